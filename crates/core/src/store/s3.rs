//! S3-backed record store.
//!
//! Each record is a JSON object keyed by its info hash. The object's own
//! `Last-Modified` is the entry timestamp, so no extra metadata is written.

use std::fmt;

use async_trait::async_trait;
use aws_sdk_s3::primitives::{ByteStream, DateTime as S3DateTime};
use aws_sdk_s3::Client;
use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::{RecordStore, StoreError, StoredEntry};
use crate::config::S3Config;
use crate::record::{InfoHash, TorrentRecord};

/// S3-backed record store.
pub struct S3Store {
    client: Client,
    bucket: String,
}

impl fmt::Debug for S3Store {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("S3Store")
            .field("bucket", &self.bucket)
            .finish()
    }
}

impl S3Store {
    /// Build a store from configuration, loading credentials from the
    /// environment unless static keys are configured.
    pub async fn new(config: &S3Config) -> Self {
        let mut loader = aws_config::from_env()
            .region(aws_sdk_s3::config::Region::new(config.region.clone()));

        if let Some(endpoint_url) = &config.endpoint_url {
            loader = loader.endpoint_url(endpoint_url);
        }

        if let (Some(access_key), Some(secret_key)) = (&config.access_key, &config.secret_key) {
            loader = loader.credentials_provider(aws_sdk_s3::config::Credentials::new(
                access_key.clone(),
                secret_key.clone(),
                None,
                None,
                "dhtinfo-static",
            ));
        }

        let sdk_config = loader.load().await;
        let s3_config = aws_sdk_s3::config::Builder::from(&sdk_config)
            .force_path_style(config.force_path_style)
            .build();

        Self::with_client(Client::from_conf(s3_config), config.bucket.clone())
    }

    /// Build a store around an existing client.
    pub fn with_client(client: Client, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
        }
    }

    async fn head_last_modified(&self, key: &str) -> Option<DateTime<Utc>> {
        match self
            .client
            .head_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(head) => head.last_modified().and_then(to_chrono),
            Err(e) => {
                warn!(key, error = %e, "Failed to read object timestamp after write");
                None
            }
        }
    }
}

#[async_trait]
impl RecordStore for S3Store {
    fn name(&self) -> &str {
        "s3"
    }

    async fn get(&self, info_hash: &InfoHash) -> Result<Option<StoredEntry>, StoreError> {
        let key = info_hash.as_str();

        let response = match self
            .client
            .get_object()
            .bucket(&self.bucket)
            .key(key)
            .send()
            .await
        {
            Ok(response) => response,
            Err(err) => {
                let err = err.into_service_error();
                if err.is_no_such_key() {
                    debug!(info_hash = %info_hash, "Object not cached");
                    return Ok(None);
                }
                return Err(StoreError::ObjectStorage(err.to_string()));
            }
        };

        let last_modified = response
            .last_modified()
            .and_then(to_chrono)
            .ok_or_else(|| {
                StoreError::ObjectStorage(format!("object {} has no Last-Modified", key))
            })?;

        let body = response
            .body
            .collect()
            .await
            .map_err(|e| StoreError::ObjectStorage(e.to_string()))?
            .into_bytes();

        let record: TorrentRecord = serde_json::from_slice(&body)
            .map_err(|e| StoreError::Serialization(e.to_string()))?;

        Ok(Some(StoredEntry {
            record,
            last_modified,
        }))
    }

    async fn put(
        &self,
        info_hash: &InfoHash,
        record: &TorrentRecord,
    ) -> Result<DateTime<Utc>, StoreError> {
        let key = info_hash.as_str();
        let body =
            serde_json::to_vec(record).map_err(|e| StoreError::Serialization(e.to_string()))?;

        self.client
            .put_object()
            .bucket(&self.bucket)
            .key(key)
            .content_type("application/json")
            .body(ByteStream::from(body))
            .send()
            .await
            .map_err(|e| StoreError::ObjectStorage(e.into_service_error().to_string()))?;

        let last_modified = self
            .head_last_modified(key)
            .await
            .unwrap_or_else(Utc::now);

        debug!(info_hash = %info_hash, bucket = %self.bucket, "Stored torrent object");
        Ok(last_modified)
    }
}

fn to_chrono(timestamp: &S3DateTime) -> Option<DateTime<Utc>> {
    DateTime::from_timestamp(timestamp.secs(), timestamp.subsec_nanos())
}

#[cfg(test)]
mod tests {
    use super::*;
    use aws_sdk_s3::operation::get_object::{GetObjectError, GetObjectOutput};
    use aws_sdk_s3::operation::head_object::{HeadObjectError, HeadObjectOutput};
    use aws_sdk_s3::operation::put_object::PutObjectOutput;
    use aws_sdk_s3::types::error::{NoSuchKey, NotFound};
    use aws_smithy_mocks::{mock, mock_client, RuleMode};

    use crate::testing::fixtures;

    const BUCKET: &str = "torrents";
    const STORED_AT: i64 = 1_700_000_000;

    fn record_json(record: &TorrentRecord) -> Vec<u8> {
        serde_json::to_vec(record).unwrap()
    }

    #[test]
    fn test_to_chrono_preserves_instant() {
        let timestamp = S3DateTime::from_secs_and_nanos(1_700_000_000, 500);
        let converted = to_chrono(&timestamp).unwrap();
        assert_eq!(converted.timestamp(), 1_700_000_000);
        assert_eq!(converted.timestamp_subsec_nanos(), 500);
    }

    #[tokio::test]
    async fn test_get_missing_key_is_none() {
        let missing = mock!(aws_sdk_s3::Client::get_object)
            .then_error(|| GetObjectError::NoSuchKey(NoSuchKey::builder().build()));
        let store = S3Store::with_client(mock_client!(aws_sdk_s3, [&missing]), BUCKET);

        let entry = store.get(&fixtures::info_hash('a')).await.unwrap();
        assert!(entry.is_none());
    }

    #[tokio::test]
    async fn test_get_maps_body_and_last_modified() {
        let info_hash = fixtures::info_hash('b');
        let record = fixtures::torrent_record(&info_hash, "Stored");
        let body = record_json(&record);

        let expected_key = info_hash.as_str().to_string();
        let found = mock!(aws_sdk_s3::Client::get_object)
            .match_requests(move |req| {
                req.bucket() == Some(BUCKET) && req.key() == Some(expected_key.as_str())
            })
            .then_output(move || {
                GetObjectOutput::builder()
                    .body(ByteStream::from(body.clone()))
                    .last_modified(S3DateTime::from_secs(STORED_AT))
                    .build()
            });
        let store = S3Store::with_client(mock_client!(aws_sdk_s3, [&found]), BUCKET);

        let entry = store.get(&info_hash).await.unwrap().unwrap();
        assert_eq!(entry.record, record);
        assert_eq!(entry.last_modified.timestamp(), STORED_AT);
    }

    #[tokio::test]
    async fn test_get_without_last_modified_is_error() {
        let record = fixtures::torrent_record(&fixtures::info_hash('c'), "Undated");
        let body = record_json(&record);
        let undated = mock!(aws_sdk_s3::Client::get_object).then_output(move || {
            GetObjectOutput::builder()
                .body(ByteStream::from(body.clone()))
                .build()
        });
        let store = S3Store::with_client(mock_client!(aws_sdk_s3, [&undated]), BUCKET);

        let result = store.get(&fixtures::info_hash('c')).await;
        assert!(matches!(result, Err(StoreError::ObjectStorage(_))));
    }

    #[tokio::test]
    async fn test_get_corrupt_body_is_serialization_error() {
        let corrupt = mock!(aws_sdk_s3::Client::get_object).then_output(|| {
            GetObjectOutput::builder()
                .body(ByteStream::from_static(b"not json"))
                .last_modified(S3DateTime::from_secs(STORED_AT))
                .build()
        });
        let store = S3Store::with_client(mock_client!(aws_sdk_s3, [&corrupt]), BUCKET);

        let result = store.get(&fixtures::info_hash('d')).await;
        assert!(matches!(result, Err(StoreError::Serialization(_))));
    }

    #[tokio::test]
    async fn test_put_returns_object_last_modified() {
        let info_hash = fixtures::info_hash('e');
        let record = fixtures::torrent_record(&info_hash, "Written");

        let expected_body = record_json(&record);
        let written = mock!(aws_sdk_s3::Client::put_object)
            .match_requests(move |req| {
                req.bucket() == Some(BUCKET)
                    && req.content_type() == Some("application/json")
                    && req.body().bytes() == Some(expected_body.as_slice())
            })
            .then_output(|| PutObjectOutput::builder().build());
        let head = mock!(aws_sdk_s3::Client::head_object).then_output(|| {
            HeadObjectOutput::builder()
                .last_modified(S3DateTime::from_secs(STORED_AT))
                .build()
        });
        let store = S3Store::with_client(
            mock_client!(aws_sdk_s3, RuleMode::MatchAny, [&written, &head]),
            BUCKET,
        );

        let last_modified = store.put(&info_hash, &record).await.unwrap();
        assert_eq!(last_modified.timestamp(), STORED_AT);
        assert_eq!(written.num_calls(), 1);
        assert_eq!(head.num_calls(), 1);
    }

    #[tokio::test]
    async fn test_put_without_head_falls_back_to_now() {
        let info_hash = fixtures::info_hash('f');
        let record = fixtures::torrent_record(&info_hash, "Written");

        let written = mock!(aws_sdk_s3::Client::put_object)
            .then_output(|| PutObjectOutput::builder().build());
        let head = mock!(aws_sdk_s3::Client::head_object)
            .then_error(|| HeadObjectError::NotFound(NotFound::builder().build()));
        let store = S3Store::with_client(
            mock_client!(aws_sdk_s3, RuleMode::MatchAny, [&written, &head]),
            BUCKET,
        );

        let before = Utc::now();
        let last_modified = store.put(&info_hash, &record).await.unwrap();
        assert!(last_modified >= before);
        assert!(last_modified <= Utc::now());
    }
}
