//! Mock upstream fetcher for testing.

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::RwLock;

use crate::fetcher::{FetchError, UpstreamFetcher};
use crate::record::{InfoHash, TorrentRecord};

/// A recorded fetch for test assertions.
#[derive(Debug, Clone)]
pub struct RecordedFetch {
    pub info_hash: InfoHash,
    pub timestamp: Instant,
}

/// Mock implementation of the UpstreamFetcher trait.
///
/// Unknown info hashes resolve to "not found". A configured failure applies
/// to every fetch until cleared.
///
/// # Example
///
/// ```rust,ignore
/// use dhtinfo_core::testing::{MockFetcher, fixtures};
///
/// let fetcher = MockFetcher::new();
/// let hash = fixtures::info_hash('a');
/// fetcher.set_record(fixtures::torrent_record(&hash, "Ubuntu")).await;
///
/// let record = fetcher.fetch(&hash).await?;
/// assert!(record.is_some());
/// assert_eq!(fetcher.fetch_count().await, 1);
/// ```
#[derive(Debug, Clone, Default)]
pub struct MockFetcher {
    records: Arc<RwLock<HashMap<InfoHash, TorrentRecord>>>,
    fetches: Arc<RwLock<Vec<RecordedFetch>>>,
    failure: Arc<RwLock<Option<FetchError>>>,
    delay: Arc<RwLock<Duration>>,
}

impl MockFetcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make upstream know a record (keyed by its own info hash).
    pub async fn set_record(&self, record: TorrentRecord) {
        self.records
            .write()
            .await
            .insert(record.info_hash.clone(), record);
    }

    /// Make upstream forget an info hash.
    pub async fn set_not_found(&self, info_hash: &InfoHash) {
        self.records.write().await.remove(info_hash);
    }

    /// Fail every fetch with this error, or clear with `None`.
    pub async fn set_failure(&self, error: Option<FetchError>) {
        *self.failure.write().await = error;
    }

    /// Delay every fetch, to keep refreshes in flight.
    pub async fn set_delay(&self, delay: Duration) {
        *self.delay.write().await = delay;
    }

    pub async fn recorded_fetches(&self) -> Vec<RecordedFetch> {
        self.fetches.read().await.clone()
    }

    pub async fn fetch_count(&self) -> usize {
        self.fetches.read().await.len()
    }
}

#[async_trait]
impl UpstreamFetcher for MockFetcher {
    fn name(&self) -> &str {
        "mock"
    }

    async fn fetch(&self, info_hash: &InfoHash) -> Result<Option<TorrentRecord>, FetchError> {
        self.fetches.write().await.push(RecordedFetch {
            info_hash: info_hash.clone(),
            timestamp: Instant::now(),
        });

        let delay = *self.delay.read().await;
        if !delay.is_zero() {
            tokio::time::sleep(delay).await;
        }

        if let Some(error) = self.failure.read().await.clone() {
            return Err(error);
        }

        Ok(self.records.read().await.get(info_hash).cloned())
    }
}
