//! Record store - durable mapping from info hash to the last fetched record.
//!
//! Backends are interchangeable: the cache logic only needs `get` and `put`
//! plus the timestamp of the most recent `put`.

mod s3;
mod sqlite;

pub use s3::S3Store;
pub use sqlite::SqliteStore;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use thiserror::Error;

use crate::record::{InfoHash, TorrentRecord};

/// A stored record together with the time it was last written.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredEntry {
    pub record: TorrentRecord,
    pub last_modified: DateTime<Utc>,
}

/// Errors for record store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("Database error: {0}")]
    Database(String),

    #[error("Object storage error: {0}")]
    ObjectStorage(String),

    #[error("Serialization error: {0}")]
    Serialization(String),
}

/// Trait for record storage backends.
///
/// A `put` must replace any previous entry for the same key atomically:
/// readers see either the old entry or the new one, never a mix.
#[async_trait]
pub trait RecordStore: Send + Sync {
    /// Backend name for logging.
    fn name(&self) -> &str;

    /// Fetch the entry for an info hash, if any.
    async fn get(&self, info_hash: &InfoHash) -> Result<Option<StoredEntry>, StoreError>;

    /// Store a record under an info hash, replacing any previous entry.
    ///
    /// Returns the new `last_modified`.
    async fn put(
        &self,
        info_hash: &InfoHash,
        record: &TorrentRecord,
    ) -> Result<DateTime<Utc>, StoreError>;
}
