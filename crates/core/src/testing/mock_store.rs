//! In-memory record store for testing.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use tokio::sync::RwLock;

use crate::record::{InfoHash, TorrentRecord};
use crate::store::{RecordStore, StoreError, StoredEntry};

/// Mock implementation of the RecordStore trait.
///
/// Entries can be inserted with an arbitrary `last_modified` to simulate
/// aging, and reads or writes can be made to fail.
#[derive(Debug, Clone, Default)]
pub struct MockRecordStore {
    entries: Arc<RwLock<HashMap<InfoHash, StoredEntry>>>,
    puts: Arc<AtomicUsize>,
    fail_reads: Arc<AtomicBool>,
    fail_writes: Arc<AtomicBool>,
}

impl MockRecordStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert an entry directly, bypassing `put` and its timestamp.
    pub async fn insert_entry(&self, entry: StoredEntry) {
        self.entries
            .write()
            .await
            .insert(entry.record.info_hash.clone(), entry);
    }

    pub async fn entry(&self, info_hash: &InfoHash) -> Option<StoredEntry> {
        self.entries.read().await.get(info_hash).cloned()
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    /// Number of successful `put` calls.
    pub fn put_count(&self) -> usize {
        self.puts.load(Ordering::SeqCst)
    }

    pub fn fail_reads(&self, fail: bool) {
        self.fail_reads.store(fail, Ordering::SeqCst);
    }

    pub fn fail_writes(&self, fail: bool) {
        self.fail_writes.store(fail, Ordering::SeqCst);
    }
}

#[async_trait]
impl RecordStore for MockRecordStore {
    fn name(&self) -> &str {
        "mock"
    }

    async fn get(&self, info_hash: &InfoHash) -> Result<Option<StoredEntry>, StoreError> {
        if self.fail_reads.load(Ordering::SeqCst) {
            return Err(StoreError::Database("simulated read failure".to_string()));
        }
        Ok(self.entries.read().await.get(info_hash).cloned())
    }

    async fn put(
        &self,
        info_hash: &InfoHash,
        record: &TorrentRecord,
    ) -> Result<DateTime<Utc>, StoreError> {
        if self.fail_writes.load(Ordering::SeqCst) {
            return Err(StoreError::Database("simulated write failure".to_string()));
        }

        let last_modified = Utc::now();
        self.entries.write().await.insert(
            info_hash.clone(),
            StoredEntry {
                record: record.clone(),
                last_modified,
            },
        );
        self.puts.fetch_add(1, Ordering::SeqCst);
        Ok(last_modified)
    }
}
