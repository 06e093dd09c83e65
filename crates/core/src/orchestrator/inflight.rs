//! Per-key tracking of in-flight background refreshes.

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use tokio::sync::Notify;
use tokio::time::Instant;

use crate::record::InfoHash;

/// Tracks which info hashes currently have a refresh running.
///
/// At most one guard exists per key at any time. The key is released when the
/// guard is dropped, so a refresh that fails, panics or is aborted still frees
/// its slot.
#[derive(Debug, Clone, Default)]
pub struct RefreshTracker {
    inflight: Arc<DashMap<InfoHash, DateTime<Utc>>>,
    released: Arc<Notify>,
}

impl RefreshTracker {
    pub fn new() -> Self {
        Self::default()
    }

    /// Claim the refresh slot for a key, or `None` if one is already running.
    pub fn try_acquire(&self, info_hash: &InfoHash) -> Option<RefreshGuard> {
        match self.inflight.entry(info_hash.clone()) {
            Entry::Occupied(_) => None,
            Entry::Vacant(slot) => {
                slot.insert(Utc::now());
                Some(RefreshGuard {
                    inflight: Arc::clone(&self.inflight),
                    released: Arc::clone(&self.released),
                    info_hash: info_hash.clone(),
                })
            }
        }
    }

    pub fn is_refreshing(&self, info_hash: &InfoHash) -> bool {
        self.inflight.contains_key(info_hash)
    }

    pub fn len(&self) -> usize {
        self.inflight.len()
    }

    pub fn is_empty(&self) -> bool {
        self.inflight.is_empty()
    }

    /// Wait until no refresh is in flight, or `timeout` elapses.
    ///
    /// Returns whether the tracker is idle.
    pub async fn wait_idle(&self, timeout: Duration) -> bool {
        let deadline = Instant::now() + timeout;
        loop {
            let released = self.released.notified();
            tokio::pin!(released);
            // Register before checking, so a release in between is not missed.
            released.as_mut().enable();

            if self.inflight.is_empty() {
                return true;
            }
            if tokio::time::timeout_at(deadline, released).await.is_err() {
                return self.inflight.is_empty();
            }
        }
    }

    /// Keys with a refresh in flight, oldest first.
    pub fn keys(&self) -> Vec<InfoHash> {
        let mut entries: Vec<(InfoHash, DateTime<Utc>)> = self
            .inflight
            .iter()
            .map(|entry| (entry.key().clone(), *entry.value()))
            .collect();
        entries.sort_by_key(|(_, started_at)| *started_at);
        entries.into_iter().map(|(key, _)| key).collect()
    }
}

/// Holds the refresh slot for one key until dropped.
#[derive(Debug)]
pub struct RefreshGuard {
    inflight: Arc<DashMap<InfoHash, DateTime<Utc>>>,
    released: Arc<Notify>,
    info_hash: InfoHash,
}

impl RefreshGuard {
    pub fn info_hash(&self) -> &InfoHash {
        &self.info_hash
    }
}

impl Drop for RefreshGuard {
    fn drop(&mut self) {
        self.inflight.remove(&self.info_hash);
        self.released.notify_waiters();
    }
}
