//! Cache orchestrator - serves lookups from the store and keeps it fresh.

use std::sync::Arc;
use std::time::{Duration, Instant};

use chrono::Utc;
use tracing::{debug, info, warn};

use super::inflight::RefreshTracker;
use super::types::{LookupError, OrchestratorStatus, Resolution, ResolutionSource};
use crate::fetcher::{FetchError, UpstreamFetcher};
use crate::freshness::{FreshnessPolicy, FreshnessVerdict};
use crate::metrics;
use crate::record::{InfoHash, TorrentRecord};
use crate::store::{RecordStore, StoredEntry};

/// Coordinates the record store and the upstream fetcher.
///
/// Decision per lookup:
/// - fresh entry: served from the store with the remaining TTL
/// - stale entry: served immediately with a zero TTL, and one background
///   refresh per key is started
/// - no entry: fetched from upstream synchronously and stored
pub struct CacheOrchestrator {
    store: Arc<dyn RecordStore>,
    fetcher: Arc<dyn UpstreamFetcher>,
    policy: FreshnessPolicy,
    refreshes: RefreshTracker,
}

impl CacheOrchestrator {
    pub fn new(
        store: Arc<dyn RecordStore>,
        fetcher: Arc<dyn UpstreamFetcher>,
        policy: FreshnessPolicy,
    ) -> Self {
        Self {
            store,
            fetcher,
            policy,
            refreshes: RefreshTracker::new(),
        }
    }

    pub fn policy(&self) -> FreshnessPolicy {
        self.policy
    }

    /// Parse a raw info hash and resolve it.
    pub async fn lookup(&self, raw_info_hash: &str) -> Result<Resolution, LookupError> {
        let info_hash = InfoHash::parse(raw_info_hash)?;
        match self.resolve(&info_hash).await {
            Some(resolution) => Ok(resolution),
            None => Err(LookupError::NotFound(info_hash)),
        }
    }

    /// Resolve an info hash to a record and TTL, or `None` if it is unknown.
    ///
    /// Never fails: store read errors count as a miss, upstream errors as
    /// not found.
    pub async fn resolve(&self, info_hash: &InfoHash) -> Option<Resolution> {
        let entry = self.read_entry(info_hash).await;
        let now = Utc::now();
        let verdict = self
            .policy
            .evaluate(now, entry.as_ref().map(|e| e.last_modified));

        match (verdict, entry) {
            (FreshnessVerdict::Fresh, Some(entry)) => {
                let ttl = self.policy.remaining_ttl(now, entry.last_modified);
                debug!(info_hash = %info_hash, ttl_secs = ttl.as_secs(), "Serving fresh record");
                metrics::LOOKUPS_TOTAL.with_label_values(&["fresh"]).inc();
                Some(Resolution {
                    record: entry.record,
                    ttl,
                    source: ResolutionSource::Cache,
                })
            }
            (FreshnessVerdict::Stale, Some(entry)) => {
                info!(
                    info_hash = %info_hash,
                    last_modified = %entry.last_modified,
                    "Serving stale record, refreshing in background"
                );
                metrics::LOOKUPS_TOTAL.with_label_values(&["stale"]).inc();
                self.schedule_refresh(info_hash);
                Some(Resolution {
                    record: entry.record,
                    ttl: self.policy.remaining_ttl(now, entry.last_modified),
                    source: ResolutionSource::StaleCache,
                })
            }
            _ => self.fetch_and_store(info_hash).await,
        }
    }

    /// Number of background refreshes currently running.
    pub fn refreshes_in_flight(&self) -> usize {
        self.refreshes.len()
    }

    pub fn is_refreshing(&self, info_hash: &InfoHash) -> bool {
        self.refreshes.is_refreshing(info_hash)
    }

    /// Wait until no background refresh is running.
    ///
    /// Returns `false` if refreshes are still in flight after `timeout`.
    pub async fn drain(&self, timeout: Duration) -> bool {
        let idle = self.refreshes.wait_idle(timeout).await;
        if !idle {
            warn!(
                in_flight = self.refreshes.len(),
                "Timed out waiting for background refreshes"
            );
        }
        idle
    }

    pub fn status(&self) -> OrchestratorStatus {
        OrchestratorStatus {
            store: self.store.name().to_string(),
            upstream: self.fetcher.name().to_string(),
            max_age_secs: self.policy.max_age().as_secs(),
            refreshes_in_flight: self.refreshes.keys(),
        }
    }

    async fn read_entry(&self, info_hash: &InfoHash) -> Option<StoredEntry> {
        match self.store.get(info_hash).await {
            Ok(entry) => entry,
            Err(e) => {
                warn!(
                    info_hash = %info_hash,
                    store = self.store.name(),
                    error = %e,
                    "Store read failed, treating as a miss"
                );
                metrics::STORE_READ_FAILURES.inc();
                None
            }
        }
    }

    async fn fetch_and_store(&self, info_hash: &InfoHash) -> Option<Resolution> {
        let record = match fetch_upstream(self.fetcher.as_ref(), info_hash).await {
            Ok(Some(record)) => record,
            Ok(None) => {
                debug!(info_hash = %info_hash, "Torrent not found upstream");
                metrics::LOOKUPS_TOTAL.with_label_values(&["not_found"]).inc();
                return None;
            }
            Err(e) => {
                warn!(info_hash = %info_hash, error = %e, "Upstream fetch failed");
                metrics::LOOKUPS_TOTAL.with_label_values(&["not_found"]).inc();
                return None;
            }
        };

        match self.store.put(info_hash, &record).await {
            Ok(_) => info!(info_hash = %info_hash, name = %record.name, "Added new torrent"),
            Err(e) => {
                warn!(info_hash = %info_hash, error = %e, "Failed to store fetched record");
                metrics::STORE_WRITE_FAILURES.inc();
            }
        }

        metrics::LOOKUPS_TOTAL.with_label_values(&["fetched"]).inc();
        Some(Resolution {
            record,
            ttl: self.policy.max_age(),
            source: ResolutionSource::Upstream,
        })
    }

    fn schedule_refresh(&self, info_hash: &InfoHash) {
        let Some(guard) = self.refreshes.try_acquire(info_hash) else {
            debug!(info_hash = %info_hash, "Refresh already in flight");
            metrics::REFRESHES_TOTAL
                .with_label_values(&["deduplicated"])
                .inc();
            return;
        };

        let store = Arc::clone(&self.store);
        let fetcher = Arc::clone(&self.fetcher);
        let policy = self.policy;
        tokio::spawn(async move {
            refresh(store.as_ref(), fetcher.as_ref(), policy, guard.info_hash()).await;
            drop(guard);
        });
    }
}

/// Fetch a record upstream and, if found, replace the stored entry.
///
/// The entry is read again under the refresh slot: a lookup that saw it stale
/// may only get the slot after another refresh already replaced it. Any
/// failure leaves the stale entry in place.
async fn refresh(
    store: &dyn RecordStore,
    fetcher: &dyn UpstreamFetcher,
    policy: FreshnessPolicy,
    info_hash: &InfoHash,
) {
    let last_modified = match store.get(info_hash).await {
        Ok(entry) => entry.map(|e| e.last_modified),
        Err(e) => {
            warn!(info_hash = %info_hash, error = %e, "Store read failed before refresh");
            metrics::STORE_READ_FAILURES.inc();
            None
        }
    };
    if policy.evaluate(Utc::now(), last_modified) == FreshnessVerdict::Fresh {
        debug!(info_hash = %info_hash, "Entry already refreshed");
        metrics::REFRESHES_TOTAL
            .with_label_values(&["deduplicated"])
            .inc();
        return;
    }

    match fetch_upstream(fetcher, info_hash).await {
        Ok(Some(record)) => match store.put(info_hash, &record).await {
            Ok(last_modified) => {
                info!(info_hash = %info_hash, %last_modified, "Updated torrent info");
                metrics::REFRESHES_TOTAL.with_label_values(&["updated"]).inc();
            }
            Err(e) => {
                warn!(info_hash = %info_hash, error = %e, "Failed to store refreshed record");
                metrics::STORE_WRITE_FAILURES.inc();
                metrics::REFRESHES_TOTAL.with_label_values(&["error"]).inc();
            }
        },
        Ok(None) => {
            warn!(info_hash = %info_hash, "Torrent no longer found upstream, keeping stale record");
            metrics::REFRESHES_TOTAL
                .with_label_values(&["not_found"])
                .inc();
        }
        Err(e) => {
            warn!(info_hash = %info_hash, error = %e, "Background refresh failed");
            metrics::REFRESHES_TOTAL.with_label_values(&["error"]).inc();
        }
    }
}

async fn fetch_upstream(
    fetcher: &dyn UpstreamFetcher,
    info_hash: &InfoHash,
) -> Result<Option<TorrentRecord>, FetchError> {
    let start = Instant::now();
    let result = fetcher.fetch(info_hash).await;

    metrics::UPSTREAM_FETCH_DURATION
        .with_label_values(&[fetcher.name()])
        .observe(start.elapsed().as_secs_f64());
    let label = match &result {
        Ok(Some(_)) => "found",
        Ok(None) => "not_found",
        Err(_) => "error",
    };
    metrics::UPSTREAM_FETCHES
        .with_label_values(&[fetcher.name(), label])
        .inc();

    result
}
