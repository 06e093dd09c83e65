//! Types for the cache orchestrator.

use std::time::Duration;

use serde::Serialize;
use thiserror::Error;

use crate::freshness::cache_control_value;
use crate::record::{InfoHash, InfoHashError, TorrentRecord};

/// Where a resolved record came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ResolutionSource {
    /// Fresh record from the store.
    Cache,
    /// Stale record from the store; a background refresh was scheduled.
    StaleCache,
    /// Fetched from upstream during this request.
    Upstream,
}

impl ResolutionSource {
    /// Value for the `X-Cache` diagnostic header.
    pub fn as_header_value(&self) -> &'static str {
        match self {
            ResolutionSource::Cache => "hit",
            ResolutionSource::StaleCache => "stale",
            ResolutionSource::Upstream => "miss",
        }
    }
}

/// A successfully resolved lookup.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Resolution {
    pub record: TorrentRecord,
    /// How long downstream caches may keep the record.
    pub ttl: Duration,
    pub source: ResolutionSource,
}

impl Resolution {
    /// `Cache-Control` header value for this resolution.
    pub fn cache_control(&self) -> String {
        cache_control_value(self.ttl)
    }
}

/// Errors surfaced by a lookup.
///
/// Upstream and store failures never appear here: they degrade to serving
/// stale data or to `NotFound`.
#[derive(Debug, Error)]
pub enum LookupError {
    #[error("invalid info hash: {0}")]
    InvalidInfoHash(#[from] InfoHashError),

    #[error("torrent not found: {0}")]
    NotFound(InfoHash),
}

/// Current status of the orchestrator.
#[derive(Debug, Clone, Serialize)]
pub struct OrchestratorStatus {
    /// Record store backend name.
    pub store: String,
    /// Upstream fetcher name.
    pub upstream: String,
    /// Configured max age in seconds.
    pub max_age_secs: u64,
    /// Info hashes with a background refresh in flight.
    pub refreshes_in_flight: Vec<InfoHash>,
}
