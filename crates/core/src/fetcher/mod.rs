//! Upstream torrent metadata lookup.
//!
//! This module provides an `UpstreamFetcher` trait for fetching a torrent's
//! metadata by info hash, with a BTDigg implementation that scrapes the
//! index's search page through a proxy.

mod btdigg;
mod parser;
mod size;

pub use btdigg::BtdiggFetcher;
pub use parser::parse_search_page;
pub use size::parse_size;

use async_trait::async_trait;
use thiserror::Error;

use crate::record::{InfoHash, TorrentRecord};

/// Transient failures while fetching from upstream.
///
/// "Not found" is not an error: fetchers report it as `Ok(None)`.
#[derive(Debug, Clone, Error)]
pub enum FetchError {
    #[error("Upstream connection failed: {0}")]
    Connection(String),

    #[error("Upstream request timed out")]
    Timeout,

    #[error("Upstream returned HTTP {0}")]
    Status(u16),

    #[error("Failed to parse upstream response: {0}")]
    Parse(String),

    #[error("Invalid fetcher configuration: {0}")]
    InvalidConfig(String),
}

/// Trait for upstream metadata sources.
#[async_trait]
pub trait UpstreamFetcher: Send + Sync {
    /// Source name for logging/metrics.
    fn name(&self) -> &str;

    /// Look up a torrent. `Ok(None)` means upstream does not know it.
    async fn fetch(&self, info_hash: &InfoHash) -> Result<Option<TorrentRecord>, FetchError>;
}
