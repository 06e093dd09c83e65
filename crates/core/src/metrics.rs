//! Prometheus metrics for core components.
//!
//! This module provides metrics for:
//! - Lookups (cache hits, stale hits, upstream misses)
//! - Upstream fetches (results, duration)
//! - Background refreshes and store writes

use once_cell::sync::Lazy;
use prometheus::{HistogramOpts, HistogramVec, IntCounter, IntCounterVec, Opts};

// =============================================================================
// Lookup Metrics
// =============================================================================

/// Lookups by outcome.
pub static LOOKUPS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("dhtinfo_lookups_total", "Total info hash lookups"),
        &["outcome"], // "fresh", "stale", "fetched", "not_found"
    )
    .unwrap()
});

// =============================================================================
// Upstream Metrics
// =============================================================================

/// Upstream fetches by result.
pub static UPSTREAM_FETCHES: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("dhtinfo_upstream_fetches_total", "Total upstream fetches"),
        &["source", "result"], // result: "found", "not_found", "error"
    )
    .unwrap()
});

/// Upstream fetch duration in seconds.
pub static UPSTREAM_FETCH_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "dhtinfo_upstream_fetch_duration_seconds",
            "Duration of upstream fetches",
        )
        .buckets(vec![0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 20.0, 30.0, 60.0]),
        &["source"],
    )
    .unwrap()
});

// =============================================================================
// Refresh Metrics
// =============================================================================

/// Background refreshes by result.
pub static REFRESHES_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new(
            "dhtinfo_background_refreshes_total",
            "Background refreshes of stale records",
        ),
        &["result"], // "updated", "not_found", "error", "deduplicated"
    )
    .unwrap()
});

/// Failed store writes (the fetched record is still served).
pub static STORE_WRITE_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "dhtinfo_store_write_failures_total",
        "Record store writes that failed",
    )
    .unwrap()
});

/// Failed store reads (treated as a cache miss).
pub static STORE_READ_FAILURES: Lazy<IntCounter> = Lazy::new(|| {
    IntCounter::new(
        "dhtinfo_store_read_failures_total",
        "Record store reads that failed",
    )
    .unwrap()
});

/// All core metrics, for registration in the server's registry.
pub fn all_metrics() -> Vec<Box<dyn prometheus::core::Collector>> {
    vec![
        Box::new(LOOKUPS_TOTAL.clone()),
        Box::new(UPSTREAM_FETCHES.clone()),
        Box::new(UPSTREAM_FETCH_DURATION.clone()),
        Box::new(REFRESHES_TOTAL.clone()),
        Box::new(STORE_WRITE_FAILURES.clone()),
        Box::new(STORE_READ_FAILURES.clone()),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_all_metrics_register_without_conflicts() {
        let registry = prometheus::Registry::new();
        for metric in all_metrics() {
            registry.register(metric).unwrap();
        }

        LOOKUPS_TOTAL.with_label_values(&["fresh"]).inc();
        let families = registry.gather();
        assert!(families
            .iter()
            .any(|f| f.get_name() == "dhtinfo_lookups_total"));
    }
}
