//! Prometheus metrics for observability.
//!
//! This module provides metrics for monitoring the dhtinfo server:
//! - HTTP request metrics (latency, counts)
//! - Background refreshes in flight (collected dynamically)
//!
//! Cache and upstream metrics live in `dhtinfo_core::metrics` and are
//! registered here as well.

use once_cell::sync::Lazy;
use prometheus::{
    self, Encoder, HistogramOpts, HistogramVec, IntCounterVec, IntGauge, Opts, Registry,
    TextEncoder,
};
use regex_lite::Regex;
use tracing::error;

/// Global metrics registry.
pub static REGISTRY: Lazy<Registry> = Lazy::new(|| {
    let registry = Registry::new();
    register_metrics(&registry);
    registry
});

// =============================================================================
// HTTP Request Metrics
// =============================================================================

/// HTTP request duration in seconds.
pub static HTTP_REQUEST_DURATION: Lazy<HistogramVec> = Lazy::new(|| {
    HistogramVec::new(
        HistogramOpts::new(
            "dhtinfo_http_request_duration_seconds",
            "HTTP request duration in seconds",
        )
        .buckets(vec![
            0.001, 0.005, 0.01, 0.025, 0.05, 0.1, 0.25, 0.5, 1.0, 2.5, 5.0, 10.0, 30.0,
        ]),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests total count.
pub static HTTP_REQUESTS_TOTAL: Lazy<IntCounterVec> = Lazy::new(|| {
    IntCounterVec::new(
        Opts::new("dhtinfo_http_requests_total", "Total HTTP requests"),
        &["method", "path", "status"],
    )
    .unwrap()
});

/// HTTP requests currently in flight.
pub static HTTP_REQUESTS_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "dhtinfo_http_requests_in_flight",
        "Number of HTTP requests currently being processed",
    )
    .unwrap()
});

// =============================================================================
// Refresh Metrics (collected dynamically)
// =============================================================================

/// Background refreshes currently running.
pub static REFRESHES_IN_FLIGHT: Lazy<IntGauge> = Lazy::new(|| {
    IntGauge::new(
        "dhtinfo_refreshes_in_flight",
        "Number of background refreshes currently running",
    )
    .unwrap()
});

// =============================================================================
// Registration
// =============================================================================

fn register_metrics(registry: &Registry) {
    // HTTP
    registry
        .register(Box::new(HTTP_REQUEST_DURATION.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_TOTAL.clone()))
        .unwrap();
    registry
        .register(Box::new(HTTP_REQUESTS_IN_FLIGHT.clone()))
        .unwrap();

    // Refreshes
    registry
        .register(Box::new(REFRESHES_IN_FLIGHT.clone()))
        .unwrap();

    // Core metrics (lookups, upstream, store)
    for metric in dhtinfo_core::metrics::all_metrics() {
        registry.register(metric).unwrap();
    }
}

/// Encode all metrics as Prometheus text format.
pub fn encode_metrics() -> String {
    let encoder = TextEncoder::new();
    let metric_families = REGISTRY.gather();
    let mut buffer = Vec::new();
    if let Err(e) = encoder.encode(&metric_families, &mut buffer) {
        error!("Failed to encode metrics: {}", e);
    }
    String::from_utf8_lossy(&buffer).into_owned()
}

/// Collect dynamic metrics from current application state.
pub fn collect_dynamic_metrics(state: &crate::state::AppState) {
    REFRESHES_IN_FLIGHT.set(state.orchestrator().refreshes_in_flight() as i64);
}

static HASH_REGEX: Lazy<Regex> = Lazy::new(|| Regex::new(r"[0-9a-fA-F]{40}").unwrap());

/// Normalize a path for metric labels.
///
/// Lookups carry the hash in the query string, which is never part of the
/// label. A hash pasted into the path of an unknown route is collapsed so it
/// cannot mint a label per torrent.
pub fn normalize_path(path: &str) -> String {
    HASH_REGEX.replace_all(path, "{hash}").into_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_normalize_path_keeps_routes() {
        for path in [
            "/info",
            "/metrics",
            "/api/v1/info",
            "/api/v1/health",
            "/api/v1/config",
            "/api/v1/status",
        ] {
            assert_eq!(normalize_path(path), path);
        }
    }

    #[test]
    fn test_normalize_path_collapses_hash_in_unknown_path() {
        let path = "/info/a94a8fe5ccb19ba61c4c0873d391e987982fbbd3";
        assert_eq!(normalize_path(path), "/info/{hash}");
    }

    #[test]
    fn test_encode_includes_core_metrics() {
        dhtinfo_core::metrics::LOOKUPS_TOTAL
            .with_label_values(&["fresh"])
            .inc();
        let output = encode_metrics();
        assert!(output.contains("dhtinfo_lookups_total"));
    }
}
