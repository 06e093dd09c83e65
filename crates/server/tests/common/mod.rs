//! Common test utilities for in-process server tests with mocks.
//!
//! This module provides a test fixture that builds the router with a mock
//! upstream fetcher and an in-memory record store, so lookups can be tested
//! without network access.

use std::sync::Arc;

use axum::body::Body;
use axum::http::{HeaderMap, Request, StatusCode};
use axum::Router;
use http_body_util::BodyExt;
use serde_json::Value;
use tower::ServiceExt;

use dhtinfo_core::{
    testing::{MockFetcher, MockRecordStore},
    CacheOrchestrator, Config, FreshnessPolicy, RecordStore, UpstreamFetcher,
};

/// Re-export fixtures for test convenience
pub use dhtinfo_core::testing::fixtures;

/// Test fixture for in-process HTTP testing with mock dependencies.
///
/// # Example
///
/// ```rust,ignore
/// #[tokio::test]
/// async fn test_lookup() {
///     let fixture = TestFixture::new();
///     let hash = fixtures::info_hash('a');
///     fixture.fetcher.set_record(fixtures::torrent_record(&hash, "Debian")).await;
///
///     let response = fixture.get(&format!("/info?info_hash={}", hash)).await;
///     assert_eq!(response.status, 200);
/// }
/// ```
pub struct TestFixture {
    /// The Axum router for testing
    pub router: Router,
    /// Mock record store - seed or inspect entries
    pub store: Arc<MockRecordStore>,
    /// Mock fetcher - configure upstream responses
    pub fetcher: Arc<MockFetcher>,
    /// The orchestrator behind the router
    pub orchestrator: Arc<CacheOrchestrator>,
}

/// Response from a test request
#[derive(Debug)]
pub struct TestResponse {
    pub status: StatusCode,
    pub headers: HeaderMap,
    pub body: Value,
    pub text: String,
}

impl TestResponse {
    pub fn header(&self, name: &str) -> Option<&str> {
        self.headers.get(name).and_then(|v| v.to_str().ok())
    }
}

impl TestFixture {
    /// Create a new test fixture with default config and empty mocks.
    pub fn new() -> Self {
        Self::with_config(Config::default())
    }

    /// Create a test fixture with custom configuration.
    pub fn with_config(config: Config) -> Self {
        let store = Arc::new(MockRecordStore::new());
        let fetcher = Arc::new(MockFetcher::new());
        let orchestrator = Arc::new(CacheOrchestrator::new(
            Arc::clone(&store) as Arc<dyn RecordStore>,
            Arc::clone(&fetcher) as Arc<dyn UpstreamFetcher>,
            FreshnessPolicy::new(config.cache.max_age()),
        ));

        let state = Arc::new(dhtinfo_server::state::AppState::new(
            config,
            Arc::clone(&orchestrator),
        ));
        let router = dhtinfo_server::api::create_router(state);

        Self {
            router,
            store,
            fetcher,
            orchestrator,
        }
    }

    /// Send a GET request to the test server.
    pub async fn get(&self, path: &str) -> TestResponse {
        let request = Request::builder()
            .method("GET")
            .uri(path)
            .body(Body::empty())
            .unwrap();

        let response = self
            .router
            .clone()
            .oneshot(request)
            .await
            .expect("Failed to send request");

        let status = response.status();
        let headers = response.headers().clone();
        let body_bytes = response
            .into_body()
            .collect()
            .await
            .expect("Failed to collect body")
            .to_bytes();

        let text = String::from_utf8_lossy(&body_bytes).into_owned();
        let body: Value = if body_bytes.is_empty() {
            Value::Null
        } else {
            serde_json::from_slice(&body_bytes).unwrap_or(Value::Null)
        };

        TestResponse {
            status,
            headers,
            body,
            text,
        }
    }
}

/// Helper to assert a response has expected status.
#[macro_export]
macro_rules! assert_status {
    ($response:expr, $status:expr) => {
        assert_eq!(
            $response.status, $status,
            "Expected status {:?}, got {:?}. Body: {}",
            $status,
            $response.status,
            $response.text
        );
    };
}
