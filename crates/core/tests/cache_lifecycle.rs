//! Cache lifecycle integration tests.
//!
//! These tests drive the orchestrator against a real SQLite store:
//! absent -> fetched -> fresh -> stale -> refreshed

use std::sync::Arc;
use std::time::Duration;

use chrono::Utc;
use tempfile::TempDir;

use dhtinfo_core::{
    testing::{fixtures, MockFetcher},
    CacheOrchestrator, FetchError, FreshnessPolicy, LookupError, RecordStore, ResolutionSource,
    SqliteStore, UpstreamFetcher,
};

const MAX_AGE: Duration = Duration::from_secs(7 * 24 * 3600);

/// Test helper holding the store, fetcher and orchestrator.
struct TestHarness {
    store: Arc<SqliteStore>,
    fetcher: Arc<MockFetcher>,
    orchestrator: Arc<CacheOrchestrator>,
    _temp_dir: TempDir,
}

impl TestHarness {
    fn new() -> Self {
        let temp_dir = TempDir::new().expect("Failed to create temp dir");
        let store = Arc::new(
            SqliteStore::new(&temp_dir.path().join("torrents.db"))
                .expect("Failed to create store"),
        );
        let fetcher = Arc::new(MockFetcher::new());
        let orchestrator = Arc::new(CacheOrchestrator::new(
            Arc::clone(&store) as Arc<dyn RecordStore>,
            Arc::clone(&fetcher) as Arc<dyn UpstreamFetcher>,
            FreshnessPolicy::new(MAX_AGE),
        ));

        Self {
            store,
            fetcher,
            orchestrator,
            _temp_dir: temp_dir,
        }
    }
}

#[tokio::test]
async fn test_first_lookup_fetches_then_serves_from_store() {
    let harness = TestHarness::new();
    let hash = fixtures::info_hash('a');
    harness
        .fetcher
        .set_record(fixtures::torrent_record(&hash, "Big Buck Bunny"))
        .await;

    let first = harness.orchestrator.resolve(&hash).await.unwrap();
    assert_eq!(first.source, ResolutionSource::Upstream);
    assert_eq!(first.ttl, MAX_AGE);

    let stored = harness.store.get(&hash).await.unwrap().unwrap();
    assert_eq!(stored.record, first.record);
    assert!(Utc::now() - stored.last_modified < chrono::Duration::seconds(5));

    let second = harness.orchestrator.resolve(&hash).await.unwrap();
    assert_eq!(second.source, ResolutionSource::Cache);
    assert_eq!(second.record, first.record);
    assert!(second.ttl <= MAX_AGE);
    assert_eq!(harness.fetcher.fetch_count().await, 1);
}

#[tokio::test]
async fn test_repeated_fresh_lookups_do_not_fetch() {
    let harness = TestHarness::new();
    let hash = fixtures::info_hash('b');
    harness
        .store
        .write_entry(
            &hash,
            &fixtures::torrent_record(&hash, "Sintel"),
            Utc::now() - chrono::Duration::days(2),
        )
        .unwrap();

    for _ in 0..3 {
        let resolution = harness.orchestrator.resolve(&hash).await.unwrap();
        assert_eq!(resolution.source, ResolutionSource::Cache);
        assert_eq!(resolution.record.name, "Sintel");
    }
    assert_eq!(harness.fetcher.fetch_count().await, 0);
}

#[tokio::test]
async fn test_unknown_hash_leaves_store_empty() {
    let harness = TestHarness::new();
    let hash = fixtures::info_hash('c');

    let result = harness.orchestrator.lookup(hash.as_str()).await;

    assert!(matches!(result, Err(LookupError::NotFound(_))));
    assert!(harness.store.get(&hash).await.unwrap().is_none());
}

#[tokio::test]
async fn test_upstream_outage_on_miss_is_not_found() {
    let harness = TestHarness::new();
    let hash = fixtures::info_hash('d');
    harness
        .fetcher
        .set_record(fixtures::torrent_record(&hash, "Tears of Steel"))
        .await;
    harness
        .fetcher
        .set_failure(Some(FetchError::Connection("proxy down".to_string())))
        .await;

    assert!(harness.orchestrator.resolve(&hash).await.is_none());
    assert!(harness.store.get(&hash).await.unwrap().is_none());
}

#[tokio::test]
async fn test_stale_entry_refreshed_exactly_once() {
    let harness = TestHarness::new();
    let hash = fixtures::info_hash('e');
    let eight_days_ago = Utc::now() - chrono::Duration::days(8);
    harness
        .store
        .write_entry(
            &hash,
            &fixtures::torrent_record(&hash, "Old Name"),
            eight_days_ago,
        )
        .unwrap();
    harness
        .fetcher
        .set_record(fixtures::torrent_record(&hash, "New Name"))
        .await;
    harness.fetcher.set_delay(Duration::from_millis(100)).await;

    let lookups = (0..10).map(|_| {
        let orchestrator = Arc::clone(&harness.orchestrator);
        let hash = hash.clone();
        async move { orchestrator.resolve(&hash).await }
    });
    let results = futures::future::join_all(lookups).await;

    for resolution in results {
        let resolution = resolution.unwrap();
        assert_eq!(resolution.source, ResolutionSource::StaleCache);
        assert_eq!(resolution.record.name, "Old Name");
        assert_eq!(resolution.cache_control(), "public, max-age=0");
    }

    assert!(harness.orchestrator.drain(Duration::from_secs(5)).await);
    assert_eq!(harness.fetcher.fetch_count().await, 1);

    let stored = harness.store.get(&hash).await.unwrap().unwrap();
    assert_eq!(stored.record.name, "New Name");
    assert!(stored.last_modified > eight_days_ago);

    let after = harness.orchestrator.resolve(&hash).await.unwrap();
    assert_eq!(after.source, ResolutionSource::Cache);
    assert_eq!(after.record.name, "New Name");
}

#[tokio::test]
async fn test_refresh_not_found_keeps_stale_entry() {
    let harness = TestHarness::new();
    let hash = fixtures::info_hash('f');
    let eight_days_ago = Utc::now() - chrono::Duration::days(8);
    harness
        .store
        .write_entry(&hash, &fixtures::torrent_record(&hash, "Gone"), eight_days_ago)
        .unwrap();

    let resolution = harness.orchestrator.resolve(&hash).await.unwrap();
    assert_eq!(resolution.source, ResolutionSource::StaleCache);
    assert!(harness.orchestrator.drain(Duration::from_secs(5)).await);

    let stored = harness.store.get(&hash).await.unwrap().unwrap();
    assert_eq!(stored.record.name, "Gone");
    assert_eq!(stored.last_modified, eight_days_ago);

    // Still stale, so a later lookup tries again.
    harness.orchestrator.resolve(&hash).await.unwrap();
    assert!(harness.orchestrator.drain(Duration::from_secs(5)).await);
    assert_eq!(harness.fetcher.fetch_count().await, 2);
}

#[tokio::test]
async fn test_different_keys_refresh_independently() {
    let harness = TestHarness::new();
    let eight_days_ago = Utc::now() - chrono::Duration::days(8);
    let hashes = [fixtures::info_hash('1'), fixtures::info_hash('2')];
    for hash in &hashes {
        harness
            .store
            .write_entry(hash, &fixtures::torrent_record(hash, "Old"), eight_days_ago)
            .unwrap();
        harness
            .fetcher
            .set_record(fixtures::torrent_record(hash, "New"))
            .await;
    }
    harness.fetcher.set_delay(Duration::from_millis(100)).await;

    for hash in &hashes {
        harness.orchestrator.resolve(hash).await.unwrap();
    }
    assert_eq!(harness.orchestrator.refreshes_in_flight(), 2);

    assert!(harness.orchestrator.drain(Duration::from_secs(5)).await);
    assert_eq!(harness.fetcher.fetch_count().await, 2);
    for hash in &hashes {
        let stored = harness.store.get(hash).await.unwrap().unwrap();
        assert_eq!(stored.record.name, "New");
    }
}
