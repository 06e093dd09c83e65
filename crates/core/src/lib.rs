pub mod config;
pub mod fetcher;
pub mod freshness;
pub mod metrics;
pub mod orchestrator;
pub mod record;
pub mod store;
pub mod testing;

pub use config::{
    load_config, load_config_from_str, validate_config, Config, ConfigError, SanitizedConfig,
    StoreBackend,
};
pub use fetcher::{BtdiggFetcher, FetchError, UpstreamFetcher};
pub use freshness::{FreshnessPolicy, FreshnessVerdict};
pub use orchestrator::{CacheOrchestrator, LookupError, Resolution, ResolutionSource};
pub use record::{InfoHash, InfoHashError, TorrentFile, TorrentRecord};
pub use store::{RecordStore, S3Store, SqliteStore, StoreError, StoredEntry};
