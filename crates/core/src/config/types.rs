use serde::{Deserialize, Serialize};
use std::net::IpAddr;
use std::path::PathBuf;
use std::time::Duration;

use crate::freshness::DEFAULT_MAX_AGE;

/// Root configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub store: StoreConfig,
    #[serde(default)]
    pub upstream: UpstreamConfig,
}

/// Server configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: IpAddr,
    #[serde(default = "default_port")]
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
        }
    }
}

fn default_host() -> IpAddr {
    IpAddr::from([0, 0, 0, 0])
}

fn default_port() -> u16 {
    8000
}

/// Cache freshness configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct CacheConfig {
    /// Maximum age of a stored record before it is refreshed (default: 7 days).
    #[serde(default = "default_max_age_secs")]
    pub max_age_secs: u64,
}

impl CacheConfig {
    pub fn max_age(&self) -> Duration {
        Duration::from_secs(self.max_age_secs)
    }
}

impl Default for CacheConfig {
    fn default() -> Self {
        Self {
            max_age_secs: default_max_age_secs(),
        }
    }
}

fn default_max_age_secs() -> u64 {
    DEFAULT_MAX_AGE.as_secs()
}

/// Record store configuration
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct StoreConfig {
    /// Storage backend type
    #[serde(default)]
    pub backend: StoreBackend,
    #[serde(default)]
    pub sqlite: SqliteConfig,
    /// S3-specific configuration (required when backend = "s3")
    #[serde(default)]
    pub s3: Option<S3Config>,
}

/// Available storage backends
#[derive(Debug, Clone, Copy, Default, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum StoreBackend {
    #[default]
    Sqlite,
    S3,
}

/// SQLite database configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct SqliteConfig {
    #[serde(default = "default_db_path")]
    pub path: PathBuf,
}

impl Default for SqliteConfig {
    fn default() -> Self {
        Self {
            path: default_db_path(),
        }
    }
}

fn default_db_path() -> PathBuf {
    PathBuf::from("torrents.db")
}

/// S3 bucket configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct S3Config {
    pub bucket: String,
    #[serde(default = "default_region")]
    pub region: String,
    /// Custom endpoint for S3-compatible services (e.g. MinIO).
    #[serde(default)]
    pub endpoint_url: Option<String>,
    /// Use path-style addressing (needed by most S3-compatible services).
    #[serde(default)]
    pub force_path_style: bool,
    /// Static credentials. When unset the default AWS provider chain is used.
    #[serde(default)]
    pub access_key: Option<String>,
    #[serde(default)]
    pub secret_key: Option<String>,
}

fn default_region() -> String {
    "us-east-1".to_string()
}

/// Upstream (BTDigg) configuration
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct UpstreamConfig {
    /// Base URL of the BTDigg instance.
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Proxy for all upstream requests. Empty disables the proxy.
    #[serde(default = "default_proxy_url")]
    pub proxy_url: String,
    /// Request timeout in seconds (default: 30)
    #[serde(default = "default_timeout")]
    pub timeout_secs: u32,
    #[serde(default = "default_user_agent")]
    pub user_agent: String,
}

impl UpstreamConfig {
    /// The configured proxy, if any.
    pub fn proxy(&self) -> Option<&str> {
        let proxy = self.proxy_url.trim();
        (!proxy.is_empty()).then_some(proxy)
    }
}

impl Default for UpstreamConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            proxy_url: default_proxy_url(),
            timeout_secs: default_timeout(),
            user_agent: default_user_agent(),
        }
    }
}

fn default_base_url() -> String {
    "http://btdigggink2pdqzqrik3blmqemsbntpzwxottujilcdjfz56jumzfsyd.onion".to_string()
}

fn default_proxy_url() -> String {
    "socks5h://127.0.0.1:9050".to_string()
}

fn default_timeout() -> u32 {
    30
}

fn default_user_agent() -> String {
    "Mozilla/5.0 (X11; Linux x86_64; rv:123.0) Gecko/20100101 Firefox/123.0".to_string()
}

/// Sanitized config for API responses (secrets redacted)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedConfig {
    pub server: ServerConfig,
    pub cache: CacheConfig,
    pub store: SanitizedStoreConfig,
    pub upstream: SanitizedUpstreamConfig,
}

#[derive(Debug, Clone, Serialize)]
pub struct SanitizedStoreConfig {
    pub backend: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub sqlite: Option<SqliteConfig>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub s3: Option<SanitizedS3Config>,
}

/// Sanitized S3 config (credentials hidden)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedS3Config {
    pub bucket: String,
    pub region: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub endpoint_url: Option<String>,
    pub credentials_configured: bool,
}

/// Sanitized upstream config (proxy URL hidden, it may carry credentials)
#[derive(Debug, Clone, Serialize)]
pub struct SanitizedUpstreamConfig {
    pub base_url: String,
    pub proxy_configured: bool,
    pub timeout_secs: u32,
}

impl From<&Config> for SanitizedConfig {
    fn from(config: &Config) -> Self {
        let store = &config.store;
        Self {
            server: config.server.clone(),
            cache: config.cache.clone(),
            store: SanitizedStoreConfig {
                backend: match store.backend {
                    StoreBackend::Sqlite => "sqlite".to_string(),
                    StoreBackend::S3 => "s3".to_string(),
                },
                sqlite: (store.backend == StoreBackend::Sqlite).then(|| store.sqlite.clone()),
                s3: store.s3.as_ref().map(|s3| SanitizedS3Config {
                    bucket: s3.bucket.clone(),
                    region: s3.region.clone(),
                    endpoint_url: s3.endpoint_url.clone(),
                    credentials_configured: s3.access_key.is_some() && s3.secret_key.is_some(),
                }),
            },
            upstream: SanitizedUpstreamConfig {
                base_url: config.upstream.base_url.clone(),
                proxy_configured: config.upstream.proxy().is_some(),
                timeout_secs: config.upstream.timeout_secs,
            },
        }
    }
}
