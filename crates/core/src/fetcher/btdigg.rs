//! BTDigg upstream fetcher.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Client, Proxy, StatusCode};
use tracing::debug;

use crate::config::UpstreamConfig;
use crate::record::{InfoHash, TorrentRecord};

use super::parser::parse_search_page;
use super::{FetchError, UpstreamFetcher};

/// Fetches torrent details by scraping BTDigg's search page.
pub struct BtdiggFetcher {
    client: Client,
    config: UpstreamConfig,
}

impl BtdiggFetcher {
    /// Create a fetcher. The proxy (if any) is applied to every request.
    pub fn new(config: UpstreamConfig) -> Result<Self, FetchError> {
        let mut builder = Client::builder()
            .timeout(Duration::from_secs(config.timeout_secs as u64))
            .user_agent(config.user_agent.clone());

        if let Some(proxy_url) = config.proxy() {
            let proxy = Proxy::all(proxy_url)
                .map_err(|e| FetchError::InvalidConfig(format!("proxy_url: {}", e)))?;
            builder = builder.proxy(proxy);
        }

        let client = builder
            .build()
            .map_err(|e| FetchError::InvalidConfig(e.to_string()))?;

        Ok(Self { client, config })
    }

    /// Build the search URL for an info hash.
    fn build_search_url(&self, info_hash: &InfoHash) -> String {
        format!(
            "{}/search?order=0&q={}",
            self.config.base_url.trim_end_matches('/'),
            urlencoding::encode(info_hash.as_str())
        )
    }

    async fn get_page(&self, info_hash: &InfoHash) -> Result<Option<String>, FetchError> {
        let url = self.build_search_url(info_hash);
        debug!(info_hash = %info_hash, "Querying BTDigg");

        let response = self.client.get(&url).send().await.map_err(map_transport_error)?;

        match response.status() {
            StatusCode::NOT_FOUND => Ok(None),
            status if status.is_success() => response
                .text()
                .await
                .map(Some)
                .map_err(map_transport_error),
            status => Err(FetchError::Status(status.as_u16())),
        }
    }
}

#[async_trait]
impl UpstreamFetcher for BtdiggFetcher {
    fn name(&self) -> &str {
        "btdigg"
    }

    async fn fetch(&self, info_hash: &InfoHash) -> Result<Option<TorrentRecord>, FetchError> {
        let Some(html) = self.get_page(info_hash).await? else {
            debug!(info_hash = %info_hash, "BTDigg returned 404");
            return Ok(None);
        };

        let record = parse_search_page(info_hash, &html)?;
        debug!(
            info_hash = %info_hash,
            found = record.is_some(),
            "BTDigg page parsed"
        );
        Ok(record)
    }
}

fn map_transport_error(e: reqwest::Error) -> FetchError {
    if e.is_timeout() {
        FetchError::Timeout
    } else if e.is_connect() {
        FetchError::Connection(e.to_string())
    } else if e.is_decode() || e.is_body() {
        FetchError::Parse(e.to_string())
    } else {
        FetchError::Connection(e.to_string())
    }
}
