use crate::config::ScraperConfig;
use crate::error::{FetchFailure, HistoryError, Result};
use crate::models::AssetId;
use std::time::Duration;
use tracing::{debug, warn};

/// Thin wrapper over a pooled `reqwest::Client`.
///
/// Clones share the same connection pool; the pool is released once the last
/// clone is dropped.
#[derive(Clone)]
pub struct HttpClient {
    inner: reqwest::Client,
}

impl HttpClient {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let inner = reqwest::Client::builder()
            .user_agent(&config.user_agent)
            .gzip(true)
            // Accept cookies so session-based pages work
            .cookie_store(true)
            .pool_max_idle_per_host(config.max_concurrency)
            .build()
            .map_err(|e| HistoryError::Client(e.to_string()))?;

        Ok(Self { inner })
    }

    /// GET `url` and return the body. Any non-2xx status is a failure.
    pub async fn get_bytes(
        &self,
        asset: &AssetId,
        url: &str,
        timeout: Duration,
    ) -> Result<Vec<u8>, FetchFailure> {
        debug!("GET {} (timeout {:?})", url, timeout);

        let resp = self
            .inner
            .get(url)
            .timeout(timeout)
            .send()
            .await
            .map_err(|e| FetchFailure::transport(asset, url, e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            warn!("{}: HTTP {} from {}", asset, status, url);
            return Err(FetchFailure::status(asset, url, status.as_u16()));
        }

        let body = resp
            .bytes()
            .await
            .map_err(|e| FetchFailure::transport(asset, url, format!("reading body: {}", e)))?;

        Ok(body.to_vec())
    }
}
