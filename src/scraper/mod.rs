pub mod cleaner;
pub mod http_client;
pub mod parsers;

use crate::config::{FetchMode, ScraperConfig};
use crate::error::{FetchFailure, HistoryError, Result};
use crate::models::{AssetId, DateRange, RawPage};
use async_trait::async_trait;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{debug, error, info, warn};
use url::Url;

use self::http_client::HttpClient;

// ── Source trait ──────────────────────────────────────────────────────────────

/// Swappable history page source.
#[async_trait]
pub trait PageSource: Send + Sync {
    /// Upstream URL for `(asset, range)`; identical inputs give identical URLs.
    fn page_url(&self, asset: &AssetId, range: &DateRange) -> String;

    async fn fetch_page(
        &self,
        asset: &AssetId,
        range: &DateRange,
        timeout: Duration,
    ) -> Result<RawPage, FetchFailure>;
}

// ── CoinMarketCap scraper ─────────────────────────────────────────────────────

pub struct CoinMarketCapScraper {
    client: HttpClient,
    base_url: Url,
}

impl CoinMarketCapScraper {
    pub fn new(config: &ScraperConfig) -> Result<Self> {
        let base = format!("{}/", config.base_url.trim_end_matches('/'));
        let base_url = Url::parse(&base).map_err(|e| {
            HistoryError::Client(format!("bad base url {:?}: {}", config.base_url, e))
        })?;
        // Page paths are appended as segments, which `mailto:`/`data:` URLs lack.
        if base_url.cannot_be_a_base() {
            return Err(HistoryError::Client(format!(
                "base url {:?} cannot carry a path",
                config.base_url
            )));
        }
        Ok(Self {
            client: HttpClient::new(config)?,
            base_url,
        })
    }
}

/// `<base>/currencies/<asset>/historical-data/?start=YYYYMMDD&end=YYYYMMDD`
///
/// `base` must be able to carry a path; `CoinMarketCapScraper::new` rejects
/// one that cannot.
pub fn history_url(base: &Url, asset: &AssetId, range: &DateRange) -> String {
    let mut url = base.clone();
    if let Ok(mut segments) = url.path_segments_mut() {
        segments
            .pop_if_empty()
            .extend(["currencies", asset.as_str(), "historical-data", ""]);
    }
    url.query_pairs_mut()
        .append_pair("start", &range.compact_start())
        .append_pair("end", &range.compact_end());
    url.to_string()
}

#[async_trait]
impl PageSource for CoinMarketCapScraper {
    fn page_url(&self, asset: &AssetId, range: &DateRange) -> String {
        history_url(&self.base_url, asset, range)
    }

    async fn fetch_page(
        &self,
        asset: &AssetId,
        range: &DateRange,
        timeout: Duration,
    ) -> Result<RawPage, FetchFailure> {
        let url = self.page_url(asset, range);
        let body = self.client.get_bytes(asset, &url, timeout).await?;
        Ok(RawPage {
            asset: asset.clone(),
            range: *range,
            body,
        })
    }
}

// ── Fetching ──────────────────────────────────────────────────────────────────

/// How a batch of page requests is scheduled.
#[derive(Debug, Clone, Copy)]
pub struct FetchOptions {
    pub mode: FetchMode,
    pub timeout: Duration,
    pub max_concurrency: usize,
    /// Sequential mode stops at the first failure when set.
    pub stop_on_failure: bool,
    pub show_progress: bool,
}

pub type FetchOutcome = (AssetId, Result<RawPage, FetchFailure>);

/// Fetch one page per asset. Outcomes come back in `assets` order.
pub async fn fetch_pages(
    source: Arc<dyn PageSource>,
    assets: &[AssetId],
    range: DateRange,
    opts: FetchOptions,
) -> Vec<FetchOutcome> {
    if assets.is_empty() {
        return Vec::new();
    }
    match opts.mode {
        FetchMode::Sequential => fetch_sequential(source.as_ref(), assets, &range, &opts).await,
        FetchMode::Concurrent => fetch_concurrent(source, assets, range, &opts).await,
    }
}

async fn fetch_sequential(
    source: &dyn PageSource,
    assets: &[AssetId],
    range: &DateRange,
    opts: &FetchOptions,
) -> Vec<FetchOutcome> {
    let total = assets.len();
    let mut out = Vec::with_capacity(total);

    for (i, asset) in assets.iter().enumerate() {
        if opts.show_progress {
            info!("[{}/{}] fetching {}", i + 1, total, asset);
        }
        let result = source.fetch_page(asset, range, opts.timeout).await;
        let failed = result.is_err();
        if let Err(e) = &result {
            warn!("{}", e);
        }
        out.push((asset.clone(), result));

        if failed && opts.stop_on_failure {
            break;
        }
    }
    out
}

/// Semaphore-gated worker pool. Tasks live in a `JoinSet`, so dropping this
/// future aborts whatever is still in flight.
async fn fetch_concurrent(
    source: Arc<dyn PageSource>,
    assets: &[AssetId],
    range: DateRange,
    opts: &FetchOptions,
) -> Vec<FetchOutcome> {
    let sem = Arc::new(Semaphore::new(opts.max_concurrency.max(1)));
    let mut set = JoinSet::new();

    for (idx, asset) in assets.iter().enumerate() {
        let asset = asset.clone();
        let source = Arc::clone(&source);
        let sem = Arc::clone(&sem);
        let timeout = opts.timeout;

        set.spawn(async move {
            let result = match sem.acquire_owned().await {
                Ok(_permit) => source.fetch_page(&asset, &range, timeout).await,
                Err(e) => Err(FetchFailure::transport(
                    &asset,
                    &source.page_url(&asset, &range),
                    format!("worker pool closed: {}", e),
                )),
            };
            (idx, result)
        });
    }

    let mut slots: Vec<Option<Result<RawPage, FetchFailure>>> = vec![None; assets.len()];
    let mut done = 0usize;
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((idx, result)) => {
                done += 1;
                match &result {
                    Ok(page) => debug!(
                        "{}: {} bytes ({}/{})",
                        page.asset,
                        page.body.len(),
                        done,
                        assets.len()
                    ),
                    Err(e) => warn!("{}", e),
                }
                slots[idx] = Some(result);
            }
            Err(e) => error!("fetch task failed: {}", e),
        }
    }

    assets
        .iter()
        .zip(slots)
        .map(|(asset, slot)| {
            let result = slot.unwrap_or_else(|| {
                Err(FetchFailure::transport(
                    asset,
                    &source.page_url(asset, &range),
                    "fetch task did not complete",
                ))
            });
            (asset.clone(), result)
        })
        .collect()
}
