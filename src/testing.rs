//! In-memory page source for exercising the fetch/pipeline layers offline.

use crate::error::FetchFailure;
use crate::models::{AssetId, DateRange, RawPage};
use crate::scraper::PageSource;
use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;

#[derive(Default)]
pub struct FakeSource {
    pages: HashMap<String, String>,
    delays: HashMap<String, Duration>,
    default_delay: Option<Duration>,
    calls: AtomicUsize,
    in_flight: AtomicUsize,
    peak: AtomicUsize,
    timeouts: Mutex<Vec<Duration>>,
}

impl FakeSource {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_page(mut self, asset: &str, html: &str) -> Self {
        self.pages.insert(asset.to_lowercase(), html.to_string());
        self
    }

    pub fn with_delay(mut self, asset: &str, delay: Duration) -> Self {
        self.delays.insert(asset.to_lowercase(), delay);
        self
    }

    /// Delay for every asset without its own `with_delay`.
    pub fn with_default_delay(mut self, delay: Duration) -> Self {
        self.default_delay = Some(delay);
        self
    }

    /// Number of `fetch_page` calls so far.
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }

    /// Most `fetch_page` calls ever running at once.
    pub fn peak_in_flight(&self) -> usize {
        self.peak.load(Ordering::SeqCst)
    }

    /// Timeout passed to each `fetch_page` call, in call order.
    pub fn timeouts(&self) -> Vec<Duration> {
        self.timeouts.lock().map(|t| t.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl PageSource for FakeSource {
    fn page_url(&self, asset: &AssetId, range: &DateRange) -> String {
        format!(
            "https://fake.test/currencies/{}/historical-data/?start={}&end={}",
            asset,
            range.compact_start(),
            range.compact_end()
        )
    }

    async fn fetch_page(
        &self,
        asset: &AssetId,
        range: &DateRange,
        timeout: Duration,
    ) -> Result<RawPage, FetchFailure> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        if let Ok(mut t) = self.timeouts.lock() {
            t.push(timeout);
        }

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.peak.fetch_max(now, Ordering::SeqCst);
        let delay = self.delays.get(asset.as_str()).copied().or(self.default_delay);
        if let Some(delay) = delay {
            tokio::time::sleep(delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        let url = self.page_url(asset, range);
        match self.pages.get(asset.as_str()) {
            Some(html) => Ok(RawPage {
                asset: asset.clone(),
                range: *range,
                body: html.as_bytes().to_vec(),
            }),
            None => Err(FetchFailure::status(asset, &url, 404)),
        }
    }
}
