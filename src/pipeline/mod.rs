//! Pipeline orchestrator: validator → cache → fetcher → extractor →
//! normalizer → merger.
//!
//! ## Failure policy
//!
//! The same rule applies in sequential and concurrent mode:
//!   * `fail_fast = true` (default): the first fetch failure, in request
//!     order, ends the run with `HistoryError::FetchFailure`. Sequential mode
//!     stops issuing requests at that point; concurrent mode lets the batch
//!     finish first. Pages fetched before the failure are still cached.
//!   * `fail_fast = false`: failures are collected in `HistoryReport::failures`
//!     and the merged table is built from the assets that succeeded.
//!
//! A malformed page always ends the run.
//!
//! ## HTTP client lifetime
//!
//! A `Pipeline::new` pipeline builds its CoinMarketCap client inside each
//! `run`, after the cache step, and drops it when the run returns. Runs
//! served fully from cache never build one.

use crate::config::AppConfig;
use crate::dates::{self, DateInput};
use crate::error::{FetchFailure, Result};
use crate::merge::{merge, select_fields};
use crate::models::{AssetId, DateRange, MergedTable, PerAssetTable};
use crate::scraper::cleaner::normalize;
use crate::scraper::parsers::extract;
use crate::scraper::{CoinMarketCapScraper, FetchOptions, PageSource, fetch_pages};
use crate::storage::TableCache;
use crate::utils::fmt_number;
use std::sync::Arc;
use tracing::{info, warn};

pub struct Pipeline {
    config: AppConfig,
    /// Injected source; `None` means a fresh scraper per run.
    source: Option<Arc<dyn PageSource>>,
}

#[derive(Debug, Default)]
pub struct PipelineStats {
    pub assets_requested: usize,
    pub loaded_from_cache: usize,
    pub fetched: usize,
    pub failed: usize,
    pub rows: usize,
}

#[derive(Debug, Default)]
pub struct HistoryReport {
    pub table: MergedTable,
    /// Only populated when `fail_fast` is off.
    pub failures: Vec<FetchFailure>,
    pub stats: PipelineStats,
}

impl Pipeline {
    /// Fails early on a scraper config that could never build a client.
    pub fn new(config: AppConfig) -> Result<Self> {
        CoinMarketCapScraper::new(&config.scraper)?;
        Ok(Self {
            config,
            source: None,
        })
    }

    pub fn with_source(config: AppConfig, source: Arc<dyn PageSource>) -> Self {
        Self {
            config,
            source: Some(source),
        }
    }

    fn page_source(&self) -> Result<Arc<dyn PageSource>> {
        match &self.source {
            Some(source) => Ok(Arc::clone(source)),
            None => Ok(Arc::new(CoinMarketCapScraper::new(&self.config.scraper)?)),
        }
    }

    /// Validate the dates, then run for `assets` (case-insensitive, duplicates dropped).
    pub async fn get_data_for<S: AsRef<str>>(
        &self,
        assets: &[S],
        start: impl DateInput,
        end: impl DateInput,
        fields: &[String],
    ) -> Result<HistoryReport> {
        let range = dates::validate(start, end)?;
        let joined = assets.iter().map(|a| a.as_ref()).collect::<Vec<_>>().join(",");
        self.run(&AssetId::parse_list(&joined), range, fields).await
    }

    pub async fn run(
        &self,
        assets: &[AssetId],
        range: DateRange,
        fields: &[String],
    ) -> Result<HistoryReport> {
        let mut stats = PipelineStats {
            assets_requested: assets.len(),
            ..Default::default()
        };
        if assets.is_empty() {
            info!("No assets requested");
            return Ok(HistoryReport::default());
        }

        let cache = match &self.config.cache.dir {
            Some(dir) => Some(TableCache::open(dir)?),
            None => None,
        };

        // ── 1. Cache ──────────────────────────────────────────────────────────
        let mut slots: Vec<Option<PerAssetTable>> = vec![None; assets.len()];
        let mut pending: Vec<usize> = Vec::new();
        for (i, asset) in assets.iter().enumerate() {
            let cached = match &cache {
                Some(c) => c.load(asset, &range)?,
                None => None,
            };
            match cached {
                Some(table) => {
                    stats.loaded_from_cache += 1;
                    slots[i] = Some(table);
                }
                None => pending.push(i),
            }
        }

        // ── 2. Fetch ──────────────────────────────────────────────────────────
        let to_fetch: Vec<AssetId> = pending.iter().map(|&i| assets[i].clone()).collect();
        let mode = self.config.pipeline.mode;
        info!(
            "Fetching {} of {} assets ({:?}) for {}",
            to_fetch.len(),
            assets.len(),
            mode,
            range
        );

        let opts = FetchOptions {
            mode,
            timeout: self.config.scraper.timeout_for(mode),
            max_concurrency: self.config.scraper.max_concurrency,
            stop_on_failure: self.config.pipeline.fail_fast,
            show_progress: self.config.pipeline.show_progress,
        };
        let outcomes = if to_fetch.is_empty() {
            Vec::new()
        } else {
            fetch_pages(self.page_source()?, &to_fetch, range, opts).await
        };

        // ── 3. Extract + normalize + cache ────────────────────────────────────
        let mut failures = Vec::new();
        for (&slot, (asset, outcome)) in pending.iter().zip(outcomes) {
            let page = match outcome {
                Ok(page) => page,
                Err(failure) if self.config.pipeline.fail_fast => return Err(failure.into()),
                Err(failure) => {
                    warn!("Skipping {}: {}", asset, failure);
                    failures.push(failure);
                    continue;
                }
            };
            stats.fetched += 1;

            let table = normalize(&asset, extract(&page)?)?;
            if let Some(cache) = &cache {
                cache.store(&range, &table)?;
            }
            slots[slot] = Some(table);
        }
        stats.failed = failures.len();

        // ── 4. Merge ──────────────────────────────────────────────────────────
        let tables = slots
            .into_iter()
            .flatten()
            .map(|t| select_fields(t, fields))
            .collect::<Result<Vec<_>>>()?;
        let table = merge(&tables);
        stats.rows = table.rows.len();

        info!(
            "=== Done: {} assets | {} cached | {} fetched | {} failed | {} rows ===",
            stats.assets_requested,
            stats.loaded_from_cache,
            stats.fetched,
            stats.failed,
            fmt_number(stats.rows as i64),
        );

        Ok(HistoryReport {
            table,
            failures,
            stats,
        })
    }
}
