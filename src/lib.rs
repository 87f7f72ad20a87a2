//! Daily USD price history for CoinMarketCap-listed assets.
//!
//! `Pipeline::get_data_for` validates a date range, loads or fetches one
//! history page per asset, extracts and normalizes its table, and outer-joins
//! the per-asset tables on date.

pub mod config;
pub mod dates;
pub mod error;
pub mod merge;
pub mod models;
pub mod output;
pub mod pipeline;
pub mod scraper;
pub mod storage;
pub mod utils;

#[cfg(test)]
pub(crate) mod testing;

pub use crate::config::{AppConfig, FetchMode};
pub use crate::error::{FetchFailure, HistoryError};
pub use crate::models::{AssetId, DateRange, MergedTable, PerAssetTable};
pub use crate::pipeline::{HistoryReport, Pipeline};
