use crate::models::AssetId;
use std::path::PathBuf;
use thiserror::Error;

/// A single asset's page could not be retrieved.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
#[error("failed to fetch {url} for '{asset}': {reason}")]
pub struct FetchFailure {
    pub asset: AssetId,
    pub url: String,
    pub status: Option<u16>,
    pub reason: String,
}

impl FetchFailure {
    pub fn status(asset: &AssetId, url: &str, status: u16) -> Self {
        Self {
            asset: asset.clone(),
            url: url.to_string(),
            status: Some(status),
            reason: format!("HTTP {}", status),
        }
    }

    pub fn transport(asset: &AssetId, url: &str, reason: impl Into<String>) -> Self {
        Self {
            asset: asset.clone(),
            url: url.to_string(),
            status: None,
            reason: reason.into(),
        }
    }
}

/// Every failure the history pipeline can hand back to a caller.
#[derive(Debug, Error)]
pub enum HistoryError {
    #[error("invalid format for the {which}: '{value}'. Should be of the form: yyyy-mm-dd")]
    InvalidFormat { which: &'static str, value: String },

    #[error("invalid date range {start} → {end}: {reason}")]
    InvalidRange {
        start: String,
        end: String,
        reason: &'static str,
    },

    #[error(transparent)]
    FetchFailure(#[from] FetchFailure),

    #[error("malformed document for '{asset}': {reason}")]
    MalformedDocument { asset: AssetId, reason: String },

    #[error("unparseable date '{value}' in table for '{asset}'")]
    InvalidDate { asset: AssetId, value: String },

    #[error("field '{field}' not present in table for '{asset}'")]
    UnknownField { asset: AssetId, field: String },

    #[error("cache error at {path:?}: {reason}")]
    Cache { path: PathBuf, reason: String },

    #[error("failed to build HTTP client: {0}")]
    Client(String),
}

impl HistoryError {
    pub(crate) fn malformed(asset: &AssetId, reason: impl Into<String>) -> Self {
        Self::MalformedDocument {
            asset: asset.clone(),
            reason: reason.into(),
        }
    }

    pub(crate) fn cache(path: impl Into<PathBuf>, reason: impl ToString) -> Self {
        Self::Cache {
            path: path.into(),
            reason: reason.to_string(),
        }
    }
}

pub type Result<T, E = HistoryError> = std::result::Result<T, E>;
