use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::fmt;

// ── Asset ─────────────────────────────────────────────────────────────────────

/// Lowercased asset slug as used by the upstream site ("bitcoin", "bitcoin-cash").
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct AssetId(String);

impl AssetId {
    pub fn new(name: &str) -> Self {
        Self(name.trim().to_lowercase())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Split a comma-separated list, dropping blanks and repeats (first one wins).
    pub fn parse_list(s: &str) -> Vec<AssetId> {
        let mut out: Vec<AssetId> = Vec::new();
        for id in s.split(',').map(AssetId::new) {
            if !id.0.is_empty() && !out.contains(&id) {
                out.push(id);
            }
        }
        out
    }
}

impl fmt::Display for AssetId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

// ── Date range ────────────────────────────────────────────────────────────────

/// Inclusive, validated date range. Built by `dates::validate`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct DateRange {
    start: NaiveDate,
    end: NaiveDate,
}

impl DateRange {
    pub(crate) fn new_unchecked(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    pub fn start(&self) -> NaiveDate {
        self.start
    }

    pub fn end(&self) -> NaiveDate {
        self.end
    }

    /// "20180101" form used in URLs and cache file names.
    pub fn compact_start(&self) -> String {
        self.start.format("%Y%m%d").to_string()
    }

    pub fn compact_end(&self) -> String {
        self.end.format("%Y%m%d").to_string()
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} → {}", self.start, self.end)
    }
}

// ── Raw page / raw table ──────────────────────────────────────────────────────

/// Unparsed response body for one (asset, range) request.
#[derive(Debug, Clone)]
pub struct RawPage {
    pub asset: AssetId,
    pub range: DateRange,
    pub body: Vec<u8>,
}

/// Header + string rows as lifted from the page, `Average` already appended.
#[derive(Debug, Clone, PartialEq)]
pub struct RawTable {
    pub header: Vec<String>,
    pub rows: Vec<Vec<String>>,
}

// ── Per-asset table ───────────────────────────────────────────────────────────

pub const DATE_FIELD: &str = "Date";

/// One calendar day; `values` line up with `PerAssetTable::columns`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DailyRecord {
    pub date: NaiveDate,
    pub values: Vec<f64>,
}

/// Normalized, chronologically sorted history for a single asset.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PerAssetTable {
    pub asset: AssetId,
    /// Non-date field names, e.g. `Open, High, Low, Close, Volume, Market Cap, Average`.
    pub columns: Vec<String>,
    pub rows: Vec<DailyRecord>,
}

impl PerAssetTable {
    pub fn len(&self) -> usize {
        self.rows.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn column_index(&self, field: &str) -> Option<usize> {
        self.columns.iter().position(|c| c == field)
    }

    /// Last record stored for `date`, if any.
    pub fn get(&self, date: NaiveDate) -> Option<&DailyRecord> {
        let end = self.rows.partition_point(|r| r.date <= date);
        self.rows[..end].last().filter(|r| r.date == date)
    }

    pub fn value(&self, date: NaiveDate, field: &str) -> Option<f64> {
        let idx = self.column_index(field)?;
        self.get(date).and_then(|r| r.values.get(idx).copied())
    }
}

// ── Merged table ──────────────────────────────────────────────────────────────

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ColumnKey {
    pub asset: AssetId,
    pub field: String,
}

impl fmt::Display for ColumnKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}.{}", self.asset, self.field)
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct MergedRow {
    pub date: NaiveDate,
    /// `None` where the asset has no record for this date.
    pub values: Vec<Option<f64>>,
}

/// Outer join of several per-asset tables on date.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct MergedTable {
    pub columns: Vec<ColumnKey>,
    pub rows: Vec<MergedRow>,
}

impl MergedTable {
    pub fn is_empty(&self) -> bool {
        self.rows.is_empty() && self.columns.is_empty()
    }

    pub fn column_index(&self, asset: &AssetId, field: &str) -> Option<usize> {
        self.columns
            .iter()
            .position(|c| &c.asset == asset && c.field == field)
    }

    pub fn value(&self, date: NaiveDate, asset: &AssetId, field: &str) -> Option<f64> {
        let idx = self.column_index(asset, field)?;
        self.rows
            .iter()
            .find(|r| r.date == date)
            .and_then(|r| r.values[idx])
    }
}
