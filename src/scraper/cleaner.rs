use crate::error::{HistoryError, Result};
use crate::models::{AssetId, DATE_FIELD, DailyRecord, PerAssetTable, RawTable};
use chrono::NaiveDate;
use tracing::debug;

// ── Parsers ───────────────────────────────────────────────────────────────────

/// Unsigned decimal numeral: digits with at most one dot.
/// "610.00" → 610.0 | "1234" → 1234.0 | "N/A" → None | "-3" → None
pub fn parse_numeral(s: &str) -> Option<f64> {
    let s = s.trim();
    let digits = s.chars().filter(|c| c.is_ascii_digit()).count();
    let dots = s.chars().filter(|&c| c == '.').count();
    if digits == 0 || dots > 1 || digits + dots != s.chars().count() {
        return None;
    }
    s.parse().ok()
}

/// Lossy cell coercion: anything that is not a plain numeral becomes 0.0.
pub fn coerce_cell(s: &str) -> f64 {
    parse_numeral(s).unwrap_or(0.0)
}

/// Parse dates: "Jun 01 2018" (upstream listing, thousands commas already
/// stripped), "Jun 01, 2018" or ISO
pub fn parse_date(s: &str) -> Option<NaiveDate> {
    let s = s.trim();

    ["%Y-%m-%d", "%b %d %Y", "%B %d %Y", "%b %d, %Y", "%B %d, %Y"]
        .iter()
        .find_map(|fmt| NaiveDate::parse_from_str(s, fmt).ok())
}

// ── Raw table → PerAssetTable ─────────────────────────────────────────────────

/// Type the raw string table and sort it by date.
///
/// Numeric cells are coerced with `coerce_cell`; the date cell must parse.
pub fn normalize(asset: &AssetId, raw: RawTable) -> Result<PerAssetTable> {
    let date_idx = raw
        .header
        .iter()
        .position(|h| h == DATE_FIELD)
        .ok_or_else(|| HistoryError::malformed(asset, "no 'Date' column in header"))?;

    let columns: Vec<String> = raw
        .header
        .iter()
        .enumerate()
        .filter(|(i, _)| *i != date_idx)
        .map(|(_, h)| h.clone())
        .collect();

    let mut rows = Vec::with_capacity(raw.rows.len());
    for row in raw.rows {
        if row.len() != raw.header.len() {
            return Err(HistoryError::malformed(
                asset,
                format!("row has {} fields, header has {}", row.len(), raw.header.len()),
            ));
        }

        let date = parse_date(&row[date_idx]).ok_or_else(|| HistoryError::InvalidDate {
            asset: asset.clone(),
            value: row[date_idx].clone(),
        })?;

        let values = row
            .iter()
            .enumerate()
            .filter(|(i, _)| *i != date_idx)
            .map(|(_, cell)| coerce_cell(cell))
            .collect();

        rows.push(DailyRecord { date, values });
    }

    // Stable: same-day rows keep their page order.
    rows.sort_by_key(|r| r.date);

    debug!("{}: normalized {} rows", asset, rows.len());
    Ok(PerAssetTable {
        asset: asset.clone(),
        columns,
        rows,
    })
}

// ── Tests ─────────────────────────────────────────────────────────────────────
