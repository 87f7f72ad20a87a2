use crate::error::{HistoryError, Result};
use crate::models::{AssetId, RawPage, RawTable};
use crate::scraper::cleaner::parse_numeral;
use scraper::{ElementRef, Html, Selector};
use tracing::debug;

/// Date, Open, High, Low, Close, Volume, Market Cap
pub const ROW_ARITY: usize = 7;

pub const AVERAGE_FIELD: &str = "Average";

/// Written in place of the average when High or Low is not a number.
pub const MISSING_AVERAGE: &str = "-";

fn selector(asset: &AssetId, s: &str) -> Result<Selector> {
    Selector::parse(s)
        .map_err(|e| HistoryError::malformed(asset, format!("selector {:?}: {:?}", s, e)))
}

fn cell_text(el: ElementRef<'_>) -> String {
    el.text().collect::<String>().trim().to_string()
}

// ── History table ─────────────────────────────────────────────────────────────

/// Pull the single history table out of `page`.
///
/// Header cells lose footnote asterisks, body cells lose thousands separators,
/// and every row gets an `Average` of its High and Low (two decimals).
pub fn extract(page: &RawPage) -> Result<RawTable> {
    let asset = &page.asset;
    let html = std::str::from_utf8(&page.body)
        .map_err(|e| HistoryError::malformed(asset, format!("page is not UTF-8: {}", e)))?;
    let doc = Html::parse_document(html);

    let table_sel = selector(asset, "table")?;
    let thead_sel = selector(asset, "thead")?;
    let tbody_sel = selector(asset, "tbody")?;
    let th_sel = selector(asset, "th")?;
    let tr_sel = selector(asset, "tr")?;
    let td_sel = selector(asset, "td")?;

    let (thead, table) = doc
        .select(&table_sel)
        .find_map(|t| t.select(&thead_sel).next().map(|h| (h, t)))
        .ok_or_else(|| HistoryError::malformed(asset, "no table header section"))?;
    let tbody = table
        .select(&tbody_sel)
        .next()
        .ok_or_else(|| HistoryError::malformed(asset, "no table body section"))?;

    let mut header: Vec<String> = thead
        .select(&th_sel)
        .map(|th| cell_text(th).replace('*', "").trim().to_string())
        .collect();
    header.push(AVERAGE_FIELD.to_string());

    let position = |name: &str| {
        header
            .iter()
            .position(|h| h == name)
            .filter(|&i| i < ROW_ARITY)
            .ok_or_else(|| {
                HistoryError::malformed(asset, format!("no '{}' column in header", name))
            })
    };
    let high_idx = position("High")?;
    let low_idx = position("Low")?;

    let mut rows = Vec::new();
    for (i, tr) in tbody.select(&tr_sel).enumerate() {
        let mut row: Vec<String> = tr
            .select(&td_sel)
            .map(|td| cell_text(td).replace(',', ""))
            .collect();

        if row.len() != ROW_ARITY {
            return Err(HistoryError::malformed(
                asset,
                format!("row {} has {} fields, expected {}", i + 1, row.len(), ROW_ARITY),
            ));
        }

        let average = match (parse_numeral(&row[high_idx]), parse_numeral(&row[low_idx])) {
            (Some(high), Some(low)) => format!("{:.2}", (high + low) / 2.0),
            _ => MISSING_AVERAGE.to_string(),
        };
        row.push(average);
        rows.push(row);
    }

    debug!("{}: extracted {} rows, header {:?}", asset, rows.len(), header);
    Ok(RawTable { header, rows })
}
