//! Outer join of per-asset tables on date.

use crate::error::{HistoryError, Result};
use crate::models::{ColumnKey, DailyRecord, MergedRow, MergedTable, PerAssetTable};
use chrono::NaiveDate;
use std::collections::BTreeMap;

/// Keep only `fields` (in the given order). Empty `fields` keeps everything.
pub fn select_fields(table: PerAssetTable, fields: &[String]) -> Result<PerAssetTable> {
    if fields.is_empty() {
        return Ok(table);
    }

    let idx = fields
        .iter()
        .map(|f| {
            table.column_index(f).ok_or_else(|| HistoryError::UnknownField {
                asset: table.asset.clone(),
                field: f.clone(),
            })
        })
        .collect::<Result<Vec<usize>>>()?;

    let rows = table
        .rows
        .into_iter()
        .map(|r| DailyRecord {
            date: r.date,
            values: idx.iter().map(|&i| r.values[i]).collect(),
        })
        .collect();

    Ok(PerAssetTable {
        asset: table.asset,
        columns: fields.to_vec(),
        rows,
    })
}

/// Full outer join on date. Column groups follow the order of `tables`;
/// cells for dates an asset lacks are `None`. A date repeated within one
/// table resolves to its last row.
pub fn merge(tables: &[PerAssetTable]) -> MergedTable {
    let columns: Vec<ColumnKey> = tables
        .iter()
        .flat_map(|t| {
            t.columns.iter().map(|f| ColumnKey {
                asset: t.asset.clone(),
                field: f.clone(),
            })
        })
        .collect();
    let width = columns.len();

    let mut by_date: BTreeMap<NaiveDate, Vec<Option<f64>>> = BTreeMap::new();
    let mut offset = 0usize;
    for table in tables {
        for rec in &table.rows {
            let cells = by_date.entry(rec.date).or_insert_with(|| vec![None; width]);
            for (j, v) in rec.values.iter().enumerate().take(table.columns.len()) {
                cells[offset + j] = Some(*v);
            }
        }
        offset += table.columns.len();
    }

    MergedTable {
        columns,
        rows: by_date
            .into_iter()
            .map(|(date, values)| MergedRow { date, values })
            .collect(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::AssetId;

    fn day(d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(2018, 1, d).unwrap()
    }

    fn table(asset: &str, rows: &[(u32, f64)]) -> PerAssetTable {
        PerAssetTable {
            asset: AssetId::new(asset),
            columns: vec!["Open".into(), "Close".into()],
            rows: rows
                .iter()
                .map(|&(d, v)| DailyRecord {
                    date: day(d),
                    values: vec![v, v + 1.0],
                })
                .collect(),
        }
    }

    #[test]
    fn test_disjoint_dates_leave_gaps() {
        let merged = merge(&[table("A", &[(1, 10.0)]), table("B", &[(2, 20.0)])]);
        let a = AssetId::new("a");
        let b = AssetId::new("b");

        assert_eq!(merged.rows.len(), 2);
        assert_eq!(merged.columns.len(), 4);
        assert_eq!(merged.value(day(1), &a, "Close"), Some(11.0));
        assert_eq!(merged.value(day(1), &b, "Close"), None);
        assert_eq!(merged.value(day(2), &a, "Open"), None);
        assert_eq!(merged.value(day(2), &b, "Open"), Some(20.0));
        assert_eq!(merged.rows[0].values, vec![Some(10.0), Some(11.0), None, None]);
    }

    #[test]
    fn test_column_groups_follow_request_order() {
        let merged = merge(&[table("zcash", &[(1, 1.0)]), table("bitcoin", &[(1, 2.0)])]);
        let names: Vec<String> = merged.columns.iter().map(|c| c.to_string()).collect();
        assert_eq!(names, vec!["zcash.Open", "zcash.Close", "bitcoin.Open", "bitcoin.Close"]);
    }

    #[test]
    fn test_dates_sorted_across_assets() {
        let merged = merge(&[table("a", &[(3, 1.0), (5, 1.0)]), table("b", &[(1, 1.0), (4, 1.0)])]);
        let dates: Vec<u32> = merged.rows.iter().map(|r| chrono::Datelike::day(&r.date)).collect();
        assert_eq!(dates, vec![1, 3, 4, 5]);
    }

    #[test]
    fn test_empty_input() {
        let merged = merge(&[]);
        assert!(merged.is_empty());
    }

    #[test]
    fn test_select_fields() {
        let t = select_fields(table("a", &[(1, 10.0)]), &["Close".to_string()]).unwrap();
        assert_eq!(t.columns, vec!["Close"]);
        assert_eq!(t.rows[0].values, vec![11.0]);

        let err = select_fields(table("a", &[(1, 10.0)]), &["Price".to_string()]).unwrap_err();
        assert!(matches!(err, HistoryError::UnknownField { ref field, .. } if field == "Price"));
    }
}
