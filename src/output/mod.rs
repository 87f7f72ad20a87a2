//! Delimited-text rendering of a merged table.

use crate::models::MergedTable;
use anyhow::{Context, Result};
use std::io::Write;

/// Header is `Date` then `<asset>.<field>`; missing cells are left empty.
pub fn write_delimited<W: Write>(table: &MergedTable, delimiter: u8, out: W) -> Result<()> {
    let mut wtr = csv::WriterBuilder::new().delimiter(delimiter).from_writer(out);

    let mut header = Vec::with_capacity(table.columns.len() + 1);
    header.push("Date".to_string());
    header.extend(table.columns.iter().map(|c| c.to_string()));
    wtr.write_record(&header).context("writing header")?;

    for row in &table.rows {
        let mut record = Vec::with_capacity(row.values.len() + 1);
        record.push(row.date.format("%Y-%m-%d").to_string());
        record.extend(row.values.iter().map(|v| v.map(|x| x.to_string()).unwrap_or_default()));
        wtr.write_record(&record)
            .with_context(|| format!("writing row {}", row.date))?;
    }

    wtr.flush().context("flushing output")?;
    Ok(())
}
