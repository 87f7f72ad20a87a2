//! On-disk cache of normalized per-asset tables.
//!
//! One JSON file per `(asset, start, end)`: `bitcoin_20170601_20180601.json`.
//! The asset part is percent-encoded, so a slug can never name a file
//! outside the cache directory.
//! Writes land in a temp file in the same directory and are renamed into
//! place, so readers never observe a half-written table.

use crate::error::{HistoryError, Result};
use crate::models::{AssetId, DateRange, PerAssetTable};
use std::fs;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};
use tracing::{debug, info};

const EXTENSION: &str = "json";

pub struct TableCache {
    dir: PathBuf,
}

impl TableCache {
    /// Open (and create if needed) the cache directory.
    pub fn open(dir: &Path) -> Result<Self> {
        fs::create_dir_all(dir).map_err(|e| HistoryError::cache(dir, e))?;
        Ok(Self {
            dir: dir.to_path_buf(),
        })
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    pub fn path_for(&self, asset: &AssetId, range: &DateRange) -> PathBuf {
        self.dir.join(format!(
            "{}_{}_{}.{}",
            urlencoding::encode(asset.as_str()),
            range.compact_start(),
            range.compact_end(),
            EXTENSION
        ))
    }

    /// Cached table for `(asset, range)`, or `None` on a miss.
    pub fn load(&self, asset: &AssetId, range: &DateRange) -> Result<Option<PerAssetTable>> {
        let path = self.path_for(asset, range);
        if !path.exists() {
            debug!("cache miss: {:?}", path);
            return Ok(None);
        }

        info!("Loading data for {} from {:?}", asset, path);
        let file = fs::File::open(&path).map_err(|e| HistoryError::cache(&path, e))?;
        let table: PerAssetTable = serde_json::from_reader(BufReader::new(file))
            .map_err(|e| HistoryError::cache(&path, e))?;

        // Column labels come from the stored asset, so it must be the requested one.
        if &table.asset != asset {
            return Err(HistoryError::cache(
                &path,
                format!("holds data for '{}', expected '{}'", table.asset, asset),
            ));
        }
        Ok(Some(table))
    }

    /// Persist `table` under `(table.asset, range)`.
    pub fn store(&self, range: &DateRange, table: &PerAssetTable) -> Result<PathBuf> {
        let path = self.path_for(&table.asset, range);

        let tmp = tempfile::NamedTempFile::new_in(&self.dir)
            .map_err(|e| HistoryError::cache(&self.dir, e))?;
        {
            let mut writer = BufWriter::new(tmp.as_file());
            serde_json::to_writer(&mut writer, table).map_err(|e| HistoryError::cache(&path, e))?;
            writer.flush().map_err(|e| HistoryError::cache(&path, e))?;
        }
        tmp.persist(&path).map_err(|e| HistoryError::cache(&path, e.error))?;

        debug!("{}: cached {} rows at {:?}", table.asset, table.len(), path);
        Ok(path)
    }
}
