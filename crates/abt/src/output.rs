//! Persistence of assembled tables.
//!
//! A table is written as parquet (primary, preserves types) and/or CSV
//! (flattened, for inspection). Each format is written only when a file name
//! is configured.

use crate::{AbtError, Result};
use polars::prelude::*;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::{debug, info};

/// Output location and file names.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputTarget {
    /// Directory the files are written to
    pub dir: PathBuf,
    /// Parquet file name; `None` or empty skips the parquet write
    pub parquet: Option<String>,
    /// CSV file name; `None` or empty skips the CSV write
    pub csv: Option<String>,
}

impl OutputTarget {
    /// Target directory with no files configured.
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self {
            dir: dir.into(),
            parquet: None,
            csv: None,
        }
    }

    /// Set the parquet file name.
    pub fn with_parquet(mut self, name: impl Into<String>) -> Self {
        self.parquet = Some(name.into());
        self
    }

    /// Set the CSV file name.
    pub fn with_csv(mut self, name: impl Into<String>) -> Self {
        self.csv = Some(name.into());
        self
    }

    /// Whether any file would be written.
    pub fn is_enabled(&self) -> bool {
        file_name(&self.parquet).is_some() || file_name(&self.csv).is_some()
    }

    /// Write `df` to every configured file and return the written paths.
    ///
    /// The directory is created when missing.
    pub fn write(&self, df: &mut DataFrame) -> Result<Vec<PathBuf>> {
        let mut written = Vec::new();
        if !self.is_enabled() {
            return Ok(written);
        }
        std::fs::create_dir_all(&self.dir).map_err(|source| AbtError::Io {
            path: self.dir.clone(),
            source,
        })?;

        if let Some(name) = file_name(&self.parquet) {
            let path = self.dir.join(name);
            write_parquet(df, &path)?;
            written.push(path);
        }

        if let Some(name) = file_name(&self.csv) {
            let path = self.dir.join(name);
            write_csv(df, &path)?;
            written.push(path);
        }

        Ok(written)
    }
}

fn file_name(name: &Option<String>) -> Option<&str> {
    name.as_deref().map(str::trim).filter(|n| !n.is_empty())
}

fn create(path: &Path) -> Result<File> {
    File::create(path).map_err(|source| AbtError::Io {
        path: path.to_path_buf(),
        source,
    })
}

/// Write `df` as a parquet file.
pub fn write_parquet(df: &mut DataFrame, path: &Path) -> Result<()> {
    let file = create(path)?;
    ParquetWriter::new(file).finish(df)?;
    info!(path = %path.display(), rows = df.height(), "Wrote parquet");
    Ok(())
}

/// Write `df` as a CSV file with a header row.
///
/// Nested columns are written as their display text.
pub fn write_csv(df: &mut DataFrame, path: &Path) -> Result<()> {
    let mut flat = flatten_nested(df)?;
    let mut file = create(path)?;
    CsvWriter::new(&mut file).include_header(true).finish(&mut flat)?;
    info!(path = %path.display(), rows = df.height(), "Wrote csv");
    Ok(())
}

fn flatten_nested(df: &DataFrame) -> Result<DataFrame> {
    let mut flat = df.clone();
    for column in df.get_columns() {
        if !column.dtype().is_nested() {
            continue;
        }
        let series = column.as_materialized_series().rechunk();
        let text: StringChunked = series
            .iter()
            .map(|value| match value {
                AnyValue::Null => None,
                value => Some(value.to_string()),
            })
            .collect();
        debug!(column = %column.name(), dtype = %column.dtype(), "Writing nested column as text");
        flat.with_column(text.with_name(column.name().clone()).into_column())?;
    }
    Ok(flat)
}
