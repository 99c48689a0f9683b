//! Input tables, either already in memory or on disk.

use crate::{AbtError, Result};
use derive_more::From;
use polars::prelude::*;
use std::fs::File;
use std::path::{Path, PathBuf};
use tracing::debug;

/// An input table handed to an assembler.
#[derive(Debug, Clone, From)]
pub enum TableSource {
    /// A loaded table
    InMemory(DataFrame),
    /// A parquet or CSV file, chosen by extension
    FilePath(PathBuf),
}

impl TableSource {
    /// Source backed by a file path.
    pub fn path(path: impl AsRef<Path>) -> Self {
        Self::FilePath(path.as_ref().to_path_buf())
    }

    /// Materialize the table.
    pub fn load(&self) -> Result<DataFrame> {
        match self {
            Self::InMemory(df) => Ok(df.clone()),
            Self::FilePath(path) => read_table(path),
        }
    }
}

/// Read a parquet or CSV file.
pub fn read_table(path: &Path) -> Result<DataFrame> {
    let extension = path
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_ascii_lowercase);

    let df = match extension.as_deref() {
        Some("parquet") => {
            let file = File::open(path).map_err(|source| AbtError::Io {
                path: path.to_path_buf(),
                source,
            })?;
            ParquetReader::new(file).finish()?
        }
        Some("csv") => {
            if !path.exists() {
                return Err(AbtError::Io {
                    path: path.to_path_buf(),
                    source: std::io::Error::new(std::io::ErrorKind::NotFound, "file not found"),
                });
            }
            CsvReadOptions::default()
                .with_has_header(true)
                .with_parse_options(CsvParseOptions::default().with_try_parse_dates(true))
                .try_into_reader_with_file_path(Some(path.to_path_buf()))?
                .finish()?
        }
        _ => return Err(AbtError::UnsupportedFormat(path.to_path_buf())),
    };

    debug!(path = %path.display(), rows = df.height(), columns = df.width(), "Loaded table");
    Ok(df)
}
