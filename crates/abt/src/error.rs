//! Error types for ABT assembly.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for ABT operations.
pub type Result<T> = std::result::Result<T, AbtError>;

/// Errors that can occur while assembling an analytical base table.
///
/// Arithmetic edge cases (zero denominators, short histories) are never
/// errors; they resolve to null values inside the panel.
#[derive(Debug, Error)]
pub enum AbtError {
    /// Missing required column in an input table
    #[error("Missing required column `{column}` in {table} table")]
    MissingColumn {
        /// Logical name of the table being validated
        table: String,
        /// Name of the absent column
        column: String,
    },

    /// Key columns are not unique where a one-row-per-key table is required
    #[error("Duplicate keys ({keys}) in {table} table: {count} key(s) occur more than once")]
    DuplicateKey {
        /// Logical name of the offending table
        table: String,
        /// Comma-separated key column names
        keys: String,
        /// Number of distinct keys that are duplicated
        count: usize,
    },

    /// Malformed date threshold
    #[error("Invalid date `{0}`: expected YYYY-MM-DD")]
    InvalidDate(String),

    /// Invalid date range
    #[error("Invalid date range: start {start} is after end {end}")]
    InvalidDateRange {
        /// Start date of the range
        start: String,
        /// End date of the range
        end: String,
    },

    /// File extension is neither parquet nor csv
    #[error("Unsupported table format: {}", .0.display())]
    UnsupportedFormat(PathBuf),

    /// Filesystem failure while reading or writing a table
    #[error("I/O error on {}: {source}", path.display())]
    Io {
        /// Path being read or written
        path: PathBuf,
        /// Underlying error
        #[source]
        source: std::io::Error,
    },

    /// Malformed run configuration
    #[error("Config error: {0}")]
    Config(#[from] serde_json::Error),

    /// Polars DataFrame error
    #[error("DataFrame error: {0}")]
    Polars(#[from] polars::error::PolarsError),
}

impl AbtError {
    /// Shorthand for [`AbtError::MissingColumn`].
    pub fn missing_column(table: impl Into<String>, column: impl Into<String>) -> Self {
        Self::MissingColumn {
            table: table.into(),
            column: column.into(),
        }
    }
}
