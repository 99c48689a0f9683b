//! Explicit column contracts for input tables and output ordering.
//!
//! Input tables are schema-on-read: each assembler states which columns it
//! takes, under which name, and whether they are required. Missing required
//! columns fail fast with the table name attached.

use crate::{AbtError, Result};
use polars::prelude::*;

/// A column taken from an input table, optionally under a new name.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ColumnSpec {
    /// Column name in the input table
    pub source: &'static str,
    /// Column name in the panel
    pub alias: &'static str,
    /// Whether absence is an error
    pub required: bool,
}

impl ColumnSpec {
    /// Required column, kept under its own name.
    pub const fn required(name: &'static str) -> Self {
        Self {
            source: name,
            alias: name,
            required: true,
        }
    }

    /// Required column, renamed.
    pub const fn renamed(source: &'static str, alias: &'static str) -> Self {
        Self {
            source,
            alias,
            required: true,
        }
    }

    /// Optional column, kept under its own name when present.
    pub const fn optional(name: &'static str) -> Self {
        Self {
            source: name,
            alias: name,
            required: false,
        }
    }

    /// Optional column, renamed when present.
    pub const fn optional_renamed(source: &'static str, alias: &'static str) -> Self {
        Self {
            source,
            alias,
            required: false,
        }
    }
}

/// Whether `df` has a column called `name`.
pub fn has_column(df: &DataFrame, name: &str) -> bool {
    df.get_column_index(name).is_some()
}

/// Fail with [`AbtError::MissingColumn`] on the first absent column.
pub fn require_columns(df: &DataFrame, table: &str, columns: &[&str]) -> Result<()> {
    match columns.iter().find(|c| !has_column(df, c)) {
        Some(missing) => Err(AbtError::missing_column(table, *missing)),
        None => Ok(()),
    }
}

/// Project `df` onto `specs`, renaming as declared.
///
/// Columns are emitted in spec order. Absent optional columns are skipped.
pub fn select_columns(df: &DataFrame, table: &str, specs: &[ColumnSpec]) -> Result<DataFrame> {
    let mut exprs = Vec::with_capacity(specs.len());
    for spec in specs {
        if has_column(df, spec.source) {
            exprs.push(col(spec.source).alias(spec.alias));
        } else if spec.required {
            return Err(AbtError::missing_column(table, spec.source));
        }
    }
    Ok(df.clone().lazy().select(exprs).collect()?)
}

/// Reorder columns: `leading` first, then everything unlisted, then `trailing`.
///
/// Listed names that are not in the frame are ignored, so optional
/// enrichments can be named unconditionally.
pub fn order_columns(df: &DataFrame, leading: &[String], trailing: &[String]) -> Result<DataFrame> {
    let present: Vec<String> = df
        .get_column_names()
        .iter()
        .map(|name| name.to_string())
        .collect();

    let mut order: Vec<String> = Vec::with_capacity(present.len());
    for name in leading {
        if present.contains(name) && !order.contains(name) {
            order.push(name.clone());
        }
    }
    for name in &present {
        if !order.contains(name) && !trailing.contains(name) {
            order.push(name.clone());
        }
    }
    for name in trailing {
        if present.contains(name) && !order.contains(name) {
            order.push(name.clone());
        }
    }

    Ok(df.select(order)?)
}

/// Convert a list of string slices into owned column names.
pub fn names(columns: &[&str]) -> Vec<String> {
    columns.iter().map(|c| c.to_string()).collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample() -> DataFrame {
        df![
            "symbol" => ["A", "B"],
            "revenuePerShare" => [1.0, 2.0],
            "extra" => [0, 1]
        ]
        .unwrap()
    }

    #[test]
    fn test_select_renames_and_skips_optional() {
        let specs = [
            ColumnSpec::required("symbol"),
            ColumnSpec::renamed("revenuePerShare", "RPS_0_1q"),
            ColumnSpec::optional("admin_runDate"),
        ];
        let out = select_columns(&sample(), "key_metrics", &specs).unwrap();
        let cols: Vec<String> = out.get_column_names().iter().map(|c| c.to_string()).collect();
        assert_eq!(cols, vec!["symbol", "RPS_0_1q"]);
    }

    #[test]
    fn test_select_missing_required() {
        let specs = [ColumnSpec::required("bookValuePerShare")];
        let err = select_columns(&sample(), "key_metrics", &specs).unwrap_err();
        match err {
            AbtError::MissingColumn { table, column } => {
                assert_eq!(table, "key_metrics");
                assert_eq!(column, "bookValuePerShare");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn test_order_columns() {
        let out = order_columns(
            &sample(),
            &names(&["revenuePerShare", "missing"]),
            &names(&["symbol"]),
        )
        .unwrap();
        let cols: Vec<String> = out.get_column_names().iter().map(|c| c.to_string()).collect();
        assert_eq!(cols, vec!["revenuePerShare", "extra", "symbol"]);
    }
}
