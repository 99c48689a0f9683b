//! Panel alignment: ordering, sequence index and date filtering.
//!
//! Every panel is keyed by `(symbol, date)`. Alignment sorts the panel,
//! normalizes the date column to a calendar date and derives the per-symbol
//! sequence columns:
//!
//! - `nlag`: zero-based chronological rank within the symbol
//! - `max_nlag`: highest rank for the symbol
//! - `reverse_nlag`: `max_nlag - nlag`
//! - `firstLast_flag`: `"L"` for the last record, `"F"` for the first, `"I"`
//!   otherwise. The last check runs first, so a singleton record is `"L"`.
//!
//! The sequence columns must be recomputed after any filter that changes the
//! number of records per symbol.

use crate::{AbtError, DateRange, Result, Stage, schema::require_columns};
use chrono::NaiveDate;
use polars::prelude::*;
use std::collections::BTreeSet;
use tracing::debug;

/// Symbol column.
pub const SYMBOL: &str = "symbol";
/// Date column.
pub const DATE: &str = "date";
/// Zero-based chronological rank within a symbol.
pub const NLAG: &str = "nlag";
/// Highest rank within a symbol.
pub const MAX_NLAG: &str = "max_nlag";
/// `max_nlag - nlag`.
pub const REVERSE_NLAG: &str = "reverse_nlag";
/// First/last/interior record flag.
pub const FIRST_LAST_FLAG: &str = "firstLast_flag";

/// Sequence columns in the order they are usually emitted.
pub const SEQUENCE_COLUMNS: [&str; 4] = [NLAG, MAX_NLAG, REVERSE_NLAG, FIRST_LAST_FLAG];

const UNIX_EPOCH_DAYS_FROM_CE: i32 = 719_163;

/// Days since 1970-01-01, the physical representation of a polars `Date`.
pub fn epoch_days(date: NaiveDate) -> i32 {
    use chrono::Datelike;
    date.num_days_from_ce() - UNIX_EPOCH_DAYS_FROM_CE
}

/// Inverse of [`epoch_days`].
pub fn from_epoch_days(days: i32) -> Option<NaiveDate> {
    NaiveDate::from_num_days_from_ce_opt(days + UNIX_EPOCH_DAYS_FROM_CE)
}

/// A `Date` literal.
pub fn date_lit(date: NaiveDate) -> Expr {
    lit(epoch_days(date)).cast(DataType::Date)
}

/// Normalize a date-like column to `Date`.
///
/// Strings are parsed as `YYYY-MM-DD`; datetimes are truncated to the day.
pub fn normalize_date_column(df: DataFrame, name: &str) -> Result<DataFrame> {
    let dtype = df.column(name)?.dtype().clone();
    let expr = match dtype {
        DataType::Date => return Ok(df),
        DataType::String => col(name).str().to_date(StrptimeOptions {
            format: Some("%Y-%m-%d".into()),
            ..Default::default()
        }),
        _ => col(name).cast(DataType::Date),
    };
    Ok(df.lazy().with_column(expr).collect()?)
}

/// Normalize the `date` column of a panel.
pub fn normalize_dates(df: DataFrame) -> Result<DataFrame> {
    normalize_date_column(df, DATE)
}

/// Sort ascending by symbol then date.
pub fn sort_panel(panel: LazyFrame) -> LazyFrame {
    panel.sort([SYMBOL, DATE], SortMultipleOptions::default().with_maintain_order(true))
}

/// Add (or replace) the sequence columns on a sorted panel.
pub fn with_sequence(panel: LazyFrame) -> LazyFrame {
    panel
        .with_column(
            (col(SYMBOL).cum_count(false).cast(DataType::Int64) - lit(1i64))
                .over([col(SYMBOL)])
                .alias(NLAG),
        )
        .with_column(col(NLAG).max().over([col(SYMBOL)]).alias(MAX_NLAG))
        .with_columns([
            (col(MAX_NLAG) - col(NLAG)).alias(REVERSE_NLAG),
            when(col(NLAG).eq(col(MAX_NLAG)))
                .then(lit("L"))
                .when(col(NLAG).eq(lit(0i64)))
                .then(lit("F"))
                .otherwise(lit("I"))
                .alias(FIRST_LAST_FLAG),
        ])
}

/// Normalize, sort and sequence a panel.
pub fn align(df: DataFrame) -> Result<DataFrame> {
    require_columns(&df, "panel", &[SYMBOL, DATE])?;
    let df = normalize_dates(df)?;
    Ok(with_sequence(sort_panel(df.lazy())).collect()?)
}

/// Keep rows whose date lies within `range` (both bounds inclusive).
pub fn filter_dates(panel: LazyFrame, range: &DateRange) -> LazyFrame {
    let mut panel = panel;
    if let Some(min) = range.min {
        panel = panel.filter(col(DATE).gt_eq(date_lit(min)));
    }
    if let Some(max) = range.max {
        panel = panel.filter(col(DATE).lt_eq(date_lit(max)));
    }
    panel
}

/// Keep rows for the given symbols (case-insensitive). Empty keeps all rows.
pub fn filter_symbols(df: DataFrame, symbols: &[String]) -> Result<DataFrame> {
    if symbols.is_empty() {
        return Ok(df);
    }
    let wanted: BTreeSet<String> = symbols.iter().map(|s| s.trim().to_uppercase()).collect();
    let wanted: Vec<String> = wanted.into_iter().collect();
    debug!(symbols = wanted.len(), "Applying symbol filter");

    let filter = df![SYMBOL => wanted]?;
    Ok(df
        .lazy()
        .join(
            filter.lazy(),
            [col(SYMBOL)],
            [col(SYMBOL)],
            JoinArgs::new(JoinType::Inner),
        )
        .collect()?)
}

/// Fail if any combination of `keys` occurs more than once.
pub fn check_unique_keys(df: &DataFrame, table: &str, keys: &[&str]) -> Result<()> {
    require_columns(df, table, keys)?;
    let key_exprs: Vec<Expr> = keys.iter().map(|k| col(*k)).collect();
    let duplicated = df
        .clone()
        .lazy()
        .group_by(key_exprs)
        .agg([len().alias("__rows")])
        .filter(col("__rows").gt(lit(1)))
        .collect()?
        .height();

    if duplicated > 0 {
        return Err(AbtError::DuplicateKey {
            table: table.to_string(),
            keys: keys.join(","),
            count: duplicated,
        });
    }
    Ok(())
}

/// Number of distinct symbols in a panel.
pub fn symbol_count(df: &DataFrame) -> Result<usize> {
    Ok(df.column(SYMBOL)?.n_unique()?)
}

/// Panel alignment as a [`Stage`].
#[derive(Debug, Clone, Copy, Default)]
pub struct PanelAligner;

impl Stage for PanelAligner {
    fn name(&self) -> &str {
        "panel_aligner"
    }

    fn description(&self) -> &str {
        "Sorts by (symbol, date) and derives nlag, max_nlag, reverse_nlag and firstLast_flag"
    }

    fn required_columns(&self) -> Vec<String> {
        vec![SYMBOL.to_string(), DATE.to_string()]
    }

    fn output_columns(&self) -> Vec<String> {
        SEQUENCE_COLUMNS.iter().map(|c| c.to_string()).collect()
    }

    fn apply(&self, panel: LazyFrame) -> Result<LazyFrame> {
        Ok(with_sequence(sort_panel(panel)))
    }

    fn run(&self, panel: &DataFrame) -> Result<DataFrame> {
        align(panel.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn unsorted() -> DataFrame {
        df![
            "symbol" => ["B", "A", "A", "C", "A", "B"],
            "date" => [
                "2024-06-30",
                "2024-03-31",
                "2023-12-31",
                "2024-03-31",
                "2024-06-30",
                "2024-03-31"
            ],
            "value" => [6.0, 2.0, 1.0, 9.0, 3.0, 5.0]
        ]
        .unwrap()
    }

    fn strings(df: &DataFrame, name: &str) -> Vec<String> {
        df.column(name)
            .unwrap()
            .str()
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap().to_string())
            .collect()
    }

    fn ints(df: &DataFrame, name: &str) -> Vec<i64> {
        df.column(name)
            .unwrap()
            .i64()
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap())
            .collect()
    }

    #[test]
    fn test_align_sorts_and_sequences() {
        let aligned = align(unsorted()).unwrap();

        assert_eq!(aligned.column("date").unwrap().dtype(), &DataType::Date);
        assert_eq!(strings(&aligned, "symbol"), vec!["A", "A", "A", "B", "B", "C"]);
        let values: Vec<f64> = aligned
            .column("value")
            .unwrap()
            .f64()
            .unwrap()
            .into_iter()
            .map(|v| v.unwrap())
            .collect();
        assert_eq!(values, vec![1.0, 2.0, 3.0, 5.0, 6.0, 9.0]);

        assert_eq!(ints(&aligned, NLAG), vec![0, 1, 2, 0, 1, 0]);
        assert_eq!(ints(&aligned, MAX_NLAG), vec![2, 2, 2, 1, 1, 0]);
        assert_eq!(ints(&aligned, REVERSE_NLAG), vec![2, 1, 0, 1, 0, 0]);
    }

    #[test]
    fn test_first_last_flags() {
        let aligned = align(unsorted()).unwrap();
        // Singleton C is flagged last, not first.
        assert_eq!(
            strings(&aligned, FIRST_LAST_FLAG),
            vec!["F", "I", "L", "F", "L", "L"]
        );
    }

    #[test]
    fn test_realign_after_filter() {
        let aligned = align(unsorted()).unwrap();
        let range = DateRange::parse("2024-03-31", "").unwrap();
        let filtered = filter_dates(aligned.lazy(), &range).collect().unwrap();
        let realigned = align(filtered).unwrap();

        assert_eq!(realigned.height(), 5);
        assert_eq!(ints(&realigned, NLAG), vec![0, 1, 0, 1, 0]);
        assert_eq!(strings(&realigned, FIRST_LAST_FLAG), vec!["F", "L", "F", "L", "L"]);
    }

    #[test]
    fn test_filter_dates_inclusive() {
        let df = normalize_dates(unsorted()).unwrap();
        let range = DateRange::parse("2024-03-31", "2024-03-31").unwrap();
        let filtered = filter_dates(df.lazy(), &range).collect().unwrap();
        assert_eq!(filtered.height(), 3);
    }

    #[test]
    fn test_filter_symbols_case_insensitive() {
        let filtered = filter_symbols(unsorted(), &["a".to_string(), " c ".to_string()]).unwrap();
        let aligned = align(filtered).unwrap();
        assert_eq!(strings(&aligned, "symbol"), vec!["A", "A", "A", "C"]);

        let all = filter_symbols(unsorted(), &[]).unwrap();
        assert_eq!(all.height(), 6);
    }

    #[test]
    fn test_duplicate_keys_detected() {
        let df = df![
            "symbol" => ["A", "A", "B"],
            "date" => ["2024-03-31", "2024-03-31", "2024-03-31"]
        ]
        .unwrap();
        let err = check_unique_keys(&df, "key_metrics", &["symbol", "date"]).unwrap_err();
        match err {
            AbtError::DuplicateKey { table, count, .. } => {
                assert_eq!(table, "key_metrics");
                assert_eq!(count, 1);
            }
            other => panic!("unexpected error: {other}"),
        }
        assert!(check_unique_keys(&df, "x", &["symbol"]).is_err());
        assert!(check_unique_keys(&unsorted(), "x", &["symbol", "date"]).is_ok());
    }

    #[test]
    fn test_epoch_days_roundtrip() {
        let date = NaiveDate::from_ymd_opt(2020, 1, 1).unwrap();
        assert_eq!(epoch_days(NaiveDate::from_ymd_opt(1970, 1, 1).unwrap()), 0);
        assert_eq!(from_epoch_days(epoch_days(date)), Some(date));
    }

    #[test]
    fn test_stage_contract() {
        let stage = PanelAligner;
        let missing = df!["symbol" => ["A"]].unwrap();
        assert!(matches!(stage.run(&missing), Err(AbtError::MissingColumn { .. })));
        assert_eq!(stage.output_columns().len(), 4);
    }
}
