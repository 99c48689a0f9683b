//! Full-window rolling aggregates.
//!
//! All aggregates require `w` non-null observations (`min_periods = w`); a
//! shorter history yields null on every row rather than a partial value.

use super::lag::{period_column, year_column};
use crate::{Frequency, panel::SYMBOL};
use polars::prelude::*;

fn full_window(window: usize) -> RollingOptionsFixedWindow {
    RollingOptionsFixedWindow {
        window_size: window,
        min_periods: window,
        ..Default::default()
    }
}

/// Trailing sum over `window` records.
pub fn rolling_sum(expr: Expr, window: usize) -> Expr {
    expr.rolling_sum(full_window(window)).over([col(SYMBOL)])
}

/// Trailing mean over `window` records.
pub fn rolling_mean(expr: Expr, window: usize) -> Expr {
    expr.rolling_mean(full_window(window)).over([col(SYMBOL)])
}

/// Trailing sample standard deviation (ddof = 1) over `window` records.
pub fn rolling_std(expr: Expr, window: usize) -> Expr {
    expr.rolling_std(full_window(window)).over([col(SYMBOL)])
}

/// Add `{metric}_0_1y` .. `{metric}_{years-1}_{years}y`.
///
/// `{metric}_0_1y` is the trailing one-year sum of the period column. Bucket
/// `k` is the trailing `k + 1` year sum minus every shorter bucket, i.e. the
/// sum of the year that ended `k` years ago.
pub fn with_year_buckets(
    panel: LazyFrame,
    metric: &str,
    frequency: Frequency,
    years: usize,
) -> LazyFrame {
    let base = period_column(metric, 0, frequency);
    let periods = frequency.periods_per_year();

    let mut panel = panel;
    for k in 0..years {
        let bucket = (0..k).fold(
            rolling_sum(col(base.as_str()).cast(DataType::Float64), periods * (k + 1)),
            |acc, previous| acc - col(year_column(metric, previous)),
        );
        panel = panel.with_column(bucket.alias(year_column(metric, k)));
    }
    panel
}
