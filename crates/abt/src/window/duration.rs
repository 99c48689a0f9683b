//! Period-duration labels.
//!
//! The span covered by the last `n` quarterly reports is the number of days
//! between the current date and the date `lag` records earlier, plus one
//! quarter. Spans close to a whole number of quarters are snapped to the
//! canonical value so irregular filing dates still compare equal.

use super::lag::lag;
use crate::{Result, Stage, panel::DATE, panel::SYMBOL};
use polars::prelude::*;

/// Days added to the raw span to cover the first period itself.
pub const QUARTER_DAYS: i32 = 91;

/// Maximum distance, in days, for snapping to a canonical span.
pub const SNAP_TOLERANCE: i32 = 10;

/// Canonical spans from three quarters to four years.
pub const CANONICAL_SPANS: [i32; 14] = [
    274, 365, 456, 547, 639, 730, 821, 913, 1004, 1095, 1186, 1278, 1369, 1460,
];

/// Snap a raw span to the canonical bucket within [`SNAP_TOLERANCE`] days.
pub fn snap_days(days: i32) -> i32 {
    CANONICAL_SPANS
        .iter()
        .copied()
        .find(|bucket| (days - bucket).abs() <= SNAP_TOLERANCE)
        .unwrap_or(days)
}

/// Span label covering the current record and the `lag` before it.
///
/// Null when the lagged date does not exist.
pub fn period_duration(lag_records: usize) -> Expr {
    let raw = col(DATE).cast(DataType::Int32) - lag(DATE, lag_records).cast(DataType::Int32)
        + lit(QUARTER_DAYS);

    // Buckets are further apart than twice the tolerance, so at most one matches.
    CANONICAL_SPANS
        .iter()
        .fold(raw.clone(), |acc, bucket| {
            when((raw.clone() - lit(*bucket)).abs().lt_eq(lit(SNAP_TOLERANCE)))
                .then(lit(*bucket))
                .otherwise(acc)
        })
        .cast(DataType::Int32)
}

/// Adds `days_0_1y` (lag 3) and `days_1_2y` (lag 7).
#[derive(Debug, Clone, Copy, Default)]
pub struct PeriodDuration;

impl Stage for PeriodDuration {
    fn name(&self) -> &str {
        "period_duration"
    }

    fn description(&self) -> &str {
        "Days spanned by the trailing one and two years of quarterly reports"
    }

    fn required_columns(&self) -> Vec<String> {
        vec![SYMBOL.to_string(), DATE.to_string()]
    }

    fn output_columns(&self) -> Vec<String> {
        vec!["days_0_1y".to_string(), "days_1_2y".to_string()]
    }

    fn apply(&self, panel: LazyFrame) -> Result<LazyFrame> {
        Ok(panel.with_columns([
            period_duration(3).alias("days_0_1y"),
            period_duration(7).alias("days_1_2y"),
        ]))
    }
}
