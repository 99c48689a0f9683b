//! Trailing dividend counts, totals and yields.

use super::safe_div;
use crate::{
    Frequency, Result, Stage,
    panel::SYMBOL,
    window::{lag, rolling_sum},
};
use polars::prelude::*;

/// Years of trailing dividend history emitted.
pub const DIVIDEND_YEARS: usize = 3;

/// Dividend history for a monthly price panel.
///
/// Missing dividend amounts count as no payout. For each of the last three
/// years the stage emits:
/// - `divN_{n}y`: number of months with a positive payout
/// - `totDiv_{n}y`: total amount paid
/// - `divYld_{n}y`: sum of monthly yields (`div_amount / price`)
///
/// Year `n > 1` is the one-year figure lagged by `n - 1` years.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DividendHistory {
    amount: String,
    price: String,
}

impl DividendHistory {
    /// Dividend history from the given amount and price columns.
    pub fn new(amount: impl Into<String>, price: impl Into<String>) -> Self {
        Self {
            amount: amount.into(),
            price: price.into(),
        }
    }
}

impl Default for DividendHistory {
    fn default() -> Self {
        Self::new("div_amount", "adj_close")
    }
}

impl Stage for DividendHistory {
    fn name(&self) -> &str {
        "dividend_history"
    }

    fn description(&self) -> &str {
        "Trailing dividend payout counts, totals and yields"
    }

    fn required_columns(&self) -> Vec<String> {
        vec![SYMBOL.to_string(), self.amount.clone(), self.price.clone()]
    }

    fn output_columns(&self) -> Vec<String> {
        ["divN", "totDiv", "divYld"]
            .iter()
            .flat_map(|prefix| (1..=DIVIDEND_YEARS).map(move |n| format!("{prefix}_{n}y")))
            .collect()
    }

    fn apply(&self, panel: LazyFrame) -> Result<LazyFrame> {
        let window = Frequency::Monthly.periods_per_year();
        let amount = col(self.amount.as_str())
            .cast(DataType::Float64)
            .fill_null(lit(0.0));
        let payout = when(amount.clone().gt(lit(0.0)))
            .then(lit(1.0))
            .otherwise(lit(0.0));
        let yld = safe_div(amount.clone(), col(self.price.as_str()));

        let panel = panel.with_columns([
            rolling_sum(payout, window).alias("divN_1y"),
            rolling_sum(amount, window).alias("totDiv_1y"),
            rolling_sum(yld, window).alias("divYld_1y"),
        ]);

        let mut lagged = Vec::new();
        for prefix in ["divN", "totDiv", "divYld"] {
            for n in 2..=DIVIDEND_YEARS {
                lagged.push(
                    lag(&format!("{prefix}_1y"), (n - 1) * window).alias(format!("{prefix}_{n}y")),
                );
            }
        }
        Ok(panel.with_columns(lagged))
    }
}
