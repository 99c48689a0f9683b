//! Price returns, volatility and the Sharpe-like ratio.
//!
//! Horizons are expressed in records of a monthly panel. Returns up to one
//! year are simple; multi-year `r_*` returns are annualized and `cr_*` returns
//! are cumulative over the same horizons.

use super::{null_f64, safe_div};
use crate::{
    Frequency, Result, Stage,
    panel::SYMBOL,
    window::{lag_expr, rolling_std},
};
use polars::prelude::*;

/// Longest horizon, in years, for annualized returns, volatility and Sharpe.
pub const MAX_YEARS: usize = 7;

/// `price / price_lag_h - 1`, null unless the lagged price is positive.
pub fn simple_return(price: Expr, horizon: usize) -> Expr {
    ratio_return(price.clone(), lag_expr(price, horizon))
}

fn ratio_return(price: Expr, prior: Expr) -> Expr {
    let prior = prior.cast(DataType::Float64);
    when(prior.clone().gt(lit(0.0)))
        .then(price.cast(DataType::Float64) / prior - lit(1.0))
        .otherwise(null_f64())
}

/// `(price / price_lag_h)^(1 / years) - 1` with `years = horizon / periods_per_year`.
pub fn annualized_return(price: Expr, horizon: usize, periods_per_year: usize) -> Expr {
    let prior = lag_expr(price.clone(), horizon).cast(DataType::Float64);
    let price = price.cast(DataType::Float64);
    let years = horizon as f64 / periods_per_year as f64;
    when(prior.clone().gt(lit(0.0)).and(price.clone().gt_eq(lit(0.0))))
        .then((price / prior).pow(lit(1.0 / years)) - lit(1.0))
        .otherwise(null_f64())
}

/// Cumulative (non-annualized) return over `horizon` records.
pub fn cumulative_return(price: Expr, horizon: usize) -> Expr {
    simple_return(price, horizon)
}

/// Rolling standard deviation of `returns` scaled by `sqrt(periods_per_year)`.
pub fn volatility(returns: Expr, window: usize, periods_per_year: usize) -> Expr {
    rolling_std(returns, window) * lit((periods_per_year as f64).sqrt())
}

/// Annualized return divided by the non-annualized rolling std of `returns`.
pub fn sharpe(annualized: Expr, returns: Expr, window: usize) -> Expr {
    safe_div(annualized, rolling_std(returns, window))
}

/// Return, volatility and Sharpe columns for a monthly price panel.
///
/// # Output Columns
/// - `r_1m`, `r_3m`, `r_6m`, `r_1y`: simple returns
/// - `r_2y` .. `r_7y`: annualized returns
/// - `r_1_2y` .. `r_4_5y`: one-year returns of earlier windows
/// - `cr_2y` .. `cr_7y`: cumulative returns
/// - `vol_1y` .. `vol_7y`, `shp_1y` .. `shp_7y`
/// - `data_years`: longest horizon with both `r_ny` and `shp_ny` present
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PriceReturns {
    price: String,
    frequency: Frequency,
}

impl PriceReturns {
    /// Returns computed from `price` on a monthly panel.
    pub fn new(price: impl Into<String>) -> Self {
        Self {
            price: price.into(),
            frequency: Frequency::Monthly,
        }
    }

    fn ppy(&self) -> usize {
        self.frequency.periods_per_year()
    }

    fn annual_return_column(years: usize) -> String {
        format!("r_{years}y")
    }
}

impl Default for PriceReturns {
    fn default() -> Self {
        Self::new("adj_close")
    }
}

impl Stage for PriceReturns {
    fn name(&self) -> &str {
        "price_returns"
    }

    fn description(&self) -> &str {
        "Simple, annualized and cumulative returns with volatility and Sharpe ratios"
    }

    fn required_columns(&self) -> Vec<String> {
        vec![SYMBOL.to_string(), self.price.clone()]
    }

    fn output_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = ["r_1m", "r_3m", "r_6m", "r_1y"]
            .iter()
            .map(|c| c.to_string())
            .collect();
        columns.extend((2..=MAX_YEARS).map(Self::annual_return_column));
        columns.extend((1..=4).map(|k| format!("r_{k}_{}y", k + 1)));
        columns.extend((2..=MAX_YEARS).map(|n| format!("cr_{n}y")));
        columns.extend((1..=MAX_YEARS).map(|n| format!("vol_{n}y")));
        columns.extend((1..=MAX_YEARS).map(|n| format!("shp_{n}y")));
        columns.push("data_years".to_string());
        columns
    }

    fn apply(&self, panel: LazyFrame) -> Result<LazyFrame> {
        let ppy = self.ppy();
        let price = || col(self.price.as_str());

        let mut returns = vec![
            simple_return(price(), 1).alias("r_1m"),
            simple_return(price(), 3).alias("r_3m"),
            simple_return(price(), 6).alias("r_6m"),
            simple_return(price(), ppy).alias("r_1y"),
        ];
        for n in 2..=MAX_YEARS {
            returns.push(
                annualized_return(price(), n * ppy, ppy).alias(Self::annual_return_column(n)),
            );
        }
        for k in 1..=4 {
            returns.push(
                ratio_return(lag_expr(price(), k * ppy), lag_expr(price(), (k + 1) * ppy))
                    .alias(format!("r_{k}_{}y", k + 1)),
            );
        }
        for n in 2..=MAX_YEARS {
            returns.push(cumulative_return(price(), n * ppy).alias(format!("cr_{n}y")));
        }

        let mut risk = Vec::with_capacity(2 * MAX_YEARS);
        for n in 1..=MAX_YEARS {
            risk.push(volatility(col("r_1m"), n * ppy, ppy).alias(format!("vol_{n}y")));
            risk.push(
                sharpe(col(Self::annual_return_column(n)), col("r_1m"), n * ppy)
                    .alias(format!("shp_{n}y")),
            );
        }

        let data_years = (1..=MAX_YEARS).fold(lit(0i32), |acc, n| {
            when(
                col(Self::annual_return_column(n))
                    .is_not_null()
                    .and(col(format!("shp_{n}y")).is_not_null()),
            )
            .then(lit(n as i32))
            .otherwise(acc)
        });

        Ok(panel
            .with_columns(returns)
            .with_columns(risk)
            .with_column(data_years.alias("data_years")))
    }
}
