//! Lagged values and the per-metric history columns.
//!
//! A metric observed once per period is stored as `{metric}_0_1{suffix}`
//! (`RPS_0_1q`). Its value `k` records earlier is `{metric}_{k}_{k+1}{suffix}`
//! and the `k`-th trailing year bucket is `{metric}_{k}_{k+1}y`.

use super::rolling::with_year_buckets;
use crate::{Frequency, Result, Stage, panel::SYMBOL};
use polars::prelude::*;

/// Value of `name` for the same symbol `k` records earlier.
pub fn lag(name: &str, k: usize) -> Expr {
    lag_expr(col(name), k)
}

/// Shift an arbitrary expression by `k` records within each symbol.
pub fn lag_expr(expr: Expr, k: usize) -> Expr {
    expr.shift(lit(k as i64)).over([col(SYMBOL)])
}

/// `{metric}_{k}_{k+1}{suffix}`.
pub fn period_column(metric: &str, k: usize, frequency: Frequency) -> String {
    format!("{metric}_{k}_{}{}", k + 1, frequency.suffix())
}

/// `{metric}_{k}_{k+1}y`.
pub fn year_column(metric: &str, k: usize) -> String {
    format!("{metric}_{k}_{}y", k + 1)
}

/// Lagged period columns and trailing year buckets for one metric.
///
/// # Required Columns
/// - `symbol`
/// - `{metric}_0_1{suffix}`: the current period's value
///
/// # Output Columns
/// - `{metric}_{k}_{k+1}{suffix}` for every configured lag `k`
/// - `{metric}_0_1y` .. `{metric}_{n-1}_{n}y` for `n` configured years
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MetricHistory {
    metric: String,
    frequency: Frequency,
    lags: Vec<usize>,
    years: usize,
}

impl MetricHistory {
    /// History for `metric` with no lags and no year buckets.
    pub fn new(metric: impl Into<String>, frequency: Frequency) -> Self {
        Self {
            metric: metric.into(),
            frequency,
            lags: Vec::new(),
            years: 0,
        }
    }

    /// Quarterly metric with lags `1..=8` and four year buckets.
    pub fn quarterly(metric: impl Into<String>) -> Self {
        Self::new(metric, Frequency::Quarterly)
            .with_lags(1..=8)
            .with_years(4)
    }

    /// Set the lags to emit.
    pub fn with_lags(mut self, lags: impl IntoIterator<Item = usize>) -> Self {
        self.lags = lags.into_iter().filter(|k| *k > 0).collect();
        self
    }

    /// Set the number of trailing year buckets.
    pub const fn with_years(mut self, years: usize) -> Self {
        self.years = years;
        self
    }

    /// Name of the current-period column.
    pub fn base_column(&self) -> String {
        period_column(&self.metric, 0, self.frequency)
    }

    /// Metric prefix.
    pub fn metric(&self) -> &str {
        &self.metric
    }
}

impl Stage for MetricHistory {
    fn name(&self) -> &str {
        "metric_history"
    }

    fn description(&self) -> &str {
        "Per-symbol lagged period values and trailing year buckets"
    }

    fn required_columns(&self) -> Vec<String> {
        vec![SYMBOL.to_string(), self.base_column()]
    }

    fn output_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = self
            .lags
            .iter()
            .map(|k| period_column(&self.metric, *k, self.frequency))
            .collect();
        columns.extend((0..self.years).map(|k| year_column(&self.metric, k)));
        columns
    }

    fn apply(&self, panel: LazyFrame) -> Result<LazyFrame> {
        let base = self.base_column();
        let lagged: Vec<Expr> = self
            .lags
            .iter()
            .map(|k| lag(&base, *k).alias(period_column(&self.metric, *k, self.frequency)))
            .collect();

        let panel = if lagged.is_empty() {
            panel
        } else {
            panel.with_columns(lagged)
        };
        Ok(with_year_buckets(
            panel,
            &self.metric,
            self.frequency,
            self.years,
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::align;

    fn panel() -> DataFrame {
        align(
            df![
                "symbol" => ["A", "A", "A", "B", "B"],
                "date" => ["2023-03-31", "2023-06-30", "2023-09-30", "2023-03-31", "2023-06-30"],
                "RPS_0_1q" => [1.0, 2.0, 3.0, 10.0, 20.0]
            ]
            .unwrap(),
        )
        .unwrap()
    }

    #[test]
    fn test_lag_boundary() {
        let out = panel()
            .lazy()
            .with_column(lag("RPS_0_1q", 2).alias("lag2"))
            .collect()
            .unwrap();
        let lag2 = out.column("lag2").unwrap().f64().unwrap();
        assert_eq!(lag2.get(0), None);
        assert_eq!(lag2.get(1), None);
        assert_eq!(lag2.get(2), Some(1.0));
        // B has only two records: both null, nothing leaks from A.
        assert_eq!(lag2.get(3), None);
        assert_eq!(lag2.get(4), None);
    }

    #[test]
    fn test_history_columns() {
        let stage = MetricHistory::new("RPS", Frequency::Quarterly).with_lags([1, 2]);
        assert_eq!(stage.output_columns(), vec!["RPS_1_2q", "RPS_2_3q"]);

        let out = stage.run(&panel()).unwrap();
        let lag1 = out.column("RPS_1_2q").unwrap().f64().unwrap();
        assert_eq!(lag1.get(0), None);
        assert_eq!(lag1.get(2), Some(2.0));
        assert_eq!(lag1.get(3), None);
        assert_eq!(lag1.get(4), Some(10.0));
    }

    #[test]
    fn test_quarterly_defaults() {
        let stage = MetricHistory::quarterly("NIPS");
        let columns = stage.output_columns();
        assert_eq!(columns.len(), 12);
        assert_eq!(columns[6], "NIPS_7_8q");
        assert_eq!(columns[8], "NIPS_0_1y");
        assert_eq!(columns[11], "NIPS_3_4y");
    }

    #[test]
    fn test_missing_base_column() {
        let stage = MetricHistory::quarterly("BVPS");
        assert!(stage.run(&panel()).is_err());
    }

    #[test]
    fn test_column_names() {
        assert_eq!(period_column("px", 11, Frequency::Monthly), "px_11_12m");
        assert_eq!(year_column("eps", 2), "eps_2_3y");
    }
}
