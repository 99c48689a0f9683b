//! Year-over-year growth of period and year-bucket columns.

use super::{chain_growth, pct_change};
use crate::{
    Frequency, Result, Stage,
    window::{period_column, year_column},
};
use polars::prelude::*;

/// Year-over-year percent changes for one metric.
///
/// A period change at offset `k` compares `{m}_{k}_{k+1}{suffix}` with the
/// same period one year earlier. A year change at offset `k` compares year
/// bucket `k` with bucket `k + 1`. Outputs are named
/// `{m}_{label}_{k}_{k+1}{suffix}` and `{m}_{label}_{k}_{k+1}y`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GrowthStage {
    metric: String,
    label: String,
    frequency: Frequency,
    period_offsets: Vec<usize>,
    year_offsets: Vec<usize>,
}

impl GrowthStage {
    /// Growth stage with no offsets configured.
    pub fn new(metric: impl Into<String>, label: impl Into<String>, frequency: Frequency) -> Self {
        Self {
            metric: metric.into(),
            label: label.into(),
            frequency,
            period_offsets: Vec::new(),
            year_offsets: Vec::new(),
        }
    }

    /// Period offsets to compare against the prior year.
    pub fn with_period_offsets(mut self, offsets: impl IntoIterator<Item = usize>) -> Self {
        self.period_offsets = offsets.into_iter().collect();
        self
    }

    /// Year-bucket offsets to compare against the preceding bucket.
    pub fn with_year_offsets(mut self, offsets: impl IntoIterator<Item = usize>) -> Self {
        self.year_offsets = offsets.into_iter().collect();
        self
    }

    /// Name of the period change column at offset `k`.
    pub fn period_output(&self, k: usize) -> String {
        let label = format!("{}_{}", self.metric, self.label);
        period_column(&label, k, self.frequency)
    }

    /// Name of the year change column at offset `k`.
    pub fn year_output(&self, k: usize) -> String {
        year_column(&format!("{}_{}", self.metric, self.label), k)
    }

    fn prior_period(&self, k: usize) -> String {
        period_column(&self.metric, k + self.frequency.periods_per_year(), self.frequency)
    }
}

impl Stage for GrowthStage {
    fn name(&self) -> &str {
        "growth"
    }

    fn description(&self) -> &str {
        "Year-over-year percent changes of period values and year buckets"
    }

    fn required_columns(&self) -> Vec<String> {
        let mut columns = Vec::new();
        for k in &self.period_offsets {
            columns.push(period_column(&self.metric, *k, self.frequency));
            columns.push(self.prior_period(*k));
        }
        for k in &self.year_offsets {
            columns.push(year_column(&self.metric, *k));
            columns.push(year_column(&self.metric, k + 1));
        }
        columns.dedup();
        columns
    }

    fn output_columns(&self) -> Vec<String> {
        self.period_offsets
            .iter()
            .map(|k| self.period_output(*k))
            .chain(self.year_offsets.iter().map(|k| self.year_output(*k)))
            .collect()
    }

    fn apply(&self, panel: LazyFrame) -> Result<LazyFrame> {
        let mut exprs = Vec::with_capacity(self.period_offsets.len() + self.year_offsets.len());
        for k in &self.period_offsets {
            exprs.push(
                pct_change(
                    col(period_column(&self.metric, *k, self.frequency)),
                    col(self.prior_period(*k)),
                )
                .alias(self.period_output(*k)),
            );
        }
        for k in &self.year_offsets {
            exprs.push(
                pct_change(
                    col(year_column(&self.metric, *k)),
                    col(year_column(&self.metric, k + 1)),
                )
                .alias(self.year_output(*k)),
            );
        }
        Ok(if exprs.is_empty() {
            panel
        } else {
            panel.with_columns(exprs)
        })
    }
}

/// Geometric chain of existing growth columns into one annualized rate.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChainedGrowth {
    output: String,
    inputs: Vec<String>,
}

impl ChainedGrowth {
    /// Chain `inputs` into `output`.
    pub fn new<I, S>(output: impl Into<String>, inputs: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            output: output.into(),
            inputs: inputs.into_iter().map(Into::into).collect(),
        }
    }
}

impl Stage for ChainedGrowth {
    fn name(&self) -> &str {
        "chained_growth"
    }

    fn description(&self) -> &str {
        "Geometric mean of consecutive growth rates"
    }

    fn required_columns(&self) -> Vec<String> {
        self.inputs.clone()
    }

    fn output_columns(&self) -> Vec<String> {
        vec![self.output.clone()]
    }

    fn apply(&self, panel: LazyFrame) -> Result<LazyFrame> {
        let parts = self.inputs.iter().map(|c| col(c.as_str())).collect();
        Ok(panel.with_column(chain_growth(parts).alias(self.output.as_str())))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{panel::align, window::MetricHistory};
    use approx::assert_relative_eq;

    fn eps_panel() -> DataFrame {
        let eps: Vec<f64> = vec![1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0, 3.0, 3.0, 3.0, 3.0];
        let dates: Vec<String> = (0..eps.len())
            .map(|i| format!("{}-{:02}-28", 2018 + i / 4, (i % 4) * 3 + 3))
            .collect();
        let df = align(
            df![
                "symbol" => vec!["ZZ"; eps.len()],
                "date" => dates,
                "eps_0_1q" => eps
            ]
            .unwrap(),
        )
        .unwrap();
        MetricHistory::new("eps", Frequency::Quarterly)
            .with_lags([4, 8])
            .with_years(3)
            .run(&df)
            .unwrap()
    }

    fn last(df: &DataFrame, name: &str) -> Option<f64> {
        let column = df.column(name).unwrap().f64().unwrap();
        column.get(column.len() - 1)
    }

    #[test]
    fn test_growth_names() {
        let stage = GrowthStage::new("RPS", "pc", Frequency::Quarterly)
            .with_period_offsets(0..5)
            .with_year_offsets(0..3);
        let outputs = stage.output_columns();
        assert_eq!(outputs[0], "RPS_pc_0_1q");
        assert_eq!(outputs[4], "RPS_pc_4_5q");
        assert_eq!(outputs[5], "RPS_pc_0_1y");
        assert!(stage.required_columns().contains(&"RPS_8_9q".to_string()));
        assert!(stage.required_columns().contains(&"RPS_3_4y".to_string()));
    }

    #[test]
    fn test_eps_growth_and_chain() {
        let growth = GrowthStage::new("eps", "pctChg", Frequency::Quarterly)
            .with_period_offsets([0, 4])
            .with_year_offsets([0, 1]);
        let out = growth.run(&eps_panel()).unwrap();

        assert_relative_eq!(last(&out, "eps_pctChg_0_1q").unwrap(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(last(&out, "eps_pctChg_4_5q").unwrap(), 1.0, epsilon = 1e-12);
        assert_relative_eq!(last(&out, "eps_pctChg_0_1y").unwrap(), 0.5, epsilon = 1e-12);
        assert_relative_eq!(last(&out, "eps_pctChg_1_2y").unwrap(), 1.0, epsilon = 1e-12);

        let chained = ChainedGrowth::new("eps_pctChg_0_2y", ["eps_pctChg_0_1y", "eps_pctChg_1_2y"])
            .run(&out)
            .unwrap();
        // sqrt(1.5 * 2.0) - 1
        assert_relative_eq!(
            last(&chained, "eps_pctChg_0_2y").unwrap(),
            3.0_f64.sqrt() - 1.0,
            epsilon = 1e-12
        );
        let first = chained.column("eps_pctChg_0_2y").unwrap().f64().unwrap().get(0);
        assert_eq!(first, None);
    }
}
