//! Piotroski F-Score.
//!
//! The F-Score is a 9-point composite of binary fundamental-trend rules, each
//! comparing a trailing-twelve-month figure with its value one year (four
//! quarterly records) earlier:
//!
//! **Profitability**
//! - CR1: net income > 0
//! - CR2: operating cash flow > 0
//! - CR3: return on assets improved, from a positive base
//! - CR4: operating cash flow > net income
//!
//! **Leverage and liquidity**
//! - CR5: long-term debt decreased, from a positive base
//! - CR6: current ratio improved, from a positive base
//! - CR7: share count did not increase, from a positive base
//!
//! **Operating efficiency**
//! - CR8: gross profit ratio improved, from a positive base
//! - CR9: asset turnover improved, from a positive base
//!
//! The "current ratio" here is total assets over total liabilities net of
//! minority interest, which is what the rule set has always used.

use crate::{
    Frequency, Result, Stage,
    panel::SYMBOL,
    ratio::safe_div,
    window::{lag, rolling_sum},
};
use polars::prelude::*;
use serde::{Deserialize, Serialize};

/// Score column.
pub const SCORE: &str = "Piotroski_Score";

/// Rule columns, CR1 first.
pub const RULES: [&str; 9] = ["CR1", "CR2", "CR3", "CR4", "CR5", "CR6", "CR7", "CR8", "CR9"];

/// Suffix of the prior-year columns.
pub const LAG_SUFFIX: &str = "_lag4";

/// Quarterly flows summed over the trailing four records before scoring.
pub const FLOW_COLUMNS: [&str; 3] = ["netIncome", "revenue", "operatingCashFlow"];

/// How rules treat comparisons that cannot be evaluated.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MissingHistoryPolicy {
    /// Undefined comparisons fail the rule; the score is always 0-9.
    #[default]
    Fail,
    /// Undefined comparisons yield a null rule and a null score.
    Propagate,
}

fn prior(name: &str) -> String {
    format!("{name}{LAG_SUFFIX}")
}

/// Replace quarterly flows with their trailing-four-quarter sums.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TrailingTwelveMonths {
    columns: Vec<String>,
}

impl TrailingTwelveMonths {
    /// Trailing sums of the given flow columns.
    pub fn new<I, S>(columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            columns: columns.into_iter().map(Into::into).collect(),
        }
    }
}

impl Default for TrailingTwelveMonths {
    fn default() -> Self {
        Self::new(FLOW_COLUMNS)
    }
}

impl Stage for TrailingTwelveMonths {
    fn name(&self) -> &str {
        "trailing_twelve_months"
    }

    fn description(&self) -> &str {
        "Trailing four-quarter sums of quarterly flows"
    }

    fn required_columns(&self) -> Vec<String> {
        let mut columns = vec![SYMBOL.to_string()];
        columns.extend(self.columns.iter().cloned());
        columns
    }

    fn output_columns(&self) -> Vec<String> {
        self.columns.clone()
    }

    fn apply(&self, panel: LazyFrame) -> Result<LazyFrame> {
        let window = Frequency::Quarterly.periods_per_year();
        let sums: Vec<Expr> = self
            .columns
            .iter()
            .map(|c| rolling_sum(col(c.as_str()).cast(DataType::Float64), window).alias(c.as_str()))
            .collect();
        Ok(panel.with_columns(sums))
    }
}

/// Supporting ratios and prior-year values consumed by [`PiotroskiScorer`].
///
/// # Required Columns
/// Trailing-twelve-month `netIncome`, `revenue`, `operatingCashFlow` plus
/// `grossProfitRatio`, `numShares`, `totalAssets`, `longTermDebt`,
/// `totalLiabilities`, `minorityInterest`, `cashAndCashEquivalents`,
/// `shortTermInvestments`, `netReceivables`, `totalCurrentLiabilities`.
///
/// # Output Columns
/// `returnOnAssets`, `currentRatio`, `assetTurnover`, `quickRatio`,
/// `longTermDebtToTotalAssetsRatio` and the `_lag4` columns.
#[derive(Debug, Clone, Copy, Default)]
pub struct PiotroskiInputs;

impl PiotroskiInputs {
    const LAGGED: [&'static str; 7] = [
        "totalAssets",
        "grossProfitRatio",
        "longTermDebt",
        "numShares",
        "returnOnAssets",
        "currentRatio",
        "assetTurnover",
    ];

    const INPUTS: [&'static str; 14] = [
        "symbol",
        "netIncome",
        "revenue",
        "operatingCashFlow",
        "grossProfitRatio",
        "numShares",
        "totalAssets",
        "longTermDebt",
        "totalLiabilities",
        "minorityInterest",
        "cashAndCashEquivalents",
        "shortTermInvestments",
        "netReceivables",
        "totalCurrentLiabilities",
    ];
}

impl Stage for PiotroskiInputs {
    fn name(&self) -> &str {
        "piotroski_inputs"
    }

    fn description(&self) -> &str {
        "Return on assets, current ratio, asset turnover, quick ratio and prior-year values"
    }

    fn required_columns(&self) -> Vec<String> {
        Self::INPUTS.iter().map(|c| c.to_string()).collect()
    }

    fn output_columns(&self) -> Vec<String> {
        let mut columns: Vec<String> = [
            "returnOnAssets",
            "currentRatio",
            "assetTurnover",
            "quickRatio",
            "longTermDebtToTotalAssetsRatio",
        ]
        .iter()
        .map(|c| c.to_string())
        .collect();
        columns.extend(Self::LAGGED.iter().map(|c| prior(c)));
        columns
    }

    fn apply(&self, panel: LazyFrame) -> Result<LazyFrame> {
        let k = Frequency::Quarterly.periods_per_year();
        let average_assets = (col("totalAssets") + col(prior("totalAssets"))) / lit(2.0);

        Ok(panel
            .with_column(lag("totalAssets", k).alias(prior("totalAssets")))
            .with_columns([
                safe_div(col("netIncome"), average_assets.clone()).alias("returnOnAssets"),
                safe_div(
                    col("totalAssets"),
                    col("totalLiabilities") - col("minorityInterest"),
                )
                .alias("currentRatio"),
                safe_div(col("revenue"), average_assets).alias("assetTurnover"),
                safe_div(
                    col("cashAndCashEquivalents")
                        + col("shortTermInvestments")
                        + col("netReceivables"),
                    col("totalCurrentLiabilities"),
                )
                .alias("quickRatio"),
                safe_div(col("longTermDebt"), col("totalAssets"))
                    .alias("longTermDebtToTotalAssetsRatio"),
            ])
            .with_columns(
                Self::LAGGED[1..]
                    .iter()
                    .map(|c| lag(c, k).alias(prior(c)))
                    .collect::<Vec<_>>(),
            ))
    }
}

/// The nine rule expressions, CR1 first, as booleans.
pub fn rule_conditions() -> [Expr; 9] {
    let improved = |name: &str| {
        col(name)
            .gt(col(prior(name)))
            .and(col(prior(name)).gt(lit(0.0)))
    };
    [
        col("netIncome").gt(lit(0.0)),
        col("operatingCashFlow").gt(lit(0.0)),
        improved("returnOnAssets"),
        col("operatingCashFlow").gt(col("netIncome")),
        col("longTermDebt")
            .lt(col(prior("longTermDebt")))
            .and(col(prior("longTermDebt")).gt(lit(0.0))),
        improved("currentRatio"),
        col("numShares")
            .lt_eq(col(prior("numShares")))
            .and(col(prior("numShares")).gt(lit(0.0))),
        improved("grossProfitRatio"),
        improved("assetTurnover"),
    ]
}

/// The nine rules as `Int32` 0/1 columns under `policy`.
pub fn rule_exprs(policy: MissingHistoryPolicy) -> Vec<Expr> {
    rule_conditions()
        .into_iter()
        .zip(RULES)
        .map(|(condition, name)| {
            let condition = match policy {
                MissingHistoryPolicy::Fail => condition.fill_null(lit(false)),
                MissingHistoryPolicy::Propagate => condition,
            };
            condition.cast(DataType::Int32).alias(name)
        })
        .collect()
}

/// Evaluates CR1..CR9 and their sum.
#[derive(Debug, Clone, Copy, Default)]
pub struct PiotroskiScorer {
    policy: MissingHistoryPolicy,
}

impl PiotroskiScorer {
    /// Scorer with the given missing-history policy.
    pub const fn new(policy: MissingHistoryPolicy) -> Self {
        Self { policy }
    }

    /// Configured policy.
    pub const fn policy(&self) -> MissingHistoryPolicy {
        self.policy
    }
}

impl Stage for PiotroskiScorer {
    fn name(&self) -> &str {
        "piotroski_scorer"
    }

    fn description(&self) -> &str {
        "Piotroski F-Score - nine binary fundamental-trend rules and their sum"
    }

    fn required_columns(&self) -> Vec<String> {
        const TRENDED: [&str; 6] = [
            "returnOnAssets",
            "longTermDebt",
            "currentRatio",
            "numShares",
            "grossProfitRatio",
            "assetTurnover",
        ];
        let mut columns = vec!["netIncome".to_string(), "operatingCashFlow".to_string()];
        columns.extend(TRENDED.iter().map(|c| c.to_string()));
        columns.extend(TRENDED.iter().map(|c| prior(c)));
        columns
    }

    fn output_columns(&self) -> Vec<String> {
        std::iter::once(SCORE)
            .chain(RULES)
            .map(|c| c.to_string())
            .collect()
    }

    fn apply(&self, panel: LazyFrame) -> Result<LazyFrame> {
        let score = RULES
            .iter()
            .map(|r| col(*r))
            .reduce(|acc, rule| acc + rule)
            .unwrap_or_else(|| lit(0i32));

        Ok(panel
            .with_columns(rule_exprs(self.policy))
            .with_column(score.cast(DataType::Int32).alias(SCORE)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::panel::align;
    use rstest::rstest;

    fn scored(df: DataFrame, policy: MissingHistoryPolicy) -> DataFrame {
        PiotroskiScorer::new(policy).run(&df).unwrap()
    }

    fn ints(df: &DataFrame, name: &str) -> Vec<Option<i32>> {
        df.column(name).unwrap().i32().unwrap().into_iter().collect()
    }

    #[allow(clippy::too_many_arguments)]
    fn scorer_row(
        net_income: f64,
        ocf: f64,
        roa: (f64, f64),
        debt: (f64, f64),
        current: (f64, f64),
        shares: (f64, f64),
        gross: (f64, f64),
        turnover: (f64, f64),
    ) -> DataFrame {
        df![
            "symbol" => ["X"],
            "netIncome" => [net_income],
            "operatingCashFlow" => [ocf],
            "returnOnAssets" => [roa.0],
            "returnOnAssets_lag4" => [roa.1],
            "longTermDebt" => [debt.0],
            "longTermDebt_lag4" => [debt.1],
            "currentRatio" => [current.0],
            "currentRatio_lag4" => [current.1],
            "numShares" => [shares.0],
            "numShares_lag4" => [shares.1],
            "grossProfitRatio" => [gross.0],
            "grossProfitRatio_lag4" => [gross.1],
            "assetTurnover" => [turnover.0],
            "assetTurnover_lag4" => [turnover.1]
        ]
        .unwrap()
    }

    #[test]
    fn test_perfect_score() {
        let df = scorer_row(
            10000.0,
            12000.0,
            (0.15, 0.12),
            (50000.0, 55000.0),
            (2.5, 2.2),
            (10000.0, 10000.0),
            (0.45, 0.42),
            (1.3, 1.2),
        );
        let out = scored(df, MissingHistoryPolicy::Fail);
        assert_eq!(ints(&out, SCORE), vec![Some(9)]);
    }

    #[test]
    fn test_weak_company() {
        let df = scorer_row(
            -5000.0,
            -3000.0,
            (0.05, 0.08),
            (60000.0, 50000.0),
            (1.5, 1.8),
            (12000.0, 10000.0),
            (0.25, 0.30),
            (0.9, 1.0),
        );
        let out = scored(df, MissingHistoryPolicy::Fail);
        // Only CR4 holds: -3000 > -5000.
        assert_eq!(ints(&out, SCORE), vec![Some(1)]);
        assert_eq!(ints(&out, "CR4"), vec![Some(1)]);
    }

    #[test]
    fn test_mixed_signals() {
        let df = scorer_row(
            8000.0,
            9000.0,
            (0.10, 0.12),
            (45000.0, 50000.0),
            (2.0, 2.1),
            (10000.0, 10000.0),
            (0.38, 0.35),
            (1.1, 1.2),
        );
        let out = scored(df, MissingHistoryPolicy::Fail);
        let rules: Vec<Option<i32>> = RULES.iter().map(|r| ints(&out, r)[0]).collect();
        assert_eq!(
            rules,
            vec![Some(1), Some(1), Some(0), Some(1), Some(1), Some(0), Some(1), Some(1), Some(0)]
        );
        assert_eq!(ints(&out, SCORE), vec![Some(6)]);
    }

    #[rstest]
    #[case(-1.0)]
    #[case(0.0)]
    fn test_improvement_requires_positive_base(#[case] base: f64) {
        let df = scorer_row(
            1.0,
            1.0,
            (0.5, base),
            (1.0, base),
            (2.0, base),
            (1.0, base),
            (0.5, base),
            (1.0, base),
        );
        let out = scored(df, MissingHistoryPolicy::Fail);
        for rule in ["CR3", "CR5", "CR6", "CR7", "CR8", "CR9"] {
            assert_eq!(ints(&out, rule), vec![Some(0)], "{rule}");
        }
    }

    fn fundamentals(net_income: Vec<f64>) -> DataFrame {
        let n = net_income.len();
        let dates: Vec<String> = (0..n)
            .map(|i| format!("{}-{:02}-30", 2020 + i / 4, (i % 4) * 3 + 3))
            .collect();
        align(
            df![
                "symbol" => vec!["ZT"; n],
                "date" => dates,
                "netIncome" => net_income,
                "revenue" => vec![100.0; n],
                "operatingCashFlow" => vec![2.0; n],
                "grossProfitRatio" => vec![0.4; n],
                "numShares" => vec![1000.0; n],
                "totalAssets" => vec![500.0; n],
                "longTermDebt" => vec![100.0; n],
                "totalLiabilities" => vec![300.0; n],
                "minorityInterest" => vec![0.0; n],
                "cashAndCashEquivalents" => vec![50.0; n],
                "shortTermInvestments" => vec![10.0; n],
                "netReceivables" => vec![40.0; n],
                "totalCurrentLiabilities" => vec![100.0; n]
            ]
            .unwrap(),
        )
        .unwrap()
    }

    fn pipeline(df: &DataFrame, policy: MissingHistoryPolicy) -> DataFrame {
        let df = TrailingTwelveMonths::default().run(df).unwrap();
        let df = PiotroskiInputs.run(&df).unwrap();
        PiotroskiScorer::new(policy).run(&df).unwrap()
    }

    #[test]
    fn test_trailing_sum_and_missing_history() {
        let out = pipeline(
            &fundamentals(vec![10.0, -5.0, 3.0, 3.0, 3.0]),
            MissingHistoryPolicy::Fail,
        );

        let ttm = out.column("netIncome").unwrap().f64().unwrap();
        assert_eq!(ttm.get(2), None);
        assert_eq!(ttm.get(4), Some(4.0));

        assert_eq!(ints(&out, "CR1")[4], Some(1));
        assert_eq!(ints(&out, "CR3")[4], Some(0));
        // Too little history for a trailing sum: every flow rule fails.
        assert_eq!(ints(&out, SCORE)[0], Some(0));
    }

    #[test]
    fn test_propagate_policy() {
        let out = pipeline(
            &fundamentals(vec![10.0, -5.0, 3.0, 3.0, 3.0]),
            MissingHistoryPolicy::Propagate,
        );
        assert_eq!(ints(&out, "CR1")[4], Some(1));
        assert_eq!(ints(&out, "CR3")[4], None);
        assert_eq!(ints(&out, SCORE)[4], None);
        assert_eq!(ints(&out, "CR1")[0], None);
    }

    #[test]
    fn test_score_is_sum_of_rules() {
        let out = pipeline(
            &fundamentals(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0, 7.0, 8.0, 9.0, 1.0]),
            MissingHistoryPolicy::Fail,
        );
        for row in 0..out.height() {
            let total: i32 = RULES.iter().map(|r| ints(&out, r)[row].unwrap()).sum();
            let score = ints(&out, SCORE)[row].unwrap();
            assert_eq!(score, total);
            assert!((0..=9).contains(&score));
        }
    }

    #[test]
    fn test_ratios_and_zero_denominator() {
        let mut df = fundamentals(vec![1.0; 5]);
        df.with_column(Series::new("minorityInterest".into(), vec![0.0, 0.0, 0.0, 0.0, 300.0]))
            .unwrap();
        let out = PiotroskiInputs.run(&TrailingTwelveMonths::default().run(&df).unwrap()).unwrap();

        let roa = out.column("returnOnAssets").unwrap().f64().unwrap();
        assert_eq!(roa.get(3), None);
        assert_eq!(roa.get(4), Some(4.0 / 500.0));
        let quick = out.column("quickRatio").unwrap().f64().unwrap();
        assert_eq!(quick.get(0), Some(1.0));
        let current = out.column("currentRatio").unwrap().f64().unwrap();
        assert_eq!(current.get(4), None);
    }

    #[test]
    fn test_policy_serde() {
        let policy: MissingHistoryPolicy = serde_json::from_str("\"fail\"").unwrap();
        assert_eq!(policy, MissingHistoryPolicy::Fail);
        assert_eq!(MissingHistoryPolicy::default(), MissingHistoryPolicy::Fail);
    }
}
