//! Quarterly Piotroski F-Score ABT.

use super::{apply_stages, feature_range, finalize, join_lookups, load_lookup, load_panel};
use crate::{
    AbtConfig, AbtInfo, Assembler, Frequency, Result, TableSource,
    panel::{DATE, FIRST_LAST_FLAG, MAX_NLAG, NLAG, REVERSE_NLAG, SYMBOL, filter_dates},
    piotroski::{LAG_SUFFIX, PiotroskiInputs, PiotroskiScorer, RULES, SCORE, TrailingTwelveMonths},
    schema::{ColumnSpec, names},
};
use polars::prelude::*;
use tracing::{debug, info};

const INCOME_COLUMNS: [ColumnSpec; 6] = [
    ColumnSpec::required("symbol"),
    ColumnSpec::required("date"),
    ColumnSpec::required("netIncome"),
    ColumnSpec::required("numShares"),
    ColumnSpec::required("revenue"),
    ColumnSpec::required("grossProfitRatio"),
];

const BALANCE_COLUMNS: [ColumnSpec; 10] = [
    ColumnSpec::required("symbol"),
    ColumnSpec::required("date"),
    ColumnSpec::required("totalAssets"),
    ColumnSpec::required("longTermDebt"),
    ColumnSpec::required("totalLiabilities"),
    ColumnSpec::required("minorityInterest"),
    ColumnSpec::required("cashAndCashEquivalents"),
    ColumnSpec::required("shortTermInvestments"),
    ColumnSpec::required("netReceivables"),
    ColumnSpec::required("totalCurrentLiabilities"),
];

const CASHFLOW_COLUMNS: [ColumnSpec; 3] = [
    ColumnSpec::required("symbol"),
    ColumnSpec::required("date"),
    ColumnSpec::required("operatingCashFlow"),
];

/// Piotroski F-Score per symbol and quarter.
///
/// Flows (`netIncome`, `revenue`, `operatingCashFlow`) are replaced by their
/// trailing four-quarter sums before the rules are evaluated, so the first
/// three records of a symbol never score on profitability. The prior-year
/// helper columns are not part of the output.
///
/// # Output Columns
/// Statement inputs, `returnOnAssets`, `currentRatio`, `assetTurnover`,
/// `quickRatio`, `longTermDebtToTotalAssetsRatio`, `Piotroski_Score`,
/// `CR1`..`CR9` and the sequence columns.
#[derive(Debug, Clone)]
pub struct PiotroskiAbt {
    income: TableSource,
    balance: TableSource,
    cashflow: TableSource,
    config: AbtConfig,
}

impl PiotroskiAbt {
    /// Registry metadata.
    pub const INFO: AbtInfo = AbtInfo {
        name: "piotroski",
        description: "Piotroski F-Score and its nine rules from quarterly statements",
        frequency: Frequency::Quarterly,
        inputs: &["income_statement", "balance_sheet", "cash_flow"],
        default_buffer_years: 3,
    };

    /// Score ABT over the three quarterly statements.
    pub fn new(
        income: impl Into<TableSource>,
        balance: impl Into<TableSource>,
        cashflow: impl Into<TableSource>,
        config: AbtConfig,
    ) -> Self {
        Self {
            income: income.into(),
            balance: balance.into(),
            cashflow: cashflow.into(),
            config,
        }
    }
}

fn without_lag_columns(panel: LazyFrame) -> Result<LazyFrame> {
    let mut panel = panel;
    let schema = panel.collect_schema()?;
    let kept: Vec<Expr> = schema
        .iter_names()
        .filter(|name| !name.ends_with(LAG_SUFFIX))
        .map(|name| col(name.clone()))
        .collect();
    debug!(dropped = schema.len() - kept.len(), "Dropping prior-year helper columns");
    Ok(panel.select(kept))
}

impl Assembler for PiotroskiAbt {
    fn info(&self) -> &AbtInfo {
        &Self::INFO
    }

    fn config(&self) -> &AbtConfig {
        &self.config
    }

    fn assemble(&self) -> Result<DataFrame> {
        let config = &self.config;
        let range = config.date_range()?;
        let buffered = feature_range(
            &range,
            config.buffer_years_or(Self::INFO.default_buffer_years),
        );

        let income = load_panel(
            &self.income,
            "income_statement",
            &INCOME_COLUMNS,
            &config.symbols,
        )?;
        let balance = load_lookup(
            Some(&self.balance),
            "balance_sheet",
            &[SYMBOL, DATE],
            &BALANCE_COLUMNS,
        )?;
        let cashflow = load_lookup(
            Some(&self.cashflow),
            "cash_flow",
            &[SYMBOL, DATE],
            &CASHFLOW_COLUMNS,
        )?;

        let panel = join_lookups(filter_dates(income.lazy(), &buffered), &[&balance, &cashflow])?;
        let panel = apply_stages(
            panel,
            &[
                &TrailingTwelveMonths::default(),
                &PiotroskiInputs,
                &PiotroskiScorer::new(config.piotroski_policy),
            ],
        )?;
        let panel = without_lag_columns(panel)?;

        let mut leading = names(&[
            SYMBOL,
            DATE,
            NLAG,
            REVERSE_NLAG,
            MAX_NLAG,
            FIRST_LAST_FLAG,
            SCORE,
        ]);
        leading.extend(names(&RULES));
        let table = finalize(panel, &range, &leading, &[])?;

        info!(
            abt = Self::INFO.name,
            rows = table.height(),
            policy = ?config.piotroski_policy,
            "Assembled Piotroski ABT"
        );
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::MissingHistoryPolicy;

    const DATES: [&str; 5] = ["2022-03-31", "2022-06-30", "2022-09-30", "2022-12-31", "2023-03-31"];

    fn income() -> DataFrame {
        df![
            "symbol" => ["AA"; 5],
            "date" => DATES,
            "netIncome" => [10.0, -5.0, 3.0, 3.0, 3.0],
            "numShares" => [100.0; 5],
            "revenue" => [50.0; 5],
            "grossProfitRatio" => [0.4; 5]
        ]
        .unwrap()
    }

    fn balance() -> DataFrame {
        df![
            "symbol" => ["AA"; 5],
            "date" => DATES,
            "totalAssets" => [1000.0; 5],
            "longTermDebt" => [200.0; 5],
            "totalLiabilities" => [500.0; 5],
            "minorityInterest" => [0.0; 5],
            "cashAndCashEquivalents" => [50.0; 5],
            "shortTermInvestments" => [10.0; 5],
            "netReceivables" => [40.0; 5],
            "totalCurrentLiabilities" => [100.0; 5]
        ]
        .unwrap()
    }

    fn cashflow() -> DataFrame {
        df![
            "symbol" => ["AA"; 5],
            "date" => DATES,
            "operatingCashFlow" => [5.0; 5]
        ]
        .unwrap()
    }

    #[test]
    fn test_piotroski_abt() {
        let table = PiotroskiAbt::new(income(), balance(), cashflow(), AbtConfig::default())
            .assemble()
            .unwrap();

        assert_eq!(table.height(), 5);
        let ttm = table.column("netIncome").unwrap().f64().unwrap();
        assert_eq!(ttm.get(2), None);
        assert_eq!(ttm.get(4), Some(4.0));

        let cr1 = table.column("CR1").unwrap().i32().unwrap();
        let cr3 = table.column("CR3").unwrap().i32().unwrap();
        assert_eq!(cr1.get(4), Some(1));
        assert_eq!(cr3.get(4), Some(0));

        let score = table.column(SCORE).unwrap().i32().unwrap();
        assert!(score.into_iter().all(|s| matches!(s, Some(0..=9))));

        let names = table.get_column_names();
        assert!(names.iter().all(|n| !n.ends_with(LAG_SUFFIX)));
        assert_eq!(names[2].as_str(), "nlag");
        assert_eq!(names[6].as_str(), SCORE);
        assert_eq!(names[15].as_str(), "CR9");
        assert!(table.column("quickRatio").is_ok());
    }

    #[test]
    fn test_propagate_policy_nulls_short_history() {
        let config = AbtConfig {
            piotroski_policy: MissingHistoryPolicy::Propagate,
            ..AbtConfig::default()
        };
        let table = PiotroskiAbt::new(income(), balance(), cashflow(), config)
            .assemble()
            .unwrap();
        let score = table.column(SCORE).unwrap().i32().unwrap();
        assert_eq!(score.get(0), None);
    }

    #[test]
    fn test_min_date_keeps_history() {
        let config = AbtConfig::default().with_dates("2023-01-01", "");
        let table = PiotroskiAbt::new(income(), balance(), cashflow(), config)
            .assemble()
            .unwrap();
        assert_eq!(table.height(), 1);
        let ttm = table.column("netIncome").unwrap().f64().unwrap();
        assert_eq!(ttm.get(0), Some(4.0));
    }
}
