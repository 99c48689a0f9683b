//! Quarterly financial-statement ABT.

use super::{
    SEQUENCE_LEADING, feature_range, finalize, join_lookups, load_lookup, load_panel, with_calendar,
};
use crate::{
    AbtConfig, AbtInfo, Assembler, Frequency, Result, TableSource,
    panel::{DATE, SYMBOL, filter_dates},
    schema::{ColumnSpec, names},
};
use polars::prelude::*;
use tracing::info;

const INCOME_COLUMNS: [ColumnSpec; 14] = [
    ColumnSpec::required("symbol"),
    ColumnSpec::required("date"),
    ColumnSpec::optional("fiscal_year"),
    ColumnSpec::optional("fiscal_qtr"),
    ColumnSpec::optional("reportedCurrency"),
    ColumnSpec::optional("numShares"),
    ColumnSpec::required("revenue"),
    ColumnSpec::required("netIncome"),
    ColumnSpec::optional("netIncomeRatio"),
    ColumnSpec::optional_renamed("eps", "eps_qtr"),
    ColumnSpec::optional_renamed("epsdiluted", "epsDiluted_qtr"),
    ColumnSpec::optional("url_SEC"),
    ColumnSpec::optional("url_10K"),
    ColumnSpec::optional_renamed("admin_runDate", "admin_runDate_is"),
];

const BALANCE_COLUMNS: [ColumnSpec; 7] = [
    ColumnSpec::required("symbol"),
    ColumnSpec::required("date"),
    ColumnSpec::required("totalAssets"),
    ColumnSpec::required("totalLiabilities"),
    ColumnSpec::optional("totalDebt"),
    ColumnSpec::optional("netDebt"),
    ColumnSpec::optional_renamed("admin_runDate", "admin_runDate_bs"),
];

const CASHFLOW_COLUMNS: [ColumnSpec; 10] = [
    ColumnSpec::required("symbol"),
    ColumnSpec::required("date"),
    ColumnSpec::optional("inventory"),
    ColumnSpec::optional("debtRepayment"),
    ColumnSpec::optional("commonStockIssued"),
    ColumnSpec::optional("commonStockRepurchased"),
    ColumnSpec::required("operatingCashFlow"),
    ColumnSpec::optional("capitalExpenditure"),
    ColumnSpec::optional("freeCashFlow"),
    ColumnSpec::optional_renamed("admin_runDate", "admin_runDate_cf"),
];

const COMPANY_COLUMNS: [ColumnSpec; 5] = [
    ColumnSpec::required("symbol"),
    ColumnSpec::optional("sector"),
    ColumnSpec::optional("industry"),
    ColumnSpec::optional("ipo_date"),
    ColumnSpec::optional("isActivelyTrading"),
];

const TRAILING: [&str; 7] = [
    "year_char",
    "month_char",
    "url_SEC",
    "url_10K",
    "admin_runDate_is",
    "admin_runDate_bs",
    "admin_runDate_cf",
];

/// Income statement, balance sheet and cash flow side by side.
///
/// The income statement is the primary panel. Balance-sheet and cash-flow
/// rows are matched on `(symbol, date)`; reports without a matching
/// statement keep nulls.
#[derive(Debug, Clone)]
pub struct FinStatementAbt {
    income: TableSource,
    balance: TableSource,
    cashflow: TableSource,
    company: Option<TableSource>,
    config: AbtConfig,
}

impl FinStatementAbt {
    /// Registry metadata.
    pub const INFO: AbtInfo = AbtInfo {
        name: "fin_statement",
        description: "Merged quarterly income statement, balance sheet and cash flow",
        frequency: Frequency::Quarterly,
        inputs: &["income_statement", "balance_sheet", "cash_flow", "company_overview"],
        default_buffer_years: 0,
    };

    /// Statement ABT over the three quarterly statements.
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
            company: None,
            config,
        }
    }

    /// Add sector, industry, IPO date and trading status by symbol.
    pub fn with_company(mut self, company: impl Into<TableSource>) -> Self {
        self.company = Some(company.into());
        self
    }
}

impl Assembler for FinStatementAbt {
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
        let company = load_lookup(
            self.company.as_ref(),
            "company_overview",
            &[SYMBOL],
            &COMPANY_COLUMNS,
        )?;

        let panel = join_lookups(filter_dates(income.lazy(), &buffered), &[&balance, &cashflow])?;
        let panel = join_lookups(with_calendar(panel), &[&company])?;

        let mut leading = names(&[SYMBOL, DATE, "year", "fiscal_year", "fiscal_qtr"]);
        leading.extend(names(&SEQUENCE_LEADING));
        let table = finalize(panel, &range, &leading, &names(&TRAILING))?;

        info!(abt = Self::INFO.name, rows = table.height(), "Assembled financial-statement ABT");
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AbtError;
    use rstest::{fixture, rstest};

    #[fixture]
    fn income() -> DataFrame {
        df![
            "symbol" => ["AA", "AA", "AA", "BB"],
            "date" => ["2023-03-31", "2023-06-30", "2023-09-30", "2023-06-30"],
            "revenue" => [100.0, 110.0, 120.0, 50.0],
            "netIncome" => [10.0, 11.0, 12.0, -5.0],
            "url_SEC" => ["a", "b", "c", "d"],
            "admin_runDate" => ["2024-01-01"; 4]
        ]
        .unwrap()
    }

    fn balance() -> DataFrame {
        df![
            "symbol" => ["AA", "AA", "AA", "BB"],
            "date" => ["2023-03-31", "2023-06-30", "2023-09-30", "2023-06-30"],
            "totalAssets" => [1000.0, 1010.0, 1020.0, 300.0],
            "totalLiabilities" => [400.0, 410.0, 420.0, 200.0]
        ]
        .unwrap()
    }

    fn cashflow() -> DataFrame {
        df![
            "symbol" => ["AA", "BB"],
            "date" => ["2023-06-30", "2023-06-30"],
            "operatingCashFlow" => [15.0, 2.0],
            "admin_runDate" => ["2024-01-02"; 2]
        ]
        .unwrap()
    }

    #[rstest]
    fn test_statements_merged(income: DataFrame) {
        let table = FinStatementAbt::new(income, balance(), cashflow(), AbtConfig::default())
            .assemble()
            .unwrap();

        assert_eq!(table.height(), 4);
        let assets = table.column("totalAssets").unwrap().f64().unwrap();
        assert_eq!(assets.get(1), Some(1010.0));
        let ocf = table.column("operatingCashFlow").unwrap().f64().unwrap();
        assert_eq!(ocf.get(0), None);
        assert_eq!(ocf.get(1), Some(15.0));
        assert_eq!(ocf.get(3), Some(2.0));

        let names = table.get_column_names();
        assert_eq!(names[0].as_str(), "symbol");
        assert_eq!(names[3].as_str(), "max_nlag");
        assert_eq!(names[names.len() - 1].as_str(), "admin_runDate_cf");
        assert_eq!(names[names.len() - 2].as_str(), "admin_runDate_is");

        let flags = table.column("firstLast_flag").unwrap().str().unwrap();
        assert_eq!(flags.get(0), Some("F"));
        assert_eq!(flags.get(3), Some("L"));
        let month = table.column("month_char").unwrap().str().unwrap();
        assert_eq!(month.get(2), Some("Sep"));
    }

    #[rstest]
    fn test_date_range_and_symbols(income: DataFrame) {
        let config = AbtConfig::default()
            .with_symbols(["aa"])
            .with_dates("2023-04-01", "2023-09-30");
        let table = FinStatementAbt::new(income, balance(), cashflow(), config)
            .assemble()
            .unwrap();

        assert_eq!(table.height(), 2);
        let nlag = table.column("nlag").unwrap().i64().unwrap();
        assert_eq!(nlag.get(0), Some(0));
        let revenue = table.column("revenue").unwrap().f64().unwrap();
        assert_eq!(revenue.get(1), Some(120.0));
    }

    #[rstest]
    fn test_duplicate_balance_sheet(income: DataFrame) {
        let balance = df![
            "symbol" => ["AA", "AA"],
            "date" => ["2023-03-31", "2023-03-31"],
            "totalAssets" => [1.0, 2.0],
            "totalLiabilities" => [1.0, 2.0]
        ]
        .unwrap();
        let err = FinStatementAbt::new(income, balance, cashflow(), AbtConfig::default())
            .assemble()
            .unwrap_err();
        match err {
            AbtError::DuplicateKey { table, .. } => assert_eq!(table, "balance_sheet"),
            other => panic!("unexpected error: {other}"),
        }
    }
}
