//! Quarterly EPS growth ABT built from income statements.

use super::{apply_stages, feature_range, finalize, join_lookups, load_lookup, load_panel};
use crate::{
    AbtConfig, AbtInfo, Assembler, Frequency, Result, TableSource,
    panel::{DATE, FIRST_LAST_FLAG, MAX_NLAG, NLAG, SYMBOL, filter_dates},
    quality::NotNullFlag,
    ratio::{ChainedGrowth, GrowthStage},
    schema::{ColumnSpec, names},
    window::{MetricHistory, PeriodDuration},
};
use polars::prelude::*;
use tracing::info;

const INCOME_COLUMNS: [ColumnSpec; 9] = [
    ColumnSpec::required("symbol"),
    ColumnSpec::required("date"),
    ColumnSpec::optional("date_qtr"),
    ColumnSpec::optional("fiscal_qtr"),
    ColumnSpec::renamed("eps_qtr", "eps_0_1q"),
    ColumnSpec::optional("numShares"),
    ColumnSpec::optional_renamed("revenue", "rev_0_1q"),
    ColumnSpec::optional_renamed("netIncome", "netInc_0_1q"),
    ColumnSpec::optional_renamed("netIncomeRatio", "netIncRatio_0_1q"),
];

const COMPANY_COLUMNS: [ColumnSpec; 7] = [
    ColumnSpec::required("symbol"),
    ColumnSpec::optional("sector"),
    ColumnSpec::optional("industry"),
    ColumnSpec::optional("ipo_date"),
    ColumnSpec::optional("mktCap"),
    ColumnSpec::optional("companyName"),
    ColumnSpec::optional("description"),
];

const LEADING: [&str; 27] = [
    SYMBOL,
    DATE,
    "date_qtr",
    "fiscal_qtr",
    "numShares",
    NLAG,
    MAX_NLAG,
    FIRST_LAST_FLAG,
    "dqPass_flag",
    "days_0_1y",
    "days_1_2y",
    "eps_pctChg_0_1q",
    "eps_pctChg_4_5q",
    "eps_pctChg_0_5q",
    "eps_pctChg_0_1y",
    "eps_pctChg_1_2y",
    "eps_pctChg_0_2y",
    "eps_0_1q",
    "eps_4_5q",
    "eps_8_9q",
    "eps_0_1y",
    "eps_1_2y",
    "eps_2_3y",
    "rev_0_1q",
    "netInc_0_1q",
    "sector",
    "industry",
];

/// Quarterly EPS with one- and two-year growth.
///
/// `eps_pctChg_0_5q` chains the latest two same-quarter year-over-year
/// changes; `eps_pctChg_0_2y` chains the latest two trailing-year changes.
/// `dqPass_flag` is true when both are present.
#[derive(Debug, Clone)]
pub struct IncomeStatementAbt {
    income: TableSource,
    company: Option<TableSource>,
    config: AbtConfig,
}

impl IncomeStatementAbt {
    /// Registry metadata.
    pub const INFO: AbtInfo = AbtInfo {
        name: "income_statement",
        description: "Quarterly EPS history with same-quarter and trailing-year growth",
        frequency: Frequency::Quarterly,
        inputs: &["income_statement", "company_overview"],
        default_buffer_years: 3,
    };

    /// EPS ABT over a quarterly income-statement table with an `eps_qtr` column.
    pub fn new(income: impl Into<TableSource>, config: AbtConfig) -> Self {
        Self {
            income: income.into(),
            company: None,
            config,
        }
    }

    /// Add sector, industry, IPO date, market cap, name and description.
    pub fn with_company(mut self, company: impl Into<TableSource>) -> Self {
        self.company = Some(company.into());
        self
    }
}

impl Assembler for IncomeStatementAbt {
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
        let company = load_lookup(
            self.company.as_ref(),
            "company_overview",
            &[SYMBOL],
            &COMPANY_COLUMNS,
        )?;

        let panel = apply_stages(
            filter_dates(income.lazy(), &buffered),
            &[
                &MetricHistory::new("eps", Frequency::Quarterly)
                    .with_lags([4, 8])
                    .with_years(3),
                &GrowthStage::new("eps", "pctChg", Frequency::Quarterly)
                    .with_period_offsets([0, 4])
                    .with_year_offsets([0, 1]),
                &ChainedGrowth::new("eps_pctChg_0_5q", ["eps_pctChg_0_1q", "eps_pctChg_4_5q"]),
                &ChainedGrowth::new("eps_pctChg_0_2y", ["eps_pctChg_0_1y", "eps_pctChg_1_2y"]),
                &NotNullFlag::new("dqPass_flag", ["eps_pctChg_0_5q", "eps_pctChg_0_2y"]),
                &PeriodDuration,
            ],
        )?;
        let panel = join_lookups(panel, &[&company])?;

        let mut leading = names(&LEADING);
        leading.extend(names(&["ipo_date", "mktCap", "companyName", "description"]));
        let table = finalize(panel, &range, &leading, &[])?;

        info!(abt = Self::INFO.name, rows = table.height(), "Assembled income-statement ABT");
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    fn income() -> DataFrame {
        let mut dates: Vec<String> = (0..12)
            .map(|i| {
                let (month, day) = [(3, 31), (6, 30), (9, 30), (12, 31)][i % 4];
                format!("{}-{month:02}-{day}", 2019 + i / 4)
            })
            .collect();
        dates.push("2021-12-31".to_string());
        let mut symbols = vec!["AA"; 12];
        symbols.push("BB");

        df![
            "symbol" => symbols,
            "date" => dates,
            "eps_qtr" => [1.0, 1.0, 1.0, 1.0, 2.0, 2.0, 2.0, 2.0, 3.0, 3.0, 3.0, 3.0, 0.7],
            "revenue" => vec![100.0; 13],
            "numShares" => vec![10.0; 13]
        ]
        .unwrap()
    }

    fn value(df: &DataFrame, name: &str, row: usize) -> Option<f64> {
        df.column(name).unwrap().f64().unwrap().get(row)
    }

    #[test]
    fn test_eps_growth() {
        let table = IncomeStatementAbt::new(income(), AbtConfig::default())
            .assemble()
            .unwrap();
        assert_eq!(table.height(), 13);

        assert_relative_eq!(value(&table, "eps_pctChg_0_1q", 11).unwrap(), 0.5);
        assert_relative_eq!(value(&table, "eps_pctChg_4_5q", 11).unwrap(), 1.0);
        assert_relative_eq!(
            value(&table, "eps_pctChg_0_5q", 11).unwrap(),
            3.0_f64.sqrt() - 1.0,
            epsilon = 1e-12
        );
        assert_eq!(value(&table, "eps_2_3y", 11), Some(4.0));
        assert_relative_eq!(
            value(&table, "eps_pctChg_0_2y", 11).unwrap(),
            3.0_f64.sqrt() - 1.0,
            epsilon = 1e-12
        );

        let flag = table.column("dqPass_flag").unwrap().bool().unwrap();
        assert_eq!(flag.get(11), Some(true));
        assert_eq!(flag.get(10), Some(false));
        assert_eq!(flag.get(12), Some(false));

        let names = table.get_column_names();
        assert_eq!(names[2].as_str(), "numShares");
        assert_eq!(names[3].as_str(), "nlag");
        assert!(table.column("rev_0_1q").is_ok());
    }

    #[test]
    fn test_company_overview() {
        let company = df![
            "symbol" => ["AA"],
            "sector" => ["Tech"],
            "companyName" => ["Alpha"],
            "ceo" => ["someone"]
        ]
        .unwrap();
        let config = AbtConfig::default().with_dates("2021-01-01", "");
        let table = IncomeStatementAbt::new(income(), config)
            .with_company(company)
            .assemble()
            .unwrap();

        assert_eq!(table.height(), 5);
        assert!(table.column("ceo").is_err());
        let name = table.column("companyName").unwrap().str().unwrap();
        assert_eq!(name.get(0), Some("Alpha"));
        assert_eq!(name.get(4), None);
        assert_relative_eq!(value(&table, "eps_pctChg_0_1q", 0).unwrap(), 0.5);
    }
}
