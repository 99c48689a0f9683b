//! Quarterly key-metric ABT.

use super::{
    SEQUENCE_LEADING, apply_stages, drop_incomplete_latest, feature_range, finalize, join_lookups,
    load_lookup, load_panel, with_calendar,
};
use crate::{
    AbtConfig, AbtInfo, Assembler, Frequency, Result, Stage, TableSource,
    enrich::Lookup,
    panel::{DATE, SYMBOL, filter_dates, sort_panel},
    piotroski::{RULES, SCORE},
    quality::DataQualityFlags,
    ratio::GrowthStage,
    schema::{ColumnSpec, names, select_columns},
    window::{MetricHistory, PeriodDuration, period_column, year_column},
};
use polars::prelude::*;
use tracing::{debug, info};

/// Per-share metrics with full lag, bucket and growth history.
pub const METRICS: [&str; 3] = ["RPS", "NIPS", "BVPS"];

const KEY_METRIC_COLUMNS: [ColumnSpec; 18] = [
    ColumnSpec::required("symbol"),
    ColumnSpec::required("date"),
    ColumnSpec::optional("date_qtr"),
    ColumnSpec::optional("fiscal_year"),
    ColumnSpec::optional("fiscal_qtr"),
    ColumnSpec::optional_renamed("peRatio", "PE_0_1q"),
    ColumnSpec::renamed("revenuePerShare", "RPS_0_1q"),
    ColumnSpec::renamed("netIncomePerShare", "NIPS_0_1q"),
    ColumnSpec::optional_renamed("cashPerShare", "CPS_0_1q"),
    ColumnSpec::optional_renamed("freeCashFlowPerShare", "FCPS_0_1q"),
    ColumnSpec::renamed("bookValuePerShare", "BVPS_0_1q"),
    ColumnSpec::optional_renamed("shareholdersEquityPerShare", "SEPS_0_1q"),
    ColumnSpec::optional_renamed("interestDebtPerShare", "IDPS_0_1q"),
    ColumnSpec::optional_renamed("debtToEquity", "DtoE"),
    ColumnSpec::optional_renamed("debtToAssets", "DtoA"),
    ColumnSpec::optional("earningsYield"),
    ColumnSpec::optional("freeCashFlowYield"),
    ColumnSpec::optional_renamed("admin_runDate", "admin_runDate_km"),
];

const COMPANY_COLUMNS: [ColumnSpec; 10] = [
    ColumnSpec::required("symbol"),
    ColumnSpec::optional("sector"),
    ColumnSpec::optional("industry"),
    ColumnSpec::optional("ipo_date"),
    ColumnSpec::optional_renamed("companyName", "name"),
    ColumnSpec::optional_renamed("description", "desc"),
    ColumnSpec::optional_renamed("beta", "curr_beta"),
    ColumnSpec::optional_renamed("volAvg", "curr_volAvg"),
    ColumnSpec::optional_renamed("mktCap", "curr_mktCap"),
    ColumnSpec::optional("isActivelyTrading"),
];

const PRICE_RETURN_COLUMNS: [ColumnSpec; 3] = [
    ColumnSpec::required("symbol"),
    ColumnSpec::renamed("date_14m", "date"),
    ColumnSpec::required("r_1y"),
];

const TRAILING: [&str; 4] = ["date_qtr", "year_char", "month_char", "admin_runDate_km"];

/// Quarterly per-share metrics with their history and growth.
///
/// # Required Columns
/// - `symbol`, `date`
/// - `revenuePerShare`, `netIncomePerShare`, `bookValuePerShare`
///
/// Other per-share and leverage columns are taken when present, under short
/// names (`peRatio` becomes `PE_0_1q`, `debtToEquity` becomes `DtoE`).
///
/// A symbol's latest record is dropped when RPS, NIPS or BVPS is missing, or
/// RPS or BVPS is zero.
///
/// # Output Columns
/// For each of RPS, NIPS and BVPS: quarter lags `_1_2q` to `_8_9q`, quarterly
/// changes `_pc_0_1q` to `_pc_4_5q`, year buckets `_0_1y` to `_3_4y` and
/// yearly changes `_pc_0_1y` to `_pc_2_3y`. Also the `dqPass_*` flags,
/// `days_0_1y`, `days_1_2y`, calendar helpers and sequence columns.
///
/// Optional enrichments: company overview by symbol, Piotroski scores by
/// `(symbol, date)`, and the forward one-year return `r_1y` from a price ABT,
/// matched where the price row's `date_14m` equals the report date. The
/// overview's `beta`, `volAvg` and `mktCap` describe the company today and
/// get a `curr_` prefix; `companyName` and `description` become `name` and
/// `desc`.
#[derive(Debug, Clone)]
pub struct KeyMetricAbt {
    key_metrics: TableSource,
    company: Option<TableSource>,
    piotroski: Option<TableSource>,
    price_returns: Option<TableSource>,
    config: AbtConfig,
}

impl KeyMetricAbt {
    /// Registry metadata.
    pub const INFO: AbtInfo = AbtInfo {
        name: "key_metrics",
        description: "Per-share metric history, growth and data-quality flags",
        frequency: Frequency::Quarterly,
        inputs: &["key_metrics", "company_overview", "piotroski_scores", "price_abt"],
        default_buffer_years: 4,
    };

    /// Key-metric ABT over a quarterly key-metrics table.
    pub fn new(key_metrics: impl Into<TableSource>, config: AbtConfig) -> Self {
        Self {
            key_metrics: key_metrics.into(),
            company: None,
            piotroski: None,
            price_returns: None,
            config,
        }
    }

    /// Add sector, industry, IPO date, name, description, current beta,
    /// volume and market cap, and trading status by symbol.
    pub fn with_company(mut self, company: impl Into<TableSource>) -> Self {
        self.company = Some(company.into());
        self
    }

    /// Add `Piotroski_Score` and `CR1`..`CR9` by `(symbol, date)`.
    pub fn with_piotroski(mut self, scores: impl Into<TableSource>) -> Self {
        self.piotroski = Some(scores.into());
        self
    }

    /// Add the forward one-year return from a price ABT.
    pub fn with_price_returns(mut self, price_abt: impl Into<TableSource>) -> Self {
        self.price_returns = Some(price_abt.into());
        self
    }
}

fn piotroski_columns() -> Vec<ColumnSpec> {
    let mut specs = vec![
        ColumnSpec::required(SYMBOL),
        ColumnSpec::required(DATE),
        ColumnSpec::required(SCORE),
    ];
    specs.extend(RULES.iter().map(|rule| ColumnSpec::required(*rule)));
    specs
}

/// Rows of a price ABT without a 14-month lagged date cannot be matched and
/// are dropped before keys are checked.
fn load_price_lookup(source: Option<&TableSource>) -> Result<Option<Lookup>> {
    let Some(source) = source else {
        return Ok(None);
    };
    let df = select_columns(&source.load()?, "price_abt", &PRICE_RETURN_COLUMNS)?;
    let df = df.lazy().filter(col(DATE).is_not_null()).collect()?;
    debug!(rows = df.height(), "Price returns with a lagged date");
    Lookup::all_columns("price_abt", &df, &[SYMBOL, DATE]).map(Some)
}

fn metric_columns(metric: &str) -> Vec<String> {
    let q = Frequency::Quarterly;
    let pc = format!("{metric}_pc");
    let mut columns: Vec<String> = (0..=8).map(|k| period_column(metric, k, q)).collect();
    columns.extend((0..5).map(|k| period_column(&pc, k, q)));
    columns.extend((0..4).map(|k| year_column(metric, k)));
    columns.extend((0..3).map(|k| year_column(&pc, k)));
    columns
}

fn leading_columns() -> Vec<String> {
    let mut leading = names(&[SYMBOL, DATE, "year", "fiscal_year", "fiscal_qtr"]);
    leading.extend(names(&SEQUENCE_LEADING));
    leading.extend(names(&[
        "dqPass_notNull",
        "dqPass_limits",
        "dqPass_pc",
        "days_0_1y",
        "days_1_2y",
        "r_1y",
    ]));
    for metric in METRICS {
        leading.extend(metric_columns(metric));
    }
    leading.extend(COMPANY_COLUMNS[1..].iter().map(|spec| spec.alias.to_string()));
    leading
}

impl Assembler for KeyMetricAbt {
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

        let metrics = load_panel(
            &self.key_metrics,
            "key_metrics",
            &KEY_METRIC_COLUMNS,
            &config.symbols,
        )?;
        let company = load_lookup(
            self.company.as_ref(),
            "company_overview",
            &[SYMBOL],
            &COMPANY_COLUMNS,
        )?;
        let piotroski = load_lookup(
            self.piotroski.as_ref(),
            "piotroski_scores",
            &[SYMBOL, DATE],
            &piotroski_columns(),
        )?;
        let price_returns = load_price_lookup(self.price_returns.as_ref())?;

        let panel = drop_incomplete_latest(
            with_calendar(metrics.lazy()),
            &["RPS_0_1q", "NIPS_0_1q", "BVPS_0_1q"],
            &["RPS_0_1q", "BVPS_0_1q"],
        );
        let panel = sort_panel(filter_dates(panel, &buffered));

        let histories: Vec<MetricHistory> = METRICS
            .iter()
            .map(|m| MetricHistory::quarterly(*m))
            .collect();
        let growth: Vec<GrowthStage> = METRICS
            .iter()
            .map(|m| {
                GrowthStage::new(*m, "pc", Frequency::Quarterly)
                    .with_period_offsets(0..5)
                    .with_year_offsets(0..3)
            })
            .collect();
        let flags = DataQualityFlags::key_metrics();

        let mut stages: Vec<&dyn Stage> = Vec::new();
        stages.extend(histories.iter().map(|s| s as &dyn Stage));
        stages.extend(growth.iter().map(|s| s as &dyn Stage));
        stages.push(&flags);
        stages.push(&PeriodDuration);

        let panel = apply_stages(panel, &stages)?;
        let panel = join_lookups(panel, &[&company, &piotroski, &price_returns])?;

        let table = finalize(panel, &range, &leading_columns(), &names(&TRAILING))?;
        info!(abt = Self::INFO.name, rows = table.height(), "Assembled key-metric ABT");
        Ok(table)
    }
}
