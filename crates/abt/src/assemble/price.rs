//! Monthly price ABT.

use super::{SEQUENCE_LEADING, apply_stages, feature_range, join_lookups, load_lookup, load_panel};
use crate::{
    AbtConfig, AbtInfo, Assembler, Frequency, Result, TableSource,
    panel::{DATE, SYMBOL, check_unique_keys, filter_dates, sort_panel, with_sequence},
    ratio::{DividendHistory, PriceReturns},
    schema::{ColumnSpec, names, order_columns, require_columns},
    window::lag,
};
use polars::prelude::*;
use tracing::{debug, info};

/// Lag horizons, in months, of the `date_{k}m` columns.
pub const DATE_LAGS: [usize; 8] = [1, 3, 6, 8, 9, 12, 14, 15];

const COMPANY_COLUMNS: [ColumnSpec; 4] = [
    ColumnSpec::required("symbol"),
    ColumnSpec::optional("sector"),
    ColumnSpec::optional("industry"),
    ColumnSpec::optional("ipo_date"),
];

/// Monthly price statistics per symbol.
///
/// # Required Columns
/// - `symbol`, `date`
/// - `adj_close`: adjusted close price
/// - `div_amount`: dividend paid in the month
///
/// Every other input column is carried through. Dates are moved to the last
/// day of their month and an incomplete trailing month is dropped.
///
/// # Output Columns
/// Lagged dates `date_{k}m`, dividend history, returns, volatility, Sharpe
/// ratios, `data_years`, `year`, per-symbol `min_date`, `max_date` and
/// `max_data_years`, and the sequence columns.
#[derive(Debug, Clone)]
pub struct PriceAbt {
    prices: TableSource,
    company: Option<TableSource>,
    etf_info: Option<TableSource>,
    config: AbtConfig,
}

impl PriceAbt {
    /// Registry metadata.
    pub const INFO: AbtInfo = AbtInfo {
        name: "price",
        description: "Monthly returns, volatility, Sharpe ratios and dividend history",
        frequency: Frequency::Monthly,
        inputs: &["prices", "company_overview", "etf_info"],
        default_buffer_years: 7,
    };

    /// Price ABT over a monthly price panel.
    pub fn new(prices: impl Into<TableSource>, config: AbtConfig) -> Self {
        Self {
            prices: prices.into(),
            company: None,
            etf_info: None,
            config,
        }
    }

    /// Add sector, industry and IPO date by symbol.
    pub fn with_company(mut self, company: impl Into<TableSource>) -> Self {
        self.company = Some(company.into());
        self
    }

    /// Add every ETF info column by symbol.
    pub fn with_etf_info(mut self, etf_info: impl Into<TableSource>) -> Self {
        self.etf_info = Some(etf_info.into());
        self
    }
}

/// Move dates to the last day of their month.
///
/// A month that ends after the latest observed date is incomplete and its rows
/// are dropped.
fn snap_to_month_end(prices: LazyFrame) -> LazyFrame {
    let month_end = col(DATE).dt().month_end();
    prices
        .filter(month_end.clone().lt_eq(col(DATE).max()))
        .with_column(month_end.alias(DATE))
}

impl Assembler for PriceAbt {
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

        let prices = load_panel(&self.prices, "prices", &[], &config.symbols)?;
        require_columns(&prices, "prices", &["adj_close", "div_amount"])?;
        let observed = prices.height();
        let prices = snap_to_month_end(prices.lazy()).collect()?;
        debug!(dropped = observed - prices.height(), "Dropped incomplete trailing month");
        check_unique_keys(&prices, "prices", &[SYMBOL, DATE])?;

        let company = load_lookup(
            self.company.as_ref(),
            "company_overview",
            &[SYMBOL],
            &COMPANY_COLUMNS,
        )?;
        let etf_info = load_lookup(self.etf_info.as_ref(), "etf_info", &[SYMBOL], &[])?;

        let panel = with_sequence(sort_panel(filter_dates(prices.lazy(), &buffered)));
        let panel = panel.with_columns(
            DATE_LAGS
                .iter()
                .map(|k| lag(DATE, *k).alias(format!("date_{k}m")))
                .collect::<Vec<_>>(),
        );
        let panel = apply_stages(panel, &[&DividendHistory::default(), &PriceReturns::default()])?;
        let panel = join_lookups(panel, &[&company, &etf_info])?;

        let table = with_sequence(sort_panel(filter_dates(panel, &range)))
            .with_columns([
                col(DATE).dt().year().alias("year"),
                col(DATE).min().over([col(SYMBOL)]).alias("min_date"),
                col(DATE).max().over([col(SYMBOL)]).alias("max_date"),
                col("data_years").max().over([col(SYMBOL)]).alias("max_data_years"),
            ])
            .collect()?;

        let mut leading = names(&[SYMBOL, DATE, "year"]);
        leading.extend(names(&SEQUENCE_LEADING));
        let trailing: Vec<String> = [&company, &etf_info]
            .into_iter()
            .flatten()
            .flat_map(|lookup| lookup.value_columns())
            .collect();
        let table = order_columns(&table, &leading, &trailing)?;

        info!(abt = Self::INFO.name, rows = table.height(), "Assembled price ABT");
        Ok(table)
    }
}
