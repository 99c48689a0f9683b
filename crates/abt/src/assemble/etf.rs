//! Monthly ETF ABT: a price ABT joined with the ETF company overview.

use super::{SEQUENCE_LEADING, finalize, join_lookups, load_lookup, load_panel};
use crate::{
    AbtConfig, AbtInfo, Assembler, Frequency, Result, TableSource,
    panel::{DATE, SYMBOL},
    schema::{ColumnSpec, names},
};
use polars::prelude::*;
use tracing::info;

const COMPANY_COLUMNS: [ColumnSpec; 9] = [
    ColumnSpec::required("symbol"),
    ColumnSpec::optional("sector"),
    ColumnSpec::optional("industry"),
    ColumnSpec::optional("exchange"),
    ColumnSpec::optional_renamed("beta", "curr_beta"),
    ColumnSpec::optional_renamed("volAvg", "curr_volAvg"),
    ColumnSpec::optional_renamed("mktCap", "curr_mktCap"),
    ColumnSpec::optional("isActivelyTrading"),
    ColumnSpec::optional_renamed("admin_runDate", "company_admin_runDate"),
];

/// ETF price statistics with the current company overview.
///
/// The input is a table produced by [`PriceAbt`](crate::PriceAbt). The
/// overview's `beta`, `volAvg` and `mktCap` describe the ETF today and are
/// renamed with a `curr_` prefix.
#[derive(Debug, Clone)]
pub struct EtfAbt {
    price_abt: TableSource,
    company: Option<TableSource>,
    config: AbtConfig,
}

impl EtfAbt {
    /// Registry metadata.
    pub const INFO: AbtInfo = AbtInfo {
        name: "etf",
        description: "ETF price ABT enriched with the current company overview",
        frequency: Frequency::Monthly,
        inputs: &["price_abt", "company_overview"],
        default_buffer_years: 0,
    };

    /// ETF ABT over an existing price ABT.
    pub fn new(price_abt: impl Into<TableSource>, config: AbtConfig) -> Self {
        Self {
            price_abt: price_abt.into(),
            company: None,
            config,
        }
    }

    /// Add the ETF company overview by symbol.
    pub fn with_company(mut self, company: impl Into<TableSource>) -> Self {
        self.company = Some(company.into());
        self
    }
}

impl Assembler for EtfAbt {
    fn info(&self) -> &AbtInfo {
        &Self::INFO
    }

    fn config(&self) -> &AbtConfig {
        &self.config
    }

    fn assemble(&self) -> Result<DataFrame> {
        let config = &self.config;
        let range = config.date_range()?;

        let prices = load_panel(&self.price_abt, "price_abt", &[], &config.symbols)?;
        let company = load_lookup(
            self.company.as_ref(),
            "company_overview",
            &[SYMBOL],
            &COMPANY_COLUMNS,
        )?;
        let panel = join_lookups(prices.lazy(), &[&company])?;

        let mut leading = names(&[SYMBOL, DATE, "year"]);
        leading.extend(names(&SEQUENCE_LEADING));
        let trailing: Vec<String> = company
            .iter()
            .flat_map(|lookup| lookup.value_columns())
            .collect();
        let table = finalize(panel, &range, &leading, &trailing)?;

        info!(abt = Self::INFO.name, rows = table.height(), "Assembled ETF ABT");
        Ok(table)
    }
}
