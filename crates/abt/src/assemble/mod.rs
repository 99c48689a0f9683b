//! Analytical base table assemblers.
//!
//! Each assembler is a linear pipeline over one primary panel:
//!
//! 1. load and project the input through its column contract
//! 2. filter symbols
//! 3. apply the buffered minimum date (and the maximum date)
//! 4. run the feature stages
//! 5. left-join enrichment lookups
//! 6. apply the true minimum date, re-sequence and order columns
//!
//! Step 3 keeps enough trailing history for lags and rolling windows; only
//! step 6 trims the output to the requested range.

mod etf;
mod fin_statement;
mod income_statement;
mod key_metric;
mod piotroski;
mod price;

pub use etf::EtfAbt;
pub use fin_statement::FinStatementAbt;
pub use income_statement::IncomeStatementAbt;
pub use key_metric::KeyMetricAbt;
pub use piotroski::PiotroskiAbt;
pub use price::PriceAbt;

use crate::{
    AbtError, DateRange, Result, Stage, TableSource,
    enrich::Lookup,
    panel::{
        DATE, FIRST_LAST_FLAG, MAX_NLAG, NLAG, REVERSE_NLAG, SYMBOL, check_unique_keys,
        filter_dates, filter_symbols, normalize_dates, sort_panel, symbol_count, with_sequence,
    },
    schema::{ColumnSpec, order_columns, require_columns, select_columns},
};
use polars::prelude::*;
use tracing::{debug, info};

/// Load a primary `(symbol, date)` panel.
///
/// An empty `specs` keeps every column. Dates are normalized, the symbol
/// filter is applied and `(symbol, date)` must be unique.
pub(crate) fn load_panel(
    source: &TableSource,
    table: &str,
    specs: &[ColumnSpec],
    symbols: &[String],
) -> Result<DataFrame> {
    let raw = source.load()?;
    let df = if specs.is_empty() {
        require_columns(&raw, table, &[SYMBOL, DATE])?;
        raw
    } else {
        select_columns(&raw, table, specs)?
    };
    let df = filter_symbols(normalize_dates(df)?, symbols)?;
    check_unique_keys(&df, table, &[SYMBOL, DATE])?;

    info!(
        table,
        rows = df.height(),
        symbols = symbol_count(&df)?,
        "Loaded input panel"
    );
    Ok(df)
}

/// Build an optional lookup from an optional source.
pub(crate) fn load_lookup(
    source: Option<&TableSource>,
    name: &str,
    keys: &[&str],
    specs: &[ColumnSpec],
) -> Result<Option<Lookup>> {
    source
        .map(|s| {
            let df = s.load()?;
            if specs.is_empty() {
                Lookup::all_columns(name, &df, keys)
            } else {
                Lookup::new(name, &df, keys, specs)
            }
        })
        .transpose()
}

/// Left-join every present lookup and restore `(symbol, date)` order.
pub(crate) fn join_lookups(panel: LazyFrame, lookups: &[&Option<Lookup>]) -> Result<LazyFrame> {
    let mut panel = panel;
    for lookup in lookups.iter().copied().flatten() {
        debug!(lookup = lookup.name(), "Joining lookup");
        panel = lookup.join(panel)?;
    }
    Ok(sort_panel(panel))
}

/// Apply stages in order, checking each stage's input contract first.
pub(crate) fn apply_stages(panel: LazyFrame, stages: &[&dyn Stage]) -> Result<LazyFrame> {
    let mut panel = panel;
    for stage in stages {
        let schema = panel.collect_schema()?;
        if let Some(missing) = stage
            .required_columns()
            .into_iter()
            .find(|c| !schema.contains(c))
        {
            return Err(AbtError::missing_column(stage.name(), missing));
        }
        debug!(stage = stage.name(), "Applying stage");
        panel = stage.apply(panel)?;
    }
    Ok(panel)
}

/// `year`, `year_char` and `month_char` (`Jan`..`Dec`) from the date.
pub(crate) fn with_calendar(panel: LazyFrame) -> LazyFrame {
    panel
        .with_column(col(DATE).dt().year().alias("year"))
        .with_columns([
            col("year").cast(DataType::String).alias("year_char"),
            col(DATE).dt().to_string("%b").alias("month_char"),
        ])
}

/// Drop each symbol's most recent record when its core per-share metrics are
/// missing or zero, which marks a report that is not complete yet.
pub(crate) fn drop_incomplete_latest(
    panel: LazyFrame,
    metrics: &[&str],
    nonzero: &[&str],
) -> LazyFrame {
    let any_missing = metrics
        .iter()
        .map(|m| col(*m).is_null())
        .reduce(|acc, c| acc.or(c))
        .unwrap_or_else(|| lit(false));
    let any_zero = nonzero
        .iter()
        .map(|m| col(*m).eq(lit(0.0)).fill_null(lit(false)))
        .reduce(|acc, c| acc.or(c))
        .unwrap_or_else(|| lit(false));

    with_sequence(sort_panel(panel)).filter(
        col(NLAG)
            .eq(col(MAX_NLAG))
            .and(any_missing.or(any_zero))
            .not(),
    )
}

/// Buffered range used while features are computed.
pub(crate) fn feature_range(range: &DateRange, buffer_years: u32) -> DateRange {
    let buffered = range.buffered(buffer_years);
    debug!(min = ?buffered.min, max = ?buffered.max, buffer_years, "Buffered date range");
    buffered
}

/// Apply the final range, re-sequence and order columns.
pub(crate) fn finalize(
    panel: LazyFrame,
    range: &DateRange,
    leading: &[String],
    trailing: &[String],
) -> Result<DataFrame> {
    let df = with_sequence(sort_panel(filter_dates(panel, range))).collect()?;
    order_columns(&df, leading, trailing)
}

/// Sequence columns in the order most tables lead with.
pub(crate) const SEQUENCE_LEADING: [&str; 4] = [MAX_NLAG, FIRST_LAST_FLAG, NLAG, REVERSE_NLAG];
