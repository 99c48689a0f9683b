//! Enrichment lookups joined onto a panel.
//!
//! A lookup is a read-only table keyed by `symbol` or `(symbol, date)`. Keys
//! are checked for uniqueness when the lookup is built, so a left join can
//! never fan out panel rows.

use crate::{
    Result,
    panel::{DATE, check_unique_keys, normalize_date_column},
    schema::{ColumnSpec, has_column, select_columns},
};
use polars::prelude::*;
use tracing::debug;

/// A keyed, read-only table merged into a panel with a left join.
#[derive(Debug, Clone)]
pub struct Lookup {
    name: String,
    frame: DataFrame,
    keys: Vec<String>,
}

impl Lookup {
    /// Project `df` onto `specs` and validate that `keys` are unique.
    ///
    /// `specs` must include the key columns (by their output names).
    pub fn new(name: &str, df: &DataFrame, keys: &[&str], specs: &[ColumnSpec]) -> Result<Self> {
        let frame = select_columns(df, name, specs)?;
        Self::from_frame(name, frame, keys)
    }

    /// Every column of `df`, keyed by `keys`.
    pub fn all_columns(name: &str, df: &DataFrame, keys: &[&str]) -> Result<Self> {
        Self::from_frame(name, df.clone(), keys)
    }

    fn from_frame(name: &str, frame: DataFrame, keys: &[&str]) -> Result<Self> {
        let frame = if keys.contains(&DATE) && has_column(&frame, DATE) {
            normalize_date_column(frame, DATE)?
        } else {
            frame
        };
        check_unique_keys(&frame, name, keys)?;
        debug!(lookup = name, rows = frame.height(), "Validated lookup keys");

        Ok(Self {
            name: name.to_string(),
            frame,
            keys: keys.iter().map(|k| k.to_string()).collect(),
        })
    }

    /// Lookup name used in logs and errors.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Non-key columns contributed by the lookup.
    pub fn value_columns(&self) -> Vec<String> {
        self.frame
            .get_column_names()
            .iter()
            .map(|c| c.to_string())
            .filter(|c| !self.keys.contains(c))
            .collect()
    }

    /// Left-join onto `panel`. Panel columns sharing a name with a lookup
    /// value column are replaced. Row order is not guaranteed.
    pub fn join(&self, panel: LazyFrame) -> Result<LazyFrame> {
        let mut panel = panel;
        let schema = panel.collect_schema()?;
        let values = self.value_columns();
        let kept: Vec<Expr> = schema
            .iter_names()
            .filter(|name| !values.iter().any(|v| v.as_str() == name.as_str()))
            .map(|name| col(name.clone()))
            .collect();
        if kept.len() < schema.len() {
            debug!(lookup = %self.name, "Replacing panel columns provided by lookup");
            panel = panel.select(kept);
        }

        let key_exprs: Vec<Expr> = self.keys.iter().map(|k| col(k.as_str())).collect();
        Ok(panel.join(
            self.frame.clone().lazy(),
            key_exprs.clone(),
            key_exprs,
            JoinArgs::new(JoinType::Left),
        ))
    }
}
