//! Core trait definitions for panel stages and table assemblers.
//!
//! Every transformation in the crate is a [`Stage`]: it declares the columns it
//! needs, the columns it adds, and extends a lazy panel. Assemblers chain stages
//! into a complete analytical base table and implement [`Assembler`].

use crate::{AbtConfig, AbtInfo, Result, schema::require_columns};
use derive_more::Display;
use polars::prelude::*;
use tracing::info;

/// Native granularity of a panel.
#[derive(Debug, Display, Clone, Copy, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum Frequency {
    /// Monthly observations - price panels
    Monthly,
    /// Quarterly observations - fundamentals and key metrics
    Quarterly,
}

impl Frequency {
    /// Number of periods in one year.
    pub const fn periods_per_year(self) -> usize {
        match self {
            Self::Monthly => 12,
            Self::Quarterly => 4,
        }
    }

    /// Suffix used in lagged column names (`RPS_1_2q`, `px_1_2m`).
    pub const fn suffix(self) -> &'static str {
        match self {
            Self::Monthly => "m",
            Self::Quarterly => "q",
        }
    }
}

/// A self-contained transformation of a `(symbol, date)` panel.
///
/// Stages assume the panel is aligned (sorted by symbol then date). They never
/// read across symbol boundaries.
pub trait Stage: Send + Sync + std::fmt::Debug {
    /// Short identifier used in logs and errors.
    fn name(&self) -> &str;

    /// Human-readable description of what the stage derives.
    fn description(&self) -> &str;

    /// Columns that must be present before the stage runs.
    fn required_columns(&self) -> Vec<String>;

    /// Columns the stage adds (or overwrites).
    fn output_columns(&self) -> Vec<String>;

    /// Extend the lazy panel with this stage's columns.
    fn apply(&self, panel: LazyFrame) -> Result<LazyFrame>;

    /// Validate the input contract, apply the stage and collect.
    fn run(&self, panel: &DataFrame) -> Result<DataFrame> {
        let required = self.required_columns();
        let required: Vec<&str> = required.iter().map(String::as_str).collect();
        require_columns(panel, self.name(), &required)?;
        Ok(self.apply(panel.clone().lazy())?.collect()?)
    }
}

/// Builds a complete analytical base table from its inputs.
pub trait Assembler: std::fmt::Debug {
    /// Static metadata for this table.
    fn info(&self) -> &AbtInfo;

    /// Run configuration (symbols, dates, output target).
    fn config(&self) -> &AbtConfig;

    /// Load inputs and compute the output table without persisting it.
    fn assemble(&self) -> Result<DataFrame>;

    /// Assemble the table and write it to every configured output file.
    fn run(&self) -> Result<DataFrame> {
        let mut table = self.assemble()?;
        let written = self.config().output.write(&mut table)?;
        info!(
            abt = self.info().name,
            rows = table.height(),
            columns = table.width(),
            files = written.len(),
            "ABT complete"
        );
        Ok(table)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_periods_per_year() {
        assert_eq!(Frequency::Monthly.periods_per_year(), 12);
        assert_eq!(Frequency::Quarterly.periods_per_year(), 4);
        assert_eq!(Frequency::Quarterly.suffix(), "q");
        assert_eq!(Frequency::Quarterly.to_string(), "Quarterly");
    }
}
