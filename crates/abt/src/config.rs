//! Run configuration for assemblers.
//!
//! Every assembler takes an [`AbtConfig`] instead of hard-coded defaults. The
//! config is plain data and can be loaded from a JSON file.

use crate::{AbtError, MissingHistoryPolicy, OutputTarget, Result};
use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Date format accepted for minimum and maximum date thresholds.
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Configuration shared by all assemblers.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AbtConfig {
    /// Symbols to keep (case-insensitive). Empty keeps every symbol.
    pub symbols: Vec<String>,
    /// Earliest date in the output table (`YYYY-MM-DD`).
    pub min_date: Option<String>,
    /// Latest date in the output table (`YYYY-MM-DD`).
    pub max_date: Option<String>,
    /// Overrides the assembler's default look-back buffer.
    pub buffer_years: Option<u32>,
    /// Where to persist the table. Nothing is written by default.
    pub output: OutputTarget,
    /// How Piotroski rules treat missing prior-year history.
    pub piotroski_policy: MissingHistoryPolicy,
}

impl AbtConfig {
    /// Load a configuration from a JSON file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|source| AbtError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(serde_json::from_str(&text)?)
    }

    /// Parse the configured date thresholds.
    pub fn date_range(&self) -> Result<DateRange> {
        DateRange::parse(
            self.min_date.as_deref().unwrap_or(""),
            self.max_date.as_deref().unwrap_or(""),
        )
    }

    /// Buffer to apply, falling back to the assembler default.
    pub fn buffer_years_or(&self, default: u32) -> u32 {
        self.buffer_years.unwrap_or(default)
    }

    /// Set the symbol filter.
    pub fn with_symbols<I, S>(mut self, symbols: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.symbols = symbols.into_iter().map(Into::into).collect();
        self
    }

    /// Set the date thresholds. Empty strings mean unbounded.
    pub fn with_dates(mut self, min_date: &str, max_date: &str) -> Self {
        self.min_date = (!min_date.is_empty()).then(|| min_date.to_string());
        self.max_date = (!max_date.is_empty()).then(|| max_date.to_string());
        self
    }

    /// Override the look-back buffer.
    pub const fn with_buffer_years(mut self, years: u32) -> Self {
        self.buffer_years = Some(years);
        self
    }
}

/// Inclusive date thresholds applied to a panel.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct DateRange {
    /// Lower bound, inclusive
    pub min: Option<NaiveDate>,
    /// Upper bound, inclusive
    pub max: Option<NaiveDate>,
}

impl DateRange {
    /// Parse thresholds; empty strings are unbounded.
    pub fn parse(min: &str, max: &str) -> Result<Self> {
        let range = Self {
            min: parse_date(min)?,
            max: parse_date(max)?,
        };
        if let (Some(start), Some(end)) = (range.min, range.max)
            && start > end
        {
            return Err(AbtError::InvalidDateRange {
                start: start.to_string(),
                end: end.to_string(),
            });
        }
        Ok(range)
    }

    /// The same range with the lower bound moved back by `years`.
    ///
    /// Used to keep enough trailing history for lag and rolling features
    /// before the true minimum is re-applied.
    pub fn buffered(&self, years: u32) -> Self {
        Self {
            min: self.min.map(|d| shift_years_back(d, years)),
            max: self.max,
        }
    }

    /// Whether neither bound is set.
    pub const fn is_unbounded(&self) -> bool {
        self.min.is_none() && self.max.is_none()
    }
}

fn parse_date(text: &str) -> Result<Option<NaiveDate>> {
    let text = text.trim();
    if text.is_empty() {
        return Ok(None);
    }
    NaiveDate::parse_from_str(text, DATE_FORMAT)
        .map(Some)
        .map_err(|_| AbtError::InvalidDate(text.to_string()))
}

/// Same month and day `years` earlier; Feb 29 falls back to Feb 28.
pub fn shift_years_back(date: NaiveDate, years: u32) -> NaiveDate {
    let year = date.year() - years as i32;
    date.with_year(year)
        .or_else(|| NaiveDate::from_ymd_opt(year, date.month(), 28))
        .unwrap_or(date)
}
