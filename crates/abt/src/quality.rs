//! Row-level data-quality flags.
//!
//! Flags are advisory Boolean columns. Nothing is filtered on them.

use crate::{Result, Stage};
use polars::prelude::*;

/// True when every field is non-null.
pub fn not_null<S: AsRef<str>>(fields: &[S]) -> Expr {
    fields
        .iter()
        .map(|f| col(f.as_ref()).is_not_null())
        .reduce(|acc, check| acc.and(check))
        .unwrap_or_else(|| lit(true))
}

/// A group of fields that must lie in `(lower, upper]`.
///
/// Nulls are skipped: the group passes when at least one field is present and
/// every present field is within bounds.
#[derive(Debug, Clone, PartialEq)]
pub struct BoundCheck {
    fields: Vec<String>,
    lower: f64,
    upper: f64,
}

impl BoundCheck {
    /// Bounds `(lower, upper]` over `fields`.
    pub fn new<I, S>(fields: I, lower: f64, upper: f64) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            fields: fields.into_iter().map(Into::into).collect(),
            lower,
            upper,
        }
    }

    /// Fields checked by this group.
    pub fn fields(&self) -> &[String] {
        &self.fields
    }

    /// Boolean expression for the group.
    pub fn expr(&self) -> Expr {
        let any_present = self
            .fields
            .iter()
            .map(|f| col(f.as_str()).is_not_null())
            .reduce(|acc, check| acc.or(check))
            .unwrap_or_else(|| lit(false));

        let all_within = self
            .fields
            .iter()
            .map(|f| {
                let value = col(f.as_str());
                value.clone().is_null().or(value
                    .clone()
                    .gt(lit(self.lower))
                    .and(value.lt_eq(lit(self.upper))))
            })
            .reduce(|acc, check| acc.and(check))
            .unwrap_or_else(|| lit(true));

        any_present.and(all_within)
    }
}

fn all_pass(checks: &[BoundCheck]) -> Expr {
    checks
        .iter()
        .map(BoundCheck::expr)
        .reduce(|acc, check| acc.and(check))
        .unwrap_or_else(|| lit(true))
}

fn metric_fields(metric: &str, suffixes: &[&str]) -> Vec<String> {
    suffixes.iter().map(|s| format!("{metric}_{s}")).collect()
}

const QUARTER_FIELDS: [&str; 4] = ["0_1q", "1_2q", "4_5q", "5_6q"];
const YEAR_FIELDS: [&str; 4] = ["0_1y", "1_2y", "2_3y", "3_4y"];
const PC_QUARTER_FIELDS: [&str; 2] = ["pc_0_1q", "pc_1_2q"];
const PC_YEAR_FIELDS: [&str; 3] = ["pc_0_1y", "pc_1_2y", "pc_2_3y"];

/// `dqPass_notNull`, `dqPass_limits` and `dqPass_pc`.
#[derive(Debug, Clone, PartialEq)]
pub struct DataQualityFlags {
    not_null: Vec<String>,
    limits: Vec<BoundCheck>,
    pct_changes: Vec<BoundCheck>,
}

impl DataQualityFlags {
    /// Flags from explicit field lists and bound groups.
    pub const fn new(
        not_null: Vec<String>,
        limits: Vec<BoundCheck>,
        pct_changes: Vec<BoundCheck>,
    ) -> Self {
        Self {
            not_null,
            limits,
            pct_changes,
        }
    }

    /// Checks used by the key-metric table.
    ///
    /// Revenue per share must lie in `(0, 1200]` and net income per share in
    /// `(-1000, 1200]`; percent changes must lie in `(-2, 12]`.
    pub fn key_metrics() -> Self {
        let mut not_null = Vec::new();
        let mut limits = Vec::new();
        let mut pct_changes = Vec::new();

        for (metric, lower) in [("RPS", 0.0), ("NIPS", -1000.0)] {
            let quarters = metric_fields(metric, &QUARTER_FIELDS);
            let years = metric_fields(metric, &YEAR_FIELDS);
            not_null.extend(quarters.iter().cloned());
            not_null.extend(years.iter().cloned());
            limits.push(BoundCheck::new(quarters, lower, 1200.0));
            limits.push(BoundCheck::new(years, lower, 1200.0));
            pct_changes.push(BoundCheck::new(
                metric_fields(metric, &PC_QUARTER_FIELDS),
                -2.0,
                12.0,
            ));
            pct_changes.push(BoundCheck::new(metric_fields(metric, &PC_YEAR_FIELDS), -2.0, 12.0));
        }

        Self::new(not_null, limits, pct_changes)
    }
}

impl Stage for DataQualityFlags {
    fn name(&self) -> &str {
        "data_quality_flags"
    }

    fn description(&self) -> &str {
        "Advisory null, bound and percent-change checks"
    }

    fn required_columns(&self) -> Vec<String> {
        let mut columns = self.not_null.clone();
        for check in self.limits.iter().chain(&self.pct_changes) {
            for field in check.fields() {
                if !columns.contains(field) {
                    columns.push(field.clone());
                }
            }
        }
        columns
    }

    fn output_columns(&self) -> Vec<String> {
        vec![
            "dqPass_notNull".to_string(),
            "dqPass_limits".to_string(),
            "dqPass_pc".to_string(),
        ]
    }

    fn apply(&self, panel: LazyFrame) -> Result<LazyFrame> {
        Ok(panel.with_columns([
            not_null(&self.not_null).alias("dqPass_notNull"),
            all_pass(&self.limits).alias("dqPass_limits"),
            all_pass(&self.pct_changes).alias("dqPass_pc"),
        ]))
    }
}

/// A single not-null flag over a list of fields.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NotNullFlag {
    alias: String,
    fields: Vec<String>,
}

impl NotNullFlag {
    /// Flag `alias` that passes when all `fields` are present.
    pub fn new<I, S>(alias: impl Into<String>, fields: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            alias: alias.into(),
            fields: fields.into_iter().map(Into::into).collect(),
        }
    }
}

impl Stage for NotNullFlag {
    fn name(&self) -> &str {
        "not_null_flag"
    }

    fn description(&self) -> &str {
        "Passes when every listed field is present"
    }

    fn required_columns(&self) -> Vec<String> {
        self.fields.clone()
    }

    fn output_columns(&self) -> Vec<String> {
        vec![self.alias.clone()]
    }

    fn apply(&self, panel: LazyFrame) -> Result<LazyFrame> {
        Ok(panel.with_column(not_null(&self.fields).alias(self.alias.as_str())))
    }
}
