//! Lag/window engine.
//!
//! Per-symbol shifted values, full-window rolling aggregates and the
//! period-duration label. Windows count records, not calendar time, and every
//! expression is evaluated `over` the symbol column so nothing reads across
//! symbol boundaries.

pub mod duration;
pub mod lag;
pub mod rolling;

pub use duration::{PeriodDuration, period_duration, snap_days};
pub use lag::{MetricHistory, lag, lag_expr, period_column, year_column};
pub use rolling::{rolling_mean, rolling_std, rolling_sum, with_year_buckets};
