#![doc = include_str!("../README.md")]
#![doc(issue_tracker_base_url = "https://github.com/factordynamics/abt/issues/")]
#![cfg_attr(docsrs, feature(doc_cfg, doc_auto_cfg))]
#![warn(missing_docs)]
#![forbid(unsafe_code)]

pub mod assemble;
pub mod config;
pub mod enrich;
pub mod error;
pub mod output;
pub mod panel;
pub mod piotroski;
pub mod quality;
pub mod ratio;
pub mod registry;
pub mod schema;
pub mod source;
pub mod traits;
pub mod window;

// Re-export core types
pub use assemble::{
    EtfAbt, FinStatementAbt, IncomeStatementAbt, KeyMetricAbt, PiotroskiAbt, PriceAbt,
};
pub use config::{AbtConfig, DateRange};
pub use error::{AbtError, Result};
pub use output::OutputTarget;
pub use panel::{PanelAligner, align};
pub use piotroski::{MissingHistoryPolicy, PiotroskiScorer};
pub use registry::{AbtInfo, AbtRegistry};
pub use source::TableSource;
pub use traits::{Assembler, Frequency, Stage};

/// Crate version
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
