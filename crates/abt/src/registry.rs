//! ABT registry for discovery and introspection.
//!
//! The registry lists every table the crate can assemble together with its
//! frequency, logical inputs and default look-back buffer. The CLI uses it for
//! `list` and `info`.

use crate::{
    Frequency,
    assemble::{EtfAbt, FinStatementAbt, IncomeStatementAbt, KeyMetricAbt, PiotroskiAbt, PriceAbt},
};
use std::collections::BTreeMap;

/// Metadata for an assembler.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct AbtInfo {
    /// Table name (unique identifier)
    pub name: &'static str,
    /// Human-readable description
    pub description: &'static str,
    /// Native panel frequency
    pub frequency: Frequency,
    /// Logical input tables, primary first
    pub inputs: &'static [&'static str],
    /// Years subtracted from the minimum date before features are computed
    pub default_buffer_years: u32,
}

/// Registry of the available analytical base tables.
#[derive(Debug, Default)]
pub struct AbtRegistry {
    tables: BTreeMap<&'static str, AbtInfo>,
}

impl AbtRegistry {
    /// Create a new empty registry.
    pub const fn new() -> Self {
        Self {
            tables: BTreeMap::new(),
        }
    }

    /// Register every table shipped with the crate.
    pub fn with_defaults() -> Self {
        let mut registry = Self::new();
        registry.register(PriceAbt::INFO);
        registry.register(KeyMetricAbt::INFO);
        registry.register(FinStatementAbt::INFO);
        registry.register(PiotroskiAbt::INFO);
        registry.register(IncomeStatementAbt::INFO);
        registry.register(EtfAbt::INFO);
        registry
    }

    /// Register a table.
    pub fn register(&mut self, info: AbtInfo) {
        self.tables.insert(info.name, info);
    }

    /// Get a table by name.
    pub fn get(&self, name: &str) -> Option<&AbtInfo> {
        self.tables.get(name)
    }

    /// Tables of a given frequency.
    pub fn by_frequency(&self, frequency: Frequency) -> Vec<&AbtInfo> {
        self.tables
            .values()
            .filter(|info| info.frequency == frequency)
            .collect()
    }

    /// All table metadata, ordered by name.
    pub fn all_info(&self) -> Vec<&AbtInfo> {
        self.tables.values().collect()
    }

    /// All table names, ordered.
    pub fn names(&self) -> Vec<&str> {
        self.tables.keys().copied().collect()
    }

    /// Number of registered tables.
    pub fn len(&self) -> usize {
        self.tables.len()
    }

    /// Whether the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.tables.is_empty()
    }
}
