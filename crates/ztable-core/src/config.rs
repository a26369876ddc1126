//! Configuration
//!
//! Loaded from TOML; every field has a default, so an empty document is the
//! conventional −3.99..3.99 table written to `z_table.xlsx`:
//!
//! ```toml
//! [table]
//! lo = "-3.99"
//! hi = "3.99"
//! step = "0.01"
//! probability_decimals = 6
//!
//! [output]
//! path = "z_table.xlsx"
//! sheet_name = "Z-Table"
//!
//! [names]
//! PopMean = "H4"
//!
//! [protection]
//! enabled = true
//! password = "secret"
//! locked = ["G1:G10"]
//! ```

use crate::table::TableSpec;
use crate::ConfigError;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::PathBuf;

/// Longest sheet name a workbook accepts
const MAX_SHEET_NAME: usize = 31;

#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub table: TableConfig,
    pub output: OutputConfig,
    /// Slot relocations and extra single-cell aliases, name -> address
    pub names: BTreeMap<String, String>,
    pub protection: ProtectionConfig,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TableConfig {
    pub lo: Decimal,
    pub hi: Decimal,
    pub step: Decimal,
    /// Decimal places of probabilities in text exports
    pub probability_decimals: u32,
}

impl Default for TableConfig {
    fn default() -> Self {
        let spec = TableSpec::default();
        Self {
            lo: spec.lo,
            hi: spec.hi,
            step: spec.step,
            probability_decimals: 6,
        }
    }
}

impl TableConfig {
    pub fn spec(&self) -> TableSpec {
        TableSpec::new(self.lo, self.hi, self.step)
    }
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputConfig {
    pub path: PathBuf,
    pub sheet_name: String,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("z_table.xlsx"),
            sheet_name: "Z-Table".to_string(),
        }
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ProtectionConfig {
    pub enabled: bool,
    pub password: Option<String>,
    /// Extra ranges to lock, as `A1` or `A1:B2` tokens
    pub locked: Vec<String>,
}

impl Default for ProtectionConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            password: None,
            locked: Vec::new(),
        }
    }
}

impl Config {
    pub fn from_toml_str(input: &str) -> Result<Self, ConfigError> {
        toml::from_str(input).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        toml::to_string_pretty(self).map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Checks that do not need the table or layout
    pub fn validate(&self) -> Result<(), ConfigError> {
        let decimals = self.table.probability_decimals;
        if !(1..=15).contains(&decimals) {
            return Err(ConfigError::ProbabilityDecimals(decimals));
        }
        validate_sheet_name(&self.output.sheet_name)
    }
}

/// Sheet names are 1..=31 characters, without `[]:*?/\` and not quoted at either end
pub fn validate_sheet_name(name: &str) -> Result<(), ConfigError> {
    let invalid = name.is_empty()
        || name.chars().count() > MAX_SHEET_NAME
        || name.contains(&['[', ']', ':', '*', '?', '/', '\\'][..])
        || name.starts_with('\'')
        || name.ends_with('\'');
    if invalid {
        return Err(ConfigError::SheetName(name.to_string()));
    }
    Ok(())
}
