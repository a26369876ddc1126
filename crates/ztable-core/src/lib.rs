//! # ztable-core
//!
//! Core model for the ztable spreadsheet generator.
//!
//! This crate provides:
//! - The Z-table generator: `TableSpec` → `ZSeries`
//! - Cell addressing in A1 notation: `CellAddress`, `CellRange`
//! - The declarative sheet layout: `Layout`, `Block`, `Slot`, `Role`
//! - A formula expression tree with a rendering boundary and an evaluator
//! - Named-range wiring, formula dependency ordering and the protection policy
//! - `SheetPlan`, the fully validated document description consumed by renderers
//! - Error types and the `Renderer` trait
//!
//! ## Example
//!
//! ```rust
//! use ztable_core::{Config, SheetPlan};
//!
//! let plan = SheetPlan::build(&Config::default()).unwrap();
//! assert_eq!(plan.series.len(), 799);
//! assert!(plan.names.contains("ZValues"));
//! ```

pub mod address;
pub mod config;
pub mod formula;
pub mod graph;
pub mod layout;
pub mod names;
pub mod plan;
pub mod protection;
pub mod style;
pub mod table;

pub use address::{CellAddress, CellRange};
pub use config::{Config, OutputConfig, ProtectionConfig, TableConfig};
pub use formula::eval::{CellError, Value};
pub use formula::{BinaryOp, Expr, Function};
pub use layout::{Block, Layout, NumberStyle, Role, Slot};
pub use names::{NameKind, NameRegistry, NamedRange, WiringWarning};
pub use plan::{CellContent, PlannedCell, SheetPlan, SlotOutput, TablePlacement};
pub use protection::ProtectionPolicy;
pub use style::{BorderMode, BorderPlan, Borders, Stroke};
pub use table::{TableSpec, ZEntry, ZSeries};

use rust_decimal::Decimal;
use thiserror::Error;

// ============================================================================
// Traits
// ============================================================================

/// Turns a validated sheet plan into an output artifact
pub trait Renderer {
    type Output;

    fn render(&self, plan: &SheetPlan) -> Result<Self::Output, RenderError>;
}

// ============================================================================
// Errors
// ============================================================================

/// A cell or range token that cannot be resolved to the grid
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum AddressError {
    #[error("empty cell address")]
    Empty,

    #[error("malformed cell address '{0}'")]
    Malformed(String),

    #[error("cell address '{0}' is outside the worksheet")]
    OutOfBounds(String),
}

/// Invalid configuration, detected before any document is built
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ConfigError {
    #[error("step must be greater than zero, got {0}")]
    NonPositiveStep(Decimal),

    #[error("interval lower bound {lo} is greater than upper bound {hi}")]
    InvertedInterval { lo: Decimal, hi: Decimal },

    #[error("interval width {width} is not a multiple of step {step}")]
    StepMismatch { width: Decimal, step: Decimal },

    #[error("step {0} has more than {} decimal places", table::MAX_PRECISION)]
    PrecisionTooHigh(Decimal),

    #[error("a table of {0} rows does not fit in a worksheet")]
    TooManyRows(u64),

    #[error("probability precision must be between 1 and 15 decimals, got {0}")]
    ProbabilityDecimals(u32),

    #[error("invalid sheet name '{0}'")]
    SheetName(String),

    #[error("invalid {field} address: {source}")]
    Address {
        field: String,
        #[source]
        source: AddressError,
    },

    #[error("protection range '{range}' covers {cells} cells, more than the supported {}", protection::MAX_EXTRA_CELLS)]
    RangeTooLarge { range: String, cells: u64 },

    #[error("input cell {cell} ('{slot}') cannot be locked by protection range '{range}'")]
    InputLocked {
        slot: String,
        cell: CellAddress,
        range: String,
    },

    #[error("cell {cell} is claimed by both '{first}' and '{second}'")]
    Overlap {
        cell: CellAddress,
        first: String,
        second: String,
    },

    #[error("slot '{slot}' at {cell} has no column to its left for a label")]
    LabelOutOfBounds { slot: String, cell: CellAddress },

    #[error("'{0}' is not an input of this sheet")]
    UnknownInput(String),

    #[error("failed to parse configuration: {0}")]
    Parse(String),
}

/// Failure to define a named range the sheet cannot work without
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum WiringError {
    #[error("required named range '{name}' could not be defined: {reason}")]
    RequiredRange { name: String, reason: String },
}

/// Invalid formula wiring
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FormulaError {
    #[error("formula in {cell} ('{slot}') references undefined name '{name}'")]
    UndefinedName {
        slot: String,
        cell: CellAddress,
        name: String,
    },

    #[error("circular reference between formula cells: {}", .slots.join(", "))]
    Cycle { slots: Vec<String> },
}

/// Rendering or persistence failure
#[derive(Debug, Error)]
pub enum RenderError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Format error: {0}")]
    Format(String),

    #[error("Invalid data: {0}")]
    InvalidData(String),
}

/// Any error raised while planning or producing a Z-table document
#[derive(Debug, Error)]
pub enum Error {
    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Wiring(#[from] WiringError),

    #[error(transparent)]
    Formula(#[from] FormulaError),

    #[error(transparent)]
    Render(#[from] RenderError),
}

pub type Result<T, E = Error> = std::result::Result<T, E>;

// ============================================================================
// Tests
// ============================================================================
