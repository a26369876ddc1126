//! # ztable-render
//!
//! Rendering backends for ztable sheet plans.
//!
//! This crate provides:
//! - The Excel workbook with live lookup formulas, named ranges and protection
//! - CSV, JSON and text exports of the raw Z-table
//! - Atomic file persistence
//!
//! ## Example
//!
//! ```rust,no_run
//! use ztable_core::{Config, Renderer, SheetPlan};
//! use ztable_render::{ExcelRenderer, TableFormat, TableRenderer};
//!
//! let plan = SheetPlan::build(&Config::default())?;
//!
//! // Interactive workbook
//! ExcelRenderer::new().write_to_path(&plan, "z_table.xlsx".as_ref())?;
//!
//! // The historic CSV layout
//! let csv = TableRenderer::new().format(TableFormat::Csv).render(&plan)?;
//! std::fs::write("full_z_table.csv", csv)?;
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```

pub mod excel;
pub mod persist;
pub mod table;

pub use excel::ExcelRenderer;
pub use persist::write_atomic;
pub use table::{TableFormat, TableRenderer};
