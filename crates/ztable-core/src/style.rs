//! Fills and border plans
//!
//! Borders are computed per cell so a renderer only has to merge them into
//! each cell's format. Where two bordered rectangles meet, the heavier
//! stroke wins on every side.

use crate::address::{CellAddress, CellRange};
use crate::layout::Role;
use serde::Serialize;
use std::collections::BTreeMap;

/// Input cells: light yellow
pub const INPUT_FILL: u32 = 0xFFF2CC;
/// Formula outputs: light green
pub const OUTPUT_FILL: u32 = 0xE2EFDA;
/// Labels: light grey
pub const LABEL_FILL: u32 = 0xF2F2F2;
/// Headings: blue, with white bold text
pub const HEADING_FILL: u32 = 0x4472C4;
pub const HEADING_FONT: u32 = 0xFFFFFF;

/// Background colour for a role, if it has one
pub fn role_fill(role: Role) -> Option<u32> {
    match role {
        Role::Input => Some(INPUT_FILL),
        Role::Output => Some(OUTPUT_FILL),
        Role::Label => Some(LABEL_FILL),
        Role::Heading => Some(HEADING_FILL),
        Role::Table => None,
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
pub enum Stroke {
    Thin,
    Medium,
}

/// Border strokes of one cell
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct Borders {
    pub top: Option<Stroke>,
    pub bottom: Option<Stroke>,
    pub left: Option<Stroke>,
    pub right: Option<Stroke>,
}

impl Borders {
    pub fn all(stroke: Stroke) -> Self {
        Self {
            top: Some(stroke),
            bottom: Some(stroke),
            left: Some(stroke),
            right: Some(stroke),
        }
    }

    /// Side-by-side maximum of two border sets
    pub fn merge(self, other: Self) -> Self {
        Self {
            top: self.top.max(other.top),
            bottom: self.bottom.max(other.bottom),
            left: self.left.max(other.left),
            right: self.right.max(other.right),
        }
    }

    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }
}

/// How a rectangle is bordered
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum BorderMode {
    /// Thin stroke on every side of every cell
    Full,
    /// Medium stroke around the rectangle, thin inside
    Outer,
}

/// Per-cell borders for one rectangle
pub fn borders_for(range: CellRange, mode: BorderMode) -> impl Iterator<Item = (CellAddress, Borders)> {
    range.cells().map(move |cell| {
        let borders = match mode {
            BorderMode::Full => Borders::all(Stroke::Thin),
            BorderMode::Outer => {
                let edge = |on_edge: bool| Some(if on_edge { Stroke::Medium } else { Stroke::Thin });
                Borders {
                    top: edge(cell.row == range.first.row),
                    bottom: edge(cell.row == range.last.row),
                    left: edge(cell.col == range.first.col),
                    right: edge(cell.col == range.last.col),
                }
            }
        };
        (cell, borders)
    })
}

/// Accumulated border plan for a sheet
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct BorderPlan {
    cells: BTreeMap<CellAddress, Borders>,
}

impl BorderPlan {
    pub fn new() -> Self {
        Self::default()
    }

    /// Draw a rectangle, merging with what is already there
    pub fn draw(&mut self, range: CellRange, mode: BorderMode) {
        for (cell, borders) in borders_for(range, mode) {
            let entry = self.cells.entry(cell).or_default();
            *entry = entry.merge(borders);
        }
    }

    pub fn get(&self, cell: CellAddress) -> Borders {
        self.cells.get(&cell).copied().unwrap_or_default()
    }

    pub fn iter(&self) -> impl Iterator<Item = (CellAddress, Borders)> + '_ {
        self.cells.iter().map(|(cell, borders)| (*cell, *borders))
    }

    pub fn len(&self) -> usize {
        self.cells.len()
    }

    pub fn is_empty(&self) -> bool {
        self.cells.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn at(s: &str) -> CellAddress {
        s.parse().unwrap()
    }

    #[test]
    fn full_mode_is_thin_everywhere() {
        let mut plan = BorderPlan::new();
        plan.draw("A1:B3".parse().unwrap(), BorderMode::Full);
        assert_eq!(plan.len(), 6);
        assert!(plan.iter().all(|(_, b)| b == Borders::all(Stroke::Thin)));
    }

    #[test]
    fn outer_mode_thickens_edges_only() {
        let mut plan = BorderPlan::new();
        plan.draw("D1:E3".parse().unwrap(), BorderMode::Outer);

        assert_eq!(
            plan.get(at("D1")),
            Borders {
                top: Some(Stroke::Medium),
                bottom: Some(Stroke::Thin),
                left: Some(Stroke::Medium),
                right: Some(Stroke::Thin),
            }
        );
        assert_eq!(
            plan.get(at("E3")),
            Borders {
                top: Some(Stroke::Thin),
                bottom: Some(Stroke::Medium),
                left: Some(Stroke::Thin),
                right: Some(Stroke::Medium),
            }
        );
        let middle = plan.get(at("D2"));
        assert_eq!(middle.top, Some(Stroke::Thin));
        assert_eq!(middle.left, Some(Stroke::Medium));
    }

    #[test]
    fn overlapping_rectangles_keep_heavier_stroke() {
        let mut plan = BorderPlan::new();
        plan.draw("A1:A2".parse().unwrap(), BorderMode::Outer);
        plan.draw("A1:B2".parse().unwrap(), BorderMode::Full);
        let a1 = plan.get(at("A1"));
        assert_eq!(a1.top, Some(Stroke::Medium));
        assert_eq!(a1.bottom, Some(Stroke::Thin));
        assert!(plan.get(at("C1")).is_empty());
    }

    #[test]
    fn single_cell_outer_is_all_medium() {
        let mut plan = BorderPlan::new();
        plan.draw("C5".parse().unwrap(), BorderMode::Outer);
        assert_eq!(plan.get(at("C5")), Borders::all(Stroke::Medium));
    }

    #[test]
    fn fills_by_role() {
        assert_eq!(role_fill(Role::Input), Some(INPUT_FILL));
        assert_eq!(role_fill(Role::Heading), Some(HEADING_FILL));
        assert_eq!(role_fill(Role::Table), None);
    }
}
