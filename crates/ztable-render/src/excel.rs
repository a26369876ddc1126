//! Excel workbook renderer
//!
//! Replays a [`SheetPlan`] onto a single-sheet workbook:
//!
//! ```text
//! Sheet: Z-Table
//! | Z-Value | Probability |   | Z-Score Lookup      |        |
//! |---------|-------------|---|---------------------|--------|
//! | -3.99   | 0.0000      |   | Z-score 1 (z1)      | [in]   |
//! | -3.98   | 0.0000      |   | P(Z < z1)           | =IF(.. |
//! | ...     | ...         |   | ...                 |        |
//! ```
//!
//! Write order matters to spreadsheet hosts and is fixed:
//! 1. table, headings and labels
//! 2. named ranges (`ZValues`, `Probabilities`, slot aliases)
//! 3. input cells, then formulas in dependency order
//! 4. column widths, frozen header row
//! 5. sheet protection, last
//!
//! Every written cell carries an explicit lock state; every column gets an
//! unlocked default format, so cells nobody writes stay editable.

use rust_xlsxwriter::{Format, FormatAlign, FormatBorder, Workbook, Worksheet};
use std::path::Path;
use ztable_core::layout::{NumberStyle, Role};
use ztable_core::plan::PROBABILITY_STYLE;
use ztable_core::address::MAX_COL;
use ztable_core::style::{self, Borders, Stroke};
use ztable_core::{CellAddress, CellContent, RenderError, Renderer, SheetPlan};

use crate::persist;

/// Excel (.xlsx) renderer
#[derive(Clone, Debug)]
pub struct ExcelRenderer {
    /// Freeze the table header row
    pub freeze_header: bool,
    /// Apply the plan's protection policy
    pub protect: bool,
}

impl Default for ExcelRenderer {
    fn default() -> Self {
        Self {
            freeze_header: true,
            protect: true,
        }
    }
}

impl ExcelRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Leave the header row scrollable
    pub fn no_freeze(mut self) -> Self {
        self.freeze_header = false;
        self
    }

    /// Skip sheet protection regardless of the plan
    pub fn unprotected(mut self) -> Self {
        self.protect = false;
        self
    }

    /// Generate workbook bytes
    pub fn render_to_bytes(&self, plan: &SheetPlan) -> Result<Vec<u8>, RenderError> {
        let mut workbook = Workbook::new();

        {
            let sheet = workbook.add_worksheet();
            sheet
                .set_name(&plan.sheet_name)
                .map_err(|e| RenderError::Format(e.to_string()))?;

            let unlocked = Format::new().set_unlocked();
            sheet
                .set_column_range_format(0, MAX_COL, &unlocked)
                .map_err(|e| RenderError::Format(e.to_string()))?;

            self.write_table(sheet, plan)?;
            self.write_static_cells(sheet, plan)?;
        }

        for named in plan.names.iter() {
            workbook
                .define_name(&named.name, &named.definition(&plan.sheet_name))
                .map_err(|e| RenderError::Format(format!("defining '{}': {e}", named.name)))?;
        }

        let sheet = workbook
            .worksheet_from_index(0)
            .map_err(|e| RenderError::Format(e.to_string()))?;
        self.write_inputs(sheet, plan)?;
        self.write_formulas(sheet, plan)?;
        self.write_extra_locked(sheet, plan)?;

        for &(col, width) in &plan.column_widths {
            sheet.set_column_width(col, width).ok();
        }
        if self.freeze_header {
            sheet.set_freeze_panes(plan.table.first_data_row(), 0).ok();
        }

        if self.protect && plan.protection.enabled {
            match &plan.protection.password {
                Some(password) => {
                    sheet.protect_with_password(password);
                }
                None => {
                    sheet.protect();
                }
            }
        }

        let buffer = workbook
            .save_to_buffer()
            .map_err(|e| RenderError::Format(format!("Failed to create Excel: {e}")))?;

        tracing::debug!(bytes = buffer.len(), "rendered workbook");
        Ok(buffer)
    }

    /// Render and atomically write the workbook to `path`
    pub fn write_to_path(&self, plan: &SheetPlan, path: &Path) -> Result<(), RenderError> {
        let bytes = self.render(plan)?;
        persist::write_atomic(path, &bytes)
    }

    fn write_table(&self, sheet: &mut Worksheet, plan: &SheetPlan) -> Result<(), RenderError> {
        let table = &plan.table;
        let z_style = NumberStyle::Fixed(plan.series.precision() as u8);
        let z_format = cell_format(Role::Table, z_style, Borders::all(Stroke::Thin), true);
        let p_format = cell_format(Role::Table, PROBABILITY_STYLE, Borders::all(Stroke::Thin), true);

        for (i, entry) in plan.series.iter().enumerate() {
            let row = table.first_data_row() + i as u32;
            let z_borders = plan.borders.get(CellAddress::new(row, table.z_col));
            let p_borders = plan.borders.get(CellAddress::new(row, table.p_col));

            // Interior rows share formats; edges pick up the merged strokes
            let z_edge;
            let z_fmt = if z_borders == Borders::all(Stroke::Thin) {
                &z_format
            } else {
                z_edge = cell_format(Role::Table, z_style, z_borders, true);
                &z_edge
            };
            let p_edge;
            let p_fmt = if p_borders == Borders::all(Stroke::Thin) {
                &p_format
            } else {
                p_edge = cell_format(Role::Table, PROBABILITY_STYLE, p_borders, true);
                &p_edge
            };

            sheet
                .write_number_with_format(row, table.z_col, entry.z, z_fmt)
                .map_err(|e| RenderError::Format(e.to_string()))?;
            sheet
                .write_number_with_format(row, table.p_col, entry.probability, p_fmt)
                .map_err(|e| RenderError::Format(e.to_string()))?;
        }
        Ok(())
    }

    /// Headings, labels and padding blanks
    fn write_static_cells(&self, sheet: &mut Worksheet, plan: &SheetPlan) -> Result<(), RenderError> {
        for planned in plan
            .cells
            .iter()
            .filter(|c| matches!(c.role, Role::Heading | Role::Label))
        {
            let format = self.format_for(plan, planned.cell, planned.role, planned.style);
            let (row, col) = (planned.cell.row, planned.cell.col);
            let written = match &planned.content {
                CellContent::Text(text) => sheet.write_string_with_format(row, col, text, &format),
                CellContent::Number(n) => sheet.write_number_with_format(row, col, *n, &format),
                CellContent::Empty | CellContent::Formula(_) => sheet.write_blank(row, col, &format),
            };
            written.map_err(|e| RenderError::Format(e.to_string()))?;
        }
        Ok(())
    }

    fn write_inputs(&self, sheet: &mut Worksheet, plan: &SheetPlan) -> Result<(), RenderError> {
        for planned in plan.inputs() {
            let format = self.format_for(plan, planned.cell, planned.role, planned.style);
            sheet
                .write_blank(planned.cell.row, planned.cell.col, &format)
                .map_err(|e| RenderError::Format(e.to_string()))?;
        }
        Ok(())
    }

    fn write_formulas(&self, sheet: &mut Worksheet, plan: &SheetPlan) -> Result<(), RenderError> {
        for &i in &plan.formula_order {
            let planned = &plan.cells[i];
            let CellContent::Formula(expr) = &planned.content else {
                return Err(RenderError::InvalidData(format!(
                    "cell {} is ordered as a formula but holds none",
                    planned.cell
                )));
            };
            let format = self.format_for(plan, planned.cell, planned.role, planned.style);
            let text = expr.to_formula();
            sheet
                .write_formula_with_format(planned.cell.row, planned.cell.col, text.as_str(), &format)
                .map_err(|e| RenderError::Format(format!("{} in {}: {e}", planned.owner, planned.cell)))?;
        }
        Ok(())
    }

    /// Locked blanks for configured cells nothing else writes
    fn write_extra_locked(&self, sheet: &mut Worksheet, plan: &SheetPlan) -> Result<(), RenderError> {
        let locked = Format::new().set_locked();
        for cell in plan.protection.extra_locked() {
            if plan.cell_at(cell).is_some() || plan.table.range().contains(cell) {
                continue;
            }
            sheet
                .write_blank(cell.row, cell.col, &locked)
                .map_err(|e| RenderError::Format(e.to_string()))?;
        }
        Ok(())
    }

    fn format_for(&self, plan: &SheetPlan, cell: CellAddress, role: Role, style: NumberStyle) -> Format {
        cell_format(role, style, plan.borders.get(cell), plan.is_locked(cell))
    }
}

/// Build the complete format of one cell
fn cell_format(role: Role, style: NumberStyle, borders: Borders, locked: bool) -> Format {
    let mut format = Format::new();

    if let Some(fill) = style::role_fill(role) {
        format = format.set_background_color(fill);
    }
    if role == Role::Heading {
        format = format.set_bold().set_font_color(style::HEADING_FONT);
    }
    if role == Role::Table {
        format = format.set_align(FormatAlign::Right);
    }
    if let Some(num_format) = style.num_format() {
        format = format.set_num_format(&num_format);
    }

    format = format
        .set_border_top(border(borders.top))
        .set_border_bottom(border(borders.bottom))
        .set_border_left(border(borders.left))
        .set_border_right(border(borders.right));

    if locked {
        format.set_locked()
    } else {
        format.set_unlocked()
    }
}

fn border(stroke: Option<Stroke>) -> FormatBorder {
    match stroke {
        None => FormatBorder::None,
        Some(Stroke::Thin) => FormatBorder::Thin,
        Some(Stroke::Medium) => FormatBorder::Medium,
    }
}

impl Renderer for ExcelRenderer {
    type Output = Vec<u8>;

    fn render(&self, plan: &SheetPlan) -> Result<Vec<u8>, RenderError> {
        if plan.series.is_empty() {
            return Err(RenderError::InvalidData("No table rows to render".into()));
        }
        self.render_to_bytes(plan)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ztable_core::Config;

    fn plan() -> SheetPlan {
        SheetPlan::build(&Config::default()).unwrap()
    }

    #[test]
    fn excel_renderer_creation() {
        let renderer = ExcelRenderer::new();
        assert!(renderer.freeze_header);
        assert!(renderer.protect);

        let renderer = ExcelRenderer::new().no_freeze().unprotected();
        assert!(!renderer.freeze_header);
        assert!(!renderer.protect);
    }

    #[test]
    fn excel_produces_valid_output() {
        let bytes = ExcelRenderer::new().render(&plan()).unwrap();
        // XLSX files start with PK (ZIP header)
        assert!(bytes.len() > 100);
        assert_eq!(&bytes[0..2], b"PK");
    }

    #[test]
    fn password_protection_renders() {
        let mut config = Config::default();
        config.protection.password = Some("secret".into());
        let plan = SheetPlan::build(&config).unwrap();
        let bytes = ExcelRenderer::new().render(&plan).unwrap();
        assert_eq!(&bytes[0..2], b"PK");
    }

    #[test]
    fn strokes_map_to_excel_borders() {
        assert_eq!(border(None), FormatBorder::None);
        assert_eq!(border(Some(Stroke::Thin)), FormatBorder::Thin);
        assert_eq!(border(Some(Stroke::Medium)), FormatBorder::Medium);
    }
}
