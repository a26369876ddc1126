//! Sheet planning
//!
//! [`SheetPlan::build`] turns a [`Config`] into a fully resolved description
//! of the document: the generated table, every calculator cell with its role
//! and content, named ranges, formula write order, borders, column widths
//! and the protection policy. Every configuration and wiring error is raised
//! here, before a renderer creates anything.
//!
//! The plan can also be evaluated directly ([`SheetPlan::evaluate`]), which
//! runs the calculator formulas against the generated table.

use crate::address::{CellAddress, CellRange};
use crate::config::Config;
use crate::formula::eval::{self, Binding, CellError, NameResolver, Value};
use crate::formula::Expr;
use crate::graph::{self, FormulaNode};
use crate::layout::{Layout, NumberStyle, Role};
use crate::names::{self, NameRegistry, WiringWarning, PROBABILITIES, Z_VALUES};
use crate::protection::ProtectionPolicy;
use crate::style::{BorderMode, BorderPlan};
use crate::table::{self, ZSeries};
use crate::{ConfigError, Result};
use std::collections::{BTreeMap, BTreeSet, HashMap};

/// What is written into a cell
#[derive(Clone, Debug, PartialEq)]
pub enum CellContent {
    Text(String),
    Number(f64),
    Formula(Expr),
    Empty,
}

/// One non-table cell of the sheet
#[derive(Clone, Debug, PartialEq)]
pub struct PlannedCell {
    pub cell: CellAddress,
    pub role: Role,
    pub style: NumberStyle,
    pub content: CellContent,
    /// Slot or block the cell belongs to
    pub owner: String,
}

/// Where the Z-table sits: headers in the first row, z and Φ(z) below
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TablePlacement {
    pub header_row: u32,
    pub z_col: u16,
    pub p_col: u16,
    pub rows: u32,
}

impl TablePlacement {
    fn new(rows: u32) -> Self {
        Self {
            header_row: 0,
            z_col: 0,
            p_col: 1,
            rows,
        }
    }

    pub fn first_data_row(&self) -> u32 {
        self.header_row + 1
    }

    pub fn last_data_row(&self) -> u32 {
        self.header_row + self.rows
    }

    fn column(&self, col: u16) -> CellRange {
        CellRange::new(
            CellAddress::new(self.first_data_row(), col),
            CellAddress::new(self.last_data_row(), col),
        )
    }

    pub fn z_range(&self) -> CellRange {
        self.column(self.z_col)
    }

    pub fn p_range(&self) -> CellRange {
        self.column(self.p_col)
    }

    /// Headers and data of both columns
    pub fn range(&self) -> CellRange {
        CellRange::new(
            CellAddress::new(self.header_row, self.z_col),
            CellAddress::new(self.last_data_row(), self.p_col),
        )
    }
}

/// Number style of the probability column on the sheet
pub const PROBABILITY_STYLE: NumberStyle = NumberStyle::Fixed(4);

/// Computed value of an output slot
#[derive(Clone, Debug, PartialEq)]
pub struct SlotOutput {
    pub name: String,
    pub cell: CellAddress,
    pub style: NumberStyle,
    pub value: Value,
}

impl SlotOutput {
    /// The value as the sheet would display it
    pub fn display(&self) -> String {
        match &self.value {
            Value::Number(n) => self.style.display(*n),
            other => other.to_string(),
        }
    }
}

#[derive(Clone, Debug)]
pub struct SheetPlan {
    pub sheet_name: String,
    pub series: ZSeries,
    pub table: TablePlacement,
    pub cells: Vec<PlannedCell>,
    pub names: NameRegistry,
    /// Indices into `cells` of formula cells, dependencies first
    pub formula_order: Vec<usize>,
    pub borders: BorderPlan,
    pub column_widths: Vec<(u16, f64)>,
    pub protection: ProtectionPolicy,
    pub warnings: Vec<WiringWarning>,
}

impl SheetPlan {
    pub fn build(config: &Config) -> Result<Self> {
        config.validate()?;

        let series = table::generate(&config.table.spec())?;
        let rows = u32::try_from(series.len())
            .map_err(|_| ConfigError::TooManyRows(series.len() as u64))?;
        let table = TablePlacement::new(rows);
        let mut layout = Layout::standard(series.precision());

        let mut names = NameRegistry::new();
        names.define_column(Z_VALUES, table.z_range())?;
        names.define_column(PROBABILITIES, table.p_range())?;

        let Relocation {
            moved,
            unaliased,
            extras,
            mut warnings,
        } = relocate(&mut layout, &config.names);

        let aliases: Vec<(String, String)> = layout
            .slots()
            .filter(|slot| !unaliased.contains(&slot.name))
            .map(|slot| (slot.name.clone(), slot.cell.to_string()))
            .chain(extras)
            .collect();
        warnings.extend(names::wire_aliases(
            &mut names,
            aliases.iter().map(|(name, token)| (name.as_str(), token.as_str())),
        ));

        let mut sheet = Placement::default();
        sheet.place_table(&table)?;
        let frames = sheet.place_blocks(&layout, &moved)?;

        let mut borders = BorderPlan::new();
        borders.draw(table.range(), BorderMode::Full);
        for frame in &frames {
            borders.draw(frame.rect, BorderMode::Outer);
            if frame.padded {
                sheet.pad(frame.rect, &frame.owner);
            }
        }
        let cells = sheet.cells;

        let nodes: Vec<(usize, FormulaNode<'_>)> = cells
            .iter()
            .enumerate()
            .filter_map(|(i, planned)| match &planned.content {
                CellContent::Formula(expr) => Some((
                    i,
                    FormulaNode {
                        slot: planned.owner.as_str(),
                        cell: planned.cell,
                        expr,
                    },
                )),
                _ => None,
            })
            .collect();
        let graph_nodes: Vec<FormulaNode<'_>> = nodes.iter().map(|(_, node)| *node).collect();
        let formula_order: Vec<usize> = graph::formula_order(&graph_nodes, &names)?
            .into_iter()
            .map(|n| nodes[n].0)
            .collect();

        let inputs: BTreeMap<CellAddress, String> = cells
            .iter()
            .filter(|planned| planned.role == Role::Input)
            .map(|planned| (planned.cell, planned.owner.clone()))
            .collect();
        let protection = ProtectionPolicy::derive(&config.protection, &inputs)?;

        tracing::info!(
            rows,
            names = names.len(),
            formulas = formula_order.len(),
            warnings = warnings.len(),
            "planned sheet"
        );

        Ok(Self {
            sheet_name: config.output.sheet_name.clone(),
            series,
            table,
            cells,
            names,
            formula_order,
            borders,
            column_widths: layout.column_widths,
            protection,
            warnings,
        })
    }

    pub fn cell_at(&self, cell: CellAddress) -> Option<&PlannedCell> {
        self.cells.iter().find(|planned| planned.cell == cell)
    }

    /// Input slots in layout order
    pub fn inputs(&self) -> impl Iterator<Item = &PlannedCell> {
        self.cells.iter().filter(|planned| planned.role == Role::Input)
    }

    /// Output slots in layout order
    pub fn outputs(&self) -> impl Iterator<Item = &PlannedCell> {
        self.cells.iter().filter(|planned| planned.role == Role::Output)
    }

    /// Whether the cell ends up locked once protection is applied
    pub fn is_locked(&self, cell: CellAddress) -> bool {
        if self.table.range().contains(cell) {
            return true;
        }
        match self.cell_at(cell) {
            Some(planned) => planned.role.is_locked(),
            None => self.protection.is_extra_locked(cell),
        }
    }

    /// Fill the named inputs and compute every output slot
    ///
    /// Inputs not given stay blank. Names are matched without regard to case.
    pub fn evaluate<'a>(
        &self,
        inputs: impl IntoIterator<Item = (&'a str, f64)>,
    ) -> Result<Vec<SlotOutput>, ConfigError> {
        let mut sheet = SheetValues::new(self);

        for (name, value) in inputs {
            let input = self
                .inputs()
                .find(|planned| planned.owner.eq_ignore_ascii_case(name))
                .ok_or_else(|| ConfigError::UnknownInput(name.to_string()))?;
            sheet.values.insert(input.cell, Value::Number(value));
        }

        for &i in &self.formula_order {
            let planned = &self.cells[i];
            if let CellContent::Formula(expr) = &planned.content {
                let value = eval::evaluate(expr, &sheet);
                tracing::trace!(slot = %planned.owner, %value, "evaluated");
                sheet.values.insert(planned.cell, value);
            }
        }

        Ok(self
            .outputs()
            .map(|planned| SlotOutput {
                name: planned.owner.clone(),
                cell: planned.cell,
                style: planned.style,
                value: sheet
                    .values
                    .get(&planned.cell)
                    .cloned()
                    .unwrap_or(Value::Blank),
            })
            .collect())
    }
}

struct Relocation {
    /// Slots moved away from their block
    moved: BTreeSet<String>,
    /// Slots whose alias was dropped
    unaliased: BTreeSet<String>,
    /// Entries naming no slot, as (name, address token)
    extras: Vec<(String, String)>,
    warnings: Vec<WiringWarning>,
}

/// Move slots named in the configuration; unknown names become extra aliases
fn relocate(layout: &mut Layout, entries: &BTreeMap<String, String>) -> Relocation {
    let mut relocation = Relocation {
        moved: BTreeSet::new(),
        unaliased: BTreeSet::new(),
        extras: Vec::new(),
        warnings: Vec::new(),
    };

    for (name, token) in entries {
        let Some(slot) = layout.slot_mut(name) else {
            relocation.extras.push((name.clone(), token.clone()));
            continue;
        };
        match token.parse::<CellAddress>() {
            Ok(cell) => {
                if cell != slot.cell {
                    tracing::debug!(slot = %slot.name, from = %slot.cell, to = %cell, "relocated slot");
                    relocation.moved.insert(slot.name.clone());
                    slot.cell = cell;
                }
            }
            Err(e) => {
                let warning = WiringWarning {
                    name: slot.name.clone(),
                    reason: format!("relocation address: {e}"),
                };
                tracing::warn!(name = %warning.name, reason = %warning.reason, "dropping alias");
                relocation.unaliased.insert(slot.name.clone());
                relocation.warnings.push(warning);
            }
        }
    }
    relocation
}

/// A bordered rectangle: a whole block, or one relocated slot with its label
struct Frame {
    owner: String,
    rect: CellRange,
    /// Unclaimed cells inside get formatted blanks
    padded: bool,
}

/// Cells placed so far, with the owner of every claimed address
#[derive(Default)]
struct Placement {
    cells: Vec<PlannedCell>,
    owners: BTreeMap<CellAddress, String>,
}

impl Placement {
    fn claim(&mut self, cell: CellAddress, owner: &str) -> Result<(), ConfigError> {
        if let Some(first) = self.owners.get(&cell) {
            return Err(ConfigError::Overlap {
                cell,
                first: first.clone(),
                second: owner.to_string(),
            });
        }
        self.owners.insert(cell, owner.to_string());
        Ok(())
    }

    fn push(
        &mut self,
        cell: CellAddress,
        role: Role,
        style: NumberStyle,
        content: CellContent,
        owner: &str,
    ) -> Result<(), ConfigError> {
        self.claim(cell, owner)?;
        self.cells.push(PlannedCell {
            cell,
            role,
            style,
            content,
            owner: owner.to_string(),
        });
        Ok(())
    }

    fn place_table(&mut self, table: &TablePlacement) -> Result<(), ConfigError> {
        for cell in table.range().cells() {
            self.claim(cell, "table")?;
        }
        let header = |col| CellAddress::new(table.header_row, col);
        self.cells.push(PlannedCell {
            cell: header(table.z_col),
            role: Role::Heading,
            style: NumberStyle::General,
            content: CellContent::Text("Z-Value".to_string()),
            owner: "table".to_string(),
        });
        self.cells.push(PlannedCell {
            cell: header(table.p_col),
            role: Role::Heading,
            style: NumberStyle::General,
            content: CellContent::Text("Probability".to_string()),
            owner: "table".to_string(),
        });
        Ok(())
    }

    /// Place headings, labels and slots; returns the rectangles to border
    ///
    /// A block's rectangle spans its heading and the slots still in place.
    /// Each moved slot gets its own frame around label and cell.
    fn place_blocks(
        &mut self,
        layout: &Layout,
        moved: &BTreeSet<String>,
    ) -> Result<Vec<Frame>, ConfigError> {
        let mut frames = Vec::new();

        for block in &layout.blocks {
            let title = block.title.as_str();
            let mut rect = CellRange::single(block.heading);
            self.push(
                block.heading,
                Role::Heading,
                NumberStyle::General,
                CellContent::Text(block.title.clone()),
                title,
            )?;
            if let Some(right) = block.heading.right() {
                self.push(right, Role::Heading, NumberStyle::General, CellContent::Empty, title)?;
                rect = rect.expand_to(right);
            }

            for slot in &block.slots {
                let label = slot.label_cell().ok_or_else(|| ConfigError::LabelOutOfBounds {
                    slot: slot.name.clone(),
                    cell: slot.cell,
                })?;
                self.push(
                    label,
                    Role::Label,
                    NumberStyle::General,
                    CellContent::Text(slot.label.clone()),
                    &slot.name,
                )?;

                let content = match &slot.formula {
                    Some(expr) => CellContent::Formula(expr.clone()),
                    None => CellContent::Empty,
                };
                self.push(slot.cell, slot.role, slot.style, content, &slot.name)?;

                if moved.contains(&slot.name) {
                    frames.push(Frame {
                        owner: slot.name.clone(),
                        rect: CellRange::new(label, slot.cell),
                        padded: false,
                    });
                } else {
                    rect = rect.expand_to(label).expand_to(slot.cell);
                }
            }

            frames.push(Frame {
                owner: block.title.clone(),
                rect,
                padded: true,
            });
        }
        Ok(frames)
    }

    /// Formatted blanks for unclaimed cells inside a bordered block
    fn pad(&mut self, rect: CellRange, owner: &str) {
        for cell in rect.cells() {
            if !self.owners.contains_key(&cell) {
                self.owners.insert(cell, owner.to_string());
                self.cells.push(PlannedCell {
                    cell,
                    role: Role::Label,
                    style: NumberStyle::General,
                    content: CellContent::Empty,
                    owner: owner.to_string(),
                });
            }
        }
    }
}

/// Cell values during evaluation
struct SheetValues<'a> {
    plan: &'a SheetPlan,
    z: Vec<Value>,
    p: Vec<Value>,
    values: HashMap<CellAddress, Value>,
}

impl<'a> SheetValues<'a> {
    fn new(plan: &'a SheetPlan) -> Self {
        let values = plan
            .cells
            .iter()
            .map(|planned| {
                let value = match &planned.content {
                    CellContent::Text(text) => Value::Text(text.clone()),
                    CellContent::Number(n) => Value::Number(*n),
                    CellContent::Formula(_) | CellContent::Empty => Value::Blank,
                };
                (planned.cell, value)
            })
            .collect();

        Self {
            plan,
            z: plan.series.iter().map(|e| Value::Number(e.z)).collect(),
            p: plan.series.iter().map(|e| Value::Number(e.probability)).collect(),
            values,
        }
    }

    fn value_at(&self, cell: CellAddress) -> Value {
        let table = &self.plan.table;
        if table.z_range().contains(cell) || table.p_range().contains(cell) {
            let column = if cell.col == table.z_col { &self.z } else { &self.p };
            let row = (cell.row - table.first_data_row()) as usize;
            return column.get(row).cloned().unwrap_or(Value::Blank);
        }
        self.values.get(&cell).cloned().unwrap_or(Value::Blank)
    }
}

impl NameResolver for SheetValues<'_> {
    fn resolve(&self, name: &str) -> Option<Binding<'_>> {
        let named = self.plan.names.get(name)?;
        let table = &self.plan.table;
        let binding = if named.range == table.z_range() {
            Binding::Column(&self.z)
        } else if named.range == table.p_range() {
            Binding::Column(&self.p)
        } else if named.range.is_single() {
            Binding::Scalar(self.value_at(named.range.first))
        } else {
            Binding::Scalar(Value::Error(CellError::Value))
        };
        Some(binding)
    }
}
