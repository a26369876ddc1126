//! Declarative sheet layout
//!
//! The calculator area is a table of [`Slot`]s grouped into [`Block`]s. Each
//! slot names one cell, its role, label, number style and (for outputs) the
//! formula that fills it. Formulas refer to other slots and to the table
//! columns by name only, so relocating a slot never touches a formula.
//!
//! Default placement (labels in D, values in E):
//!
//! ```text
//! D1   Z-Score Lookup             D9   Sample Mean Z-Score      D18  Sample Proportion Z-Score
//! E2   ZLow          (input)      E10  PopMean       (input)    E19  PopProportion     (input)
//! E3   ProbBelowLow               E11  PopStdDev     (input)    E20  PropSampleSize    (input)
//! E4   ZHigh         (input)      E12  MeanSampleSize(input)    E21  PropPopSize       (input)
//! E5   ProbBelowHigh              E13  MeanPopSize   (input)    E22  PropSuccesses     (input)
//! E6   ProbBetween                E14  SampleMean    (input)    E23  SampleProportion  (input)
//! E7   ProbAboveLow               E15  MeanStdError             E24  CalcProportion
//!                                 E16  MeanZScore               E25  PropStdError
//!                                                               E26  PropZScore
//!                                                               E27  CalcPropZScore
//! ```

use crate::address::CellAddress;
use crate::formula::{blank_guarded, finite_population_se, probability_lookup, Expr};
use crate::names::{PROBABILITIES, Z_VALUES};
use serde::Serialize;

/// What a cell is for; decides its fill and whether it is locked
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub enum Role {
    Input,
    Output,
    Label,
    Heading,
    Table,
}

impl Role {
    /// Everything except user inputs is read-only
    pub fn is_locked(self) -> bool {
        !matches!(self, Role::Input)
    }
}

/// Number display of a cell
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, Serialize)]
pub enum NumberStyle {
    #[default]
    General,
    Integer,
    Fixed(u8),
}

impl NumberStyle {
    /// Spreadsheet number format code, `None` for the general format
    pub fn num_format(self) -> Option<String> {
        match self {
            NumberStyle::General => None,
            NumberStyle::Integer => Some("0".to_string()),
            NumberStyle::Fixed(0) => Some("0".to_string()),
            NumberStyle::Fixed(places) => Some(format!("0.{}", "0".repeat(usize::from(places)))),
        }
    }

    /// Render a number the way the format would show it
    pub fn display(self, value: f64) -> String {
        match self {
            NumberStyle::General => value.to_string(),
            NumberStyle::Integer => format!("{value:.0}"),
            NumberStyle::Fixed(places) => format!("{value:.*}", usize::from(places)),
        }
    }
}

/// One named cell of the calculator area
#[derive(Clone, Debug, PartialEq)]
pub struct Slot {
    pub name: String,
    pub label: String,
    pub cell: CellAddress,
    pub role: Role,
    pub style: NumberStyle,
    pub formula: Option<Expr>,
}

impl Slot {
    fn input(name: &str, label: &str, row: u32) -> Self {
        Self {
            name: name.to_string(),
            label: label.to_string(),
            cell: CellAddress::new(row, VALUE_COL),
            role: Role::Input,
            style: NumberStyle::General,
            formula: None,
        }
    }

    fn output(name: &str, label: &str, row: u32, formula: Expr) -> Self {
        Self {
            role: Role::Output,
            formula: Some(formula),
            ..Self::input(name, label, row)
        }
    }

    fn styled(mut self, style: NumberStyle) -> Self {
        self.style = style;
        self
    }

    /// Where the label goes: immediately left of the slot
    pub fn label_cell(&self) -> Option<CellAddress> {
        self.cell.left()
    }
}

/// A titled group of slots with an outer border
#[derive(Clone, Debug, PartialEq)]
pub struct Block {
    pub title: String,
    pub heading: CellAddress,
    pub slots: Vec<Slot>,
}

/// The whole sheet arrangement
#[derive(Clone, Debug, PartialEq)]
pub struct Layout {
    pub blocks: Vec<Block>,
    /// Fixed widths as (column, width in characters)
    pub column_widths: Vec<(u16, f64)>,
}

const LABEL_COL: u16 = 3;
const VALUE_COL: u16 = 4;

impl Layout {
    /// The three calculators, with lookups rounding to `precision` decimals
    pub fn standard(precision: u32) -> Self {
        Self {
            blocks: vec![lookup_block(precision), mean_block(), proportion_block()],
            column_widths: vec![(0, 10.0), (1, 13.0), (2, 3.0), (3, 34.0), (4, 14.0)],
        }
    }

    pub fn slots(&self) -> impl Iterator<Item = &Slot> {
        self.blocks.iter().flat_map(|block| block.slots.iter())
    }

    /// Case-insensitive slot lookup
    pub fn slot(&self, name: &str) -> Option<&Slot> {
        self.slots().find(|slot| slot.name.eq_ignore_ascii_case(name))
    }

    pub fn slot_mut(&mut self, name: &str) -> Option<&mut Slot> {
        self.blocks
            .iter_mut()
            .flat_map(|block| block.slots.iter_mut())
            .find(|slot| slot.name.eq_ignore_ascii_case(name))
    }
}

fn heading(row: u32) -> CellAddress {
    CellAddress::new(row, LABEL_COL)
}

fn lookup_block(precision: u32) -> Block {
    let lookup = |input: &str| probability_lookup(input, Z_VALUES, PROBABILITIES, precision);
    let z_style = NumberStyle::Fixed(u8::try_from(precision).unwrap_or(u8::MAX));
    let p_style = NumberStyle::Fixed(4);

    Block {
        title: "Z-Score Lookup".to_string(),
        heading: heading(0),
        slots: vec![
            Slot::input("ZLow", "Z-score 1 (z1)", 1).styled(z_style),
            Slot::output("ProbBelowLow", "P(Z < z1)", 2, lookup("ZLow")).styled(p_style),
            Slot::input("ZHigh", "Z-score 2 (z2)", 3).styled(z_style),
            Slot::output("ProbBelowHigh", "P(Z < z2)", 4, lookup("ZHigh")).styled(p_style),
            Slot::output(
                "ProbBetween",
                "P(z1 < Z < z2)",
                5,
                blank_guarded(
                    &["ProbBelowLow", "ProbBelowHigh"],
                    Expr::name("ProbBelowHigh").sub(Expr::name("ProbBelowLow")).abs(),
                ),
            )
            .styled(p_style),
            Slot::output(
                "ProbAboveLow",
                "P(Z > z1)",
                6,
                blank_guarded(
                    &["ProbBelowLow"],
                    Expr::num(1.0).sub(Expr::name("ProbBelowLow")),
                ),
            )
            .styled(p_style),
        ],
    }
}

fn mean_block() -> Block {
    let standard_error = finite_population_se(
        Expr::name("PopStdDev").div(Expr::name("MeanSampleSize").sqrt()),
        "MeanPopSize",
        "MeanSampleSize",
    );
    let z_score = Expr::name("SampleMean")
        .sub(Expr::name("PopMean"))
        .div(Expr::name("MeanStdError"));

    Block {
        title: "Sample Mean Z-Score".to_string(),
        heading: heading(8),
        slots: vec![
            Slot::input("PopMean", "Population mean (mu)", 9),
            Slot::input("PopStdDev", "Population std. deviation (sigma)", 10),
            Slot::input("MeanSampleSize", "Sample size (n)", 11).styled(NumberStyle::Integer),
            Slot::input("MeanPopSize", "Population size (N, optional)", 12)
                .styled(NumberStyle::Integer),
            Slot::input("SampleMean", "Sample mean (x-bar)", 13),
            Slot::output(
                "MeanStdError",
                "Standard error",
                14,
                blank_guarded(&["PopStdDev", "MeanSampleSize"], standard_error),
            )
            .styled(NumberStyle::Fixed(4)),
            Slot::output(
                "MeanZScore",
                "Z-score",
                15,
                blank_guarded(&["SampleMean", "PopMean", "MeanStdError"], z_score),
            )
            .styled(NumberStyle::Fixed(2)),
        ],
    }
}

fn proportion_block() -> Block {
    let p = || Expr::name("PopProportion");
    let standard_error = finite_population_se(
        p().mul(Expr::num(1.0).sub(p()))
            .div(Expr::name("PropSampleSize"))
            .sqrt(),
        "PropPopSize",
        "PropSampleSize",
    );
    let z_against = |estimate: &str| {
        blank_guarded(
            &[estimate, "PopProportion", "PropStdError"],
            Expr::name(estimate).sub(p()).div(Expr::name("PropStdError")),
        )
    };

    Block {
        title: "Sample Proportion Z-Score".to_string(),
        heading: heading(17),
        slots: vec![
            Slot::input("PopProportion", "Population proportion (p)", 18),
            Slot::input("PropSampleSize", "Sample size (n)", 19).styled(NumberStyle::Integer),
            Slot::input("PropPopSize", "Population size (N, optional)", 20)
                .styled(NumberStyle::Integer),
            Slot::input("PropSuccesses", "Successes (x)", 21).styled(NumberStyle::Integer),
            Slot::input("SampleProportion", "Sample proportion (manual)", 22)
                .styled(NumberStyle::Fixed(4)),
            Slot::output(
                "CalcProportion",
                "Calculated proportion (x/n)",
                23,
                blank_guarded(
                    &["PropSuccesses", "PropSampleSize"],
                    Expr::name("PropSuccesses").div(Expr::name("PropSampleSize")),
                ),
            )
            .styled(NumberStyle::Fixed(4)),
            Slot::output(
                "PropStdError",
                "Standard error",
                24,
                blank_guarded(&["PopProportion", "PropSampleSize"], standard_error),
            )
            .styled(NumberStyle::Fixed(4)),
            Slot::output("PropZScore", "Z-score (manual proportion)", 25, z_against("SampleProportion"))
                .styled(NumberStyle::Fixed(2)),
            Slot::output(
                "CalcPropZScore",
                "Z-score (calculated proportion)",
                26,
                z_against("CalcProportion"),
            )
            .styled(NumberStyle::Fixed(2)),
        ],
    }
}
