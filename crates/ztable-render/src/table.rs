//! Plain table exports of the Z-series
//!
//! ```text
//! csv:   z_value,probability        json:  [{"z_value":-3.99,"probability":0.000033}, ...]
//!        -3.990000,0.000033
//!
//! text:  Z-Value  Probability
//!        -3.99    0.000033
//! ```

use serde::Serialize;
use std::fmt::Write as _;
use std::str::FromStr;
use ztable_core::{RenderError, Renderer, SheetPlan};

/// Output flavour of [`TableRenderer`]
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub enum TableFormat {
    #[default]
    Csv,
    Json,
    Text,
}

impl FromStr for TableFormat {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "csv" => Ok(TableFormat::Csv),
            "json" => Ok(TableFormat::Json),
            "text" | "txt" => Ok(TableFormat::Text),
            other => Err(format!("unknown table format '{other}' (expected csv, json or text)")),
        }
    }
}

/// Renders the raw (z, Φ(z)) rows without any calculator
#[derive(Clone, Debug)]
pub struct TableRenderer {
    pub format: TableFormat,
    /// Decimal places for probabilities (and z-values in CSV)
    pub decimals: u32,
}

impl Default for TableRenderer {
    fn default() -> Self {
        Self {
            format: TableFormat::Csv,
            decimals: 6,
        }
    }
}

#[derive(Serialize)]
struct Row {
    z_value: f64,
    probability: f64,
}

impl TableRenderer {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn format(mut self, format: TableFormat) -> Self {
        self.format = format;
        self
    }

    pub fn decimals(mut self, decimals: u32) -> Self {
        self.decimals = decimals;
        self
    }

    fn csv(&self, plan: &SheetPlan) -> String {
        let places = self.decimals as usize;
        let mut out = String::from("z_value,probability\n");
        for entry in plan.series.iter() {
            let _ = writeln!(out, "{:.places$},{:.places$}", entry.z, entry.probability);
        }
        out
    }

    fn json(&self, plan: &SheetPlan) -> Result<String, RenderError> {
        let scale = 10_f64.powi(self.decimals as i32);
        let rows: Vec<Row> = plan
            .series
            .iter()
            .map(|entry| Row {
                z_value: entry.z,
                probability: (entry.probability * scale).round() / scale,
            })
            .collect();
        serde_json::to_string_pretty(&rows).map_err(|e| RenderError::Format(e.to_string()))
    }

    fn text(&self, plan: &SheetPlan) -> String {
        let z_places = plan.series.precision() as usize;
        let p_places = self.decimals as usize;
        let z_width = plan
            .series
            .iter()
            .map(|e| format!("{:.z_places$}", e.z).len())
            .max()
            .unwrap_or(0)
            .max("Z-Value".len());

        let mut out = format!("{:<z_width$}  Probability\n", "Z-Value");
        for entry in plan.series.iter() {
            let _ = writeln!(out, "{:>z_width$.z_places$}  {:.p_places$}", entry.z, entry.probability);
        }
        out
    }
}

impl Renderer for TableRenderer {
    type Output = String;

    fn render(&self, plan: &SheetPlan) -> Result<String, RenderError> {
        if plan.series.is_empty() {
            return Err(RenderError::InvalidData("No table rows to render".into()));
        }
        match self.format {
            TableFormat::Csv => Ok(self.csv(plan)),
            TableFormat::Json => self.json(plan),
            TableFormat::Text => Ok(self.text(plan)),
        }
    }
}
