//! Named-range wiring
//!
//! Two kinds of names are defined on the sheet:
//! - **column ranges** over the z and probability columns, which every lookup
//!   needs; failing to define them is fatal ([`WiringError`])
//! - **aliases** for single input/output cells, defined best-effort: an entry
//!   with an invalid name or an empty/malformed address is skipped and
//!   reported as a [`WiringWarning`]
//!
//! Names follow spreadsheet rules: they start with a letter, `_` or `\`,
//! contain only letters, digits, `.` and `_`, and may not look like a cell
//! reference (`Z1`, `R1C1`) or a boolean keyword. Lookup is case-insensitive.

use crate::address::{split_reference, CellAddress, CellRange};
use crate::WiringError;
use serde::Serialize;
use std::collections::HashMap;
use std::fmt;

/// Name of the z-value column range
pub const Z_VALUES: &str = "ZValues";

/// Name of the probability column range
pub const PROBABILITIES: &str = "Probabilities";

const MAX_NAME_LEN: usize = 255;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub enum NameKind {
    Column,
    Alias,
}

/// A name bound to a cell or rectangle of the sheet
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct NamedRange {
    pub name: String,
    pub range: CellRange,
    pub kind: NameKind,
}

impl NamedRange {
    /// Workbook definition formula, e.g. `='Z-Table'!$A$2:$A$800`
    pub fn definition(&self, sheet: &str) -> String {
        format!("={}!{}", quote_sheet_name(sheet), self.range.absolute())
    }
}

/// A wiring entry that was skipped
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct WiringWarning {
    pub name: String,
    pub reason: String,
}

impl fmt::Display for WiringWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "skipped name '{}': {}", self.name, self.reason)
    }
}

/// Why a name is not acceptable
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum NameIssue {
    Empty,
    TooLong,
    InvalidStart(char),
    InvalidChar(char),
    CellReference,
    Keyword,
}

impl fmt::Display for NameIssue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            NameIssue::Empty => f.write_str("name is empty"),
            NameIssue::TooLong => write!(f, "name is longer than {MAX_NAME_LEN} characters"),
            NameIssue::InvalidStart(c) => write!(f, "name cannot start with '{c}'"),
            NameIssue::InvalidChar(c) => write!(f, "name cannot contain '{c}'"),
            NameIssue::CellReference => f.write_str("name looks like a cell reference"),
            NameIssue::Keyword => f.write_str("name is a reserved keyword"),
        }
    }
}

/// Check a name against spreadsheet naming rules
pub fn validate_name(name: &str) -> Result<(), NameIssue> {
    if name.is_empty() {
        return Err(NameIssue::Empty);
    }
    if name.chars().count() > MAX_NAME_LEN {
        return Err(NameIssue::TooLong);
    }

    let mut chars = name.chars();
    if let Some(first) = chars.next() {
        if !first.is_alphabetic() && first != '_' && first != '\\' {
            return Err(NameIssue::InvalidStart(first));
        }
    }
    if let Some(bad) = chars.find(|c| !c.is_alphanumeric() && *c != '.' && *c != '_') {
        return Err(NameIssue::InvalidChar(bad));
    }

    if split_reference(name).is_some() || is_r1c1_reference(name) {
        return Err(NameIssue::CellReference);
    }
    if name.eq_ignore_ascii_case("TRUE") || name.eq_ignore_ascii_case("FALSE") {
        return Err(NameIssue::Keyword);
    }
    Ok(())
}

/// `R`, `C`, `R12`, `C3`, `R1C1` and friends
fn is_r1c1_reference(name: &str) -> bool {
    let upper = name.to_ascii_uppercase();
    let digits = |s: &str| s.bytes().all(|b| b.is_ascii_digit());

    if let Some(rest) = upper.strip_prefix('R') {
        match rest.split_once('C') {
            Some((row, col)) => digits(row) && digits(col),
            None => digits(rest),
        }
    } else if let Some(rest) = upper.strip_prefix('C') {
        digits(rest)
    } else {
        false
    }
}

/// Quote a sheet name for use in a reference when it is not a plain identifier
pub fn quote_sheet_name(sheet: &str) -> String {
    let plain = sheet
        .chars()
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
        && sheet.chars().all(|c| c.is_ascii_alphanumeric() || c == '_');
    if plain {
        sheet.to_string()
    } else {
        format!("'{}'", sheet.replace('\'', "''"))
    }
}

/// Why a definition was refused
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Rejection {
    Invalid(NameIssue),
    Duplicate,
}

impl fmt::Display for Rejection {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Rejection::Invalid(issue) => write!(f, "{issue}"),
            Rejection::Duplicate => f.write_str("name is already defined"),
        }
    }
}

/// The set of names defined on the sheet, in definition order
#[derive(Clone, Debug, Default)]
pub struct NameRegistry {
    entries: Vec<NamedRange>,
    index: HashMap<String, usize>,
}

impl NameRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Define `name` over `range`; names are unique regardless of case
    pub fn define(
        &mut self,
        name: &str,
        range: CellRange,
        kind: NameKind,
    ) -> Result<(), Rejection> {
        validate_name(name).map_err(Rejection::Invalid)?;
        let key = name.to_uppercase();
        if self.index.contains_key(&key) {
            return Err(Rejection::Duplicate);
        }
        self.index.insert(key, self.entries.len());
        self.entries.push(NamedRange {
            name: name.to_string(),
            range,
            kind,
        });
        Ok(())
    }

    /// Define a column range the sheet cannot work without
    pub fn define_column(&mut self, name: &str, range: CellRange) -> Result<(), WiringError> {
        self.define(name, range, NameKind::Column)
            .map_err(|rejection| WiringError::RequiredRange {
                name: name.to_string(),
                reason: rejection.to_string(),
            })
    }

    /// Define a single-cell alias from an address token
    pub fn define_alias(&mut self, name: &str, token: &str) -> Result<CellAddress, WiringWarning> {
        let warn = |reason: String| WiringWarning {
            name: name.to_string(),
            reason,
        };

        let range: CellRange = token
            .parse()
            .map_err(|e| warn(format!("target address: {e}")))?;
        if !range.is_single() {
            return Err(warn(format!("alias target '{range}' is not a single cell")));
        }
        self.define(name, range, NameKind::Alias)
            .map_err(|rejection| warn(rejection.to_string()))?;
        Ok(range.first)
    }

    pub fn get(&self, name: &str) -> Option<&NamedRange> {
        self.index
            .get(&name.to_uppercase())
            .map(|&i| &self.entries[i])
    }

    pub fn contains(&self, name: &str) -> bool {
        self.index.contains_key(&name.to_uppercase())
    }

    pub fn iter(&self) -> impl Iterator<Item = &NamedRange> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Define every alias entry, skipping and logging the ones that fail
pub fn wire_aliases<'a>(
    registry: &mut NameRegistry,
    entries: impl IntoIterator<Item = (&'a str, &'a str)>,
) -> Vec<WiringWarning> {
    let mut warnings = Vec::new();
    for (name, token) in entries {
        match registry.define_alias(name, token) {
            Ok(cell) => tracing::trace!(name, %cell, "defined alias"),
            Err(warning) => {
                tracing::warn!(name = %warning.name, reason = %warning.reason, "skipping named range");
                warnings.push(warning);
            }
        }
    }
    warnings
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn accepts_ordinary_names() {
        for name in ["ZValues", "Probabilities", "PopMean", "_hidden", "mean.sample", "\\x"] {
            assert_eq!(validate_name(name), Ok(()), "{name}");
        }
    }

    #[test]
    fn rejects_cell_references() {
        for name in ["Z1", "AB12", "$A$1", "R", "C", "r1c1", "R12", "C3", "RC"] {
            assert!(validate_name(name).is_err(), "{name}");
        }
        assert_eq!(validate_name("Z1"), Err(NameIssue::CellReference));
    }

    #[test]
    fn rejects_keywords_and_bad_characters() {
        assert_eq!(validate_name("TRUE"), Err(NameIssue::Keyword));
        assert_eq!(validate_name("false"), Err(NameIssue::Keyword));
        assert_eq!(validate_name(""), Err(NameIssue::Empty));
        assert_eq!(validate_name("1st"), Err(NameIssue::InvalidStart('1')));
        assert_eq!(validate_name("pop mean"), Err(NameIssue::InvalidChar(' ')));
        assert_eq!(validate_name(&"a".repeat(256)), Err(NameIssue::TooLong));
    }

    #[test]
    fn sheet_names_are_quoted_when_needed() {
        assert_eq!(quote_sheet_name("Sheet1"), "Sheet1");
        assert_eq!(quote_sheet_name("Z-Table"), "'Z-Table'");
        assert_eq!(quote_sheet_name("Bob's"), "'Bob''s'");
    }

    #[test]
    fn column_definition_formula() {
        let mut registry = NameRegistry::new();
        registry
            .define_column(Z_VALUES, "A2:A800".parse().unwrap())
            .unwrap();
        let named = registry.get("zvalues").unwrap();
        assert_eq!(named.definition("Z-Table"), "='Z-Table'!$A$2:$A$800");
        assert_eq!(named.kind, NameKind::Column);
    }

    #[test]
    fn duplicate_required_range_is_fatal() {
        let mut registry = NameRegistry::new();
        registry.define_column(Z_VALUES, "A2:A10".parse().unwrap()).unwrap();
        let err = registry
            .define_column("ZVALUES", "B2:B10".parse().unwrap())
            .unwrap_err();
        assert!(matches!(err, WiringError::RequiredRange { .. }));
    }

    #[test]
    fn aliases_are_best_effort() {
        let mut registry = NameRegistry::new();
        let warnings = wire_aliases(
            &mut registry,
            [
                ("PopMean", "E10"),
                ("Empty", ""),
                ("Broken", "E"),
                ("Wide", "E1:E2"),
                ("Z1", "E11"),
                ("popmean", "E12"),
            ],
        );

        assert_eq!(registry.len(), 1);
        assert_eq!(
            registry.get("PopMean").unwrap().range,
            CellRange::single(CellAddress::new(9, 4))
        );
        let skipped: Vec<&str> = warnings.iter().map(|w| w.name.as_str()).collect();
        assert_eq!(skipped, vec!["Empty", "Broken", "Wide", "Z1", "popmean"]);
        assert_eq!(
            warnings[0].to_string(),
            "skipped name 'Empty': target address: empty cell address"
        );
    }
}
