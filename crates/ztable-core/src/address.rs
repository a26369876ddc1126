//! Cell addresses and rectangular ranges
//!
//! Addresses are zero-based internally (`row`, `col`), the same convention
//! the xlsx writer uses, and are read and written in A1 notation:
//!
//! ```text
//! CellAddress { row: 11, col: 4 }  <->  "E12"  /  "$E$12"
//! CellRange  (A2, A800)            <->  "A2:A800"
//! ```

use crate::AddressError;
use serde::Serialize;
use std::fmt;
use std::str::FromStr;

/// Last addressable row (zero-based)
pub const MAX_ROW: u32 = 1_048_575;

/// Last addressable column (zero-based, `XFD`)
pub const MAX_COL: u16 = 16_383;

/// A single cell in the grid
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize)]
pub struct CellAddress {
    pub row: u32,
    pub col: u16,
}

impl CellAddress {
    pub const fn new(row: u32, col: u16) -> Self {
        Self { row, col }
    }

    /// The cell immediately to the left, if any
    pub fn left(self) -> Option<Self> {
        self.col.checked_sub(1).map(|col| Self::new(self.row, col))
    }

    /// The cell immediately to the right, if inside the grid
    pub fn right(self) -> Option<Self> {
        (self.col < MAX_COL).then(|| Self::new(self.row, self.col + 1))
    }

    /// Offset by whole rows, if the result stays inside the grid
    pub fn down(self, rows: u32) -> Option<Self> {
        self.row
            .checked_add(rows)
            .filter(|row| *row <= MAX_ROW)
            .map(|row| Self::new(row, self.col))
    }

    /// Absolute A1 reference (`$E$12`)
    pub fn absolute(self) -> String {
        format!("${}${}", col_to_letter(self.col), self.row + 1)
    }
}

impl fmt::Display for CellAddress {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}{}", col_to_letter(self.col), self.row + 1)
    }
}

impl FromStr for CellAddress {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        if token.is_empty() {
            return Err(AddressError::Empty);
        }

        let (letters, digits) =
            split_reference(token).ok_or_else(|| AddressError::Malformed(token.to_string()))?;

        let col =
            letters_to_col(letters).ok_or_else(|| AddressError::OutOfBounds(token.to_string()))?;
        let row: u32 = digits
            .parse()
            .map_err(|_| AddressError::OutOfBounds(token.to_string()))?;
        if row == 0 || row - 1 > MAX_ROW {
            return Err(AddressError::OutOfBounds(token.to_string()));
        }

        Ok(Self::new(row - 1, col))
    }
}

/// A rectangle of cells, stored with normalized corners
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize)]
pub struct CellRange {
    pub first: CellAddress,
    pub last: CellAddress,
}

impl CellRange {
    /// Build a range from any two opposite corners
    pub fn new(a: CellAddress, b: CellAddress) -> Self {
        Self {
            first: CellAddress::new(a.row.min(b.row), a.col.min(b.col)),
            last: CellAddress::new(a.row.max(b.row), a.col.max(b.col)),
        }
    }

    pub fn single(cell: CellAddress) -> Self {
        Self {
            first: cell,
            last: cell,
        }
    }

    pub fn is_single(&self) -> bool {
        self.first == self.last
    }

    pub fn contains(&self, cell: CellAddress) -> bool {
        (self.first.row..=self.last.row).contains(&cell.row)
            && (self.first.col..=self.last.col).contains(&cell.col)
    }

    pub fn height(&self) -> u32 {
        self.last.row - self.first.row + 1
    }

    pub fn width(&self) -> u16 {
        self.last.col - self.first.col + 1
    }

    pub fn cell_count(&self) -> u64 {
        u64::from(self.height()) * u64::from(self.width())
    }

    /// Smallest range covering both `self` and `cell`
    pub fn expand_to(&self, cell: CellAddress) -> Self {
        Self::new(
            CellAddress::new(self.first.row.min(cell.row), self.first.col.min(cell.col)),
            CellAddress::new(self.last.row.max(cell.row), self.last.col.max(cell.col)),
        )
    }

    /// Every cell in the rectangle, row by row
    pub fn cells(&self) -> impl Iterator<Item = CellAddress> {
        let (first, last) = (self.first, self.last);
        (first.row..=last.row)
            .flat_map(move |row| (first.col..=last.col).map(move |col| CellAddress::new(row, col)))
    }

    /// Absolute reference (`$A$2:$A$800`, or `$E$3` for a single cell)
    pub fn absolute(&self) -> String {
        if self.is_single() {
            self.first.absolute()
        } else {
            format!("{}:{}", self.first.absolute(), self.last.absolute())
        }
    }
}

impl From<CellAddress> for CellRange {
    fn from(cell: CellAddress) -> Self {
        Self::single(cell)
    }
}

impl fmt::Display for CellRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_single() {
            write!(f, "{}", self.first)
        } else {
            write!(f, "{}:{}", self.first, self.last)
        }
    }
}

impl FromStr for CellRange {
    type Err = AddressError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let token = s.trim();
        match token.split_once(':') {
            Some((a, b)) => {
                if a.trim().is_empty() || b.trim().is_empty() {
                    return Err(AddressError::Malformed(token.to_string()));
                }
                Ok(Self::new(a.parse()?, b.parse()?))
            }
            None => token.parse::<CellAddress>().map(Self::single),
        }
    }
}

/// Convert column number to letters (0 -> A, 25 -> Z, 26 -> AA)
pub fn col_to_letter(col: u16) -> String {
    let mut result = String::new();
    let mut n = u32::from(col);
    loop {
        result.insert(0, (b'A' + (n % 26) as u8) as char);
        if n < 26 {
            break;
        }
        n = n / 26 - 1;
    }
    result
}

/// Convert column letters to a column number (A -> 0), `None` past `XFD`
fn letters_to_col(letters: &str) -> Option<u16> {
    let mut n: u32 = 0;
    for b in letters.bytes() {
        n = n * 26 + u32::from(b.to_ascii_uppercase() - b'A') + 1;
    }
    u16::try_from(n - 1).ok().filter(|col| *col <= MAX_COL)
}

/// Split `$AB$12` into (`AB`, `12`) when the token has the shape of an A1 reference
pub(crate) fn split_reference(token: &str) -> Option<(&str, &str)> {
    let body = token.strip_prefix('$').unwrap_or(token);
    let letter_end = body
        .bytes()
        .position(|b| !b.is_ascii_alphabetic())
        .unwrap_or(body.len());
    let (letters, rest) = body.split_at(letter_end);
    let digits = rest.strip_prefix('$').unwrap_or(rest);

    let shaped = (1..=3).contains(&letters.len())
        && !digits.is_empty()
        && digits.bytes().all(|b| b.is_ascii_digit());
    shaped.then_some((letters, digits))
}
