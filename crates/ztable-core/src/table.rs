//! Z-table generation
//!
//! A [`TableSpec`] describes a closed interval and a step as exact decimals.
//! [`generate`] validates it and produces the [`ZSeries`]: every grid point
//! `k / 10^precision` paired with the standard-normal CDF Φ(z).
//!
//! Grid points are computed from integers rather than by repeated addition,
//! so the sequence never drifts and each z is the double nearest to its
//! decimal literal (a `1.96` typed into a cell compares equal to the table's
//! `1.96`).

use crate::address::MAX_ROW;
use crate::ConfigError;
use rust_decimal::prelude::ToPrimitive;
use rust_decimal::{Decimal, RoundingStrategy};
use serde::{Deserialize, Serialize};
use statrs::function::erf::erfc;
use std::f64::consts::SQRT_2;

/// Largest supported number of decimal places in the step
pub const MAX_PRECISION: u32 = 10;

/// Interval and step of a Z-table
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSpec {
    pub lo: Decimal,
    pub hi: Decimal,
    pub step: Decimal,
}

impl Default for TableSpec {
    fn default() -> Self {
        Self {
            lo: Decimal::new(-399, 2),
            hi: Decimal::new(399, 2),
            step: Decimal::new(1, 2),
        }
    }
}

/// Integer description of a validated table: z_i = (first + i * stride) / 10^precision
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
struct Grid {
    first: i64,
    stride: i64,
    count: usize,
    precision: u32,
}

impl TableSpec {
    pub fn new(lo: Decimal, hi: Decimal, step: Decimal) -> Self {
        Self { lo, hi, step }
    }

    /// Decimal places of the step (`0.01` -> 2, `0.010` -> 2, `0.5` -> 1)
    pub fn precision(&self) -> u32 {
        self.step.normalize().scale()
    }

    /// Number of rows the table will have, after validation
    pub fn row_count(&self) -> Result<usize, ConfigError> {
        self.grid().map(|grid| grid.count)
    }

    fn grid(&self) -> Result<Grid, ConfigError> {
        if self.step <= Decimal::ZERO {
            return Err(ConfigError::NonPositiveStep(self.step));
        }
        let precision = self.precision();
        if precision > MAX_PRECISION {
            return Err(ConfigError::PrecisionTooHigh(self.step));
        }

        let lo = self
            .lo
            .round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero);
        let hi = self
            .hi
            .round_dp_with_strategy(precision, RoundingStrategy::MidpointAwayFromZero);
        if lo > hi {
            return Err(ConfigError::InvertedInterval { lo, hi });
        }

        let width = hi - lo;
        if !(width % self.step).is_zero() {
            return Err(ConfigError::StepMismatch {
                width,
                step: self.step,
            });
        }

        let scale = Decimal::from(10_i64.pow(precision));
        let to_units = |value: Decimal| value.checked_mul(scale).and_then(|units| units.to_i64());
        let (Some(first), Some(last), Some(stride)) =
            (to_units(lo), to_units(hi), to_units(self.step.normalize()))
        else {
            return Err(ConfigError::TooManyRows(u64::MAX));
        };

        let rows = (last - first) / stride + 1;
        let rows = u64::try_from(rows).unwrap_or(u64::MAX);
        // Row 1 of the sheet holds headers
        if rows > u64::from(MAX_ROW) {
            return Err(ConfigError::TooManyRows(rows));
        }

        Ok(Grid {
            first,
            stride,
            count: rows as usize,
            precision,
        })
    }
}

/// One row of the table
#[derive(Clone, Copy, Debug, PartialEq, Serialize)]
pub struct ZEntry {
    pub z: f64,
    pub probability: f64,
}

/// The ordered (z, Φ(z)) series
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct ZSeries {
    precision: u32,
    entries: Vec<ZEntry>,
}

impl ZSeries {
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Decimal places of the z column
    pub fn precision(&self) -> u32 {
        self.precision
    }

    pub fn entries(&self) -> &[ZEntry] {
        &self.entries
    }

    pub fn iter(&self) -> impl Iterator<Item = &ZEntry> {
        self.entries.iter()
    }

    pub fn first(&self) -> Option<&ZEntry> {
        self.entries.first()
    }

    pub fn last(&self) -> Option<&ZEntry> {
        self.entries.last()
    }

    /// Exact lookup of a z-value present in the table
    pub fn probability_of(&self, z: f64) -> Option<f64> {
        self.entries
            .iter()
            .find(|entry| entry.z == z)
            .map(|entry| entry.probability)
    }
}

/// Standard-normal cumulative distribution Φ(z)
pub fn standard_normal_cdf(z: f64) -> f64 {
    0.5 * erfc(-z / SQRT_2)
}

/// Validate `spec` and compute its Z-series
pub fn generate(spec: &TableSpec) -> Result<ZSeries, ConfigError> {
    let grid = spec.grid()?;
    let denominator = 10_f64.powi(grid.precision as i32);

    let entries = (0..grid.count)
        .map(|i| {
            let units = grid.first + grid.stride * i as i64;
            let z = units as f64 / denominator;
            ZEntry {
                z,
                probability: standard_normal_cdf(z),
            }
        })
        .collect();

    tracing::debug!(
        rows = grid.count,
        precision = grid.precision,
        "generated z-series"
    );

    Ok(ZSeries {
        precision: grid.precision,
        entries,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal_macros::dec;

    fn conventional() -> ZSeries {
        generate(&TableSpec::default()).unwrap()
    }

    #[test]
    fn conventional_table_has_799_rows() {
        let series = conventional();
        assert_eq!(series.len(), 799);
        assert_eq!(series.precision(), 2);
        assert_eq!(series.first().unwrap().z, -3.99);
        assert_eq!(series.last().unwrap().z, 3.99);
    }

    #[test]
    fn known_probabilities() {
        let series = conventional();
        assert!((series.probability_of(0.0).unwrap() - 0.5).abs() < 1e-6);
        assert!((series.probability_of(-3.99).unwrap() - 0.000033).abs() < 5e-7);
        assert!((series.probability_of(3.99).unwrap() - 0.999967).abs() < 5e-7);
        assert!((series.probability_of(1.96).unwrap() - 0.975002).abs() < 1e-6);
        assert!((series.probability_of(-1.0).unwrap() - 0.158655).abs() < 1e-6);
    }

    #[test]
    fn tail_keeps_six_significant_digits() {
        // Φ(-3.99) = 3.3037e-5
        let p = standard_normal_cdf(-3.99);
        assert!((p - 3.303_7e-5).abs() / 3.303_7e-5 < 1e-4);
    }

    #[test]
    fn z_values_equal_their_decimal_literals() {
        let series = conventional();
        for (i, entry) in series.iter().enumerate() {
            let literal: f64 = format!("{:.2}", -3.99 + 0.01 * i as f64).parse().unwrap();
            assert_eq!(entry.z, literal, "row {i}");
        }
    }

    #[test]
    fn strictly_increasing_and_monotone() {
        let series = conventional();
        for pair in series.entries().windows(2) {
            assert!(pair[0].z < pair[1].z);
            assert!(pair[0].probability <= pair[1].probability);
        }
        assert!(series
            .iter()
            .all(|e| (0.0..=1.0).contains(&e.probability)));
    }

    #[test]
    fn generation_is_deterministic() {
        let a = conventional();
        let b = conventional();
        let bits = |s: &ZSeries| {
            s.iter()
                .map(|e| (e.z.to_bits(), e.probability.to_bits()))
                .collect::<Vec<_>>()
        };
        assert_eq!(bits(&a), bits(&b));
    }

    #[test]
    fn length_formula_holds_for_other_steps() {
        let spec = TableSpec::new(dec!(-3), dec!(3), dec!(0.5));
        let series = generate(&spec).unwrap();
        assert_eq!(series.len(), 13);
        assert_eq!(series.precision(), 1);

        let spec = TableSpec::new(dec!(0), dec!(1), dec!(0.001));
        assert_eq!(spec.row_count().unwrap(), 1001);
    }

    #[test]
    fn trailing_zeros_do_not_change_precision() {
        let spec = TableSpec::new(dec!(-1.00), dec!(1.00), dec!(0.010));
        assert_eq!(spec.precision(), 2);
        assert_eq!(spec.row_count().unwrap(), 201);
    }

    #[test]
    fn degenerate_interval_has_one_row() {
        let spec = TableSpec::new(dec!(1.5), dec!(1.5), dec!(0.1));
        let series = generate(&spec).unwrap();
        assert_eq!(series.len(), 1);
        assert_eq!(series.first().unwrap().z, 1.5);
    }

    #[test]
    fn rejects_non_positive_step() {
        let spec = TableSpec::new(dec!(-1), dec!(1), dec!(0));
        assert_eq!(generate(&spec), Err(ConfigError::NonPositiveStep(dec!(0))));

        let spec = TableSpec::new(dec!(-1), dec!(1), dec!(-0.1));
        assert!(matches!(generate(&spec), Err(ConfigError::NonPositiveStep(_))));
    }

    #[test]
    fn rejects_inexact_multiple() {
        let spec = TableSpec::new(dec!(0), dec!(1), dec!(0.3));
        assert!(matches!(
            generate(&spec),
            Err(ConfigError::StepMismatch { .. })
        ));
    }

    #[test]
    fn rejects_inverted_interval() {
        let spec = TableSpec::new(dec!(1), dec!(-1), dec!(0.1));
        assert!(matches!(
            generate(&spec),
            Err(ConfigError::InvertedInterval { .. })
        ));
    }

    #[test]
    fn bounds_are_rounded_to_step_precision() {
        // -3.994 rounds to -3.99 before use
        let spec = TableSpec::new(dec!(-3.994), dec!(3.99), dec!(0.01));
        assert_eq!(spec.row_count().unwrap(), 799);
    }

    #[test]
    fn rejects_excessive_precision_and_size() {
        let spec = TableSpec::new(dec!(0), dec!(1), dec!(0.00000000001));
        assert!(matches!(
            generate(&spec),
            Err(ConfigError::PrecisionTooHigh(_))
        ));

        let spec = TableSpec::new(dec!(0), dec!(100), dec!(0.00001));
        assert!(matches!(generate(&spec), Err(ConfigError::TooManyRows(_))));
    }
}
