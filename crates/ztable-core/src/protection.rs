//! Cell protection policy
//!
//! Every cell starts unlocked. Cells whose role is read-only are locked, and
//! configuration may lock further ranges as long as they never cover an
//! input. Whole-sheet protection is applied by the renderer after all writes.

use crate::address::{CellAddress, CellRange};
use crate::config::ProtectionConfig;
use crate::ConfigError;
use std::collections::{BTreeMap, BTreeSet};

/// Largest extra range a configuration may lock
pub const MAX_EXTRA_CELLS: u64 = 65_536;

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ProtectionPolicy {
    pub enabled: bool,
    pub password: Option<String>,
    extra_locked: BTreeSet<CellAddress>,
}

impl ProtectionPolicy {
    /// Policy that never locks the sheet
    pub fn disabled() -> Self {
        Self::default()
    }

    /// Build the policy, rejecting any extra range that would lock an input
    ///
    /// `inputs` maps each input cell to the slot it belongs to.
    pub fn derive(
        config: &ProtectionConfig,
        inputs: &BTreeMap<CellAddress, String>,
    ) -> Result<Self, ConfigError> {
        let mut extra_locked = BTreeSet::new();

        for token in &config.locked {
            let range: CellRange = token.parse().map_err(|source| ConfigError::Address {
                field: "protection.locked".to_string(),
                source,
            })?;

            let cells = range.cell_count();
            if cells > MAX_EXTRA_CELLS {
                return Err(ConfigError::RangeTooLarge {
                    range: range.to_string(),
                    cells,
                });
            }

            for cell in range.cells() {
                if let Some(slot) = inputs.get(&cell) {
                    return Err(ConfigError::InputLocked {
                        slot: slot.clone(),
                        cell,
                        range: range.to_string(),
                    });
                }
                extra_locked.insert(cell);
            }
        }

        tracing::debug!(
            enabled = config.enabled,
            extra = extra_locked.len(),
            "derived protection policy"
        );

        Ok(Self {
            enabled: config.enabled,
            password: config.password.clone().filter(|p| !p.is_empty()),
            extra_locked,
        })
    }

    /// Cells locked by configuration on top of role-based locking
    pub fn extra_locked(&self) -> impl Iterator<Item = CellAddress> + '_ {
        self.extra_locked.iter().copied()
    }

    pub fn is_extra_locked(&self, cell: CellAddress) -> bool {
        self.extra_locked.contains(&cell)
    }
}
