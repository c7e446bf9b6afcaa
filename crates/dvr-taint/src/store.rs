//! Per-register taint bits and shadow values.

use crate::{PhysRegId, Result, TaintError};

/// Fixed-size taint table, one slot per physical register.
///
/// A slot's shadow value is only meaningful while the slot is tainted.
/// Clearing taint leaves the value in place.
#[derive(Clone, Debug)]
pub struct TaintStore {
    tainted: Vec<bool>,
    shadow: Vec<u64>,
    tainted_count: usize,
}

impl TaintStore {
    pub fn new(num_regs: usize) -> Self {
        Self {
            tainted: vec![false; num_regs],
            shadow: vec![0; num_regs],
            tainted_count: 0,
        }
    }

    pub fn len(&self) -> usize {
        self.tainted.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tainted.is_empty()
    }

    /// Slot index for `reg`, or `InvalidRegister` when out of range.
    pub fn slot(&self, reg: PhysRegId) -> Result<usize> {
        if reg.index < self.len() {
            Ok(reg.index)
        } else {
            Err(TaintError::InvalidRegister {
                index: reg.index,
                num_regs: self.len(),
            })
        }
    }

    pub fn contains(&self, reg: PhysRegId) -> bool {
        reg.index < self.len()
    }

    /// Taint state of `reg`; false for absent or out-of-range handles.
    pub fn is_tainted(&self, reg: Option<PhysRegId>) -> bool {
        reg.is_some_and(|r| self.tainted.get(r.index).copied().unwrap_or(false))
    }

    /// Seed a slot with an origin value and count it.
    pub fn seed(&mut self, slot: usize, value: u64) {
        self.tainted[slot] = true;
        self.shadow[slot] = value;
        self.tainted_count += 1;
    }

    pub fn set_tainted(&mut self, slot: usize) {
        self.tainted[slot] = true;
    }

    pub fn clear(&mut self, slot: usize) {
        self.tainted[slot] = false;
    }

    pub fn shadow(&self, slot: usize) -> u64 {
        self.shadow[slot]
    }

    pub fn set_shadow(&mut self, slot: usize, value: u64) {
        self.shadow[slot] = value;
    }

    /// Registers seeded since the last `clear_all`.
    pub const fn tainted_count(&self) -> usize {
        self.tainted_count
    }

    /// Drop every taint bit. Shadow values are kept.
    pub fn clear_all(&mut self) {
        self.tainted.fill(false);
        self.tainted_count = 0;
    }
}
