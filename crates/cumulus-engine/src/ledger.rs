//! Consumable resource budget debited by injections.

use crate::config::LedgerConfig;

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// Integer resource budget with optional passive regeneration.
///
/// `remaining()` never exceeds `capacity()`. Regeneration accrues
/// fractional units across calls and credits them whole.
#[derive(Clone, Debug)]
pub struct ResourceLedger {
    capacity: u32,
    remaining: u32,
    regen_per_second: f64,
    carry: f64,
}

impl ResourceLedger {
    /// A full ledger.
    pub fn new(config: &LedgerConfig) -> Self {
        Self {
            capacity: config.capacity,
            remaining: config.capacity,
            regen_per_second: config.regen_per_second,
            carry: 0.0,
        }
    }

    /// Resources left.
    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    /// Starting and maximum resources.
    pub fn capacity(&self) -> u32 {
        self.capacity
    }

    /// Debit `cost` if affordable. Returns `false` and leaves the ledger
    /// untouched otherwise.
    pub fn try_debit(&mut self, cost: u32) -> bool {
        match self.remaining.checked_sub(cost) {
            Some(left) => {
                self.remaining = left;
                true
            }
            None => false,
        }
    }

    /// Credit regeneration for `ns` nanoseconds of simulated time.
    ///
    /// Returns the number of whole units credited.
    pub fn regenerate(&mut self, ns: u64) -> u32 {
        if self.regen_per_second <= 0.0 || self.remaining >= self.capacity {
            self.carry = 0.0;
            return 0;
        }
        self.carry += self.regen_per_second * ns as f64 / NANOS_PER_SEC;
        let whole = self.carry.floor();
        let room = self.capacity - self.remaining;
        let credit = if whole >= room as f64 {
            room
        } else {
            whole as u32
        };
        self.remaining += credit;
        self.carry -= whole;
        if self.remaining == self.capacity {
            self.carry = 0.0;
        }
        credit
    }

    /// Refill to capacity and drop accrued regeneration.
    pub fn reset(&mut self) {
        self.remaining = self.capacity;
        self.carry = 0.0;
    }
}
