//! Strongly-typed identifiers.

use std::fmt;

/// Identifies a field within the simulation grid.
///
/// Fields are registered at engine creation and assigned sequential IDs.
/// `FieldId(n)` corresponds to the n-th buffer of the field grid.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct FieldId(pub u32);

impl fmt::Display for FieldId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u32> for FieldId {
    fn from(v: u32) -> Self {
        Self(v)
    }
}

/// Monotonically increasing substep counter.
///
/// Incremented once per fixed physical substep, not once per host
/// `update()` call. `TickId(0)` is the freshly initialised state.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct TickId(pub u64);

impl TickId {
    /// The tick that follows this one.
    pub fn next(self) -> Self {
        Self(self.0 + 1)
    }
}

impl fmt::Display for TickId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for TickId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}

/// Publication counter for snapshots.
///
/// Incremented every time the engine publishes a new snapshot, which
/// happens after each completed `update()` and each accepted injection.
/// Readers use it to tell two snapshots of the same tick apart.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct WorldGenerationId(pub u64);

impl fmt::Display for WorldGenerationId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<u64> for WorldGenerationId {
    fn from(v: u64) -> Self {
        Self(v)
    }
}
