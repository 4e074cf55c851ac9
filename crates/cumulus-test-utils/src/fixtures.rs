//! Reusable propagator test fixtures.
//!
//! - [`AddPropagator`]: adds a constant to every cell each substep.
//! - [`PoisonPropagator`]: writes NaN and negative values to exercise sanitizing.
//! - [`FailingPropagator`]: fails deterministically after N calls.

use cumulus_core::{FieldId, FieldSet, PropagatorError};
use cumulus_propagator::{Propagator, StepContext};
use std::sync::atomic::{AtomicUsize, Ordering};

fn single(field: FieldId) -> FieldSet {
    [field].into_iter().collect()
}

/// Adds `value` to every cell of `field` each substep.
pub struct AddPropagator {
    pub name: String,
    pub field: FieldId,
    pub value: f32,
}

impl AddPropagator {
    pub fn new(name: impl Into<String>, field: FieldId, value: f32) -> Self {
        Self {
            name: name.into(),
            field,
            value,
        }
    }
}

impl Propagator for AddPropagator {
    fn name(&self) -> &str {
        &self.name
    }

    fn reads(&self) -> FieldSet {
        single(self.field)
    }

    fn writes(&self) -> FieldSet {
        single(self.field)
    }

    fn step(&self, ctx: &mut StepContext<'_>) -> Result<(), PropagatorError> {
        for v in ctx.field_mut(self.field)?.iter_mut() {
            *v += self.value;
        }
        Ok(())
    }
}

/// Writes NaN into cell 0 and `-1.0` into cell 1 of `field`.
pub struct PoisonPropagator {
    pub field: FieldId,
}

impl Propagator for PoisonPropagator {
    fn name(&self) -> &str {
        "poison"
    }

    fn reads(&self) -> FieldSet {
        FieldSet::empty()
    }

    fn writes(&self) -> FieldSet {
        single(self.field)
    }

    fn step(&self, ctx: &mut StepContext<'_>) -> Result<(), PropagatorError> {
        let buf = ctx.field_mut(self.field)?;
        if let Some(v) = buf.get_mut(0) {
            *v = f32::NAN;
        }
        if let Some(v) = buf.get_mut(1) {
            *v = -1.0;
        }
        Ok(())
    }
}

/// Fails deterministically after a configurable number of successful calls.
///
/// On success it adds `1.0` to every cell of `field`, so a test can tell
/// whether an abandoned substep leaked into the published state.
pub struct FailingPropagator {
    pub name: String,
    pub field: FieldId,
    pub succeed_count: usize,
    call_count: AtomicUsize,
}

impl FailingPropagator {
    /// Create a propagator that succeeds `succeed_count` times then fails.
    pub fn new(name: impl Into<String>, field: FieldId, succeed_count: usize) -> Self {
        Self {
            name: name.into(),
            field,
            succeed_count,
            call_count: AtomicUsize::new(0),
        }
    }

    /// How many times `step()` has been called.
    pub fn calls(&self) -> usize {
        self.call_count.load(Ordering::Relaxed)
    }
}

impl Propagator for FailingPropagator {
    fn name(&self) -> &str {
        &self.name
    }

    fn reads(&self) -> FieldSet {
        single(self.field)
    }

    fn writes(&self) -> FieldSet {
        single(self.field)
    }

    fn step(&self, ctx: &mut StepContext<'_>) -> Result<(), PropagatorError> {
        let n = self.call_count.fetch_add(1, Ordering::Relaxed);
        if n >= self.succeed_count {
            return Err(PropagatorError::ExecutionFailed {
                reason: format!(
                    "deliberate failure after {} successful calls",
                    self.succeed_count
                ),
            });
        }
        for v in ctx.field_mut(self.field)?.iter_mut() {
            *v += 1.0;
        }
        Ok(())
    }
}
