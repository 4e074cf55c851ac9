//! Injection source stage.
//!
//! Deposits the share of every pending injection pulse that falls due in
//! the current substep. The pulses themselves are owned and aged by the
//! engine's injection manager and reach this stage through
//! [`StepContext::sources`].

use cumulus_core::{FieldId, FieldSet, PropagatorError};
use cumulus_field::MOISTURE;
use cumulus_propagator::{Propagator, StepContext};

/// Adds this substep's pulse deposits to a field.
#[derive(Debug)]
pub struct InjectionSource {
    field: FieldId,
}

impl InjectionSource {
    /// Deposit into moisture.
    pub fn new() -> Self {
        Self::for_field(MOISTURE)
    }

    /// Deposit into an arbitrary field.
    pub fn for_field(field: FieldId) -> Self {
        Self { field }
    }
}

impl Default for InjectionSource {
    fn default() -> Self {
        Self::new()
    }
}

impl Propagator for InjectionSource {
    fn name(&self) -> &str {
        "InjectionSource"
    }

    fn reads(&self) -> FieldSet {
        FieldSet::empty()
    }

    fn writes(&self) -> FieldSet {
        [self.field].into_iter().collect()
    }

    fn step(&self, ctx: &mut StepContext<'_>) -> Result<(), PropagatorError> {
        let sources = ctx.sources();
        let buf = ctx.field_mut(self.field)?;
        sources.for_each_deposit(&mut |delta| {
            if delta.mass.is_finite() && delta.mass > 0.0 {
                delta.footprint.deposit(buf, delta.mass);
            }
        });
        Ok(())
    }
}
