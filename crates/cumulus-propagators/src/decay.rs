//! Exponential moisture decay.

use cumulus_core::{FieldId, FieldSet, PropagatorError};
use cumulus_field::MOISTURE;
use cumulus_propagator::{Propagator, StepContext};

/// Applies `q ← q · exp(−rate · dt)` to one field.
///
/// Unconditionally stable for any `dt`; never changes sign.
#[derive(Debug)]
pub struct MoistureDecay {
    field: FieldId,
    rate: f64,
}

impl MoistureDecay {
    /// Decay moisture at `rate` per second.
    ///
    /// # Errors
    ///
    /// Returns `Err` if `rate` is negative or not finite.
    pub fn new(rate: f64) -> Result<Self, String> {
        if !rate.is_finite() || rate < 0.0 {
            return Err(format!("decay rate must be finite and >= 0, got {rate}"));
        }
        Ok(Self {
            field: MOISTURE,
            rate,
        })
    }
}

impl Propagator for MoistureDecay {
    fn name(&self) -> &str {
        "MoistureDecay"
    }

    fn reads(&self) -> FieldSet {
        [self.field].into_iter().collect()
    }

    fn writes(&self) -> FieldSet {
        [self.field].into_iter().collect()
    }

    fn step(&self, ctx: &mut StepContext<'_>) -> Result<(), PropagatorError> {
        if self.rate == 0.0 {
            return Ok(());
        }
        let factor = (-(self.rate * ctx.dt())).exp() as f32;
        for v in ctx.field_mut(self.field)?.iter_mut() {
            *v *= factor;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cumulus_core::TickId;
    use cumulus_propagator::ScratchRegion;
    use cumulus_test_utils::{line_grid, MockFieldReader, MockFieldWriter};

    #[test]
    fn decays_by_exp_factor() {
        let grid = line_grid(2);
        let reader = MockFieldReader::new();
        let mut writer = MockFieldWriter::new();
        writer.set_field(MOISTURE, vec![1.0, 4.0]);
        let mut scratch = ScratchRegion::new(0);
        let mut ctx = StepContext::new(
            &reader,
            &mut writer,
            &mut scratch,
            &grid,
            &(),
            TickId(1),
            0.5,
            0,
        );
        MoistureDecay::new(0.02).unwrap().step(&mut ctx).unwrap();
        let f = (-0.01f64).exp() as f32;
        let out = writer.get_field(MOISTURE).unwrap();
        assert!((out[0] - f).abs() < 1e-6);
        assert!((out[1] - 4.0 * f).abs() < 1e-6);
    }

    #[test]
    fn rejects_negative_rate() {
        assert!(MoistureDecay::new(-0.1).is_err());
        assert!(MoistureDecay::new(f64::INFINITY).is_err());
    }
}
