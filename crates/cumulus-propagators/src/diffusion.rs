//! Jacobi-style moisture diffusion on the 6-neighbour stencil.

use crate::stencil::{field_copy_bytes, with_input_copy};
use cumulus_core::{FieldId, FieldSet, PropagatorError};
use cumulus_field::MOISTURE;
use cumulus_propagator::{Propagator, StepContext};

/// Explicit diffusion of one scalar field.
///
/// Each substep computes, from a consistent copy of the field:
/// ```text
/// out[i] = (1 - alpha) * q[i] + alpha * mean(q[neighbours])
/// ```
/// where `alpha = coefficient * dt * num_neighbours`, capped at 1.
///
/// ```
/// use cumulus_propagators::MoistureDiffusion;
/// use cumulus_propagator::Propagator;
///
/// let prop = MoistureDiffusion::builder().coefficient(0.02).build().unwrap();
/// assert_eq!(prop.max_dt(), Some(1.0 / (6.0 * 0.02)));
/// ```
#[derive(Debug)]
pub struct MoistureDiffusion {
    field: FieldId,
    coefficient: f64,
}

/// Builder for [`MoistureDiffusion`].
pub struct MoistureDiffusionBuilder {
    field: FieldId,
    coefficient: f64,
}

impl MoistureDiffusion {
    /// Create a builder. Defaults: moisture field, coefficient 0.
    pub fn builder() -> MoistureDiffusionBuilder {
        MoistureDiffusionBuilder {
            field: MOISTURE,
            coefficient: 0.0,
        }
    }
}

impl MoistureDiffusionBuilder {
    /// Field to diffuse.
    pub fn field(mut self, field: FieldId) -> Self {
        self.field = field;
        self
    }

    /// Diffusion coefficient in cells²/s. Must be finite and >= 0.
    pub fn coefficient(mut self, c: f64) -> Self {
        self.coefficient = c;
        self
    }

    /// Build the propagator.
    ///
    /// # Errors
    ///
    /// Returns `Err` if the coefficient is negative or not finite.
    pub fn build(self) -> Result<MoistureDiffusion, String> {
        if !self.coefficient.is_finite() || self.coefficient < 0.0 {
            return Err(format!(
                "diffusion coefficient must be finite and >= 0, got {}",
                self.coefficient
            ));
        }
        Ok(MoistureDiffusion {
            field: self.field,
            coefficient: self.coefficient,
        })
    }
}

impl Propagator for MoistureDiffusion {
    fn name(&self) -> &str {
        "MoistureDiffusion"
    }

    fn reads(&self) -> FieldSet {
        [self.field].into_iter().collect()
    }

    fn writes(&self) -> FieldSet {
        [self.field].into_iter().collect()
    }

    fn max_dt(&self) -> Option<f64> {
        // Six face neighbours at most: alpha stays <= 1.
        (self.coefficient > 0.0).then(|| 1.0 / (6.0 * self.coefficient))
    }

    fn scratch_bytes(&self, cell_count: usize) -> usize {
        field_copy_bytes(cell_count)
    }

    fn step(&self, ctx: &mut StepContext<'_>) -> Result<(), PropagatorError> {
        if self.coefficient == 0.0 {
            return Ok(());
        }
        let dt = ctx.dt();
        let grid = ctx.grid();
        with_input_copy(ctx, self.field, |prev, out| {
            for (i, slot) in out.iter_mut().enumerate() {
                let nbs = grid.neighbours(i);
                if nbs.is_empty() {
                    continue;
                }
                let count = nbs.len();
                let sum: f32 = nbs.iter().map(|&n| prev[n]).sum();
                let alpha = (self.coefficient * dt * count as f64).min(1.0) as f32;
                *slot = (1.0 - alpha) * prev[i] + alpha * (sum / count as f32);
            }
        })
    }
}
