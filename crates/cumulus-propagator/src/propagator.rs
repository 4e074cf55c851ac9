//! The [`Propagator`] trait.

use crate::context::StepContext;
use cumulus_core::{FieldSet, PropagatorError};

/// One stage of the per-substep physics pipeline.
///
/// # Contract
///
/// - `step()` MUST be deterministic: same inputs produce identical outputs.
///   Randomness must be derived from [`StepContext::seed`] and the tick.
/// - `&self`: propagators are stateless; all evolving state is in fields.
/// - `reads()`, `writes()` and `max_dt()` are called once at startup.
///
/// Propagators operate in place on the staging generation, so a stage
/// that needs a consistent input (a stencil, say) copies it into scratch
/// first.
///
/// # Examples
///
/// ```
/// use cumulus_core::{FieldId, FieldSet, PropagatorError};
/// use cumulus_propagator::{Propagator, StepContext};
///
/// struct Scale {
///     field: FieldId,
///     factor: f32,
/// }
///
/// impl Propagator for Scale {
///     fn name(&self) -> &str { "scale" }
///
///     fn reads(&self) -> FieldSet { [self.field].into_iter().collect() }
///
///     fn writes(&self) -> FieldSet { [self.field].into_iter().collect() }
///
///     fn step(&self, ctx: &mut StepContext<'_>) -> Result<(), PropagatorError> {
///         let buf = ctx.field_mut(self.field)?;
///         for v in buf.iter_mut() {
///             *v *= self.factor;
///         }
///         Ok(())
///     }
/// }
///
/// let prop = Scale { field: FieldId(0), factor: 0.5 };
/// assert_eq!(prop.name(), "scale");
/// ```
pub trait Propagator: Send + 'static {
    /// Human-readable name for error reporting and metrics.
    fn name(&self) -> &str;

    /// Fields read from the staging generation (including earlier stages'
    /// writes in this substep).
    fn reads(&self) -> FieldSet;

    /// Fields read from the frozen previous generation.
    ///
    /// Default: empty set.
    fn reads_previous(&self) -> FieldSet {
        FieldSet::empty()
    }

    /// Fields mutated in the staging generation.
    fn writes(&self) -> FieldSet;

    /// Maximum stable timestep for this propagator (e.g. a CFL bound).
    ///
    /// The pipeline validates `dt <= min(max_dt)` across all propagators.
    /// Return `None` to impose no constraint.
    fn max_dt(&self) -> Option<f64> {
        None
    }

    /// Scratch memory required **in bytes** for a grid of `cell_count` cells.
    fn scratch_bytes(&self, cell_count: usize) -> usize {
        let _ = cell_count;
        0
    }

    /// Execute the propagator for one substep.
    fn step(&self, ctx: &mut StepContext<'_>) -> Result<(), PropagatorError>;
}
