//! Execution context passed to propagators during a substep.

use crate::scratch::ScratchRegion;
use cumulus_core::{FieldId, FieldReader, FieldWriter, PropagatorError, TickId};
use cumulus_field::FieldDelta;
use cumulus_space::Grid3;

/// External source terms due in the current substep.
///
/// The injection manager implements this to expose each pending pulse's
/// share for the substep without allocating.
pub trait SourceTerms {
    /// Visit every deposit due in this substep.
    fn for_each_deposit(&self, visit: &mut dyn FnMut(FieldDelta<'_>));
}

impl SourceTerms for Vec<FieldDelta<'_>> {
    fn for_each_deposit(&self, visit: &mut dyn FnMut(FieldDelta<'_>)) {
        for d in self {
            visit(*d);
        }
    }
}

/// No source terms.
impl SourceTerms for () {
    fn for_each_deposit(&self, _visit: &mut dyn FnMut(FieldDelta<'_>)) {}
}

/// Execution context passed to each propagator's `step()` method.
///
/// Uses dynamic dispatch (`&dyn FieldReader`, `&mut dyn FieldWriter`) to
/// keep [`Propagator`](crate::Propagator) object-safe while supporting
/// mock-based testing.
pub struct StepContext<'a> {
    reads_previous: &'a dyn FieldReader,
    writes: &'a mut dyn FieldWriter,
    scratch: &'a mut ScratchRegion,
    grid: &'a Grid3,
    sources: &'a dyn SourceTerms,
    tick_id: TickId,
    dt: f64,
    seed: u64,
}

impl<'a> StepContext<'a> {
    /// Construct a new step context.
    ///
    /// Typically called by the engine. For testing, construct with mock
    /// readers/writers from `cumulus-test-utils`.
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        reads_previous: &'a dyn FieldReader,
        writes: &'a mut dyn FieldWriter,
        scratch: &'a mut ScratchRegion,
        grid: &'a Grid3,
        sources: &'a dyn SourceTerms,
        tick_id: TickId,
        dt: f64,
        seed: u64,
    ) -> Self {
        Self {
            reads_previous,
            writes,
            scratch,
            grid,
            sources,
            tick_id,
            dt,
            seed,
        }
    }

    /// Frozen reader over the last completed generation.
    pub fn reads_previous(&self) -> &dyn FieldReader {
        self.reads_previous
    }

    /// Mutable writer over the staging generation.
    pub fn writes(&mut self) -> &mut dyn FieldWriter {
        self.writes
    }

    /// Mutable staging buffer of one field.
    pub fn field_mut(&mut self, field: FieldId) -> Result<&mut [f32], PropagatorError> {
        self.writes
            .write(field)
            .ok_or(PropagatorError::FieldUnavailable { field_id: field })
    }

    /// Scratch memory together with one staging buffer.
    ///
    /// Lets stencil stages snapshot their input without a heap allocation.
    pub fn scratch_and_field(
        &mut self,
        field: FieldId,
    ) -> Result<(&mut ScratchRegion, &mut [f32]), PropagatorError> {
        let buf = self
            .writes
            .write(field)
            .ok_or(PropagatorError::FieldUnavailable { field_id: field })?;
        Ok((&mut *self.scratch, buf))
    }

    /// Scratch memory allocator. Reset between propagators.
    pub fn scratch(&mut self) -> &mut ScratchRegion {
        self.scratch
    }

    /// Grid topology.
    pub fn grid(&self) -> &'a Grid3 {
        self.grid
    }

    /// Source terms due in this substep.
    pub fn sources(&self) -> &'a dyn SourceTerms {
        self.sources
    }

    /// Tick being computed.
    pub fn tick_id(&self) -> TickId {
        self.tick_id
    }

    /// Fixed substep length in seconds.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Base seed for deterministic randomness.
    pub fn seed(&self) -> u64 {
        self.seed
    }
}
