//! Shared helpers for stages that need a consistent copy of their input.

use cumulus_core::{FieldId, PropagatorError};
use cumulus_propagator::StepContext;

/// Bytes of scratch needed to hold one copy of a field.
pub(crate) fn field_copy_bytes(cell_count: usize) -> usize {
    cell_count * std::mem::size_of::<f32>()
}

/// Copy `field` of the staging generation into scratch and run `body`
/// with `(input, output)`, where `output` is the staging buffer itself.
pub(crate) fn with_input_copy<R>(
    ctx: &mut StepContext<'_>,
    field: FieldId,
    body: impl FnOnce(&[f32], &mut [f32]) -> R,
) -> Result<R, PropagatorError> {
    let (scratch, out) = ctx.scratch_and_field(field)?;
    let input = scratch
        .alloc(out.len())
        .ok_or_else(|| PropagatorError::ExecutionFailed {
            reason: format!("scratch too small for field {field} ({} cells)", out.len()),
        })?;
    input.copy_from_slice(out);
    Ok(body(input, out))
}
