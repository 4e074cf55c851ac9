//! Core abstraction traits for field access and snapshot reading.

use crate::id::{FieldId, TickId, WorldGenerationId};

/// Read-only access to field data within a simulation step.
///
/// Implemented by field buffers to give propagators read access. Returns
/// `None` if the field is not readable in the current context.
pub trait FieldReader {
    /// Read the data for a field as a flat f32 slice in canonical rank order.
    fn read(&self, field: FieldId) -> Option<&[f32]>;
}

/// Mutable access to field data within a simulation step.
///
/// Implemented by staging buffers. Returns `None` if the field is not
/// writable in the current context.
pub trait FieldWriter {
    /// Get a mutable slice for writing field data.
    fn write(&mut self, field: FieldId) -> Option<&mut [f32]>;
}

/// Read-only access to a published snapshot.
pub trait SnapshotAccess {
    /// Read field data from the snapshot.
    ///
    /// Returns `None` if the field ID is invalid or not present.
    fn read_field(&self, field: FieldId) -> Option<&[f32]>;

    /// The last completed substep at which this snapshot was taken.
    fn tick_id(&self) -> TickId;

    /// The publication counter of this snapshot.
    fn world_generation_id(&self) -> WorldGenerationId;
}
