//! Owned, thread-safe field snapshots.

use cumulus_core::{FieldId, SnapshotAccess, TickId, WorldGenerationId};

use crate::buffers::FieldBuffers;
use crate::grid::{CellSample, MOISTURE, RAINFALL};

/// An immutable copy of every field at one published generation.
///
/// Produced by [`FieldGrid::owned_snapshot`](crate::FieldGrid::owned_snapshot)
/// and shared with readers behind an `Arc`.
#[derive(Clone, Debug, PartialEq)]
pub struct OwnedSnapshot {
    fields: FieldBuffers,
    tick_id: TickId,
    world_generation_id: WorldGenerationId,
}

// Compile-time assertion: OwnedSnapshot must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<OwnedSnapshot>();
};

impl OwnedSnapshot {
    pub(crate) fn new(
        fields: FieldBuffers,
        tick_id: TickId,
        world_generation_id: WorldGenerationId,
    ) -> Self {
        Self {
            fields,
            tick_id,
            world_generation_id,
        }
    }

    pub(crate) fn refill(
        &mut self,
        src: &FieldBuffers,
        tick_id: TickId,
        world_generation_id: WorldGenerationId,
    ) {
        if self.fields.field_count() == src.field_count()
            && self.fields.cell_count() == src.cell_count()
        {
            self.fields.copy_from(src);
        } else {
            self.fields = src.clone();
        }
        self.tick_id = tick_id;
        self.world_generation_id = world_generation_id;
    }

    /// Both standard fields at `rank`, or `None` past the end of the grid.
    pub fn get(&self, rank: usize) -> Option<CellSample> {
        Some(CellSample {
            moisture: *self.fields.field(MOISTURE)?.get(rank)?,
            accumulated_rainfall: *self.fields.field(RAINFALL)?.get(rank)?,
        })
    }

    /// Cells per field.
    pub fn cell_count(&self) -> usize {
        self.fields.cell_count()
    }
}

impl SnapshotAccess for OwnedSnapshot {
    fn read_field(&self, field: FieldId) -> Option<&[f32]> {
        self.fields.field(field)
    }

    fn tick_id(&self) -> TickId {
        self.tick_id
    }

    fn world_generation_id(&self) -> WorldGenerationId {
        self.world_generation_id
    }
}
