//! Double-buffered field grid.
//!
//! The lifecycle per substep is:
//! 1. `begin_substep()` copies front → back and hands out a [`SubstepGuard`]
//! 2. Propagators read the frozen front and mutate the back
//! 3. `publish()` swaps the buffers and records the tick
//!
//! Dropping the guard without publishing abandons the substep: the front
//! generation is unchanged and the next `begin_substep()` overwrites the
//! staging buffer.

use cumulus_core::{FieldDef, FieldId, FieldSet, TickId, WorldGenerationId};
use cumulus_space::{Footprint, Grid3};

use crate::buffers::FieldBuffers;
use crate::error::FieldError;
use crate::sanitize::{hold_floor, sanitize};
use crate::snapshot::OwnedSnapshot;

/// Atmospheric moisture, kg/m³ equivalent.
pub const MOISTURE: FieldId = FieldId(0);
/// Accumulated rainfall, mm. Monotone between resets.
pub const RAINFALL: FieldId = FieldId(1);

/// The two fields of the atmosphere model, in `FieldId` order.
pub fn standard_fields() -> Vec<FieldDef> {
    vec![
        FieldDef::scalar("moisture", "kg/m3"),
        FieldDef::accumulator("accumulated_rainfall", "mm"),
    ]
}

/// The value of both standard fields at one cell.
#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct CellSample {
    /// Moisture, kg/m³ equivalent.
    pub moisture: f32,
    /// Accumulated rainfall, mm.
    pub accumulated_rainfall: f32,
}

/// Mass to add to one field over a bounded footprint.
#[derive(Clone, Copy, Debug)]
pub struct FieldDelta<'a> {
    /// Cells and weights receiving the mass.
    pub footprint: &'a Footprint,
    /// Total mass to add. Non-finite or negative mass is ignored.
    pub mass: f32,
}

/// Read/write access handed to propagators for one substep.
///
/// Holds borrows of both generations, preventing any other access to the
/// grid until the substep is published or abandoned.
#[must_use]
pub struct SubstepGuard<'a> {
    /// The last completed generation, frozen for the substep.
    pub reads_previous: &'a FieldBuffers,
    /// The staging generation, pre-filled with a copy of the front.
    pub writes: &'a mut FieldBuffers,
    /// Topology of the grid.
    pub grid: &'a Grid3,
}

/// Moisture and rainfall storage on a [`Grid3`], in two generations.
#[derive(Debug)]
pub struct FieldGrid {
    grid: Grid3,
    defs: Vec<FieldDef>,
    front: FieldBuffers,
    back: FieldBuffers,
    tick_id: TickId,
    substep_in_progress: bool,
}

impl FieldGrid {
    /// Allocate a zero-filled grid holding the given fields.
    pub fn new(grid: Grid3, defs: Vec<FieldDef>) -> Result<Self, FieldError> {
        if defs.is_empty() || defs.len() > FieldSet::CAPACITY as usize {
            return Err(FieldError::InvalidFieldCount { count: defs.len() });
        }
        let cells = grid.cell_count();
        Ok(Self {
            front: FieldBuffers::zeroed(defs.len(), cells),
            back: FieldBuffers::zeroed(defs.len(), cells),
            grid,
            defs,
            tick_id: TickId(0),
            substep_in_progress: false,
        })
    }

    /// Allocate a grid holding [`standard_fields`].
    pub fn with_standard_fields(grid: Grid3) -> Result<Self, FieldError> {
        Self::new(grid, standard_fields())
    }

    /// Grid topology.
    pub fn grid(&self) -> &Grid3 {
        &self.grid
    }

    /// Registered field definitions, indexed by `FieldId`.
    pub fn defs(&self) -> &[FieldDef] {
        &self.defs
    }

    /// The set of every registered field.
    pub fn defined_fields(&self) -> FieldSet {
        (0..self.defs.len() as u32).map(FieldId).collect()
    }

    /// Tick of the last published substep.
    pub fn tick_id(&self) -> TickId {
        self.tick_id
    }

    /// Read one field of the front generation.
    pub fn read(&self, field: FieldId) -> Option<&[f32]> {
        self.front.field(field)
    }

    /// The front generation.
    pub fn front(&self) -> &FieldBuffers {
        &self.front
    }

    /// Both standard fields at `rank`, or `None` past the end of the grid.
    pub fn get(&self, rank: usize) -> Option<CellSample> {
        let moisture = *self.front.field(MOISTURE)?.get(rank)?;
        let accumulated_rainfall = *self.front.field(RAINFALL)?.get(rank)?;
        Some(CellSample {
            moisture,
            accumulated_rainfall,
        })
    }

    /// Add mass to the front generation over a footprint.
    ///
    /// Used for deposits that happen between substeps. Ranks come from a
    /// footprint built on this grid, so they are always in bounds.
    pub fn apply(&mut self, field: FieldId, delta: &FieldDelta<'_>) -> Result<(), FieldError> {
        let buf = self
            .front
            .field_mut(field)
            .ok_or(FieldError::UnknownField { field })?;
        if delta.mass.is_finite() && delta.mass > 0.0 {
            delta.footprint.deposit(buf, delta.mass);
        }
        Ok(())
    }

    /// Begin a substep: copy front → back and lend out both generations.
    pub fn begin_substep(&mut self) -> SubstepGuard<'_> {
        self.back.copy_from(&self.front);
        self.substep_in_progress = true;
        SubstepGuard {
            reads_previous: &self.front,
            writes: &mut self.back,
            grid: &self.grid,
        }
    }

    /// Sanitize the staging generation. Returns the number of repaired cells.
    ///
    /// Non-finite and negative values become `0.0`. Cells of a monotone
    /// field that fell below the front generation are raised back to it.
    pub fn sanitize_staging(&mut self) -> usize {
        let mut repaired: usize = self.back.fields_mut().map(sanitize).sum();
        for (i, def) in self.defs.iter().enumerate() {
            if !def.monotone {
                continue;
            }
            let id = FieldId(i as u32);
            if let (Some(buf), Some(floor)) = (self.back.field_mut(id), self.front.field(id)) {
                repaired += hold_floor(buf, floor);
            }
        }
        repaired
    }

    /// Publish the staging generation as the new front.
    pub fn publish(&mut self, tick_id: TickId) -> Result<(), FieldError> {
        if !self.substep_in_progress {
            return Err(FieldError::NoSubstepInProgress);
        }
        std::mem::swap(&mut self.front, &mut self.back);
        self.substep_in_progress = false;
        self.tick_id = tick_id;
        Ok(())
    }

    /// Discard an in-progress substep, keeping the front generation.
    pub fn abandon(&mut self) {
        self.substep_in_progress = false;
    }

    /// Zero both generations and rewind the tick counter.
    pub fn reset(&mut self) {
        self.front.zero();
        self.back.zero();
        self.tick_id = TickId(0);
        self.substep_in_progress = false;
    }

    /// Copy the front generation into a new owned snapshot.
    pub fn owned_snapshot(&self, generation: WorldGenerationId) -> OwnedSnapshot {
        OwnedSnapshot::new(self.front.clone(), self.tick_id, generation)
    }

    /// Refill a recycled snapshot from the front generation.
    ///
    /// Reuses the snapshot's allocation when its shape matches.
    pub fn snapshot_into(&self, snap: &mut OwnedSnapshot, generation: WorldGenerationId) {
        snap.refill(&self.front, self.tick_id, generation);
    }

    /// Heap bytes held by both generations.
    pub fn memory_bytes(&self) -> usize {
        self.front.memory_bytes() + self.back.memory_bytes()
    }
}
