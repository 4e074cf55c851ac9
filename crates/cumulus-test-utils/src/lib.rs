//! Test utilities and mock types for Cumulus development.
//!
//! Provides mock implementations of the core field traits
//! ([`FieldReader`], [`FieldWriter`], [`SnapshotAccess`]), small grid
//! helpers, and the propagator fixtures in [`fixtures`].

#![forbid(unsafe_code)]
#![allow(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod fixtures;

use std::collections::HashMap;

use cumulus_core::{FieldId, FieldReader, FieldWriter, SnapshotAccess, TickId, WorldGenerationId};
use cumulus_space::{EdgeBehavior, Grid3};

/// A 4 × 4 × 2 absorbing grid.
pub fn small_grid() -> Grid3 {
    Grid3::new(4, 4, 2, EdgeBehavior::Absorb).expect("4x4x2 grid is valid")
}

/// An `n × 1 × 1` absorbing grid, handy for hand-checked stencils.
pub fn line_grid(n: u32) -> Grid3 {
    Grid3::new(n, 1, 1, EdgeBehavior::Absorb).expect("line grid is valid")
}

/// Mock implementation of [`FieldReader`].
///
/// Backed by a `HashMap<FieldId, Vec<f32>>`. Pre-populate fields with
/// [`set_field`](MockFieldReader::set_field) before passing to code under
/// test.
#[derive(Default)]
pub struct MockFieldReader {
    fields: HashMap<FieldId, Vec<f32>>,
}

impl MockFieldReader {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-populate a field with data for testing.
    pub fn set_field(&mut self, field: FieldId, data: Vec<f32>) {
        self.fields.insert(field, data);
    }
}

impl FieldReader for MockFieldReader {
    fn read(&self, field: FieldId) -> Option<&[f32]> {
        self.fields.get(&field).map(|v| v.as_slice())
    }
}

/// Mock implementation of [`FieldWriter`].
///
/// Pre-allocate buffers with [`add_field`](MockFieldWriter::add_field) or
/// seed them with [`set_field`](MockFieldWriter::set_field), run the code
/// under test, then inspect with [`get_field`](MockFieldWriter::get_field).
#[derive(Default)]
pub struct MockFieldWriter {
    fields: HashMap<FieldId, Vec<f32>>,
}

impl MockFieldWriter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Pre-allocate a zero-filled field buffer.
    pub fn add_field(&mut self, field: FieldId, size: usize) {
        self.fields.insert(field, vec![0.0; size]);
    }

    /// Seed a field buffer with data, as the staging copy of the front would be.
    pub fn set_field(&mut self, field: FieldId, data: Vec<f32>) {
        self.fields.insert(field, data);
    }

    /// Read back the current field data for test assertions.
    pub fn get_field(&self, field: FieldId) -> Option<&[f32]> {
        self.fields.get(&field).map(|v| v.as_slice())
    }
}

impl FieldWriter for MockFieldWriter {
    fn write(&mut self, field: FieldId) -> Option<&mut [f32]> {
        self.fields.get_mut(&field).map(|v| v.as_mut_slice())
    }
}

/// Mock snapshot implementing [`SnapshotAccess`].
pub struct MockSnapshot {
    fields: HashMap<FieldId, Vec<f32>>,
    tick: TickId,
    world_gen: WorldGenerationId,
}

impl MockSnapshot {
    pub fn new(tick: TickId, world_gen: WorldGenerationId) -> Self {
        Self {
            fields: HashMap::new(),
            tick,
            world_gen,
        }
    }

    /// Pre-populate a field with data for testing.
    pub fn set_field(&mut self, field: FieldId, data: Vec<f32>) {
        self.fields.insert(field, data);
    }
}

impl SnapshotAccess for MockSnapshot {
    fn read_field(&self, field: FieldId) -> Option<&[f32]> {
        self.fields.get(&field).map(|v| v.as_slice())
    }

    fn tick_id(&self) -> TickId {
        self.tick
    }

    fn world_generation_id(&self) -> WorldGenerationId {
        self.world_gen
    }
}
