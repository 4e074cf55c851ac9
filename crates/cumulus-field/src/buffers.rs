//! Flat per-field storage.

use cumulus_core::{FieldId, FieldReader, FieldWriter};

/// One contiguous `f32` buffer per field, all of the same length.
///
/// `FieldId(n)` addresses the n-th buffer. Values are stored in the grid's
/// canonical rank order.
#[derive(Clone, Debug, PartialEq)]
pub struct FieldBuffers {
    data: Vec<Vec<f32>>,
}

impl FieldBuffers {
    /// Allocate `field_count` zero-filled buffers of `cell_count` cells.
    pub fn zeroed(field_count: usize, cell_count: usize) -> Self {
        Self {
            data: vec![vec![0.0; cell_count]; field_count],
        }
    }

    /// Number of fields.
    pub fn field_count(&self) -> usize {
        self.data.len()
    }

    /// Cells per field.
    pub fn cell_count(&self) -> usize {
        self.data.first().map_or(0, Vec::len)
    }

    /// Borrow one field.
    pub fn field(&self, field: FieldId) -> Option<&[f32]> {
        self.data.get(field.0 as usize).map(Vec::as_slice)
    }

    /// Mutably borrow one field.
    pub fn field_mut(&mut self, field: FieldId) -> Option<&mut [f32]> {
        self.data.get_mut(field.0 as usize).map(Vec::as_mut_slice)
    }

    /// Mutably borrow every field.
    pub fn fields_mut(&mut self) -> impl Iterator<Item = &mut [f32]> {
        self.data.iter_mut().map(Vec::as_mut_slice)
    }

    /// Overwrite this buffer set with `other` without reallocating.
    ///
    /// Both sets must have the same shape.
    pub fn copy_from(&mut self, other: &FieldBuffers) {
        debug_assert_eq!(self.data.len(), other.data.len());
        for (dst, src) in self.data.iter_mut().zip(&other.data) {
            dst.copy_from_slice(src);
        }
    }

    /// Set every value of every field to zero.
    pub fn zero(&mut self) {
        for buf in &mut self.data {
            buf.fill(0.0);
        }
    }

    /// Heap bytes held by the buffers.
    pub fn memory_bytes(&self) -> usize {
        self.data.len() * self.cell_count() * std::mem::size_of::<f32>()
    }
}

impl FieldReader for FieldBuffers {
    fn read(&self, field: FieldId) -> Option<&[f32]> {
        self.field(field)
    }
}

impl FieldWriter for FieldBuffers {
    fn write(&mut self, field: FieldId) -> Option<&mut [f32]> {
        self.field_mut(field)
    }
}
