//! Pre-allocated scratch memory for propagators.
//!
//! Each propagator declares [`scratch_bytes()`](crate::Propagator::scratch_bytes)
//! for the grid size. The engine pre-allocates the maximum across all
//! propagators and resets the bump pointer before each `step()` call.

/// Bump-allocated scratch region reset between propagators.
#[derive(Debug, Default)]
pub struct ScratchRegion {
    buf: Vec<f32>,
    offset: usize,
}

impl ScratchRegion {
    /// Create a new scratch region with the given capacity **in f32 slots**.
    pub fn new(capacity: usize) -> Self {
        Self {
            buf: vec![0.0; capacity],
            offset: 0,
        }
    }

    /// Create from a **byte** capacity, rounded up to whole f32 slots.
    pub fn with_byte_capacity(bytes: usize) -> Self {
        Self::new(bytes.div_ceil(std::mem::size_of::<f32>()))
    }

    /// Allocate `count` contiguous f32 slots, zero-initialized.
    ///
    /// Returns `None` if insufficient capacity remains.
    pub fn alloc(&mut self, count: usize) -> Option<&mut [f32]> {
        let end = self.offset.checked_add(count)?;
        if end > self.buf.len() {
            return None;
        }
        let start = self.offset;
        self.offset = end;
        let slice = &mut self.buf[start..end];
        slice.fill(0.0);
        Some(slice)
    }

    /// Everything allocated since the last reset, as one slice.
    pub fn allocated(&self) -> &[f32] {
        &self.buf[..self.offset]
    }

    /// Reset the bump pointer.
    pub fn reset(&mut self) {
        self.offset = 0;
    }

    /// Total capacity in f32 slots.
    pub fn capacity(&self) -> usize {
        self.buf.len()
    }

    /// Slots used since last reset.
    pub fn used(&self) -> usize {
        self.offset
    }
}
