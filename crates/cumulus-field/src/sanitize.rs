//! Repair of non-physical values.

/// Clamp every NaN, infinite or negative value in `buf` to `0.0`.
///
/// Returns the number of cells repaired.
pub fn sanitize(buf: &mut [f32]) -> usize {
    let mut repaired = 0;
    for v in buf.iter_mut() {
        if !v.is_finite() || *v < 0.0 {
            *v = 0.0;
            repaired += 1;
        }
    }
    repaired
}

/// Raise every value of `buf` below the matching `floor` value back up to it.
///
/// Keeps accumulator fields non-decreasing across a substep. Returns the
/// number of cells raised.
pub fn hold_floor(buf: &mut [f32], floor: &[f32]) -> usize {
    let mut raised = 0;
    for (v, &f) in buf.iter_mut().zip(floor) {
        if *v < f {
            *v = f;
            raised += 1;
        }
    }
    raised
}
