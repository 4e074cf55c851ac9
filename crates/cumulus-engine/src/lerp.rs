//! Render-side interpolation between adjacent snapshots.

/// Blend `prev` towards `next` by `alpha` into `out`.
///
/// `alpha` is clamped to `[0,1]`; a non-finite `alpha` reads as `1.0`, so
/// the result is the newer snapshot. Writes `min(prev, next, out)` cells
/// and returns that count.
pub fn lerp_fields(prev: &[f32], next: &[f32], alpha: f32, out: &mut [f32]) -> usize {
    let a = if alpha.is_finite() {
        alpha.clamp(0.0, 1.0)
    } else {
        1.0
    };
    let n = prev.len().min(next.len()).min(out.len());
    for ((o, &p), &q) in out[..n].iter_mut().zip(prev).zip(next) {
        *o = p * (1.0 - a) + q * a;
    }
    n
}
