//! Bounded deposit footprints.

use crate::grid3::{Cell, Grid3};

/// A set of cell ranks with normalized weights.
///
/// Mass deposited through a footprint is spread over its cells in
/// proportion to the weights, which sum to one. Only in-bounds cells are
/// ever included, so the whole mass lands inside the grid.
#[derive(Clone, Debug, PartialEq)]
pub struct Footprint {
    ranks: Vec<usize>,
    weights: Vec<f32>,
}

impl Footprint {
    /// A footprint covering a single cell.
    pub fn single(grid: &Grid3, cell: Cell) -> Self {
        Self {
            ranks: vec![grid.rank_of(cell)],
            weights: vec![1.0],
        }
    }

    /// Gaussian footprint centred on `centre`.
    ///
    /// Covers every in-bounds cell within `radius` of the centre on each
    /// axis, weighted by `exp(-d² / (2σ²))` with `d` the Euclidean distance
    /// in cells, normalized over the included cells. A non-positive or
    /// non-finite `sigma` degenerates to a single-cell footprint.
    pub fn gaussian(grid: &Grid3, centre: Cell, radius: u32, sigma: f32) -> Self {
        if !(sigma.is_finite() && sigma > 0.0) || radius == 0 {
            return Self::single(grid, centre);
        }
        let (x0, x1) = axis_span(centre.x, radius, grid.nx());
        let (y0, y1) = axis_span(centre.y, radius, grid.ny());
        let (z0, z1) = axis_span(centre.z, radius, grid.nz());
        let two_sigma_sq = 2.0 * sigma * sigma;
        let mut ranks = Vec::new();
        let mut weights = Vec::new();
        for z in z0..=z1 {
            for y in y0..=y1 {
                for x in x0..=x1 {
                    let dx = x as i64 - centre.x as i64;
                    let dy = y as i64 - centre.y as i64;
                    let dz = z as i64 - centre.z as i64;
                    let d2 = (dx * dx + dy * dy + dz * dz) as f32;
                    ranks.push(grid.rank(x, y, z));
                    weights.push((-d2 / two_sigma_sq).exp());
                }
            }
        }
        let total: f32 = weights.iter().sum();
        for w in &mut weights {
            *w /= total;
        }
        Self { ranks, weights }
    }

    /// Cell ranks covered, in canonical order.
    pub fn ranks(&self) -> &[usize] {
        &self.ranks
    }

    /// Normalized weights, parallel to [`Footprint::ranks`].
    pub fn weights(&self) -> &[f32] {
        &self.weights
    }

    /// Number of cells covered.
    pub fn len(&self) -> usize {
        self.ranks.len()
    }

    /// Always `false`: a footprint covers at least its centre cell.
    pub fn is_empty(&self) -> bool {
        self.ranks.is_empty()
    }

    /// Add `mass` to `buf`, spread over the footprint.
    pub fn deposit(&self, buf: &mut [f32], mass: f32) {
        for (&rank, &w) in self.ranks.iter().zip(&self.weights) {
            buf[rank] += mass * w;
        }
    }
}

/// Inclusive in-bounds range within `radius` of `centre` on one axis.
fn axis_span(centre: u32, radius: u32, len: u32) -> (u32, u32) {
    let last = len.saturating_sub(1);
    let centre = centre.min(last);
    (
        centre.saturating_sub(radius),
        centre.saturating_add(radius).min(last),
    )
}
