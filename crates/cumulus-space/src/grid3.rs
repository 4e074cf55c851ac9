//! Three-dimensional rectilinear grid with a 6-connected neighbourhood.

use crate::edge::EdgeBehavior;
use crate::error::SpaceError;
use cumulus_core::Position;
use smallvec::SmallVec;

/// Integer cell coordinate: `x` east-west, `y` north-south, `z` altitude.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct Cell {
    /// East-west index.
    pub x: u32,
    /// North-south index.
    pub y: u32,
    /// Altitude layer, 0 at the ground.
    pub z: u32,
}

impl Cell {
    /// Construct a cell coordinate.
    pub const fn new(x: u32, y: u32, z: u32) -> Self {
        Self { x, y, z }
    }
}

/// A fixed `nx × ny × nz` lattice covering the unit cube `[0,1]³`.
///
/// Cells are stored in canonical order `rank = (z * ny + y) * nx + x`, so a
/// horizontal layer is contiguous and a ground column `(x, y)` is strided
/// by `nx * ny`. Neighbours are the six face-adjacent cells; what happens at
/// the walls is controlled by [`EdgeBehavior`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Grid3 {
    nx: u32,
    ny: u32,
    nz: u32,
    edge: EdgeBehavior,
}

impl Grid3 {
    /// Largest extent accepted on a single axis.
    pub const MAX_DIM: u32 = 1 << 12;
    /// Largest total cell count accepted.
    pub const MAX_CELLS: u64 = 1 << 24;

    /// Create a grid with the given extents and edge behavior.
    ///
    /// Returns `Err(SpaceError::EmptySpace)` if any extent is 0, and a size
    /// error if an axis or the total cell count is too large.
    ///
    /// # Examples
    ///
    /// ```
    /// use cumulus_space::{EdgeBehavior, Grid3};
    ///
    /// let grid = Grid3::new(16, 16, 8, EdgeBehavior::Absorb).unwrap();
    /// assert_eq!(grid.cell_count(), 2048);
    /// assert_eq!(grid.rank(1, 0, 0), 1);
    /// assert_eq!(grid.rank(0, 0, 1), 256);
    /// ```
    pub fn new(nx: u32, ny: u32, nz: u32, edge: EdgeBehavior) -> Result<Self, SpaceError> {
        if nx == 0 || ny == 0 || nz == 0 {
            return Err(SpaceError::EmptySpace);
        }
        for (name, value) in [("nx", nx), ("ny", ny), ("nz", nz)] {
            if value > Self::MAX_DIM {
                return Err(SpaceError::DimensionTooLarge {
                    name,
                    value,
                    max: Self::MAX_DIM,
                });
            }
        }
        let cells = nx as u64 * ny as u64 * nz as u64;
        if cells > Self::MAX_CELLS {
            return Err(SpaceError::TooManyCells {
                cells,
                max: Self::MAX_CELLS,
            });
        }
        Ok(Self { nx, ny, nz, edge })
    }

    /// Extent along `x`.
    pub fn nx(&self) -> u32 {
        self.nx
    }

    /// Extent along `y`.
    pub fn ny(&self) -> u32 {
        self.ny
    }

    /// Number of altitude layers.
    pub fn nz(&self) -> u32 {
        self.nz
    }

    /// Edge behavior.
    pub fn edge_behavior(&self) -> EdgeBehavior {
        self.edge
    }

    /// Total number of cells.
    pub fn cell_count(&self) -> usize {
        self.nx as usize * self.ny as usize * self.nz as usize
    }

    /// Number of ground columns (`nx * ny`).
    pub fn column_count(&self) -> usize {
        self.nx as usize * self.ny as usize
    }

    /// Column index of a cell rank, in `0..column_count()`.
    pub fn column_of(&self, rank: usize) -> usize {
        rank % self.column_count()
    }

    /// Canonical rank of an in-bounds cell.
    pub fn rank(&self, x: u32, y: u32, z: u32) -> usize {
        debug_assert!(x < self.nx && y < self.ny && z < self.nz);
        (z as usize * self.ny as usize + y as usize) * self.nx as usize + x as usize
    }

    /// Canonical rank of a [`Cell`].
    pub fn rank_of(&self, cell: Cell) -> usize {
        self.rank(cell.x, cell.y, cell.z)
    }

    /// Inverse of [`Grid3::rank`].
    pub fn cell(&self, rank: usize) -> Cell {
        let nx = self.nx as usize;
        let ny = self.ny as usize;
        Cell {
            x: (rank % nx) as u32,
            y: ((rank / nx) % ny) as u32,
            z: (rank / (nx * ny)) as u32,
        }
    }

    /// The cell containing a position.
    ///
    /// The position is clamped into the unit cube first, so any input maps
    /// to a valid cell; the upper face belongs to the last cell.
    pub fn locate(&self, position: Position) -> Cell {
        let p = position.clamped();
        Cell {
            x: axis_index(p.x, self.nx),
            y: axis_index(p.y, self.ny),
            z: axis_index(p.z, self.nz),
        }
    }

    /// Altitude layer containing `fraction` of the domain height.
    pub fn layer_at(&self, fraction: f32) -> u32 {
        let f = if fraction.is_finite() {
            fraction.clamp(0.0, 1.0)
        } else {
            0.0
        };
        axis_index(f, self.nz)
    }

    /// Face-adjacent neighbours of a cell, resolved under the edge behavior.
    ///
    /// Order is `-x, +x, -y, +y, -z, +z` with absorbed neighbours omitted.
    pub fn neighbours(&self, rank: usize) -> SmallVec<[usize; 6]> {
        let c = self.cell(rank);
        let (x, y, z) = (c.x as i64, c.y as i64, c.z as i64);
        let offsets: [(i64, i64, i64); 6] = [
            (-1, 0, 0),
            (1, 0, 0),
            (0, -1, 0),
            (0, 1, 0),
            (0, 0, -1),
            (0, 0, 1),
        ];
        let mut out = SmallVec::new();
        for (dx, dy, dz) in offsets {
            let nx = self.edge.resolve(x + dx, self.nx);
            let ny = self.edge.resolve(y + dy, self.ny);
            let nz = self.edge.resolve(z + dz, self.nz);
            if let (Some(nx), Some(ny), Some(nz)) = (nx, ny, nz) {
                out.push(self.rank(nx, ny, nz));
            }
        }
        out
    }

    /// Neighbour of `rank` one step along `axis` (0 = x, 1 = y, 2 = z) in
    /// direction `step` (`-1` or `+1`), or `None` past an absorbing wall.
    pub fn step(&self, rank: usize, axis: usize, step: i64) -> Option<usize> {
        let c = self.cell(rank);
        let (mut x, mut y, mut z) = (c.x, c.y, c.z);
        match axis {
            0 => x = self.edge.resolve(c.x as i64 + step, self.nx)?,
            1 => y = self.edge.resolve(c.y as i64 + step, self.ny)?,
            _ => z = self.edge.resolve(c.z as i64 + step, self.nz)?,
        }
        Some(self.rank(x, y, z))
    }
}

fn axis_index(fraction: f32, len: u32) -> u32 {
    let idx = (fraction * len as f32).floor() as u32;
    idx.min(len - 1)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn grid(edge: EdgeBehavior) -> Grid3 {
        Grid3::new(4, 3, 2, edge).unwrap()
    }

    #[test]
    fn zero_extent_is_empty_space() {
        assert_eq!(
            Grid3::new(0, 4, 4, EdgeBehavior::Absorb),
            Err(SpaceError::EmptySpace)
        );
        assert_eq!(
            Grid3::new(4, 4, 0, EdgeBehavior::Absorb),
            Err(SpaceError::EmptySpace)
        );
    }

    #[test]
    fn oversized_extent_rejected() {
        let err = Grid3::new(Grid3::MAX_DIM + 1, 1, 1, EdgeBehavior::Absorb).unwrap_err();
        assert!(matches!(err, SpaceError::DimensionTooLarge { name: "nx", .. }));
        let err = Grid3::new(4096, 4096, 4096, EdgeBehavior::Absorb).unwrap_err();
        assert!(matches!(err, SpaceError::TooManyCells { .. }));
    }

    #[test]
    fn rank_layout_is_x_fastest() {
        let g = grid(EdgeBehavior::Absorb);
        assert_eq!(g.rank(0, 0, 0), 0);
        assert_eq!(g.rank(1, 0, 0), 1);
        assert_eq!(g.rank(0, 1, 0), 4);
        assert_eq!(g.rank(0, 0, 1), 12);
        assert_eq!(g.cell(g.rank(3, 2, 1)), Cell::new(3, 2, 1));
    }

    #[test]
    fn column_of_ignores_altitude() {
        let g = grid(EdgeBehavior::Absorb);
        assert_eq!(g.column_count(), 12);
        assert_eq!(g.column_of(g.rank(2, 1, 0)), g.column_of(g.rank(2, 1, 1)));
    }

    #[test]
    fn locate_clamps_and_handles_upper_face() {
        let g = grid(EdgeBehavior::Absorb);
        assert_eq!(g.locate(Position::new(0.0, 0.0, 0.0)), Cell::new(0, 0, 0));
        assert_eq!(g.locate(Position::new(1.0, 1.0, 1.0)), Cell::new(3, 2, 1));
        assert_eq!(g.locate(Position::new(-5.0, 9.0, 0.49)), Cell::new(0, 2, 0));
        assert_eq!(g.locate(Position::new(0.5, 0.5, 0.5)), Cell::new(2, 1, 1));
    }

    #[test]
    fn layer_at_maps_fraction() {
        let g = Grid3::new(2, 2, 8, EdgeBehavior::Absorb).unwrap();
        assert_eq!(g.layer_at(0.0), 0);
        assert_eq!(g.layer_at(0.5), 4);
        assert_eq!(g.layer_at(1.0), 7);
        assert_eq!(g.layer_at(f32::NAN), 0);
    }

    #[test]
    fn neighbours_absorb_corner_and_interior() {
        let g = Grid3::new(3, 3, 3, EdgeBehavior::Absorb).unwrap();
        assert_eq!(g.neighbours(g.rank(0, 0, 0)).len(), 3);
        assert_eq!(g.neighbours(g.rank(1, 1, 1)).len(), 6);
        assert_eq!(g.neighbours(g.rank(1, 0, 1)).len(), 5);
    }

    #[test]
    fn neighbours_clamp_self_loops() {
        let g = grid(EdgeBehavior::Clamp);
        let r = g.rank(0, 0, 0);
        let n = g.neighbours(r);
        assert_eq!(n.len(), 6);
        assert_eq!(n.iter().filter(|&&v| v == r).count(), 3);
    }

    #[test]
    fn neighbours_wrap_corner() {
        let g = grid(EdgeBehavior::Wrap);
        let n = g.neighbours(g.rank(0, 0, 0));
        assert!(n.contains(&g.rank(3, 0, 0)));
        assert!(n.contains(&g.rank(0, 2, 0)));
        assert!(n.contains(&g.rank(0, 0, 1)));
    }

    #[test]
    fn step_along_axes() {
        let g = grid(EdgeBehavior::Absorb);
        let r = g.rank(1, 1, 0);
        assert_eq!(g.step(r, 0, 1), Some(g.rank(2, 1, 0)));
        assert_eq!(g.step(r, 1, -1), Some(g.rank(1, 0, 0)));
        assert_eq!(g.step(r, 2, -1), None);
        assert_eq!(g.step(r, 2, 1), Some(g.rank(1, 1, 1)));
    }
}
