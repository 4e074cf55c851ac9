//! Edge (boundary) behavior of the grid.

/// How the grid handles neighbours at its edges.
///
/// # Examples
///
/// ```
/// use cumulus_space::{EdgeBehavior, Grid3};
///
/// // Absorb: a corner has 3 neighbours, an interior cell has 6.
/// let absorb = Grid3::new(4, 4, 4, EdgeBehavior::Absorb).unwrap();
/// assert_eq!(absorb.neighbours(absorb.rank(0, 0, 0)).len(), 3);
/// assert_eq!(absorb.neighbours(absorb.rank(1, 1, 1)).len(), 6);
///
/// // Wrap: every cell has 6 neighbours (3-torus).
/// let wrap = Grid3::new(4, 4, 4, EdgeBehavior::Wrap).unwrap();
/// assert_eq!(wrap.neighbours(wrap.rank(0, 0, 0)).len(), 6);
/// ```
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash)]
pub enum EdgeBehavior {
    /// Out-of-bounds neighbour maps to the boundary cell (self-loop).
    Clamp,
    /// Out-of-bounds neighbour wraps to the opposite side (periodic).
    Wrap,
    /// Out-of-bounds neighbour is omitted. Diffusion sees a closed wall;
    /// advected mass leaves the domain.
    #[default]
    Absorb,
}

impl EdgeBehavior {
    /// Resolve one axis index under this behavior.
    ///
    /// Returns `None` when the neighbour falls off an absorbing edge.
    pub fn resolve(self, val: i64, len: u32) -> Option<u32> {
        let n = len as i64;
        if (0..n).contains(&val) {
            return Some(val as u32);
        }
        match self {
            Self::Absorb => None,
            Self::Clamp => Some(val.clamp(0, n - 1) as u32),
            Self::Wrap => Some(val.rem_euclid(n) as u32),
        }
    }
}
