//! Error types for grid construction.

use std::fmt;

/// Errors arising from grid construction.
///
/// These are the only failures the field grid can produce, and they are
/// fatal for engine start.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum SpaceError {
    /// Attempted to construct a grid with zero cells.
    EmptySpace,
    /// A single axis exceeds the supported extent.
    DimensionTooLarge {
        /// Name of the axis (`"nx"`, `"ny"`, `"nz"`).
        name: &'static str,
        /// The requested extent.
        value: u32,
        /// Maximum allowed extent.
        max: u32,
    },
    /// The total number of cells exceeds the supported grid size.
    TooManyCells {
        /// Requested number of cells.
        cells: u64,
        /// Maximum allowed number of cells.
        max: u64,
    },
}

impl fmt::Display for SpaceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptySpace => write!(f, "grid must have at least one cell"),
            Self::DimensionTooLarge { name, value, max } => {
                write!(f, "{name} = {value} exceeds maximum extent {max}")
            }
            Self::TooManyCells { cells, max } => {
                write!(f, "grid of {cells} cells exceeds maximum of {max}")
            }
        }
    }
}

impl std::error::Error for SpaceError {}
