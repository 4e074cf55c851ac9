//! Field-grid error types.

use std::error::Error;
use std::fmt;

use cumulus_core::FieldId;
use cumulus_space::SpaceError;

/// Errors that can occur during field-grid operations.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum FieldError {
    /// The grid extent was rejected.
    Space(SpaceError),
    /// A `FieldId` that is not registered in the grid.
    UnknownField {
        /// The unrecognised field.
        field: FieldId,
    },
    /// The field list is empty or larger than a `FieldSet` can describe.
    InvalidFieldCount {
        /// Number of fields supplied.
        count: usize,
    },
    /// `publish()` was called without a preceding `begin_substep()`.
    NoSubstepInProgress,
}

impl fmt::Display for FieldError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Space(e) => write!(f, "invalid grid: {e}"),
            Self::UnknownField { field } => write!(f, "unknown field: {field}"),
            Self::InvalidFieldCount { count } => {
                write!(f, "field count {count} must be between 1 and 64")
            }
            Self::NoSubstepInProgress => {
                write!(f, "publish() called without a preceding begin_substep()")
            }
        }
    }
}

impl Error for FieldError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Space(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SpaceError> for FieldError {
    fn from(e: SpaceError) -> Self {
        Self::Space(e)
    }
}
