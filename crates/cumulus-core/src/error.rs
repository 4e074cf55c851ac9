//! Error types shared across the Cumulus workspace.
//!
//! Organized by subsystem: stepping (the integrator), propagators, and
//! injection ingress. Configuration and topology errors live with the
//! crates that own those concerns.

use std::error::Error;
use std::fmt;

use crate::id::FieldId;

/// Errors from the integrator while running a substep.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum StepError {
    /// A propagator returned an error; the substep was abandoned and the
    /// last completed generation is still the published state.
    PropagatorFailed {
        /// Name of the failing propagator.
        name: String,
        /// The underlying propagator error.
        reason: PropagatorError,
    },
    /// The staging generation could not be published.
    PublishFailed {
        /// Description of the failure.
        reason: String,
    },
}

impl fmt::Display for StepError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::PropagatorFailed { name, reason } => {
                write!(f, "propagator '{name}' failed: {reason}")
            }
            Self::PublishFailed { reason } => write!(f, "publish failed: {reason}"),
        }
    }
}

impl Error for StepError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::PropagatorFailed { reason, .. } => Some(reason),
            Self::PublishFailed { .. } => None,
        }
    }
}

/// Errors from individual propagator execution.
///
/// Returned by `Propagator::step()` and wrapped in
/// [`StepError::PropagatorFailed`] by the integrator.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum PropagatorError {
    /// The propagator's step function failed.
    ExecutionFailed {
        /// Human-readable description of the failure.
        reason: String,
    },
    /// A field the propagator declared was not available in the context.
    FieldUnavailable {
        /// The missing field.
        field_id: FieldId,
    },
}

impl fmt::Display for PropagatorError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::ExecutionFailed { reason } => write!(f, "execution failed: {reason}"),
            Self::FieldUnavailable { field_id } => {
                write!(f, "field {field_id} not available in step context")
            }
        }
    }
}

impl Error for PropagatorError {}

/// Reasons an injection request was not applied.
///
/// Carried in [`InjectionReceipt::reason`](crate::command::InjectionReceipt).
/// None of these are failures of the engine itself.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum IngressError {
    /// The injection costs more than the remaining resources.
    InsufficientResources,
}

impl fmt::Display for IngressError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::InsufficientResources => write!(f, "insufficient resources"),
        }
    }
}

impl Error for IngressError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn step_error_chains_propagator_source() {
        let err = StepError::PropagatorFailed {
            name: "diffusion".into(),
            reason: PropagatorError::ExecutionFailed {
                reason: "bad stencil".into(),
            },
        };
        assert_eq!(
            err.to_string(),
            "propagator 'diffusion' failed: execution failed: bad stencil"
        );
        assert!(err.source().is_some());
        let publish = StepError::PublishFailed {
            reason: "no substep".into(),
        };
        assert!(publish.source().is_none());
    }

    #[test]
    fn field_unavailable_names_field() {
        let err = PropagatorError::FieldUnavailable {
            field_id: FieldId(1),
        };
        assert_eq!(err.to_string(), "field 1 not available in step context");
    }
}
