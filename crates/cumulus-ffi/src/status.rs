//! C-compatible status codes and hazard labels.
//!
//! [`CumulusStatus`] is returned by every bridge function. Conversions from
//! the engine's error types are provided.

use std::ffi::{c_char, CStr};

use cumulus_core::{HazardStatus, StepError};
use cumulus_engine::{ConfigError, TickError};
use cumulus_propagator::PipelineError;

/// C-compatible status code returned by all FFI functions.
///
/// `Ok` = 0, all errors are negative. Values are ABI-stable.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CumulusStatus {
    /// Success.
    Ok = 0,
    /// Handle was never initialised or was already destroyed.
    InvalidHandle = -1,
    /// A pointer is null or an argument is otherwise unusable.
    InvalidArgument = -2,
    /// Configuration validation failed.
    ConfigError = -3,
    /// `dt` exceeds a propagator's stability bound.
    DtOutOfRange = -4,
    /// A propagator failed; the substep was abandoned.
    PropagatorFailed = -5,
    /// A completed substep could not be published.
    PublishFailed = -6,
    /// Caller-provided buffer is too small.
    BufferTooSmall = -7,
    /// Internal error (e.g. poisoned handle table after a prior panic).
    InternalError = -8,
    /// A Rust panic was caught at the FFI boundary.
    Panicked = -128,
}

impl From<&StepError> for CumulusStatus {
    fn from(e: &StepError) -> Self {
        match e {
            StepError::PropagatorFailed { .. } => CumulusStatus::PropagatorFailed,
            StepError::PublishFailed { .. } => CumulusStatus::PublishFailed,
        }
    }
}

impl From<&TickError> for CumulusStatus {
    fn from(e: &TickError) -> Self {
        CumulusStatus::from(&e.kind)
    }
}

impl From<&ConfigError> for CumulusStatus {
    fn from(e: &ConfigError) -> Self {
        match e {
            ConfigError::Pipeline(PipelineError::DtTooLarge { .. }) => {
                CumulusStatus::DtOutOfRange
            }
            _ => CumulusStatus::ConfigError,
        }
    }
}

/// C mirror of the hazard status. Codes match [`HazardStatus`].
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CumulusHazardStatus {
    /// Rainfall below the elevated threshold.
    Normal = 0,
    /// Rainfall at or above the elevated threshold, below critical.
    Elevated = 1,
    /// Rainfall at or above the critical threshold.
    Critical = 2,
}

impl From<HazardStatus> for CumulusHazardStatus {
    fn from(s: HazardStatus) -> Self {
        match s {
            HazardStatus::Normal => Self::Normal,
            HazardStatus::Elevated => Self::Elevated,
            HazardStatus::Critical => Self::Critical,
        }
    }
}

const NORMAL: &CStr = c"normal";
const ELEVATED: &CStr = c"elevated";
const CRITICAL: &CStr = c"critical";
const UNKNOWN: &CStr = c"unknown";

/// Label for a hazard status code: `"normal"`, `"elevated"`, `"critical"`,
/// or `"unknown"` for any other code.
///
/// The returned string is static; the caller must not free it.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cumulus_status_name(code: i32) -> *const c_char {
    let label = match HazardStatus::from_code(code) {
        Some(HazardStatus::Normal) => NORMAL,
        Some(HazardStatus::Elevated) => ELEVATED,
        Some(HazardStatus::Critical) => CRITICAL,
        None => UNKNOWN,
    };
    label.as_ptr()
}

#[cfg(test)]
mod tests {
    use super::*;
    use cumulus_core::PropagatorError;

    #[test]
    fn status_code_values_are_stable() {
        assert_eq!(CumulusStatus::Ok as i32, 0);
        assert_eq!(CumulusStatus::InvalidHandle as i32, -1);
        assert_eq!(CumulusStatus::InvalidArgument as i32, -2);
        assert_eq!(CumulusStatus::ConfigError as i32, -3);
        assert_eq!(CumulusStatus::DtOutOfRange as i32, -4);
        assert_eq!(CumulusStatus::PropagatorFailed as i32, -5);
        assert_eq!(CumulusStatus::PublishFailed as i32, -6);
        assert_eq!(CumulusStatus::BufferTooSmall as i32, -7);
        assert_eq!(CumulusStatus::InternalError as i32, -8);
        assert_eq!(CumulusStatus::Panicked as i32, -128);
    }

    #[test]
    fn hazard_codes_match_core() {
        for s in [
            HazardStatus::Normal,
            HazardStatus::Elevated,
            HazardStatus::Critical,
        ] {
            assert_eq!(CumulusHazardStatus::from(s) as i32, s as i32);
        }
    }

    #[test]
    fn step_error_to_status() {
        let failed = StepError::PropagatorFailed {
            name: "condensation".into(),
            reason: PropagatorError::ExecutionFailed {
                reason: "boom".into(),
            },
        };
        assert_eq!(
            CumulusStatus::from(&failed),
            CumulusStatus::PropagatorFailed
        );
        assert_eq!(
            CumulusStatus::from(&StepError::PublishFailed {
                reason: "x".into()
            }),
            CumulusStatus::PublishFailed
        );
    }

    #[test]
    fn config_error_to_status() {
        assert_eq!(
            CumulusStatus::from(&ConfigError::SubstepCapZero),
            CumulusStatus::ConfigError
        );
        let dt = ConfigError::Pipeline(PipelineError::DtTooLarge {
            configured_dt: 1.0,
            max_supported: 0.5,
            constraining_propagator: "diffusion".into(),
        });
        assert_eq!(CumulusStatus::from(&dt), CumulusStatus::DtOutOfRange);
    }

    #[test]
    #[allow(unsafe_code)]
    fn status_names() {
        let name = |code| {
            // SAFETY: the bridge returns pointers to static C strings.
            unsafe { CStr::from_ptr(cumulus_status_name(code)) }
                .to_str()
                .unwrap()
        };
        assert_eq!(name(0), "normal");
        assert_eq!(name(1), "elevated");
        assert_eq!(name(2), "critical");
        assert_eq!(name(-1), "unknown");
        assert_eq!(name(3), "unknown");
    }
}
