//! Pipeline validation.
//!
//! [`validate_pipeline`] runs once at engine startup to check the ordered
//! propagator list for structural errors and the timestep bound, and builds
//! a [`PipelinePlan`] the integrator keeps for the life of the engine.

use cumulus_core::{FieldId, FieldSet};
use indexmap::IndexMap;

use crate::propagator::Propagator;

use std::error::Error;
use std::fmt;

// ── Plan ───────────────────────────────────────────────────────────

/// Facts about a validated pipeline, computed once at startup.
#[derive(Debug, Clone, PartialEq)]
#[must_use]
pub struct PipelinePlan {
    /// `writers[field]` lists propagator indices writing the field, in order.
    writers: IndexMap<FieldId, Vec<usize>>,
    /// Tightest `max_dt` and the propagator declaring it.
    max_dt: Option<(f64, String)>,
    /// Largest per-propagator scratch demand, in bytes.
    scratch_bytes: usize,
}

impl PipelinePlan {
    /// Propagators writing `field`, in execution order.
    pub fn writers_of(&self, field: FieldId) -> &[usize] {
        self.writers.get(&field).map_or(&[], Vec::as_slice)
    }

    /// Fields written by at least one propagator.
    pub fn written_fields(&self) -> FieldSet {
        self.writers.keys().copied().collect()
    }

    /// Tightest `max_dt` across the pipeline, if any propagator declares one.
    pub fn max_dt(&self) -> Option<f64> {
        self.max_dt.as_ref().map(|(dt, _)| *dt)
    }

    /// Name of the propagator with the tightest `max_dt`.
    pub fn constraining_propagator(&self) -> Option<&str> {
        self.max_dt.as_ref().map(|(_, name)| name.as_str())
    }

    /// Scratch bytes the engine must pre-allocate.
    pub fn scratch_bytes(&self) -> usize {
        self.scratch_bytes
    }
}

// ── Errors ─────────────────────────────────────────────────────────

/// Errors from pipeline validation (startup-time, not per-substep).
#[derive(Debug, Clone, PartialEq)]
pub enum PipelineError {
    /// No propagators registered.
    EmptyPipeline,

    /// A propagator references a field not held by the grid.
    UndefinedField {
        /// Which propagator.
        propagator: String,
        /// The missing field.
        field_id: FieldId,
    },

    /// The configured dt exceeds a propagator's `max_dt`.
    DtTooLarge {
        /// The dt that was requested.
        configured_dt: f64,
        /// The tightest `max_dt` constraint.
        max_supported: f64,
        /// Which propagator constrains it.
        constraining_propagator: String,
    },

    /// The configured dt is not a valid timestep (NaN, infinity, zero, or negative).
    InvalidDt {
        /// The invalid dt value.
        value: f64,
    },

    /// A propagator's `max_dt()` returned a non-finite or non-positive value.
    InvalidMaxDt {
        /// Which propagator.
        propagator: String,
        /// The invalid max_dt value.
        value: f64,
    },
}

impl fmt::Display for PipelineError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::EmptyPipeline => write!(f, "pipeline has no propagators"),
            Self::UndefinedField {
                propagator,
                field_id,
            } => {
                write!(
                    f,
                    "propagator '{propagator}' references undefined field {field_id}"
                )
            }
            Self::DtTooLarge {
                configured_dt,
                max_supported,
                constraining_propagator,
            } => {
                write!(
                    f,
                    "dt {configured_dt} exceeds max_dt {max_supported} \
                     (constrained by '{constraining_propagator}')"
                )
            }
            Self::InvalidDt { value } => {
                write!(f, "dt must be finite and positive, got {value}")
            }
            Self::InvalidMaxDt { propagator, value } => {
                write!(
                    f,
                    "propagator '{propagator}' returned invalid max_dt: {value}"
                )
            }
        }
    }
}

impl Error for PipelineError {}

// ── Validation ─────────────────────────────────────────────────────

/// Validate an ordered propagator pipeline.
///
/// Checks performed:
///
/// 1. `dt` is finite and positive.
/// 2. Pipeline is non-empty.
/// 3. Every read, frozen read and write names a field in `defined_fields`.
/// 4. `dt <= min(max_dt)` across all propagators.
///
/// Several propagators may write the same field; they run in list order,
/// each seeing the previous one's output.
pub fn validate_pipeline(
    propagators: &[Box<dyn Propagator>],
    defined_fields: &FieldSet,
    dt: f64,
    cell_count: usize,
) -> Result<PipelinePlan, PipelineError> {
    if !dt.is_finite() || dt <= 0.0 {
        return Err(PipelineError::InvalidDt { value: dt });
    }

    if propagators.is_empty() {
        return Err(PipelineError::EmptyPipeline);
    }

    for prop in propagators {
        let referenced = prop
            .reads()
            .union(&prop.reads_previous())
            .union(&prop.writes());
        if let Some(field_id) = referenced.difference(defined_fields).iter().next() {
            return Err(PipelineError::UndefinedField {
                propagator: prop.name().to_string(),
                field_id,
            });
        }
    }

    let mut max_dt: Option<(f64, String)> = None;
    for prop in propagators {
        if let Some(max) = prop.max_dt() {
            if !max.is_finite() || max <= 0.0 {
                return Err(PipelineError::InvalidMaxDt {
                    propagator: prop.name().to_string(),
                    value: max,
                });
            }
            if max_dt.as_ref().is_none_or(|(cur, _)| max < *cur) {
                max_dt = Some((max, prop.name().to_string()));
            }
        }
    }
    if let Some((max, name)) = &max_dt {
        if dt > *max {
            return Err(PipelineError::DtTooLarge {
                configured_dt: dt,
                max_supported: *max,
                constraining_propagator: name.clone(),
            });
        }
    }

    let mut writers: IndexMap<FieldId, Vec<usize>> = IndexMap::new();
    for (i, prop) in propagators.iter().enumerate() {
        for field in prop.writes().iter() {
            writers.entry(field).or_default().push(i);
        }
    }
    let scratch_bytes = propagators
        .iter()
        .map(|p| p.scratch_bytes(cell_count))
        .max()
        .unwrap_or(0);

    Ok(PipelinePlan {
        writers,
        max_dt,
        scratch_bytes,
    })
}
