//! Propagator trait and step context for Cumulus simulations.
//!
//! A substep is a fixed sequence of [`Propagator`]s, each mutating the
//! staging generation in place through a [`StepContext`]. Later stages see
//! the writes of earlier ones; the frozen previous generation stays
//! available through [`StepContext::reads_previous`].

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod context;
pub mod pipeline;
pub mod propagator;
pub mod scratch;

pub use context::{SourceTerms, StepContext};
pub use pipeline::{validate_pipeline, PipelineError, PipelinePlan};
pub use propagator::Propagator;
pub use scratch::ScratchRegion;
