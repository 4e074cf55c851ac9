//! Atmospheric physics propagators for Cumulus simulations.
//!
//! # Pipeline order (each substep)
//!
//! 1. [`InjectionSource`]: pending pulse deposits → moisture
//! 2. [`MoistureDiffusion`]: 6-neighbour Jacobi smoothing of moisture
//! 3. [`WindAdvection`]: upwind transport by mean wind plus seeded gusts
//! 4. [`Condensation`]: moisture above layer saturation → accumulated rainfall
//! 5. [`MoistureDecay`]: exponential loss of moisture
//!
//! Every stage mutates the staging generation in place and sees the
//! output of the stages before it.

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub mod advection;
pub mod condensation;
pub mod decay;
pub mod diffusion;
pub mod injection_source;
mod stencil;

pub use advection::WindAdvection;
pub use condensation::Condensation;
pub use decay::MoistureDecay;
pub use diffusion::MoistureDiffusion;
pub use injection_source::InjectionSource;
