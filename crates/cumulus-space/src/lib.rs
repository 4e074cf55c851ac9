//! Grid topology for Cumulus simulations.
//!
//! Provides [`Grid3`], the fixed three-dimensional lattice every field is
//! stored on, together with position lookup, 6-connected neighbourhoods and
//! the bounded [`Footprint`]s injections deposit mass over.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod edge;
pub mod error;
pub mod footprint;
pub mod grid3;

pub use edge::EdgeBehavior;
pub use error::SpaceError;
pub use footprint::Footprint;
pub use grid3::{Cell, Grid3};
