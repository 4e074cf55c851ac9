//! Field storage for Cumulus simulations.
//!
//! [`FieldGrid`] owns the two per-cell fields of the atmosphere model
//! (moisture and accumulated rainfall) in two generations: the front
//! buffer holds the last completed substep, the back buffer is the staging
//! area the propagators write into. A completed substep swaps the two; an
//! abandoned one leaves the front untouched.
//!
//! Readers never see the grid itself. They see [`OwnedSnapshot`]s, which
//! are immutable copies safe to share across threads.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod buffers;
pub mod error;
pub mod grid;
pub mod sanitize;
pub mod snapshot;

pub use buffers::FieldBuffers;
pub use error::FieldError;
pub use grid::{
    standard_fields, CellSample, FieldDelta, FieldGrid, SubstepGuard, MOISTURE, RAINFALL,
};
pub use sanitize::{hold_floor, sanitize};
pub use snapshot::OwnedSnapshot;
