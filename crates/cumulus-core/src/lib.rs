//! Core types and traits for the Cumulus cloud-seeding simulation.
//!
//! This is the leaf crate with zero internal dependencies. It defines
//! the vocabulary shared by every other crate in the workspace: field
//! and tick identifiers, injection requests and receipts, the hazard
//! status enumeration, error types, and the field access traits.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod command;
pub mod error;
pub mod field;
pub mod hazard;
pub mod id;
pub mod traits;

pub use command::{InjectionReceipt, InjectionRequest, Position};
pub use error::{IngressError, PropagatorError, StepError};
pub use field::{FieldDef, FieldSet, FieldSetIter};
pub use hazard::HazardStatus;
pub use id::{FieldId, TickId, WorldGenerationId};
pub use traits::{FieldReader, FieldWriter, SnapshotAccess};
