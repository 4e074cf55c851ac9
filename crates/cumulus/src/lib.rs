//! Cumulus: a deterministic, fixed-timestep cloud-seeding simulation.
//!
//! This is the top-level facade crate that re-exports the public API from
//! all Cumulus sub-crates. For most hosts, adding `cumulus` as a single
//! dependency is sufficient.
//!
//! # Quick start
//!
//! ```rust
//! use cumulus::prelude::*;
//!
//! let engine = SeedingEngine::init(EngineConfig::default()).unwrap();
//! assert_eq!(engine.resources(), 100);
//!
//! let receipt = engine.add_injection(Position::new(0.5, 0.5, 0.5), 0.5, 0.0);
//! assert!(receipt.accepted);
//! assert_eq!(engine.resources(), 95);
//!
//! engine.update(3.0).unwrap();
//! assert!(engine.rainfall() > 0.0);
//! assert_eq!(engine.is_emergency(), engine.status() == HazardStatus::Critical);
//! ```
//!
//! # Modules
//!
//! Each module corresponds to a sub-crate. Use them for types not in the
//! prelude:
//!
//! | Module | Sub-crate | Contents |
//! |--------|-----------|----------|
//! | [`types`] | `cumulus-core` | IDs, positions, receipts, hazard status, core traits |
//! | [`space`] | `cumulus-space` | 3-D grid topology, edge behavior, footprints |
//! | [`field`] | `cumulus-field` | Field buffers, sanitizing, owned snapshots |
//! | [`propagator`] | `cumulus-propagator` | Propagator trait and pipeline validation |
//! | [`propagators`] | `cumulus-propagators` | Diffusion, advection, condensation, decay |
//! | [`engine`] | `cumulus-engine` | The seeding engine and the realtime driver |

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

/// Core types, traits, and IDs (`cumulus-core`).
pub use cumulus_core as types;

/// Grid topology (`cumulus-space`).
///
/// [`space::Grid3`] maps cells to ranks and resolves neighbours under an
/// [`space::EdgeBehavior`].
pub use cumulus_space as space;

/// Field storage and snapshots (`cumulus-field`).
pub use cumulus_field as field;

/// Propagator trait and pipeline validation (`cumulus-propagator`).
///
/// The [`propagator::Propagator`] trait is the extension point for custom
/// physics passed to
/// [`SeedingEngine::init_with_pipeline`](engine::SeedingEngine::init_with_pipeline).
pub use cumulus_propagator as propagator;

/// Standard physics passes (`cumulus-propagators`).
pub use cumulus_propagators as propagators;

/// The simulation engine (`cumulus-engine`).
///
/// [`engine::SeedingEngine`] for host-driven stepping,
/// [`engine::RealtimeWorld`] for a background tick thread.
pub use cumulus_engine as engine;

/// Common imports for typical Cumulus usage.
///
/// ```rust
/// use cumulus::prelude::*;
/// ```
pub mod prelude {
    // Core types and traits
    pub use cumulus_core::{
        FieldId, HazardStatus, InjectionReceipt, InjectionRequest, Position, SnapshotAccess,
    };

    // Errors
    pub use cumulus_core::{IngressError, PropagatorError, StepError};

    // Space and fields
    pub use cumulus_field::{MOISTURE, RAINFALL};
    pub use cumulus_space::EdgeBehavior;

    // Propagator
    pub use cumulus_propagator::{Propagator, StepContext};

    // Engine
    pub use cumulus_engine::{
        ConfigError, EngineConfig, EngineSnapshot, GridConfig, HazardReport, RealtimeConfig,
        RealtimeWorld, SeedingEngine, StepMetrics, TickError,
    };
}
