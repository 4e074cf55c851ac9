//! Simulation engine for Cumulus cloud seeding.
//!
//! [`SeedingEngine`] couples the field grid and physics pipeline to the
//! game-facing operations: moisture injections priced against a
//! [`ResourceLedger`], a fixed-timestep [`TickEngine`] driven by host
//! `delta_time`, and a [`HazardMonitor`] classifying aggregate rainfall.
//! Readers query immutable snapshots and never block on a running update.
//!
//! [`RealtimeWorld`] runs the engine on a background thread at a fixed
//! wall-clock cadence.

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]
#![forbid(unsafe_code)]

pub mod config;
pub mod engine;
pub mod hazard;
pub mod injection;
pub mod ledger;
pub mod lerp;
pub mod metrics;
pub mod realtime;
pub mod ring;
pub mod tick;
mod tick_thread;

pub use config::{
    ConfigError, EngineConfig, GridConfig, HazardThresholds, InjectionConfig, LedgerConfig,
    PhysicsConfig, RealtimeConfig, MAX_FOOTPRINT_RADIUS, MAX_PENDING_PULSES, MAX_RING_BUFFER_SIZE,
};
pub use engine::{EngineSnapshot, SeedingEngine};
pub use hazard::{aggregate_rainfall, HazardMonitor, HazardReport};
pub use injection::{injection_cost, InjectionCounters, InjectionManager, Pulse};
pub use ledger::ResourceLedger;
pub use metrics::StepMetrics;
pub use realtime::{PendingReceipts, RealtimeWorld, ShutdownReport, SubmitError};
pub use ring::SnapshotRing;
pub use tick::{TickEngine, TickError, TimeAccounting, UpdateReport};
