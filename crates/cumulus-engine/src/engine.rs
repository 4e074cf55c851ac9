//! The seeding engine: one writer, many readers.
//!
//! [`SeedingEngine`] serializes [`add_injection`](SeedingEngine::add_injection),
//! [`update`](SeedingEngine::update) and [`reset`](SeedingEngine::reset)
//! behind a writer mutex. After every completed mutation it publishes an
//! immutable [`EngineSnapshot`] into a [`SnapshotRing`]; every query reads
//! the latest snapshot and never touches the writer mutex.

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Instant;

use cumulus_core::{
    FieldId, HazardStatus, InjectionReceipt, InjectionRequest, Position, SnapshotAccess, TickId,
    WorldGenerationId,
};
use cumulus_field::{CellSample, FieldGrid, OwnedSnapshot, MOISTURE, RAINFALL};
use cumulus_propagator::Propagator;
use cumulus_space::Grid3;
use tracing::{info, warn};

use crate::config::{ConfigError, EngineConfig};
use crate::hazard::{aggregate_rainfall, HazardMonitor, HazardReport};
use crate::injection::InjectionManager;
use crate::ledger::ResourceLedger;
use crate::lerp::lerp_fields;
use crate::metrics::StepMetrics;
use crate::ring::SnapshotRing;
use crate::tick::{seconds_to_nanos, TickEngine, TickError, TimeAccounting};

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

// ── EngineSnapshot ───────────────────────────────────────────────

/// Everything a reader can observe, frozen at one publication.
#[derive(Clone, Debug, PartialEq)]
pub struct EngineSnapshot {
    fields: OwnedSnapshot,
    hazard: HazardReport,
    sim_time_ns: u64,
    reset_epoch: u64,
    metrics: StepMetrics,
}

// Compile-time assertion: EngineSnapshot must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<EngineSnapshot>();
};

impl EngineSnapshot {
    /// Field data at this publication.
    pub fn fields(&self) -> &OwnedSnapshot {
        &self.fields
    }

    /// Moisture per cell, kg/m³, in canonical rank order.
    pub fn moisture(&self) -> &[f32] {
        self.fields.read_field(MOISTURE).unwrap_or(&[])
    }

    /// Accumulated rainfall per cell, mm, in canonical rank order.
    pub fn accumulated_rainfall(&self) -> &[f32] {
        self.fields.read_field(RAINFALL).unwrap_or(&[])
    }

    /// Both fields at `rank`.
    pub fn get(&self, rank: usize) -> Option<CellSample> {
        self.fields.get(rank)
    }

    /// Hazard classification.
    pub fn hazard(&self) -> &HazardReport {
        &self.hazard
    }

    /// Aggregate rainfall, mm.
    pub fn rainfall(&self) -> f32 {
        self.hazard.rainfall_mm
    }

    /// Resources remaining.
    pub fn resources(&self) -> u32 {
        self.hazard.resources
    }

    /// Hazard status.
    pub fn status(&self) -> HazardStatus {
        self.hazard.status
    }

    /// Simulated seconds integrated since init or the last reset.
    pub fn sim_time(&self) -> f64 {
        self.sim_time_ns as f64 / NANOS_PER_SEC
    }

    /// Simulated nanoseconds integrated since init or the last reset.
    pub fn sim_time_ns(&self) -> u64 {
        self.sim_time_ns
    }

    /// Number of resets before this publication.
    pub fn reset_epoch(&self) -> u64 {
        self.reset_epoch
    }

    /// Metrics of the update this snapshot followed.
    pub fn metrics(&self) -> &StepMetrics {
        &self.metrics
    }
}

impl SnapshotAccess for EngineSnapshot {
    fn read_field(&self, field: FieldId) -> Option<&[f32]> {
        self.fields.read_field(field)
    }

    fn tick_id(&self) -> TickId {
        self.fields.tick_id()
    }

    fn world_generation_id(&self) -> WorldGenerationId {
        self.fields.world_generation_id()
    }
}

// ── WriterState ──────────────────────────────────────────────────

struct WriterState {
    tick: TickEngine,
    injections: InjectionManager,
    ledger: ResourceLedger,
    generation: u64,
    reset_epoch: u64,
    status: HazardStatus,
    metrics: StepMetrics,
    /// Field buffers of an evicted snapshot no reader held.
    spare: Option<OwnedSnapshot>,
}

// ── SeedingEngine ────────────────────────────────────────────────

/// Cloud-seeding simulation with a single writer stream and lock-free
/// readers.
///
/// Construction is initialisation: there is no uninitialised engine.
/// All methods take `&self`, so one engine can be shared behind an `Arc`
/// between a writer thread and any number of readers.
///
/// # Example
///
/// ```
/// use cumulus_engine::{EngineConfig, SeedingEngine};
/// use cumulus_core::Position;
///
/// let engine = SeedingEngine::init(EngineConfig::default()).unwrap();
/// let receipt = engine.add_injection(Position::CENTER, 0.5, 0.0);
/// assert!(receipt.accepted);
/// assert_eq!(engine.resources(), 95);
///
/// engine.update(3.0).unwrap();
/// assert!(engine.rainfall() > 0.0);
/// ```
pub struct SeedingEngine {
    writer: Mutex<WriterState>,
    ring: SnapshotRing<EngineSnapshot>,
    monitor: HazardMonitor,
    grid: Grid3,
    config: EngineConfig,
}

// Compile-time assertion: SeedingEngine must be Send + Sync.
const _: fn() = || {
    fn assert<T: Send + Sync>() {}
    assert::<SeedingEngine>();
};

impl SeedingEngine {
    /// Validate `config`, allocate the grid, fill the ledger and publish
    /// the initial snapshot.
    pub fn init(config: EngineConfig) -> Result<Self, ConfigError> {
        let propagators = config.build_pipeline()?;
        Self::init_with_pipeline(config, propagators)
    }

    /// Like [`init`](Self::init) but with a caller-supplied pipeline in
    /// place of the standard physics.
    ///
    /// The pipeline is validated against the standard fields and
    /// `config.dt`.
    pub fn init_with_pipeline(
        config: EngineConfig,
        propagators: Vec<Box<dyn Propagator>>,
    ) -> Result<Self, ConfigError> {
        let grid = config.validate_structure()?;
        let field = FieldGrid::with_standard_fields(grid.clone())?;
        let tick = TickEngine::new(
            field,
            propagators,
            config.dt,
            config.seed,
            config.max_substeps_per_update,
        )?;
        let injections = InjectionManager::new(
            config.injection.clone(),
            config.grid.domain_top_km,
            config.pulse_substeps(),
        );
        let ledger = ResourceLedger::new(&config.ledger);

        let engine = Self {
            writer: Mutex::new(WriterState {
                tick,
                injections,
                ledger,
                generation: 0,
                reset_epoch: 0,
                status: HazardStatus::Normal,
                metrics: StepMetrics::default(),
                spare: None,
            }),
            ring: SnapshotRing::new(config.ring_buffer_size),
            monitor: HazardMonitor::new(config.hazard.clone()),
            grid,
            config,
        };
        {
            let mut state = engine.lock_writer();
            engine.publish(&mut state);
        }
        info!(
            nx = engine.grid.nx(),
            ny = engine.grid.ny(),
            nz = engine.grid.nz(),
            dt = engine.config.dt,
            resources = engine.config.ledger.capacity,
            "seeding engine initialised"
        );
        Ok(engine)
    }

    /// The writer state survives a panic on the writer thread: a panicking
    /// substep leaves the front generation untouched.
    fn lock_writer(&self) -> MutexGuard<'_, WriterState> {
        self.writer.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Build and publish a snapshot of the current writer state.
    fn publish(&self, state: &mut WriterState) {
        let start = Instant::now();
        state.generation += 1;
        let generation = WorldGenerationId(state.generation);

        let field = state.tick.field();
        let fields = match state.spare.take() {
            Some(mut snap) => {
                field.snapshot_into(&mut snap, generation);
                snap
            }
            None => field.owned_snapshot(generation),
        };
        let rainfall = fields
            .read_field(RAINFALL)
            .map_or(0.0, |r| aggregate_rainfall(&self.grid, r));
        let hazard = self.monitor.report(rainfall, state.ledger.remaining());

        let counters = state.injections.counters();
        state.metrics.memory_bytes = field.memory_bytes();
        state.metrics.pending_pulses = state.injections.pending();
        state.metrics.injections_accepted = counters.accepted;
        state.metrics.injections_rejected = counters.rejected;
        state.metrics.pulses_folded = counters.folded;
        state.metrics.snapshot_publish_us = start.elapsed().as_micros() as u64;

        if hazard.status != state.status {
            if hazard.is_emergency() {
                warn!(
                    rainfall_mm = hazard.rainfall_mm,
                    from = %state.status,
                    "hazard status critical"
                );
            } else {
                info!(
                    rainfall_mm = hazard.rainfall_mm,
                    from = %state.status,
                    to = %hazard.status,
                    "hazard status changed"
                );
            }
            state.status = hazard.status;
        }

        let snapshot = EngineSnapshot {
            fields,
            hazard,
            sim_time_ns: state.tick.time().advanced_ns,
            reset_epoch: state.reset_epoch,
            metrics: state.metrics.clone(),
        };
        if let Some(evicted) = self.ring.push(Arc::new(snapshot)) {
            if let Ok(old) = Arc::try_unwrap(evicted) {
                state.spare = Some(old.fields);
            }
        }
    }

    // ── Writer operations ────────────────────────────────────────

    /// Release seeding agent at `position`.
    ///
    /// Inputs are clamped, never rejected. The only rejection is
    /// insufficient resources, which changes nothing and publishes
    /// nothing. An accepted injection publishes a new snapshot.
    pub fn add_injection(
        &self,
        position: Position,
        intensity: f32,
        lift_km: f32,
    ) -> InjectionReceipt {
        self.submit(InjectionRequest::new(position, intensity, lift_km))
    }

    /// [`add_injection`](Self::add_injection) taking a prepared request.
    pub fn submit(&self, request: InjectionRequest) -> InjectionReceipt {
        let mut guard = self.lock_writer();
        let state = &mut *guard;
        let receipt = state
            .injections
            .add_injection(request, &mut state.ledger, state.tick.field_mut());
        if receipt.accepted {
            self.publish(state);
        }
        receipt
    }

    /// Advance simulated time by `delta_time` seconds and publish.
    ///
    /// Non-finite or non-positive `delta_time` is a no-op that publishes
    /// nothing and reports zero substeps. On a propagator error the
    /// substeps completed before it are still published; the error carries
    /// their count.
    pub fn update(&self, delta_time: f64) -> Result<StepMetrics, TickError> {
        let start = Instant::now();
        let mut guard = self.lock_writer();
        let state = &mut *guard;

        if seconds_to_nanos(delta_time) == 0 {
            return Ok(StepMetrics {
                pending_ns: state.tick.time().pending_ns,
                pending_pulses: state.injections.pending(),
                ..StepMetrics::default()
            });
        }

        let result = state.tick.update(delta_time, &mut state.injections);
        let report = match &result {
            Ok(report) => report,
            Err(err) => &err.report,
        };
        state.ledger.regenerate(report.advanced_ns);
        state.metrics = StepMetrics {
            substeps: report.substeps,
            advanced_ns: report.advanced_ns,
            discarded_ns: report.discarded_ns,
            pending_ns: report.pending_ns,
            sanitized_cells: report.sanitized_cells,
            propagator_us: report.propagator_us.clone(),
            ..StepMetrics::default()
        };
        let progressed = report.substeps > 0;
        state.metrics.total_us = start.elapsed().as_micros() as u64;

        match result {
            Ok(_) => {
                self.publish(state);
                Ok(state.metrics.clone())
            }
            Err(err) => {
                if progressed {
                    self.publish(state);
                }
                Err(err)
            }
        }
    }

    /// Return to the initial state: zero the grid, refill the ledger,
    /// drop pending pulses and clear every time accumulator.
    ///
    /// Publishes a fresh snapshot. Interpolation never blends across a
    /// reset.
    pub fn reset(&self) {
        let mut guard = self.lock_writer();
        let state = &mut *guard;
        state.tick.reset();
        state.injections.clear();
        state.ledger.reset();
        state.reset_epoch += 1;
        state.metrics = StepMetrics::default();
        self.publish(state);
        info!(reset_epoch = state.reset_epoch, "seeding engine reset");
    }

    /// Cumulative time accounting. Waits for a running update.
    pub fn time_accounting(&self) -> TimeAccounting {
        self.lock_writer().tick.time()
    }

    // ── Queries ──────────────────────────────────────────────────

    /// The latest published snapshot.
    pub fn snapshot(&self) -> Arc<EngineSnapshot> {
        // The ring is never empty after init; `None` only means the slot
        // was overwritten between reading the position and the slot.
        loop {
            if let Some(snap) = self.ring.latest() {
                return snap;
            }
            std::hint::spin_loop();
        }
    }

    /// Aggregate rainfall, mm: the largest column total.
    pub fn rainfall(&self) -> f32 {
        self.snapshot().rainfall()
    }

    /// Resources remaining.
    pub fn resources(&self) -> u32 {
        self.snapshot().resources()
    }

    /// Hazard status.
    pub fn status(&self) -> HazardStatus {
        self.snapshot().status()
    }

    /// Hazard status label: `"normal"`, `"elevated"` or `"critical"`.
    pub fn status_label(&self) -> &'static str {
        self.status().as_str()
    }

    /// `true` exactly when the status is critical.
    pub fn is_emergency(&self) -> bool {
        self.status().is_emergency()
    }

    /// Full hazard report.
    pub fn hazard_report(&self) -> HazardReport {
        *self.snapshot().hazard()
    }

    /// Simulated seconds since init or the last reset.
    pub fn sim_time(&self) -> f64 {
        self.snapshot().sim_time()
    }

    /// Metrics of the most recent update.
    pub fn last_metrics(&self) -> StepMetrics {
        self.snapshot().metrics().clone()
    }

    /// Moisture blended between the previous and latest publications.
    ///
    /// `alpha = 0` is the previous snapshot, `1` the latest. With no
    /// previous snapshot, or one from before a reset, the latest moisture
    /// is copied. Returns the number of cells written.
    pub fn interpolated_moisture(&self, alpha: f32, out: &mut [f32]) -> usize {
        let (previous, latest) = self
            .ring
            .latest_pair()
            .unwrap_or_else(|| (None, self.snapshot()));
        let next = latest.moisture();
        match previous.filter(|p| p.reset_epoch == latest.reset_epoch) {
            Some(prev) => lerp_fields(prev.moisture(), next, alpha, out),
            None => {
                let n = next.len().min(out.len());
                out[..n].copy_from_slice(&next[..n]);
                n
            }
        }
    }

    /// The grid topology.
    pub fn grid(&self) -> &Grid3 {
        &self.grid
    }

    /// The configuration the engine was built with.
    pub fn config(&self) -> &EngineConfig {
        &self.config
    }
}

impl fmt::Debug for SeedingEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let snap = self.snapshot();
        f.debug_struct("SeedingEngine")
            .field("grid", &self.grid)
            .field("generation", &snap.world_generation_id())
            .field("tick", &snap.tick_id())
            .field("hazard", snap.hazard())
            .finish_non_exhaustive()
    }
}
