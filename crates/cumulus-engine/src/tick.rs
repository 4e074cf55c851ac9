//! Tick engine: the fixed-timestep integrator.
//!
//! [`TickEngine`] owns the field grid and the propagator pipeline and
//! turns host `delta_time` values into whole substeps of fixed `dt`.
//! Time is accumulated in integer nanoseconds, so chunking never drifts:
//! sixty `update(0.05)` calls and one `update(3.0)` run the same substeps.
//!
//! Each substep copies the front generation into staging, runs every
//! propagator in order against the staging buffer, sanitizes it and
//! publishes. A propagator error abandons the staging buffer, leaving the
//! front generation exactly as it was.

use std::fmt;
use std::time::Instant;

use cumulus_core::{StepError, TickId};
use cumulus_field::FieldGrid;
use cumulus_propagator::{
    validate_pipeline, PipelineError, PipelinePlan, Propagator, ScratchRegion, StepContext,
};
use tracing::{debug, warn};

use crate::config::ConfigError;
use crate::injection::InjectionManager;

const NANOS_PER_SEC: f64 = 1_000_000_000.0;

/// Convert a host `delta_time` to whole nanoseconds.
///
/// Non-finite and non-positive inputs convert to 0.
pub fn seconds_to_nanos(seconds: f64) -> u64 {
    if !seconds.is_finite() || seconds <= 0.0 {
        return 0;
    }
    let ns = (seconds * NANOS_PER_SEC).round();
    if ns >= u64::MAX as f64 {
        u64::MAX
    } else {
        ns as u64
    }
}

// ── UpdateReport ─────────────────────────────────────────────────

/// What one `update()` did.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct UpdateReport {
    /// Substeps completed.
    pub substeps: u32,
    /// Simulated nanoseconds advanced.
    pub advanced_ns: u64,
    /// Whole substeps' worth of nanoseconds dropped by the substep cap.
    pub discarded_ns: u64,
    /// Nanoseconds carried to the next update.
    pub pending_ns: u64,
    /// Cells repaired by sanitizing.
    pub sanitized_cells: u64,
    /// Per-propagator execution time summed over substeps: `(name, µs)`.
    pub propagator_us: Vec<(String, u64)>,
}

/// Cumulative time accounting since init or the last reset.
///
/// `advanced_ns + pending_ns + discarded_ns == accepted_ns` after every
/// update.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TimeAccounting {
    /// Sum of every accepted `delta_time`, in nanoseconds.
    pub accepted_ns: u64,
    /// Simulated time integrated by completed substeps.
    pub advanced_ns: u64,
    /// Time below one substep, carried to the next update.
    pub pending_ns: u64,
    /// Time dropped by the substep cap.
    pub discarded_ns: u64,
}

// ── TickError ────────────────────────────────────────────────────

/// Error returned from [`TickEngine::update()`].
///
/// Carries the progress made before the failing substep; every substep in
/// `report` was published, the failing one was not.
#[derive(Debug, PartialEq)]
pub struct TickError {
    /// The underlying error.
    pub kind: StepError,
    /// Progress before the failure.
    pub report: UpdateReport,
}

impl fmt::Display for TickError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{} (after {} substeps)", self.kind, self.report.substeps)
    }
}

impl std::error::Error for TickError {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        Some(&self.kind)
    }
}

// ── TickEngine ───────────────────────────────────────────────────

/// Single-writer fixed-timestep integrator.
pub struct TickEngine {
    field: FieldGrid,
    propagators: Vec<Box<dyn Propagator>>,
    plan: PipelinePlan,
    scratch: ScratchRegion,
    dt: f64,
    dt_ns: u64,
    seed: u64,
    max_substeps: u32,
    time: TimeAccounting,
    propagator_us: Vec<u64>,
}

impl TickEngine {
    /// Build an integrator over `field` running `propagators` in order.
    ///
    /// Validates the pipeline against the grid's fields and `dt`.
    pub fn new(
        field: FieldGrid,
        propagators: Vec<Box<dyn Propagator>>,
        dt: f64,
        seed: u64,
        max_substeps: u32,
    ) -> Result<Self, ConfigError> {
        let plan = validate_pipeline(
            &propagators,
            &field.defined_fields(),
            dt,
            field.grid().cell_count(),
        )?;
        let dt_ns = seconds_to_nanos(dt);
        if dt_ns == 0 {
            return Err(ConfigError::Pipeline(PipelineError::InvalidDt { value: dt }));
        }
        if max_substeps == 0 {
            return Err(ConfigError::SubstepCapZero);
        }
        let scratch = ScratchRegion::with_byte_capacity(plan.scratch_bytes());
        let propagator_us = vec![0; propagators.len()];
        Ok(Self {
            field,
            propagators,
            plan,
            scratch,
            dt,
            dt_ns,
            seed,
            max_substeps,
            time: TimeAccounting::default(),
            propagator_us,
        })
    }

    /// Advance simulated time by `delta_time` seconds.
    ///
    /// Non-finite or non-positive `delta_time` is a no-op. At most
    /// `max_substeps` substeps run; whole substeps beyond the cap are
    /// discarded and reported. On a propagator error the failing substep
    /// is abandoned, its time stays pending, and the error is returned
    /// with the progress made so far.
    pub fn update(
        &mut self,
        delta_time: f64,
        injections: &mut InjectionManager,
    ) -> Result<UpdateReport, TickError> {
        let mut report = UpdateReport::default();
        let delta_ns = seconds_to_nanos(delta_time);
        if delta_ns == 0 {
            report.pending_ns = self.time.pending_ns;
            return Ok(report);
        }
        self.time.accepted_ns = self.time.accepted_ns.saturating_add(delta_ns);
        self.time.pending_ns = self.time.pending_ns.saturating_add(delta_ns);

        let due = self.time.pending_ns / self.dt_ns;
        let run = due.min(self.max_substeps as u64);
        if due > run {
            let dropped = (due - run) * self.dt_ns;
            self.time.pending_ns -= dropped;
            self.time.discarded_ns = self.time.discarded_ns.saturating_add(dropped);
            report.discarded_ns = dropped;
            warn!(
                due,
                cap = self.max_substeps,
                discarded_ns = dropped,
                "substep cap reached; discarding simulated time"
            );
        }

        self.propagator_us.iter_mut().for_each(|us| *us = 0);
        for _ in 0..run {
            match self.run_substep(injections) {
                Ok(repaired) => {
                    self.time.pending_ns -= self.dt_ns;
                    self.time.advanced_ns = self.time.advanced_ns.saturating_add(self.dt_ns);
                    report.substeps += 1;
                    report.advanced_ns += self.dt_ns;
                    report.sanitized_cells += repaired as u64;
                }
                Err(kind) => {
                    report.pending_ns = self.time.pending_ns;
                    report.propagator_us = self.propagator_timings();
                    return Err(TickError { kind, report });
                }
            }
        }

        if report.sanitized_cells > 0 {
            warn!(
                cells = report.sanitized_cells,
                "sanitized non-finite or negative field values"
            );
        }
        report.pending_ns = self.time.pending_ns;
        report.propagator_us = self.propagator_timings();
        debug!(
            delta_time,
            substeps = report.substeps,
            pending_ns = report.pending_ns,
            tick = self.field.tick_id().0,
            "update complete"
        );
        Ok(report)
    }

    /// Run one substep. Returns the number of sanitized cells.
    fn run_substep(&mut self, injections: &mut InjectionManager) -> Result<usize, StepError> {
        let next_tick = self.field.tick_id().next();

        let failure = {
            let guard = self.field.begin_substep();
            let mut failure = None;
            for (i, prop) in self.propagators.iter().enumerate() {
                let start = Instant::now();
                self.scratch.reset();
                let mut ctx = StepContext::new(
                    guard.reads_previous,
                    &mut *guard.writes,
                    &mut self.scratch,
                    guard.grid,
                    &*injections,
                    next_tick,
                    self.dt,
                    self.seed,
                );
                if let Err(reason) = prop.step(&mut ctx) {
                    failure = Some(StepError::PropagatorFailed {
                        name: prop.name().to_string(),
                        reason,
                    });
                    break;
                }
                self.propagator_us[i] += start.elapsed().as_micros() as u64;
            }
            failure
        };

        if let Some(err) = failure {
            self.field.abandon();
            warn!(tick = next_tick.0, error = %err, "substep abandoned");
            return Err(err);
        }

        injections.advance();
        let repaired = self.field.sanitize_staging();
        self.field
            .publish(next_tick)
            .map_err(|e| StepError::PublishFailed {
                reason: e.to_string(),
            })?;
        Ok(repaired)
    }

    fn propagator_timings(&self) -> Vec<(String, u64)> {
        self.propagators
            .iter()
            .zip(&self.propagator_us)
            .map(|(p, us)| (p.name().to_string(), *us))
            .collect()
    }

    /// Zero the grid and every time accumulator.
    pub fn reset(&mut self) {
        self.field.reset();
        self.time = TimeAccounting::default();
        self.propagator_us.iter_mut().for_each(|us| *us = 0);
    }

    /// The field grid.
    pub fn field(&self) -> &FieldGrid {
        &self.field
    }

    /// Mutable field grid, for deposits made between substeps.
    pub fn field_mut(&mut self) -> &mut FieldGrid {
        &mut self.field
    }

    /// Tick of the last completed substep.
    pub fn current_tick(&self) -> TickId {
        self.field.tick_id()
    }

    /// Fixed substep length in seconds.
    pub fn dt(&self) -> f64 {
        self.dt
    }

    /// Fixed substep length in nanoseconds.
    pub fn dt_ns(&self) -> u64 {
        self.dt_ns
    }

    /// Cumulative time accounting.
    pub fn time(&self) -> TimeAccounting {
        self.time
    }

    /// Simulated seconds integrated so far.
    pub fn sim_time(&self) -> f64 {
        self.time.advanced_ns as f64 / NANOS_PER_SEC
    }

    /// The validated pipeline plan.
    pub fn plan(&self) -> &PipelinePlan {
        &self.plan
    }
}

impl fmt::Debug for TickEngine {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TickEngine")
            .field("cells", &self.field.grid().cell_count())
            .field("propagators", &self.propagators.len())
            .field("dt", &self.dt)
            .field("max_substeps", &self.max_substeps)
            .field("tick", &self.field.tick_id())
            .field("time", &self.time)
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::InjectionConfig;
    use cumulus_core::PropagatorError;
    use cumulus_field::{MOISTURE, RAINFALL};
    use cumulus_test_utils::fixtures::{AddPropagator, FailingPropagator, PoisonPropagator};
    use cumulus_test_utils::line_grid;

    fn injections() -> InjectionManager {
        InjectionManager::new(InjectionConfig::default(), 15.0, 40)
    }

    fn engine_with(props: Vec<Box<dyn Propagator>>, max_substeps: u32) -> TickEngine {
        let field = FieldGrid::with_standard_fields(line_grid(4)).unwrap();
        TickEngine::new(field, props, 0.05, 1, max_substeps).unwrap()
    }

    fn adder() -> TickEngine {
        engine_with(vec![Box::new(AddPropagator::new("add", MOISTURE, 1.0))], 240)
    }

    fn moisture0(e: &TickEngine) -> f32 {
        e.field().get(0).unwrap().moisture
    }

    #[test]
    fn seconds_to_nanos_rounds() {
        assert_eq!(seconds_to_nanos(0.05), 50_000_000);
        assert_eq!(seconds_to_nanos(3.0), 3_000_000_000);
        assert_eq!(seconds_to_nanos(1e-10), 0);
        assert_eq!(seconds_to_nanos(-1.0), 0);
        assert_eq!(seconds_to_nanos(f64::NAN), 0);
        assert_eq!(seconds_to_nanos(f64::INFINITY), 0);
    }

    #[test]
    fn non_positive_delta_is_noop() {
        let mut e = adder();
        let mut inj = injections();
        for dt in [0.0, -1.0, f64::NAN, f64::NEG_INFINITY] {
            let r = e.update(dt, &mut inj).unwrap();
            assert_eq!(r.substeps, 0);
        }
        assert_eq!(e.time(), TimeAccounting::default());
        assert_eq!(e.current_tick(), TickId(0));
    }

    #[test]
    fn remainder_carries_between_updates() {
        let mut e = adder();
        let mut inj = injections();
        let r = e.update(0.03, &mut inj).unwrap();
        assert_eq!(r.substeps, 0);
        assert_eq!(r.pending_ns, 30_000_000);
        let r = e.update(0.03, &mut inj).unwrap();
        assert_eq!(r.substeps, 1);
        assert_eq!(r.pending_ns, 10_000_000);
        assert_eq!(moisture0(&e), 1.0);
    }

    #[test]
    fn chunking_matches_single_update() {
        let mut a = adder();
        let mut b = adder();
        let (mut ia, mut ib) = (injections(), injections());
        for _ in 0..60 {
            a.update(0.05, &mut ia).unwrap();
        }
        b.update(3.0, &mut ib).unwrap();
        assert_eq!(a.current_tick(), TickId(60));
        assert_eq!(b.current_tick(), TickId(60));
        assert_eq!(a.time(), b.time());
        assert_eq!(moisture0(&a), moisture0(&b));
    }

    #[test]
    fn cap_discards_whole_substeps_and_keeps_remainder() {
        let mut e = engine_with(
            vec![Box::new(AddPropagator::new("add", MOISTURE, 1.0))],
            10,
        );
        let mut inj = injections();
        let r = e.update(1.01, &mut inj).unwrap();
        assert_eq!(r.substeps, 10);
        assert_eq!(r.discarded_ns, 10 * 50_000_000);
        assert_eq!(r.pending_ns, 10_000_000);
        let t = e.time();
        assert_eq!(t.advanced_ns + t.pending_ns + t.discarded_ns, t.accepted_ns);
    }

    #[test]
    fn failure_abandons_substep_atomically() {
        let props: Vec<Box<dyn Propagator>> = vec![
            Box::new(AddPropagator::new("rain", RAINFALL, 1.0)),
            Box::new(FailingPropagator::new("flaky", MOISTURE, 2)),
        ];
        let mut e = engine_with(props, 240);
        let mut inj = injections();
        let err = e.update(0.25, &mut inj).unwrap_err();
        assert_eq!(err.report.substeps, 2);
        assert!(matches!(
            err.kind,
            StepError::PropagatorFailed {
                ref name,
                reason: PropagatorError::ExecutionFailed { .. },
            } if name == "flaky"
        ));
        // The third substep's rainfall write was rolled back with it.
        assert_eq!(e.current_tick(), TickId(2));
        let cell = e.field().get(0).unwrap();
        assert_eq!(cell.accumulated_rainfall, 2.0);
        assert_eq!(cell.moisture, 2.0);
        // Unrun time stays pending.
        assert_eq!(e.time().pending_ns, 150_000_000);
        assert_eq!(err.report.pending_ns, 150_000_000);
    }

    #[test]
    fn staging_is_sanitized_before_publish() {
        let props: Vec<Box<dyn Propagator>> = vec![Box::new(PoisonPropagator { field: MOISTURE })];
        let mut e = engine_with(props, 240);
        let mut inj = injections();
        let r = e.update(0.1, &mut inj).unwrap();
        assert_eq!(r.substeps, 2);
        assert_eq!(r.sanitized_cells, 4);
        let m = e.field().read(MOISTURE).unwrap();
        assert!(m.iter().all(|v| v.is_finite() && *v >= 0.0));
    }

    #[test]
    fn timings_reported_per_propagator() {
        let props: Vec<Box<dyn Propagator>> = vec![
            Box::new(AddPropagator::new("first", MOISTURE, 1.0)),
            Box::new(AddPropagator::new("second", RAINFALL, 1.0)),
        ];
        let mut e = engine_with(props, 240);
        let mut inj = injections();
        let r = e.update(0.05, &mut inj).unwrap();
        let names: Vec<&str> = r.propagator_us.iter().map(|(n, _)| n.as_str()).collect();
        assert_eq!(names, ["first", "second"]);
    }

    #[test]
    fn reset_rewinds_everything() {
        let mut e = adder();
        let mut inj = injections();
        e.update(0.33, &mut inj).unwrap();
        e.reset();
        assert_eq!(e.current_tick(), TickId(0));
        assert_eq!(e.time(), TimeAccounting::default());
        assert_eq!(moisture0(&e), 0.0);
        assert_eq!(e.sim_time(), 0.0);
    }

    #[test]
    fn sub_nanosecond_dt_rejected() {
        let field = FieldGrid::with_standard_fields(line_grid(4)).unwrap();
        let props: Vec<Box<dyn Propagator>> =
            vec![Box::new(AddPropagator::new("add", MOISTURE, 1.0))];
        let err = TickEngine::new(field, props, 1e-12, 0, 10).unwrap_err();
        assert!(matches!(
            err,
            ConfigError::Pipeline(PipelineError::InvalidDt { .. })
        ));
    }
}
