//! Injection manager: pricing, acceptance, and pending pulses.
//!
//! An accepted injection becomes a [`Pulse`]: a footprint around the
//! release cell plus a total mass, released over `K` substeps with
//! linearly decaying weights `w_k = 2(K − k) / (K(K + 1))`. The manager
//! is the [`SourceTerms`] the injection-source propagator reads each
//! substep.

use std::collections::VecDeque;

use cumulus_core::{InjectionReceipt, InjectionRequest, IngressError, Position};
use cumulus_field::{FieldDelta, FieldGrid, MOISTURE};
use cumulus_propagator::SourceTerms;
use cumulus_space::{Cell, Footprint, Grid3};
use tracing::{trace, warn};

use crate::config::InjectionConfig;
use crate::ledger::ResourceLedger;

/// Resource cost of an injection.
///
/// `round(intensity × (1 + lift / lift_cost_scale_km) × unit_cost)`,
/// computed on the sanitized inputs. Non-decreasing in both arguments.
pub fn injection_cost(config: &InjectionConfig, intensity: f32, lift_km: f32) -> u32 {
    let intensity = sanitize_intensity(intensity) as f64;
    let lift = sanitize_lift(lift_km, config.max_lift_km) as f64;
    let lift_factor = 1.0 + lift / config.lift_cost_scale_km as f64;
    let cost = (intensity * lift_factor * config.unit_cost as f64).round();
    if cost.is_finite() && cost > 0.0 {
        cost.min(u32::MAX as f64) as u32
    } else {
        0
    }
}

fn sanitize_intensity(v: f32) -> f32 {
    if v.is_finite() {
        v.clamp(0.0, 1.0)
    } else {
        0.0
    }
}

fn sanitize_lift(v: f32, max_lift_km: f32) -> f32 {
    if v.is_finite() {
        v.clamp(0.0, max_lift_km)
    } else {
        0.0
    }
}

// ── Pulse ──────────────────────────────────────────────────────────

/// A pending, decaying source term created by an accepted injection.
#[derive(Clone, Debug)]
pub struct Pulse {
    footprint: Footprint,
    mass: f32,
    emitted: u32,
    substeps: u32,
}

impl Pulse {
    fn new(footprint: Footprint, mass: f32, substeps: u32) -> Self {
        Self {
            footprint,
            mass,
            emitted: 0,
            substeps: substeps.max(1),
        }
    }

    /// Cells receiving the pulse.
    pub fn footprint(&self) -> &Footprint {
        &self.footprint
    }

    /// Total mass of the pulse.
    pub fn mass(&self) -> f32 {
        self.mass
    }

    /// Substeps left before the pulse is exhausted.
    pub fn substeps_left(&self) -> u32 {
        self.substeps - self.emitted
    }

    /// Share of the total mass deposited in the current substep.
    pub fn current_weight(&self) -> f64 {
        let k = self.substeps as f64;
        let left = self.substeps_left() as f64;
        2.0 * left / (k * (k + 1.0))
    }

    /// Mass not yet deposited.
    pub fn remaining_mass(&self) -> f32 {
        let k = self.substeps as f64;
        let left = self.substeps_left() as f64;
        (self.mass as f64 * left * (left + 1.0) / (k * (k + 1.0))) as f32
    }

    fn is_exhausted(&self) -> bool {
        self.emitted >= self.substeps
    }
}

// ── Counters ───────────────────────────────────────────────────────

/// Cumulative injection counters since init or the last reset.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct InjectionCounters {
    /// Injections accepted, including zero-mass ones.
    pub accepted: u64,
    /// Injections rejected for insufficient resources.
    pub rejected: u64,
    /// Pulses folded into the grid early because the queue was full.
    pub folded: u64,
}

// ── InjectionManager ───────────────────────────────────────────────

/// Turns injection requests into pulses and tracks them until exhausted.
#[derive(Debug)]
pub struct InjectionManager {
    config: InjectionConfig,
    domain_top_km: f32,
    pulse_substeps: u32,
    pulses: VecDeque<Pulse>,
    counters: InjectionCounters,
}

impl InjectionManager {
    /// Create a manager with an empty pulse queue.
    ///
    /// `pulse_substeps` is `K`, the number of substeps each pulse spans.
    pub fn new(config: InjectionConfig, domain_top_km: f32, pulse_substeps: u32) -> Self {
        let pulses = VecDeque::with_capacity(config.max_pending_pulses);
        Self {
            config,
            domain_top_km,
            pulse_substeps: pulse_substeps.max(1),
            pulses,
            counters: InjectionCounters::default(),
        }
    }

    /// Price, debit and queue an injection.
    ///
    /// Out-of-range input is clamped. The only rejection is
    /// [`IngressError::InsufficientResources`], which leaves the ledger and
    /// the grid untouched.
    pub fn add_injection(
        &mut self,
        request: InjectionRequest,
        ledger: &mut ResourceLedger,
        field: &mut FieldGrid,
    ) -> InjectionReceipt {
        let position = request.position.clamped();
        let intensity = sanitize_intensity(request.intensity);
        let lift_km = sanitize_lift(request.lift_km, self.config.max_lift_km);
        let cost = injection_cost(&self.config, intensity, lift_km);

        if !ledger.try_debit(cost) {
            self.counters.rejected += 1;
            trace!(
                cost,
                remaining = ledger.remaining(),
                "injection rejected: insufficient resources"
            );
            return InjectionReceipt::rejected(
                IngressError::InsufficientResources,
                cost,
                ledger.remaining(),
            );
        }
        self.counters.accepted += 1;

        let mass = intensity * self.config.mass_per_unit;
        if mass.is_finite() && mass > 0.0 {
            if self.pulses.len() >= self.config.max_pending_pulses {
                self.fold_oldest(field);
            }
            let cell = self.release_cell(field.grid(), position, lift_km);
            let footprint = Footprint::gaussian(
                field.grid(),
                cell,
                self.config.footprint_radius,
                self.config.footprint_sigma,
            );
            self.pulses
                .push_back(Pulse::new(footprint, mass, self.pulse_substeps));
        }
        trace!(
            x = position.x,
            y = position.y,
            z = position.z,
            intensity,
            lift_km,
            cost,
            mass,
            "injection accepted"
        );
        InjectionReceipt::accepted(cost, ledger.remaining())
    }

    /// The cell an injection is released from.
    ///
    /// Horizontal cell from the position; layer from
    /// `clamp(z × domain_top + lift, 0, domain_top)`.
    pub fn release_cell(&self, grid: &Grid3, position: Position, lift_km: f32) -> Cell {
        let base = grid.locate(position);
        let top = self.domain_top_km;
        let alt_km = (position.z * top + lift_km).clamp(0.0, top);
        Cell::new(base.x, base.y, grid.layer_at(alt_km / top))
    }

    fn fold_oldest(&mut self, field: &mut FieldGrid) {
        let Some(oldest) = self.pulses.pop_front() else {
            return;
        };
        let delta = FieldDelta {
            footprint: oldest.footprint(),
            mass: oldest.remaining_mass(),
        };
        if let Err(e) = field.apply(MOISTURE, &delta) {
            warn!(error = %e, "could not fold pulse into grid");
        }
        self.counters.folded += 1;
    }

    /// Age every pulse by one substep and drop exhausted ones.
    pub fn advance(&mut self) {
        for p in &mut self.pulses {
            p.emitted += 1;
        }
        self.pulses.retain(|p| !p.is_exhausted());
    }

    /// Pending pulses, oldest first.
    pub fn pulses(&self) -> impl Iterator<Item = &Pulse> {
        self.pulses.iter()
    }

    /// Number of pending pulses.
    pub fn pending(&self) -> usize {
        self.pulses.len()
    }

    /// Mass still to be deposited by pending pulses.
    pub fn pending_mass(&self) -> f32 {
        self.pulses.iter().map(Pulse::remaining_mass).sum()
    }

    /// Substeps each pulse spans.
    pub fn pulse_substeps(&self) -> u32 {
        self.pulse_substeps
    }

    /// Cumulative counters.
    pub fn counters(&self) -> InjectionCounters {
        self.counters
    }

    /// Drop every pending pulse and zero the counters.
    pub fn clear(&mut self) {
        self.pulses.clear();
        self.counters = InjectionCounters::default();
    }
}

impl SourceTerms for InjectionManager {
    fn for_each_deposit(&self, visit: &mut dyn FnMut(FieldDelta<'_>)) {
        for p in &self.pulses {
            visit(FieldDelta {
                footprint: &p.footprint,
                mass: (p.mass as f64 * p.current_weight()) as f32,
            });
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::LedgerConfig;
    use cumulus_space::EdgeBehavior;

    fn setup(max_pending: usize) -> (InjectionManager, ResourceLedger, FieldGrid) {
        let config = InjectionConfig {
            max_pending_pulses: max_pending,
            ..InjectionConfig::default()
        };
        let manager = InjectionManager::new(config, 15.0, 4);
        let ledger = ResourceLedger::new(&LedgerConfig::default());
        let grid = Grid3::new(8, 8, 8, EdgeBehavior::Absorb).unwrap();
        (manager, ledger, FieldGrid::with_standard_fields(grid).unwrap())
    }

    fn deposits(m: &InjectionManager) -> f32 {
        let mut total = 0.0;
        m.for_each_deposit(&mut |d| total += d.mass);
        total
    }

    #[test]
    fn cost_formula() {
        let c = InjectionConfig::default();
        assert_eq!(injection_cost(&c, 0.5, 0.0), 5);
        assert_eq!(injection_cost(&c, 1.0, 0.0), 10);
        assert_eq!(injection_cost(&c, 1.0, 5.0), 20);
        assert_eq!(injection_cost(&c, 1.0, 15.0), 40);
        assert_eq!(injection_cost(&c, 0.0, 15.0), 0);
    }

    #[test]
    fn cost_clamps_inputs() {
        let c = InjectionConfig::default();
        assert_eq!(injection_cost(&c, 7.0, 0.0), 10);
        assert_eq!(injection_cost(&c, -1.0, 3.0), 0);
        assert_eq!(injection_cost(&c, f32::NAN, 0.0), 0);
        assert_eq!(injection_cost(&c, 1.0, 99.0), 40);
        assert_eq!(injection_cost(&c, 1.0, f32::INFINITY), 10);
    }

    #[test]
    fn accepted_injection_debits_and_queues() {
        let (mut m, mut ledger, mut fg) = setup(8);
        let r = m.add_injection(
            InjectionRequest::new(Position::CENTER, 0.5, 0.0),
            &mut ledger,
            &mut fg,
        );
        assert!(r.accepted);
        assert_eq!(r.cost, 5);
        assert_eq!(r.resources_remaining, 95);
        assert_eq!(ledger.remaining(), 95);
        assert_eq!(m.pending(), 1);
        assert!((m.pending_mass() - 20.0).abs() < 1e-4);
        // The grid itself is untouched until the pulse is stepped.
        assert!(fg.read(MOISTURE).unwrap().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn rejection_leaves_everything_untouched() {
        let (mut m, mut ledger, mut fg) = setup(8);
        ledger.try_debit(97);
        let r = m.add_injection(
            InjectionRequest::new(Position::CENTER, 1.0, 0.0),
            &mut ledger,
            &mut fg,
        );
        assert!(!r.accepted);
        assert_eq!(r.cost, 10);
        assert_eq!(r.reason, Some(IngressError::InsufficientResources));
        assert_eq!(r.resources_remaining, 3);
        assert_eq!(ledger.remaining(), 3);
        assert_eq!(m.pending(), 0);
        assert_eq!(m.counters().rejected, 1);
    }

    #[test]
    fn zero_intensity_is_free_and_not_queued() {
        let (mut m, mut ledger, mut fg) = setup(8);
        let r = m.add_injection(
            InjectionRequest::new(Position::CENTER, 0.0, 0.0),
            &mut ledger,
            &mut fg,
        );
        assert!(r.accepted);
        assert_eq!(r.cost, 0);
        assert_eq!(ledger.remaining(), 100);
        assert_eq!(m.pending(), 0);
    }

    #[test]
    fn weights_sum_to_one() {
        let (mut m, mut ledger, mut fg) = setup(8);
        m.add_injection(
            InjectionRequest::new(Position::CENTER, 1.0, 0.0),
            &mut ledger,
            &mut fg,
        );
        let mut released = 0.0;
        let mut last = f32::INFINITY;
        while m.pending() > 0 {
            let d = deposits(&m);
            assert!(d < last, "weights decay linearly");
            last = d;
            released += d;
            m.advance();
        }
        assert!((released - 40.0).abs() < 1e-3);
    }

    #[test]
    fn release_layer_follows_altitude_and_lift() {
        let (m, _, fg) = setup(8);
        let grid = fg.grid();
        assert_eq!(
            m.release_cell(grid, Position::new(0.5, 0.5, 0.0), 0.0).z,
            0
        );
        assert_eq!(
            m.release_cell(grid, Position::new(0.5, 0.5, 0.0), 7.5).z,
            4
        );
        assert_eq!(
            m.release_cell(grid, Position::new(0.5, 0.5, 0.9), 15.0).z,
            7
        );
    }

    #[test]
    fn full_queue_folds_oldest_into_grid() {
        let (mut m, mut ledger, mut fg) = setup(2);
        for _ in 0..3 {
            let r = m.add_injection(
                InjectionRequest::new(Position::CENTER, 0.5, 0.0),
                &mut ledger,
                &mut fg,
            );
            assert!(r.accepted);
        }
        assert_eq!(m.pending(), 2);
        assert_eq!(m.counters().folded, 1);
        let in_grid: f32 = fg.read(MOISTURE).unwrap().iter().sum();
        assert!((in_grid - 20.0).abs() < 1e-3);
        assert_eq!(ledger.remaining(), 85);
    }

    #[test]
    fn non_finite_position_lands_at_centre_column() {
        let (mut m, mut ledger, mut fg) = setup(8);
        m.add_injection(
            InjectionRequest::new(Position::new(f32::NAN, f32::INFINITY, 0.5), 0.5, 0.0),
            &mut ledger,
            &mut fg,
        );
        let pulse = m.pulses().next().unwrap();
        let centre = fg.grid().locate(Position::CENTER);
        let ranks = pulse.footprint().ranks();
        assert!(ranks.contains(&fg.grid().rank_of(centre)));
    }

    #[test]
    fn clear_drops_pulses_and_counters() {
        let (mut m, mut ledger, mut fg) = setup(8);
        m.add_injection(
            InjectionRequest::new(Position::CENTER, 0.5, 0.0),
            &mut ledger,
            &mut fg,
        );
        m.clear();
        assert_eq!(m.pending(), 0);
        assert_eq!(m.counters(), InjectionCounters::default());
    }
}
