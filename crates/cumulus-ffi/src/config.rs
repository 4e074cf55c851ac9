//! C-compatible engine configuration.
//!
//! [`CumulusConfig`] is a flat, fixed-width mirror of
//! [`EngineConfig`]. Fill it with [`cumulus_default_config`] and override
//! the fields you need before passing it to
//! [`cumulus_init`](crate::cumulus_init).

use cumulus_engine::{
    EngineConfig, GridConfig, HazardThresholds, InjectionConfig, LedgerConfig, PhysicsConfig,
};
use cumulus_space::EdgeBehavior;

use crate::status::CumulusStatus;

/// Wall behavior of the grid.
#[repr(i32)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CumulusEdgeBehavior {
    /// Out-of-range neighbours clamp to the wall cell.
    Clamp = 0,
    /// Periodic boundary.
    Wrap = 1,
    /// Material crossing a wall leaves the domain.
    Absorb = 2,
}

impl CumulusEdgeBehavior {
    fn from_code(code: i32) -> Option<EdgeBehavior> {
        match code {
            0 => Some(EdgeBehavior::Clamp),
            1 => Some(EdgeBehavior::Wrap),
            2 => Some(EdgeBehavior::Absorb),
            _ => None,
        }
    }

    fn code(edge: EdgeBehavior) -> i32 {
        match edge {
            EdgeBehavior::Clamp => Self::Clamp as i32,
            EdgeBehavior::Wrap => Self::Wrap as i32,
            EdgeBehavior::Absorb => Self::Absorb as i32,
        }
    }
}

/// Engine configuration as seen from C.
///
/// `edge` holds a [`CumulusEdgeBehavior`] code. Sizes are `u32` for ABI
/// portability.
#[repr(C)]
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct CumulusConfig {
    /// Cells east-west.
    pub nx: u32,
    /// Cells north-south.
    pub ny: u32,
    /// Altitude layers.
    pub nz: u32,
    /// Wall behavior code.
    pub edge: i32,
    /// Altitude of the top of the grid, km.
    pub domain_top_km: f32,
    /// Moisture diffusion coefficient, cells²/s.
    pub diffusion: f64,
    /// Mean wind, east-west component, cells/s.
    pub wind_x: f64,
    /// Mean wind, north-south component, cells/s.
    pub wind_y: f64,
    /// Mean wind, vertical component, cells/s.
    pub wind_z: f64,
    /// Gust amplitude per axis, cells/s.
    pub gust: f64,
    /// Saturation threshold at the ground.
    pub sat_surface: f32,
    /// Saturation threshold at the top of the grid.
    pub sat_top: f32,
    /// Fraction-per-second of excess moisture that condenses.
    pub condensation_rate: f64,
    /// Rainfall (mm) per kg/m³ condensed.
    pub precipitation_scale: f32,
    /// Exponential moisture loss rate, 1/s.
    pub decay_rate: f64,
    /// Cost of a full-intensity injection with no lift.
    pub unit_cost: f32,
    /// Lift (km) that doubles the cost of an injection.
    pub lift_cost_scale_km: f32,
    /// Largest accepted lift, km.
    pub max_lift_km: f32,
    /// Moisture released by a full-intensity injection, kg/m³.
    pub mass_per_unit: f32,
    /// Footprint half-width in cells.
    pub footprint_radius: u32,
    /// Gaussian footprint width, cells.
    pub footprint_sigma: f32,
    /// Time over which a pulse releases its mass, seconds.
    pub pulse_horizon_s: f64,
    /// Pending pulses kept before the oldest is folded in.
    pub max_pending_pulses: u32,
    /// Starting and maximum resources.
    pub resource_capacity: u32,
    /// Units regenerated per simulated second.
    pub regen_per_second: f64,
    /// Aggregate rainfall (mm) at which status becomes elevated.
    pub elevated_mm: f32,
    /// Aggregate rainfall (mm) at which status becomes critical.
    pub critical_mm: f32,
    /// Resources at or below which reserves are reported low.
    pub low_reserve_units: u32,
    /// Fixed substep length, seconds.
    pub dt: f64,
    /// Most substeps run by one update.
    pub max_substeps_per_update: u32,
    /// Snapshots retained for readers.
    pub ring_buffer_size: u32,
    /// Seed for gust perturbations.
    pub seed: u64,
}

impl CumulusConfig {
    pub(crate) fn from_rust(c: &EngineConfig) -> Self {
        Self {
            nx: c.grid.nx,
            ny: c.grid.ny,
            nz: c.grid.nz,
            edge: CumulusEdgeBehavior::code(c.grid.edge),
            domain_top_km: c.grid.domain_top_km,
            diffusion: c.physics.diffusion,
            wind_x: c.physics.wind[0],
            wind_y: c.physics.wind[1],
            wind_z: c.physics.wind[2],
            gust: c.physics.gust,
            sat_surface: c.physics.sat_surface,
            sat_top: c.physics.sat_top,
            condensation_rate: c.physics.condensation_rate,
            precipitation_scale: c.physics.precipitation_scale,
            decay_rate: c.physics.decay_rate,
            unit_cost: c.injection.unit_cost,
            lift_cost_scale_km: c.injection.lift_cost_scale_km,
            max_lift_km: c.injection.max_lift_km,
            mass_per_unit: c.injection.mass_per_unit,
            footprint_radius: c.injection.footprint_radius,
            footprint_sigma: c.injection.footprint_sigma,
            pulse_horizon_s: c.injection.pulse_horizon_s,
            max_pending_pulses: u32::try_from(c.injection.max_pending_pulses).unwrap_or(u32::MAX),
            resource_capacity: c.ledger.capacity,
            regen_per_second: c.ledger.regen_per_second,
            elevated_mm: c.hazard.elevated_mm,
            critical_mm: c.hazard.critical_mm,
            low_reserve_units: c.hazard.low_reserve_units,
            dt: c.dt,
            max_substeps_per_update: c.max_substeps_per_update,
            ring_buffer_size: u32::try_from(c.ring_buffer_size).unwrap_or(u32::MAX),
            seed: c.seed,
        }
    }

    /// Convert to an [`EngineConfig`]. Only the edge code is checked here;
    /// everything else is validated by the engine.
    pub(crate) fn to_rust(&self) -> Result<EngineConfig, CumulusStatus> {
        let edge = CumulusEdgeBehavior::from_code(self.edge).ok_or(CumulusStatus::ConfigError)?;
        Ok(EngineConfig {
            grid: GridConfig {
                nx: self.nx,
                ny: self.ny,
                nz: self.nz,
                edge,
                domain_top_km: self.domain_top_km,
            },
            physics: PhysicsConfig {
                diffusion: self.diffusion,
                wind: [self.wind_x, self.wind_y, self.wind_z],
                gust: self.gust,
                sat_surface: self.sat_surface,
                sat_top: self.sat_top,
                condensation_rate: self.condensation_rate,
                precipitation_scale: self.precipitation_scale,
                decay_rate: self.decay_rate,
            },
            injection: InjectionConfig {
                unit_cost: self.unit_cost,
                lift_cost_scale_km: self.lift_cost_scale_km,
                max_lift_km: self.max_lift_km,
                mass_per_unit: self.mass_per_unit,
                footprint_radius: self.footprint_radius,
                footprint_sigma: self.footprint_sigma,
                pulse_horizon_s: self.pulse_horizon_s,
                max_pending_pulses: self.max_pending_pulses as usize,
            },
            ledger: LedgerConfig {
                capacity: self.resource_capacity,
                regen_per_second: self.regen_per_second,
            },
            hazard: HazardThresholds {
                elevated_mm: self.elevated_mm,
                critical_mm: self.critical_mm,
                low_reserve_units: self.low_reserve_units,
            },
            dt: self.dt,
            max_substeps_per_update: self.max_substeps_per_update,
            ring_buffer_size: self.ring_buffer_size as usize,
            seed: self.seed,
        })
    }
}

impl Default for CumulusConfig {
    fn default() -> Self {
        Self::from_rust(&EngineConfig::default())
    }
}

/// Write the default configuration to `out`.
#[no_mangle]
#[allow(unsafe_code)]
pub extern "C" fn cumulus_default_config(out: *mut CumulusConfig) -> i32 {
    ffi_guard!({
        if out.is_null() {
            return CumulusStatus::InvalidArgument as i32;
        }
        // SAFETY: out is non-null and valid per caller contract.
        unsafe { *out = CumulusConfig::default() };
        CumulusStatus::Ok as i32
    })
}
