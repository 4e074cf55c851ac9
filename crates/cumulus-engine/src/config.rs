//! Engine configuration, validation, and error types.
//!
//! [`EngineConfig`] is the input to [`SeedingEngine::init`](crate::SeedingEngine::init).
//! [`validate()`](EngineConfig::validate) checks every structural invariant
//! without allocating the grid. The engine constructor runs the same checks
//! once, keeping the resulting [`PipelinePlan`](cumulus_propagator::PipelinePlan).

use std::error::Error;
use std::fmt;
use std::time::Duration;

use cumulus_core::FieldSet;
use cumulus_field::{FieldError, MOISTURE, RAINFALL};
use cumulus_propagator::{validate_pipeline, PipelineError, Propagator};
use cumulus_propagators::{
    Condensation, InjectionSource, MoistureDecay, MoistureDiffusion, WindAdvection,
};
use cumulus_space::{EdgeBehavior, Grid3, SpaceError};

/// Largest accepted `InjectionConfig::footprint_radius`.
pub const MAX_FOOTPRINT_RADIUS: u32 = 8;

/// Largest accepted `InjectionConfig::max_pending_pulses`.
pub const MAX_PENDING_PULSES: usize = 4096;

/// Largest accepted `EngineConfig::ring_buffer_size`.
pub const MAX_RING_BUFFER_SIZE: usize = 1024;

// ── GridConfig ─────────────────────────────────────────────────────

/// Extent and vertical scale of the field grid.
#[derive(Clone, Debug, PartialEq)]
pub struct GridConfig {
    /// Cells east-west. Default: 16.
    pub nx: u32,
    /// Cells north-south. Default: 16.
    pub ny: u32,
    /// Altitude layers. Default: 8.
    pub nz: u32,
    /// Wall behavior. Default: [`EdgeBehavior::Absorb`].
    pub edge: EdgeBehavior,
    /// Altitude of the top of the grid, in kilometres. Default: 15.
    pub domain_top_km: f32,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            nx: 16,
            ny: 16,
            nz: 8,
            edge: EdgeBehavior::Absorb,
            domain_top_km: 15.0,
        }
    }
}

impl GridConfig {
    /// Build the grid topology.
    pub fn build(&self) -> Result<Grid3, SpaceError> {
        Grid3::new(self.nx, self.ny, self.nz, self.edge)
    }
}

// ── PhysicsConfig ──────────────────────────────────────────────────

/// Constants of the physics pipeline.
#[derive(Clone, Debug, PartialEq)]
pub struct PhysicsConfig {
    /// Moisture diffusion coefficient, cells²/s. Default: 0.02.
    pub diffusion: f64,
    /// Mean wind `(x, y, z)`, cells/s. Default: `(0.2, 0.0, 0.0)`.
    pub wind: [f64; 3],
    /// Gust amplitude per axis, cells/s. Default: 0.05.
    pub gust: f64,
    /// Saturation threshold at the ground. Default: 0.8.
    pub sat_surface: f32,
    /// Saturation threshold at the top of the grid. Default: 0.4.
    pub sat_top: f32,
    /// Fraction-per-second of excess moisture that condenses. Default: 0.5.
    pub condensation_rate: f64,
    /// Rainfall (mm) produced per kg/m³ condensed. Default: 10.
    pub precipitation_scale: f32,
    /// Exponential moisture loss rate, 1/s. Default: 0.02.
    pub decay_rate: f64,
}

impl Default for PhysicsConfig {
    fn default() -> Self {
        Self {
            diffusion: 0.02,
            wind: [0.2, 0.0, 0.0],
            gust: 0.05,
            sat_surface: 0.8,
            sat_top: 0.4,
            condensation_rate: 0.5,
            precipitation_scale: 10.0,
            decay_rate: 0.02,
        }
    }
}

// ── InjectionConfig ────────────────────────────────────────────────

/// Pricing and release shape of moisture injections.
#[derive(Clone, Debug, PartialEq)]
pub struct InjectionConfig {
    /// Cost of a full-intensity injection with no lift. Default: 10.
    pub unit_cost: f32,
    /// Lift (km) that doubles the cost of an injection. Default: 5.
    pub lift_cost_scale_km: f32,
    /// Largest accepted lift, km. Default: 15.
    pub max_lift_km: f32,
    /// Moisture released by a full-intensity injection, kg/m³. Default: 40.
    pub mass_per_unit: f32,
    /// Footprint half-width in cells on every axis. Default: 1.
    /// Maximum: [`MAX_FOOTPRINT_RADIUS`].
    pub footprint_radius: u32,
    /// Gaussian footprint width, cells. Default: 0.75.
    pub footprint_sigma: f32,
    /// Time over which a pulse releases its mass, seconds. Default: 2.
    pub pulse_horizon_s: f64,
    /// Pending pulses kept before the oldest is folded in. Default: 64.
    /// Maximum: [`MAX_PENDING_PULSES`].
    pub max_pending_pulses: usize,
}

impl Default for InjectionConfig {
    fn default() -> Self {
        Self {
            unit_cost: 10.0,
            lift_cost_scale_km: 5.0,
            max_lift_km: 15.0,
            mass_per_unit: 40.0,
            footprint_radius: 1,
            footprint_sigma: 0.75,
            pulse_horizon_s: 2.0,
            max_pending_pulses: 64,
        }
    }
}

// ── LedgerConfig ───────────────────────────────────────────────────

/// Resource budget.
#[derive(Clone, Debug, PartialEq)]
pub struct LedgerConfig {
    /// Starting and maximum resources. Default: 100.
    pub capacity: u32,
    /// Units regenerated per simulated second. Default: 0 (none).
    pub regen_per_second: f64,
}

impl Default for LedgerConfig {
    fn default() -> Self {
        Self {
            capacity: 100,
            regen_per_second: 0.0,
        }
    }
}

// ── HazardThresholds ───────────────────────────────────────────────

/// Rainfall thresholds of the hazard classification.
#[derive(Clone, Debug, PartialEq)]
pub struct HazardThresholds {
    /// Aggregate rainfall (mm) at which status becomes elevated. Default: 20.
    pub elevated_mm: f32,
    /// Aggregate rainfall (mm) at which status becomes critical. Default: 50.
    pub critical_mm: f32,
    /// Resources at or below which reserves are reported low. Default: 10.
    pub low_reserve_units: u32,
}

impl Default for HazardThresholds {
    fn default() -> Self {
        Self {
            elevated_mm: 20.0,
            critical_mm: 50.0,
            low_reserve_units: 10,
        }
    }
}

// ── RealtimeConfig ─────────────────────────────────────────────────

/// Configuration for [`RealtimeWorld`](crate::realtime::RealtimeWorld).
#[derive(Clone, Debug, PartialEq)]
pub struct RealtimeConfig {
    /// Wall time between simulation ticks. Default: 3 s.
    pub tick_interval: Duration,
    /// Simulated seconds advanced per tick. Default: 3.0.
    pub sim_seconds_per_tick: f64,
    /// Injection requests buffered between ticks. Default: 64.
    pub request_queue_capacity: usize,
}

impl Default for RealtimeConfig {
    fn default() -> Self {
        Self {
            tick_interval: Duration::from_secs(3),
            sim_seconds_per_tick: 3.0,
            request_queue_capacity: 64,
        }
    }
}

impl RealtimeConfig {
    /// Check the driver settings.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.tick_interval.is_zero() {
            return Err(ConfigError::InvalidRealtime {
                reason: "tick_interval must be non-zero".to_string(),
            });
        }
        let s = self.sim_seconds_per_tick;
        if !s.is_finite() || s <= 0.0 {
            return Err(ConfigError::InvalidRealtime {
                reason: format!("sim_seconds_per_tick must be finite and positive, got {s}"),
            });
        }
        if self.request_queue_capacity == 0 {
            return Err(ConfigError::InvalidRealtime {
                reason: "request_queue_capacity must be at least 1".to_string(),
            });
        }
        Ok(())
    }
}

// ── ConfigError ────────────────────────────────────────────────────

/// Errors detected while validating a configuration or starting an engine.
#[derive(Clone, Debug, PartialEq)]
pub enum ConfigError {
    /// The grid extent was rejected.
    Space(SpaceError),
    /// The field grid could not be allocated.
    Field(FieldError),
    /// Propagator pipeline validation failed.
    Pipeline(PipelineError),
    /// A physics constant is out of range.
    InvalidPhysics {
        /// Description of the violated constraint.
        reason: String,
    },
    /// An injection constant is out of range.
    InvalidInjection {
        /// Description of the violated constraint.
        reason: String,
    },
    /// A ledger constant is out of range.
    InvalidLedger {
        /// Description of the violated constraint.
        reason: String,
    },
    /// Hazard thresholds are not finite or not ordered.
    InvalidThresholds {
        /// Description of the violated constraint.
        reason: String,
    },
    /// Realtime driver settings are out of range.
    InvalidRealtime {
        /// Description of the violated constraint.
        reason: String,
    },
    /// Ring buffer size is below the minimum of 2.
    RingBufferTooSmall {
        /// The configured size that was too small.
        configured: usize,
    },
    /// Ring buffer size is above the supported maximum.
    RingBufferTooLarge {
        /// The configured size.
        configured: usize,
        /// The largest accepted size.
        max: usize,
    },
    /// `max_substeps_per_update` is zero.
    SubstepCapZero,
    /// A background thread could not be spawned.
    ThreadSpawnFailed {
        /// Description of which thread failed.
        reason: String,
    },
}

impl fmt::Display for ConfigError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Space(e) => write!(f, "grid: {e}"),
            Self::Field(e) => write!(f, "field grid: {e}"),
            Self::Pipeline(e) => write!(f, "pipeline: {e}"),
            Self::InvalidPhysics { reason } => write!(f, "invalid physics config: {reason}"),
            Self::InvalidInjection { reason } => {
                write!(f, "invalid injection config: {reason}")
            }
            Self::InvalidLedger { reason } => write!(f, "invalid ledger config: {reason}"),
            Self::InvalidThresholds { reason } => {
                write!(f, "invalid hazard thresholds: {reason}")
            }
            Self::InvalidRealtime { reason } => write!(f, "invalid realtime config: {reason}"),
            Self::RingBufferTooSmall { configured } => {
                write!(f, "ring_buffer_size {configured} is below minimum of 2")
            }
            Self::RingBufferTooLarge { configured, max } => {
                write!(f, "ring_buffer_size {configured} exceeds maximum of {max}")
            }
            Self::SubstepCapZero => write!(f, "max_substeps_per_update must be at least 1"),
            Self::ThreadSpawnFailed { reason } => write!(f, "thread spawn failed: {reason}"),
        }
    }
}

impl Error for ConfigError {
    fn source(&self) -> Option<&(dyn Error + 'static)> {
        match self {
            Self::Space(e) => Some(e),
            Self::Field(e) => Some(e),
            Self::Pipeline(e) => Some(e),
            _ => None,
        }
    }
}

impl From<SpaceError> for ConfigError {
    fn from(e: SpaceError) -> Self {
        Self::Space(e)
    }
}

impl From<FieldError> for ConfigError {
    fn from(e: FieldError) -> Self {
        Self::Field(e)
    }
}

impl From<PipelineError> for ConfigError {
    fn from(e: PipelineError) -> Self {
        Self::Pipeline(e)
    }
}

// ── EngineConfig ───────────────────────────────────────────────────

/// Complete configuration for a [`SeedingEngine`](crate::SeedingEngine).
#[derive(Clone, Debug, PartialEq)]
pub struct EngineConfig {
    /// Grid extent.
    pub grid: GridConfig,
    /// Physics constants.
    pub physics: PhysicsConfig,
    /// Injection pricing and shape.
    pub injection: InjectionConfig,
    /// Resource budget.
    pub ledger: LedgerConfig,
    /// Hazard classification thresholds.
    pub hazard: HazardThresholds,
    /// Fixed substep length in seconds. Default: 0.05.
    pub dt: f64,
    /// Most substeps run by one `update()`. Default: 240.
    pub max_substeps_per_update: u32,
    /// Snapshots retained for readers. Default: 8. Minimum: 2.
    /// Maximum: [`MAX_RING_BUFFER_SIZE`].
    pub ring_buffer_size: usize,
    /// Seed for gust perturbations. Default: 0.
    pub seed: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            grid: GridConfig::default(),
            physics: PhysicsConfig::default(),
            injection: InjectionConfig::default(),
            ledger: LedgerConfig::default(),
            hazard: HazardThresholds::default(),
            dt: 0.05,
            max_substeps_per_update: 240,
            ring_buffer_size: 8,
            seed: 0,
        }
    }
}

impl EngineConfig {
    /// Validate all structural invariants.
    ///
    /// This is a pure validation pass; it builds the pipeline to check the
    /// timestep bound but does not allocate the grid buffers.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let grid = self.validate_structure()?;
        let propagators = self.build_pipeline()?;
        let defined: FieldSet = [MOISTURE, RAINFALL].into_iter().collect();
        let _plan = validate_pipeline(&propagators, &defined, self.dt, grid.cell_count())?;
        Ok(())
    }

    /// Everything except the pipeline. Returns the validated grid.
    pub(crate) fn validate_structure(&self) -> Result<Grid3, ConfigError> {
        // 1. Grid extent.
        let grid = self.grid.build()?;
        let top = self.grid.domain_top_km;
        if !top.is_finite() || top <= 0.0 {
            return Err(ConfigError::InvalidPhysics {
                reason: format!("domain_top_km must be finite and positive, got {top}"),
            });
        }
        // 2. Injection, ledger and hazard constants.
        self.validate_injection()?;
        let regen = self.ledger.regen_per_second;
        if !regen.is_finite() || regen < 0.0 {
            return Err(ConfigError::InvalidLedger {
                reason: format!("regen_per_second must be finite and >= 0, got {regen}"),
            });
        }
        let h = &self.hazard;
        if !h.elevated_mm.is_finite() || !h.critical_mm.is_finite() || h.elevated_mm < 0.0 {
            return Err(ConfigError::InvalidThresholds {
                reason: format!(
                    "thresholds must be finite and >= 0, got {} / {}",
                    h.elevated_mm, h.critical_mm
                ),
            });
        }
        if h.critical_mm < h.elevated_mm {
            return Err(ConfigError::InvalidThresholds {
                reason: format!(
                    "critical_mm ({}) is below elevated_mm ({})",
                    h.critical_mm, h.elevated_mm
                ),
            });
        }
        // 3. Stepper limits.
        if self.max_substeps_per_update == 0 {
            return Err(ConfigError::SubstepCapZero);
        }
        if self.ring_buffer_size < 2 {
            return Err(ConfigError::RingBufferTooSmall {
                configured: self.ring_buffer_size,
            });
        }
        if self.ring_buffer_size > MAX_RING_BUFFER_SIZE {
            return Err(ConfigError::RingBufferTooLarge {
                configured: self.ring_buffer_size,
                max: MAX_RING_BUFFER_SIZE,
            });
        }
        Ok(grid)
    }

    fn validate_injection(&self) -> Result<(), ConfigError> {
        let i = &self.injection;
        let checks: [(&str, f64, bool); 5] = [
            ("unit_cost", i.unit_cost as f64, i.unit_cost >= 0.0),
            (
                "lift_cost_scale_km",
                i.lift_cost_scale_km as f64,
                i.lift_cost_scale_km > 0.0,
            ),
            ("max_lift_km", i.max_lift_km as f64, i.max_lift_km >= 0.0),
            ("mass_per_unit", i.mass_per_unit as f64, i.mass_per_unit >= 0.0),
            ("pulse_horizon_s", i.pulse_horizon_s, i.pulse_horizon_s > 0.0),
        ];
        for (name, value, ok) in checks {
            if !value.is_finite() || !ok {
                return Err(ConfigError::InvalidInjection {
                    reason: format!("{name} out of range: {value}"),
                });
            }
        }
        if !i.footprint_sigma.is_finite() || i.footprint_sigma < 0.0 {
            return Err(ConfigError::InvalidInjection {
                reason: format!(
                    "footprint_sigma must be finite and >= 0, got {}",
                    i.footprint_sigma
                ),
            });
        }
        if i.max_pending_pulses == 0 || i.max_pending_pulses > MAX_PENDING_PULSES {
            return Err(ConfigError::InvalidInjection {
                reason: format!(
                    "max_pending_pulses must be in 1..={MAX_PENDING_PULSES}, got {}",
                    i.max_pending_pulses
                ),
            });
        }
        if i.footprint_radius > MAX_FOOTPRINT_RADIUS {
            return Err(ConfigError::InvalidInjection {
                reason: format!(
                    "footprint_radius must be at most {MAX_FOOTPRINT_RADIUS}, got {}",
                    i.footprint_radius
                ),
            });
        }
        Ok(())
    }

    /// Build the standard physics pipeline in execution order.
    pub fn build_pipeline(&self) -> Result<Vec<Box<dyn Propagator>>, ConfigError> {
        let p = &self.physics;
        let invalid = |reason: String| ConfigError::InvalidPhysics { reason };
        let diffusion = MoistureDiffusion::builder()
            .field(MOISTURE)
            .coefficient(p.diffusion)
            .build()
            .map_err(invalid)?;
        let advection = WindAdvection::builder()
            .field(MOISTURE)
            .wind(p.wind)
            .gust(p.gust)
            .build()
            .map_err(invalid)?;
        let condensation = Condensation::builder()
            .sat_surface(p.sat_surface)
            .sat_top(p.sat_top)
            .rate(p.condensation_rate)
            .precipitation_scale(p.precipitation_scale)
            .build()
            .map_err(invalid)?;
        let decay = MoistureDecay::new(p.decay_rate).map_err(invalid)?;
        Ok(vec![
            Box::new(InjectionSource::new()),
            Box::new(diffusion),
            Box::new(advection),
            Box::new(condensation),
            Box::new(decay),
        ])
    }

    /// Substeps a pulse spreads its mass over: `ceil(pulse_horizon_s / dt)`,
    /// at least 1.
    pub fn pulse_substeps(&self) -> u32 {
        let k = (self.injection.pulse_horizon_s / self.dt).ceil();
        if k.is_finite() && k >= 1.0 {
            k.min(u32::MAX as f64) as u32
        } else {
            1
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_config_is_valid() {
        EngineConfig::default().validate().unwrap();
    }

    #[test]
    fn defaults_match_documented_values() {
        let cfg = EngineConfig::default();
        assert_eq!((cfg.grid.nx, cfg.grid.ny, cfg.grid.nz), (16, 16, 8));
        assert_eq!(cfg.ledger.capacity, 100);
        assert_eq!(cfg.dt, 0.05);
        assert_eq!(cfg.max_substeps_per_update, 240);
        assert_eq!(cfg.pulse_substeps(), 40);
    }

    #[test]
    fn empty_grid_is_space_error() {
        let mut cfg = EngineConfig::default();
        cfg.grid.nz = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::Space(SpaceError::EmptySpace)));
    }

    #[test]
    fn dt_above_cfl_bound_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.physics.wind = [20.0, 0.0, 0.0];
        match cfg.validate() {
            Err(ConfigError::Pipeline(PipelineError::DtTooLarge {
                constraining_propagator,
                ..
            })) => assert_eq!(constraining_propagator, "WindAdvection"),
            other => panic!("expected DtTooLarge, got {other:?}"),
        }
    }

    #[test]
    fn invalid_dt_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.dt = f64::NAN;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::Pipeline(PipelineError::InvalidDt { .. }))
        ));
    }

    #[test]
    fn negative_physics_constant_rejected() {
        let mut cfg = EngineConfig::default();
        cfg.physics.decay_rate = -1.0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidPhysics { .. })
        ));
    }

    #[test]
    fn injection_constants_checked() {
        let mut cfg = EngineConfig::default();
        cfg.injection.lift_cost_scale_km = 0.0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidInjection { .. })
        ));

        let mut cfg = EngineConfig::default();
        cfg.injection.max_pending_pulses = 0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidInjection { .. })
        ));
    }

    #[test]
    fn thresholds_must_be_ordered() {
        let mut cfg = EngineConfig::default();
        cfg.hazard.critical_mm = 10.0;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidThresholds { .. })
        ));
    }

    #[test]
    fn stepper_limits_checked() {
        let mut cfg = EngineConfig::default();
        cfg.max_substeps_per_update = 0;
        assert_eq!(cfg.validate(), Err(ConfigError::SubstepCapZero));

        let mut cfg = EngineConfig::default();
        cfg.ring_buffer_size = 1;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::RingBufferTooSmall { configured: 1 })
        );
    }

    #[test]
    fn ring_buffer_size_is_capped() {
        let mut cfg = EngineConfig::default();
        cfg.ring_buffer_size = MAX_RING_BUFFER_SIZE;
        cfg.validate().unwrap();
        cfg.ring_buffer_size = usize::MAX;
        assert_eq!(
            cfg.validate(),
            Err(ConfigError::RingBufferTooLarge {
                configured: usize::MAX,
                max: MAX_RING_BUFFER_SIZE,
            })
        );
    }

    #[test]
    fn pending_pulse_queue_is_capped() {
        let mut cfg = EngineConfig::default();
        cfg.injection.max_pending_pulses = MAX_PENDING_PULSES;
        cfg.validate().unwrap();
        cfg.injection.max_pending_pulses = usize::MAX;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidInjection { .. })
        ));
    }

    #[test]
    fn footprint_radius_is_capped() {
        let mut cfg = EngineConfig::default();
        cfg.injection.footprint_radius = MAX_FOOTPRINT_RADIUS;
        cfg.validate().unwrap();
        cfg.injection.footprint_radius = 400;
        assert!(matches!(
            cfg.validate(),
            Err(ConfigError::InvalidInjection { .. })
        ));
    }

    #[test]
    fn pulse_substeps_rounds_up() {
        let mut cfg = EngineConfig::default();
        cfg.injection.pulse_horizon_s = 0.12;
        assert_eq!(cfg.pulse_substeps(), 3);
        cfg.injection.pulse_horizon_s = 0.01;
        assert_eq!(cfg.pulse_substeps(), 1);
    }

    #[test]
    fn realtime_config_checked() {
        RealtimeConfig::default().validate().unwrap();
        let cfg = RealtimeConfig {
            tick_interval: Duration::ZERO,
            ..RealtimeConfig::default()
        };
        assert!(cfg.validate().is_err());
        let cfg = RealtimeConfig {
            sim_seconds_per_tick: f64::INFINITY,
            ..RealtimeConfig::default()
        };
        assert!(cfg.validate().is_err());
    }

    #[test]
    fn error_source_chains() {
        let e = ConfigError::from(PipelineError::EmptyPipeline);
        assert!(e.source().is_some());
        assert!(e.to_string().starts_with("pipeline:"));
    }
}
