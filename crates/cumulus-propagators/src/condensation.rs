//! Condensation of supersaturated moisture into rainfall.

use cumulus_core::{FieldId, FieldSet, PropagatorError};
use cumulus_field::{MOISTURE, RAINFALL};
use cumulus_propagator::{Propagator, StepContext};

/// Converts moisture above a per-layer saturation threshold into rain.
///
/// The threshold falls linearly with altitude:
/// ```text
/// q_sat(k) = sat_surface - (sat_surface - sat_top) * (k + 0.5) / nz
/// converted = max(0, q - q_sat(k)) * (1 - exp(-rate * dt))
/// ```
/// `converted` leaves the moisture field and `converted *
/// precipitation_scale` is added to the cell's accumulated rainfall, which
/// therefore never decreases.
#[derive(Debug)]
pub struct Condensation {
    moisture: FieldId,
    rainfall: FieldId,
    sat_surface: f32,
    sat_top: f32,
    rate: f64,
    precipitation_scale: f32,
}

/// Builder for [`Condensation`].
pub struct CondensationBuilder {
    sat_surface: f32,
    sat_top: f32,
    rate: f64,
    precipitation_scale: f32,
}

impl Condensation {
    /// Create a builder with the reference constants (0.8 → 0.4 kg/m³,
    /// 0.5 /s, 10 mm per kg/m³).
    pub fn builder() -> CondensationBuilder {
        CondensationBuilder {
            sat_surface: 0.8,
            sat_top: 0.4,
            rate: 0.5,
            precipitation_scale: 10.0,
        }
    }

    /// Saturation threshold of layer `k` out of `nz`.
    pub fn saturation(&self, k: u32, nz: u32) -> f32 {
        let frac = (k as f32 + 0.5) / nz as f32;
        self.sat_surface - (self.sat_surface - self.sat_top) * frac
    }
}

impl CondensationBuilder {
    /// Saturation threshold at the ground.
    pub fn sat_surface(mut self, v: f32) -> Self {
        self.sat_surface = v;
        self
    }

    /// Saturation threshold at the top of the domain.
    pub fn sat_top(mut self, v: f32) -> Self {
        self.sat_top = v;
        self
    }

    /// Conversion rate in 1/s.
    pub fn rate(mut self, v: f64) -> Self {
        self.rate = v;
        self
    }

    /// Millimetres of rainfall per kg/m³ condensed.
    pub fn precipitation_scale(mut self, v: f32) -> Self {
        self.precipitation_scale = v;
        self
    }

    /// Build the propagator.
    ///
    /// # Errors
    ///
    /// Returns `Err` if any constant is negative or not finite.
    pub fn build(self) -> Result<Condensation, String> {
        let checks = [
            ("sat_surface", self.sat_surface as f64),
            ("sat_top", self.sat_top as f64),
            ("rate", self.rate),
            ("precipitation_scale", self.precipitation_scale as f64),
        ];
        for (name, v) in checks {
            if !v.is_finite() || v < 0.0 {
                return Err(format!("{name} must be finite and >= 0, got {v}"));
            }
        }
        Ok(Condensation {
            moisture: MOISTURE,
            rainfall: RAINFALL,
            sat_surface: self.sat_surface,
            sat_top: self.sat_top,
            rate: self.rate,
            precipitation_scale: self.precipitation_scale,
        })
    }
}

impl Propagator for Condensation {
    fn name(&self) -> &str {
        "Condensation"
    }

    fn reads(&self) -> FieldSet {
        [self.moisture, self.rainfall].into_iter().collect()
    }

    fn writes(&self) -> FieldSet {
        [self.moisture, self.rainfall].into_iter().collect()
    }

    fn scratch_bytes(&self, cell_count: usize) -> usize {
        cell_count * std::mem::size_of::<f32>()
    }

    fn step(&self, ctx: &mut StepContext<'_>) -> Result<(), PropagatorError> {
        let fraction = (1.0 - (-self.rate * ctx.dt()).exp()) as f32;
        if fraction == 0.0 {
            return Ok(());
        }
        let grid = ctx.grid();
        let layer = grid.column_count();
        let nz = grid.nz();

        // Pass 1: strip the excess out of moisture, remembering it in scratch.
        let (scratch, q) = ctx.scratch_and_field(self.moisture)?;
        let converted = scratch
            .alloc(q.len())
            .ok_or_else(|| PropagatorError::ExecutionFailed {
                reason: format!("scratch too small for {} cells", q.len()),
            })?;
        for (k, (q_layer, c_layer)) in q
            .chunks_mut(layer)
            .zip(converted.chunks_mut(layer))
            .enumerate()
        {
            let q_sat = self.saturation(k as u32, nz);
            for (qi, ci) in q_layer.iter_mut().zip(c_layer) {
                let excess = *qi - q_sat;
                if excess > 0.0 {
                    let c = excess * fraction;
                    *qi -= c;
                    *ci = c;
                }
            }
        }

        // Pass 2: credit the rainfall accumulator.
        let (scratch, rain) = ctx.scratch_and_field(self.rainfall)?;
        let converted = scratch.allocated();
        for (r, &c) in rain.iter_mut().zip(converted) {
            *r += c * self.precipitation_scale;
        }
        Ok(())
    }
}
