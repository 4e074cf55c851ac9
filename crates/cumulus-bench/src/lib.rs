//! Benchmark profiles and utilities for the Cumulus simulation.
//!
//! - [`reference_profile`]: the default 16×16×8 grid (2K cells)
//! - [`stress_profile`]: 64×64×16 grid (~65K cells)
//! - [`seeding_schedule`]: deterministic injection requests via seed

#![forbid(unsafe_code)]
#![deny(rustdoc::broken_intra_doc_links)]

use cumulus_core::{InjectionRequest, Position};
use cumulus_engine::{EngineConfig, GridConfig, LedgerConfig};
use cumulus_space::EdgeBehavior;
use rand::prelude::*;
use rand_chacha::ChaCha8Rng;

/// The default configuration with an unbounded-in-practice budget, so
/// long runs never stall on rejected injections.
pub fn reference_profile(seed: u64) -> EngineConfig {
    EngineConfig {
        ledger: LedgerConfig {
            capacity: u32::MAX,
            regen_per_second: 0.0,
        },
        seed,
        ..EngineConfig::default()
    }
}

/// Same pipeline as [`reference_profile`] on a 64×64×16 grid.
pub fn stress_profile(seed: u64) -> EngineConfig {
    EngineConfig {
        grid: GridConfig {
            nx: 64,
            ny: 64,
            nz: 16,
            edge: EdgeBehavior::Absorb,
            ..GridConfig::default()
        },
        ..reference_profile(seed)
    }
}

/// `n` injection requests at seeded positions with moderate intensity
/// and lift.
pub fn seeding_schedule(n: usize, seed: u64) -> Vec<InjectionRequest> {
    let mut rng = ChaCha8Rng::seed_from_u64(seed);
    (0..n)
        .map(|_| {
            let position = Position::new(rng.random(), rng.random(), rng.random());
            let intensity = rng.random_range(0.1f32..0.6);
            let lift_km = rng.random_range(0.0f32..3.0);
            InjectionRequest::new(position, intensity, lift_km)
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profiles_validate() {
        reference_profile(1).validate().unwrap();
        stress_profile(1).validate().unwrap();
    }

    #[test]
    fn schedule_is_deterministic() {
        let a = seeding_schedule(16, 42);
        let b = seeding_schedule(16, 42);
        assert_eq!(a, b);
        assert_ne!(a, seeding_schedule(16, 43));
        assert!(a
            .iter()
            .all(|r| (0.0..=1.0).contains(&r.position.x) && r.intensity < 0.6));
    }
}
