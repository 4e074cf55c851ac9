//! Property tests over arbitrary sequences of host operations.

use cumulus_core::{HazardStatus, Position};
use cumulus_engine::{EngineConfig, GridConfig, SeedingEngine};
use proptest::prelude::*;

fn small_engine() -> SeedingEngine {
    engine_with_cap(40)
}

fn engine_with_cap(max_substeps_per_update: u32) -> SeedingEngine {
    SeedingEngine::init(EngineConfig {
        grid: GridConfig {
            nx: 5,
            ny: 4,
            nz: 3,
            ..GridConfig::default()
        },
        max_substeps_per_update,
        ..EngineConfig::default()
    })
    .unwrap()
}

#[derive(Clone, Debug)]
enum Op {
    Inject {
        x: f32,
        y: f32,
        z: f32,
        intensity: f32,
        lift_km: f32,
    },
    Update(f64),
}

fn op() -> impl Strategy<Value = Op> {
    prop_oneof![
        (
            -0.5f32..1.5,
            -0.5f32..1.5,
            -0.5f32..1.5,
            -0.5f32..1.5,
            -2.0f32..20.0
        )
            .prop_map(|(x, y, z, intensity, lift_km)| Op::Inject {
                x,
                y,
                z,
                intensity,
                lift_km
            }),
        (-0.5f64..3.0).prop_map(Op::Update),
    ]
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(48))]

    #[test]
    fn state_stays_valid(ops in prop::collection::vec(op(), 1..24)) {
        let e = small_engine();
        let mut last_resources = e.resources();
        for op in ops {
            match op {
                Op::Inject { x, y, z, intensity, lift_km } => {
                    let r = e.add_injection(Position::new(x, y, z), intensity, lift_km);
                    if r.accepted {
                        prop_assert_eq!(r.resources_remaining, last_resources - r.cost);
                    } else {
                        prop_assert!(r.cost > last_resources);
                        prop_assert_eq!(r.resources_remaining, last_resources);
                    }
                }
                Op::Update(dt) => {
                    e.update(dt).unwrap();
                }
            }
            let resources = e.resources();
            prop_assert!(resources <= last_resources);
            last_resources = resources;

            let snap = e.snapshot();
            prop_assert!(snap
                .moisture()
                .iter()
                .chain(snap.accumulated_rainfall())
                .all(|v| v.is_finite() && *v >= 0.0));
            let rain = e.rainfall();
            prop_assert!(rain.is_finite() && rain >= 0.0);
            prop_assert_eq!(e.is_emergency(), e.status() == HazardStatus::Critical);
        }
    }

    #[test]
    fn simulated_time_is_conserved(dts in prop::collection::vec(-1.0f64..4.0, 1..30)) {
        let e = small_engine();
        let mut accepted = 0u64;
        for dt in dts {
            if dt > 0.0 {
                accepted += (dt * 1e9).round() as u64;
            }
            e.update(dt).unwrap();
            let t = e.time_accounting();
            prop_assert_eq!(t.accepted_ns, accepted);
            prop_assert_eq!(t.advanced_ns + t.pending_ns + t.discarded_ns, t.accepted_ns);
            prop_assert!(t.pending_ns < 50_000_000);
        }
    }

    #[test]
    fn chunking_does_not_drift(splits in prop::collection::vec(1u32..20, 1..10)) {
        // Split 3 s into arbitrary integer-millisecond chunks.
        let total_ms = 3000u32;
        let mut chunks = Vec::new();
        let mut used = 0;
        for s in splits {
            let ms = (s * 37).min(total_ms - used);
            if ms > 0 {
                chunks.push(ms);
                used += ms;
            }
        }
        chunks.push(total_ms - used);

        let e = engine_with_cap(240);
        for ms in chunks {
            e.update(ms as f64 / 1000.0).unwrap();
        }
        prop_assert_eq!(e.snapshot().sim_time_ns(), 3_000_000_000);
        prop_assert_eq!(e.time_accounting().pending_ns, 0);
    }
}
