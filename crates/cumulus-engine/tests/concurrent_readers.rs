//! Integration test: readers polling while a writer steps the engine.
//!
//! Readers must always see finite, non-negative values from a single
//! publication, must observe generations in order, and must never block
//! behind a running update.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use cumulus_core::{HazardStatus, Position, SnapshotAccess};
use cumulus_engine::{EngineConfig, SeedingEngine};

const READERS: usize = 4;

#[test]
fn readers_never_see_torn_or_invalid_state() {
    let engine = Arc::new(SeedingEngine::init(EngineConfig::default()).unwrap());
    let done = Arc::new(AtomicBool::new(false));

    let readers: Vec<_> = (0..READERS)
        .map(|i| {
            let engine = Arc::clone(&engine);
            let done = Arc::clone(&done);
            thread::Builder::new()
                .name(format!("reader-{i}"))
                .spawn(move || {
                    let mut last_generation = 0;
                    let mut polls = 0u64;
                    while !done.load(Ordering::Acquire) {
                        let rain = engine.rainfall();
                        assert!(rain.is_finite() && rain >= 0.0);
                        assert_eq!(
                            engine.is_emergency(),
                            engine.status() == HazardStatus::Critical
                        );

                        let snap = engine.snapshot();
                        let generation = snap.world_generation_id().0;
                        assert!(generation >= last_generation, "generation went backwards");
                        last_generation = generation;
                        assert!(snap
                            .moisture()
                            .iter()
                            .chain(snap.accumulated_rainfall())
                            .all(|v| v.is_finite() && *v >= 0.0));
                        assert_eq!(snap.rainfall(), snap.hazard().rainfall_mm);
                        polls += 1;
                    }
                    polls
                })
                .unwrap()
        })
        .collect();

    for i in 0..40 {
        let x = (i % 7) as f32 / 6.0;
        engine.add_injection(Position::new(x, 0.5, 0.4), 0.3, 0.5);
        engine.update(0.25).unwrap();
    }
    done.store(true, Ordering::Release);

    for reader in readers {
        let polls = reader.join().unwrap();
        assert!(polls > 0);
    }
    assert!(engine.rainfall() > 0.0);
}

#[test]
fn queries_do_not_wait_for_a_long_update() {
    let engine = Arc::new(SeedingEngine::init(EngineConfig::default()).unwrap());
    engine.add_injection(Position::CENTER, 1.0, 0.0);

    let writer = {
        let engine = Arc::clone(&engine);
        thread::spawn(move || {
            for _ in 0..4 {
                engine.update(12.0).unwrap();
            }
        })
    };

    // Each query is a ring read; none of them should take anywhere near
    // as long as a 240-substep update.
    let mut slowest = Duration::ZERO;
    while !writer.is_finished() {
        let start = Instant::now();
        let _ = engine.resources();
        let _ = engine.status_label();
        slowest = slowest.max(start.elapsed());
    }
    writer.join().unwrap();
    assert!(slowest < Duration::from_millis(250), "query took {slowest:?}");
}

#[test]
fn interleaved_writers_serialize() {
    let engine = Arc::new(SeedingEngine::init(EngineConfig::default()).unwrap());
    let writers: Vec<_> = (0..4)
        .map(|_| {
            let engine = Arc::clone(&engine);
            thread::spawn(move || {
                for _ in 0..5 {
                    engine.add_injection(Position::CENTER, 0.2, 0.0);
                    engine.update(0.05).unwrap();
                }
            })
        })
        .collect();
    for w in writers {
        w.join().unwrap();
    }
    // 20 injections at cost 2 and 20 substeps, regardless of interleaving.
    assert_eq!(engine.resources(), 60);
    assert_eq!(engine.snapshot().tick_id().0, 20);
    assert_eq!(engine.last_metrics().injections_accepted, 20);
}
