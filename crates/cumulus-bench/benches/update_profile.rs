//! Criterion benchmarks for the standard physics pipeline.

use criterion::{criterion_group, criterion_main, Criterion};
use cumulus_bench::{reference_profile, seeding_schedule, stress_profile};
use cumulus_engine::SeedingEngine;
use std::hint::black_box;

fn bench_substep_2k(c: &mut Criterion) {
    let engine = SeedingEngine::init(reference_profile(42)).unwrap();
    for request in seeding_schedule(8, 42) {
        engine.submit(request);
    }
    engine.update(0.05).unwrap();

    c.bench_function("substep_2k", |b| {
        b.iter(|| black_box(engine.update(0.05).unwrap()));
    });
}

fn bench_substep_65k(c: &mut Criterion) {
    let engine = SeedingEngine::init(stress_profile(42)).unwrap();
    for request in seeding_schedule(8, 42) {
        engine.submit(request);
    }
    engine.update(0.05).unwrap();

    c.bench_function("substep_65k", |b| {
        b.iter(|| black_box(engine.update(0.05).unwrap()));
    });
}

fn bench_full_update_2k(c: &mut Criterion) {
    // One 3-second update is 60 substeps.
    let engine = SeedingEngine::init(reference_profile(42)).unwrap();
    c.bench_function("update_3s_2k", |b| {
        b.iter(|| black_box(engine.update(3.0).unwrap()));
    });
}

fn bench_seeded_session_2k(c: &mut Criterion) {
    let schedule = seeding_schedule(20, 7);
    c.bench_function("seeded_session_2k", |b| {
        b.iter(|| {
            let engine = SeedingEngine::init(reference_profile(7)).unwrap();
            for request in &schedule {
                engine.submit(*request);
                engine.update(0.5).unwrap();
            }
            black_box(engine.rainfall())
        });
    });
}

criterion_group!(
    benches,
    bench_substep_2k,
    bench_substep_65k,
    bench_full_update_2k,
    bench_seeded_session_2k
);
criterion_main!(benches);
