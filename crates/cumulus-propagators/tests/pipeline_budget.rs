//! Runs the full physics pipeline on a real field grid and checks the
//! bookkeeping the integrator relies on.

use cumulus_core::TickId;
use cumulus_field::{FieldDelta, FieldGrid, MOISTURE, RAINFALL};
use cumulus_propagator::{validate_pipeline, Propagator, ScratchRegion, StepContext};
use cumulus_propagators::{
    Condensation, InjectionSource, MoistureDecay, MoistureDiffusion, WindAdvection,
};
use cumulus_space::{EdgeBehavior, Footprint, Grid3};
use proptest::prelude::*;

fn pipeline() -> Vec<Box<dyn Propagator>> {
    vec![
        Box::new(InjectionSource::new()),
        Box::new(MoistureDiffusion::builder().coefficient(0.02).build().unwrap()),
        Box::new(
            WindAdvection::builder()
                .wind([0.2, 0.0, 0.0])
                .gust(0.05)
                .build()
                .unwrap(),
        ),
        Box::new(Condensation::builder().build().unwrap()),
        Box::new(MoistureDecay::new(0.02).unwrap()),
    ]
}

/// Run `substeps` substeps, depositing `mass` at the centre on the first.
fn run(substeps: u64, mass: f32) -> FieldGrid {
    let grid = Grid3::new(8, 8, 4, EdgeBehavior::Absorb).unwrap();
    let props = pipeline();
    let mut fg = FieldGrid::with_standard_fields(grid.clone()).unwrap();
    let plan = validate_pipeline(&props, &fg.defined_fields(), 0.05, grid.cell_count()).unwrap();
    let mut scratch = ScratchRegion::with_byte_capacity(plan.scratch_bytes());
    let fp = Footprint::gaussian(&grid, grid.locate(cumulus_core::Position::CENTER), 1, 0.75);

    for tick in 1..=substeps {
        let deposits = if tick == 1 {
            vec![FieldDelta { footprint: &fp, mass }]
        } else {
            Vec::new()
        };
        let guard = fg.begin_substep();
        for prop in &props {
            scratch.reset();
            let mut ctx = StepContext::new(
                guard.reads_previous,
                &mut *guard.writes,
                &mut scratch,
                guard.grid,
                &deposits,
                TickId(tick),
                0.05,
                1,
            );
            prop.step(&mut ctx).unwrap();
        }
        fg.sanitize_staging();
        fg.publish(TickId(tick)).unwrap();
    }
    fg
}

#[test]
fn default_pipeline_validates() {
    let grid = Grid3::new(16, 16, 8, EdgeBehavior::Absorb).unwrap();
    let fg = FieldGrid::with_standard_fields(grid.clone()).unwrap();
    let plan = validate_pipeline(&pipeline(), &fg.defined_fields(), 0.05, grid.cell_count()).unwrap();
    assert_eq!(plan.writers_of(MOISTURE).len(), 5);
    assert_eq!(plan.writers_of(RAINFALL).len(), 1);
    assert_eq!(plan.constraining_propagator(), Some("WindAdvection"));
}

#[test]
fn heavy_injection_produces_rain() {
    let fg = run(60, 20.0);
    let rain: f32 = fg.read(RAINFALL).unwrap().iter().sum();
    assert!(rain > 0.0);
}

#[test]
fn empty_sky_stays_dry() {
    let fg = run(20, 0.0);
    assert!(fg.read(MOISTURE).unwrap().iter().all(|&v| v == 0.0));
    assert!(fg.read(RAINFALL).unwrap().iter().all(|&v| v == 0.0));
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(16))]

    #[test]
    fn water_budget_never_grows(mass in 0.0f32..40.0, substeps in 1u64..40) {
        let fg = run(substeps, mass);
        let q: f32 = fg.read(MOISTURE).unwrap().iter().sum();
        let rain: f32 = fg.read(RAINFALL).unwrap().iter().sum();
        prop_assert!(fg.read(MOISTURE).unwrap().iter().all(|v| v.is_finite() && *v >= 0.0));
        // Condensed mass is rain / 10; the rest was lost to decay or outflow.
        prop_assert!(q + rain / 10.0 <= mass * 1.001 + 1e-4);
    }
}
