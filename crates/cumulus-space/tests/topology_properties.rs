//! Property tests for grid topology and footprints.

use cumulus_core::Position;
use cumulus_space::{Cell, EdgeBehavior, Footprint, Grid3};
use proptest::prelude::*;

fn arb_edge() -> impl Strategy<Value = EdgeBehavior> {
    prop_oneof![
        Just(EdgeBehavior::Absorb),
        Just(EdgeBehavior::Clamp),
        Just(EdgeBehavior::Wrap),
    ]
}

fn arb_grid() -> impl Strategy<Value = Grid3> {
    (1u32..10, 1u32..10, 1u32..6, arb_edge())
        .prop_map(|(nx, ny, nz, edge)| Grid3::new(nx, ny, nz, edge).unwrap())
}

proptest! {
    #[test]
    fn rank_cell_roundtrip(grid in arb_grid(), seed in any::<usize>()) {
        let rank = seed % grid.cell_count();
        let cell = grid.cell(rank);
        prop_assert_eq!(grid.rank_of(cell), rank);
    }

    #[test]
    fn neighbours_are_in_bounds(grid in arb_grid(), seed in any::<usize>()) {
        let rank = seed % grid.cell_count();
        for n in grid.neighbours(rank) {
            prop_assert!(n < grid.cell_count());
        }
    }

    #[test]
    fn absorb_neighbourhood_is_symmetric(
        nx in 1u32..8, ny in 1u32..8, nz in 1u32..5, seed in any::<usize>()
    ) {
        let grid = Grid3::new(nx, ny, nz, EdgeBehavior::Absorb).unwrap();
        let rank = seed % grid.cell_count();
        for n in grid.neighbours(rank) {
            prop_assert!(grid.neighbours(n).contains(&rank));
        }
    }

    #[test]
    fn locate_never_out_of_bounds(
        grid in arb_grid(),
        x in any::<f32>(), y in any::<f32>(), z in any::<f32>(),
    ) {
        let cell = grid.locate(Position::new(x, y, z));
        prop_assert!(cell.x < grid.nx());
        prop_assert!(cell.y < grid.ny());
        prop_assert!(cell.z < grid.nz());
    }

    #[test]
    fn footprint_weights_normalized(
        grid in arb_grid(), seed in any::<usize>(), radius in 0u32..3,
    ) {
        let centre: Cell = grid.cell(seed % grid.cell_count());
        let fp = Footprint::gaussian(&grid, centre, radius, 0.75);
        let total: f32 = fp.weights().iter().sum();
        prop_assert!((total - 1.0).abs() < 1e-4);
        prop_assert!(fp.ranks().iter().all(|&r| r < grid.cell_count()));
    }
}
