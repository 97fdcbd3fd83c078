//! Metamorphic relations between grids and their permutations.
//!
//! Rather than checking a ladder against a known answer, these tests edit a
//! grid and check that its permutation changes in the predicted way.

// Allow test-specific patterns that are appropriate for test code
#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]

use amidakuji::{generate, resolve_all, Lane, Pcg32, RungGrid, SeedableRng};
use proptest::prelude::*;

const CASES: u32 = if cfg!(miri) { 5 } else { 128 };

fn columns_of(grid: &RungGrid) -> Vec<Vec<bool>> {
    grid.columns().map(<[bool]>::to_vec).collect()
}

fn ends(grid: &RungGrid) -> Vec<usize> {
    resolve_all(grid)
        .unwrap()
        .as_slice()
        .iter()
        .map(|lane| lane.as_usize())
        .collect()
}

/// Mirrors a grid left to right.
fn mirrored(grid: &RungGrid) -> RungGrid {
    let mut columns = columns_of(grid);
    columns.reverse();
    RungGrid::from_columns(columns).unwrap()
}

/// Stacks `bottom` under `top`. Both must have the same lane count.
fn stacked(top: &RungGrid, bottom: &RungGrid) -> RungGrid {
    let columns = columns_of(top)
        .into_iter()
        .zip(columns_of(bottom))
        .map(|(mut upper, lower)| {
            upper.extend(lower);
            upper
        })
        .collect();
    RungGrid::from_columns(columns).unwrap()
}

fn seeded_grid(lanes: usize, rows: usize, seed: u64) -> RungGrid {
    generate(lanes, rows, &mut Pcg32::seed_from_u64(seed)).unwrap()
}

proptest! {
    #![proptest_config(ProptestConfig::with_cases(CASES))]

    /// Mirroring the grid mirrors the permutation: σ'(n-1-i) = n-1-σ(i).
    #[test]
    fn prop_mirror_mirrors_permutation(
        lanes in 2usize..=10,
        rows in 1usize..=16,
        seed in any::<u64>(),
    ) {
        let grid = seeded_grid(lanes, rows, seed);
        let original = ends(&grid);
        let flipped = ends(&mirrored(&grid));
        for start in 0..lanes {
            prop_assert_eq!(flipped[lanes - 1 - start], lanes - 1 - original[start]);
        }
    }

    /// Stacking two ladders composes their permutations.
    #[test]
    fn prop_stacking_composes(
        lanes in 2usize..=10,
        rows in 1usize..=12,
        top_seed in any::<u64>(),
        bottom_seed in any::<u64>(),
    ) {
        let top = seeded_grid(lanes, rows, top_seed);
        let bottom = seeded_grid(lanes, rows, bottom_seed);
        let upper = ends(&top);
        let lower = ends(&bottom);
        let combined = ends(&stacked(&top, &bottom));
        for start in 0..lanes {
            prop_assert_eq!(combined[start], lower[upper[start]]);
        }
    }

    /// A ladder stacked on its vertical mirror resolves to the identity.
    #[test]
    fn prop_ladder_then_reverse_is_identity(
        lanes in 2usize..=10,
        rows in 1usize..=12,
        seed in any::<u64>(),
    ) {
        let grid = seeded_grid(lanes, rows, seed);
        let reversed = RungGrid::from_columns(
            columns_of(&grid)
                .into_iter()
                .map(|mut column| {
                    column.reverse();
                    column
                })
                .collect(),
        )
        .unwrap();
        let combined = ends(&stacked(&grid, &reversed));
        prop_assert_eq!(combined, (0..lanes).collect::<Vec<_>>());
    }

    /// Appending a row with one rung swaps the two lanes that end there.
    #[test]
    fn prop_extra_rung_swaps_two_results(
        lanes in 2usize..=10,
        rows in 1usize..=12,
        seed in any::<u64>(),
        column_pick in any::<prop::sample::Index>(),
    ) {
        let grid = seeded_grid(lanes, rows, seed);
        let column = column_pick.index(lanes - 1);
        let mut extra = vec![vec![false]; lanes - 1];
        extra[column][0] = true;
        let swapped = ends(&stacked(&grid, &RungGrid::from_columns(extra).unwrap()));
        let original = ends(&grid);

        for start in 0..lanes {
            let expected = match original[start] {
                end if end == column => column + 1,
                end if end == column + 1 => column,
                end => end,
            };
            prop_assert_eq!(swapped[start], expected);
        }
    }
}

#[test]
fn test_empty_grid_is_identity() {
    for lanes in 2..=10 {
        let grid = RungGrid::empty(lanes, 5).unwrap();
        assert_eq!(ends(&grid), (0..lanes).collect::<Vec<_>>());
        for start in 0..lanes {
            let path = amidakuji::trace(&grid, Lane::new(start)).unwrap();
            assert_eq!(path.crossings(), 0);
        }
    }
}

#[test]
fn test_empty_rows_do_not_change_permutation() {
    let grid = seeded_grid(6, 10, 99);
    let padding = RungGrid::empty(6, 3).unwrap();
    assert_eq!(ends(&stacked(&padding, &grid)), ends(&grid));
    assert_eq!(ends(&stacked(&grid, &padding)), ends(&grid));
}
