//! Seeded sessions and generators replay exactly.

// Allow test-specific patterns that are appropriate for test code
#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]

use amidakuji::{
    resolve_all, Assignment, GridConfig, Lane, Pcg32, RandomSource, RungGrid, RungGridGenerator,
    SeedableRng,
};

use crate::common::stubs::ScriptedRandom;
use crate::common::{labels, run_to_completion, seeded_session};

fn ends(assignment: &Assignment) -> Vec<usize> {
    assignment.as_slice().iter().map(|lane| lane.as_usize()).collect()
}

#[test]
fn test_pcg32_stream_is_stable() {
    let mut a = Pcg32::seed_from_u64(0xDEAD_BEEF);
    let mut b = Pcg32::seed_from_u64(0xDEAD_BEEF);
    let first: Vec<u32> = (0..64).map(|_| a.next_u32()).collect();
    let second: Vec<u32> = (0..64).map(|_| b.next_u32()).collect();
    assert_eq!(first, second);

    let mut other = Pcg32::seed_from_u64(0xDEAD_BEF0);
    let third: Vec<u32> = (0..64).map(|_| other.next_u32()).collect();
    assert_ne!(first, third);
}

#[test]
fn test_same_seed_same_grids() {
    let generator = RungGridGenerator::new(GridConfig::default());
    for seed in 0..32u64 {
        let a = generator
            .generate(6, &mut Pcg32::seed_from_u64(seed))
            .unwrap();
        let b = generator
            .generate(6, &mut Pcg32::seed_from_u64(seed))
            .unwrap();
        assert_eq!(a, b, "seed {seed}");
    }
}

#[test]
fn test_seeded_sessions_replay_every_game() {
    let (mut first, first_timer) = seeded_session(1234);
    let (mut second, second_timer) = seeded_session(1234);

    for round in 0..5 {
        let lanes = 2 + round;
        let a = first.new_game(labels("p", lanes), labels("r", lanes)).unwrap();
        let b = second.new_game(labels("p", lanes), labels("r", lanes)).unwrap();
        assert_eq!(a, b);
        assert_eq!(first.grid(a).unwrap(), second.grid(b).unwrap());

        run_to_completion(&mut first, &first_timer, a);
        run_to_completion(&mut second, &second_timer, b);
        assert_eq!(first.outcomes(a).unwrap(), second.outcomes(b).unwrap());
    }
}

#[test]
fn test_every_cell_draws_once() {
    // 4 lanes x 5 rows: 3 columns of 5 cells, whatever gets suppressed
    let mut random = ScriptedRandom::constant(true);
    let grid = RungGridGenerator::new(GridConfig {
        row_count: 5,
        ..GridConfig::default()
    })
    .generate(4, &mut random)
    .unwrap();
    assert_eq!(random.draws, 15);
    assert!(grid.is_well_formed());
}

#[test]
fn test_all_true_draws_give_checkerboard() {
    let mut random = ScriptedRandom::constant(true);
    let grid = RungGridGenerator::new(GridConfig {
        row_count: 4,
        ..GridConfig::default()
    })
    .generate(4, &mut random)
    .unwrap();
    assert_eq!(grid.column(0).unwrap(), &[true, false, true, false]);
    assert_eq!(grid.column(1).unwrap(), &[false, true, false, false]);
    assert_eq!(grid.column(2).unwrap(), &[true, false, true, false]);
}

#[test]
fn test_scenario_single_rung() {
    let grid = RungGrid::from_columns(vec![vec![true], vec![false]]).unwrap();
    assert_eq!(ends(&resolve_all(&grid).unwrap()), vec![1, 0, 2]);
}

#[test]
fn test_scenario_two_rows() {
    let grid = RungGrid::from_columns(vec![
        vec![true, false],
        vec![false, true],
        vec![false, false],
    ])
    .unwrap();
    let assignment = resolve_all(&grid).unwrap();
    assert_eq!(ends(&assignment), vec![2, 0, 1, 3]);
    assert_eq!(assignment.get(Lane::new(3)), Some(Lane::new(3)));
}

#[test]
fn test_scenario_two_lanes_no_rungs() {
    let grid = RungGrid::empty(2, 3).unwrap();
    assert_eq!(ends(&resolve_all(&grid).unwrap()), vec![0, 1]);
}
