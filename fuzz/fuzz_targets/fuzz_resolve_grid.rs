//! Fuzz target for tracing arbitrary grids.
//!
//! # Safety Properties Tested
//! - No panics tracing any rectangular grid
//! - Grids repaired by the generator phases always resolve to a permutation
//! - Every path ends on the bottom edge

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use amidakuji::__internal::{clear_terminal_row, repair_adjacent_rungs, RungGrid};
use amidakuji::{resolve_all, trace_all};

#[derive(Debug, Arbitrary)]
struct FuzzGrid {
    /// Lanes minus one, kept small
    columns: u8,
    /// Rows, kept small
    rows: u8,
    /// Rung bits, consumed column by column
    bits: Vec<bool>,
}

fuzz_target!(|input: FuzzGrid| {
    let columns = usize::from(input.columns % 32) + 1;
    let rows = usize::from(input.rows % 64) + 1;
    let mut bits = input.bits.into_iter().cycle();
    let raw: Vec<Vec<bool>> = (0..columns)
        .map(|_| (0..rows).map(|_| bits.next().unwrap_or(false)).collect())
        .collect();

    let Ok(mut grid) = RungGrid::from_columns(raw) else {
        return;
    };

    // Raw grids may have adjacent rungs; tracing must still not panic
    if let Ok(tracing) = trace_all(&grid) {
        for path in &tracing.paths {
            assert_eq!(path.waypoints().last().map(|p| p.row), Some(rows));
        }
    }

    repair_adjacent_rungs(&mut grid);
    clear_terminal_row(&mut grid);
    assert!(grid.is_well_formed());

    let assignment = resolve_all(&grid).expect("well-formed grid must resolve");
    assert!(assignment.is_bijection());
});
