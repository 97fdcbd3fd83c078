//! Fuzz target for grid configuration and generation.
//!
//! # Safety Properties Tested
//! - No panics on arbitrary configuration values
//! - Invalid configurations are rejected instead of generating
//! - Accepted configurations always produce well-formed grids

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use amidakuji::{GridConfig, Pcg32, RungGridGenerator, SeedableRng};

#[derive(Debug, Arbitrary)]
struct FuzzConfig {
    lanes: u8,
    row_count: u16,
    first_row_probability: f64,
    rung_probability: f64,
    seed: u64,
}

fuzz_target!(|input: FuzzConfig| {
    let config = GridConfig {
        row_count: usize::from(input.row_count),
        first_row_probability: input.first_row_probability,
        rung_probability: input.rung_probability,
    };
    let lanes = usize::from(input.lanes % 64);
    let valid = config.validate().is_ok() && lanes >= amidakuji::MIN_LANES;

    let result =
        RungGridGenerator::new(config).generate(lanes, &mut Pcg32::seed_from_u64(input.seed));
    match result {
        Ok(grid) => {
            assert!(valid, "accepted invalid config {config:?} for {lanes} lanes");
            assert!(grid.is_well_formed());
            assert_eq!(grid.lane_count(), lanes);
        }
        Err(_) => assert!(!valid, "rejected valid config {config:?} for {lanes} lanes"),
    }
});
