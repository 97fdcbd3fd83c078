//! Shared proptest configuration and ladder strategies for unit tests.
//!
//! Under Miri the case count drops so the interpreter finishes in reasonable
//! time.

use proptest::prelude::*;

use crate::grid::RungGrid;
use crate::rng::{Pcg32, SeedableRng};
use crate::sessions::config::GridConfig;
use crate::RungGridGenerator;

/// Number of cases for property tests: 5 under Miri, 256 otherwise.
#[must_use]
pub const fn miri_case_count() -> u32 {
    if cfg!(miri) {
        5
    } else {
        256
    }
}

/// Grids as the generator builds them, for 2 to 10 lanes.
pub fn generated_grid() -> impl Strategy<Value = RungGrid> {
    (2usize..=10, 1usize..=20, any::<u64>()).prop_map(|(lanes, rows, seed)| {
        let config = GridConfig {
            row_count: rows,
            ..GridConfig::default()
        };
        RungGridGenerator::new(config)
            .generate(lanes, &mut Pcg32::seed_from_u64(seed))
            .unwrap_or_else(|err| panic!("generator rejected {lanes}x{rows}: {err}"))
    })
}

/// Any well-shaped grid, including adjacent and terminal-row rungs.
pub fn arbitrary_grid() -> impl Strategy<Value = RungGrid> {
    (1usize..=9, 1usize..=12)
        .prop_flat_map(|(columns, rows)| {
            proptest::collection::vec(proptest::collection::vec(any::<bool>(), rows), columns)
        })
        .prop_map(|columns| {
            RungGrid::from_columns(columns)
                .unwrap_or_else(|err| panic!("strategy built a malformed grid: {err}"))
        })
}

#[cfg(test)]
#[allow(clippy::panic, clippy::unwrap_used, clippy::expect_used)]
mod tests {
    use super::*;

    #[test]
    fn test_miri_case_count_returns_expected_value() {
        let count = miri_case_count();
        if cfg!(miri) {
            assert_eq!(count, 5);
        } else {
            assert_eq!(count, 256);
        }
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: 32,
            ..ProptestConfig::default()
        })]

        #[test]
        fn generated_grid_strategy_is_well_formed(grid in generated_grid()) {
            prop_assert!(grid.is_well_formed());
        }
    }
}
