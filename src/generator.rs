//! Random rung generation.
//!
//! Generation runs in three phases over a grid of `N - 1` columns and `R` rows:
//!
//! 1. **Candidates.** Columns are filled left to right, rows top to bottom.
//!    Every cell draws one boolean from the [`RandomSource`] (probability
//!    [`GridConfig::first_row_probability`] in row 0,
//!    [`GridConfig::rung_probability`] below). A drawn rung is suppressed if
//!    the same column has a rung in the row above, or the column to the left
//!    already placed one in this row.
//! 2. **Repair.** Every row is scanned left to right; whenever columns `c` and
//!    `c + 1` both hold a rung, the one at `c + 1` is removed. Phase 1 already
//!    avoids this, but the repair keeps the no-adjacent-rungs rule true no
//!    matter how phase 1 evolves.
//! 3. **Terminal row.** Every rung in row `R - 1` is removed.
//!
//! Each cell consumes exactly one draw, suppressed or not, so the grid only
//! depends on the seed, the lane count and the config.

use tracing::trace;

use crate::error::{InvalidInputKind, LadderResult};
use crate::grid::RungGrid;
use crate::rng::RandomSource;
use crate::sessions::config::GridConfig;
use crate::{debug_check_invariants, MIN_LANES};

/// Generates rung grids from a fixed [`GridConfig`].
///
/// # Examples
///
/// ```
/// use amidakuji::{GridConfig, Pcg32, RungGridGenerator, SeedableRng};
///
/// let generator = RungGridGenerator::new(GridConfig::compact());
/// let mut random = Pcg32::seed_from_u64(3);
/// let grid = generator.generate(5, &mut random)?;
///
/// assert_eq!(grid.lane_count(), 5);
/// assert_eq!(grid.row_count(), 6);
/// assert!(grid.is_well_formed());
/// # Ok::<(), amidakuji::LadderError>(())
/// ```
#[derive(Debug, Clone, Copy, Default, PartialEq)]
pub struct RungGridGenerator {
    config: GridConfig,
}

impl RungGridGenerator {
    /// Creates a generator. The config is validated on every call to
    /// [`generate`](Self::generate).
    #[must_use]
    pub fn new(config: GridConfig) -> Self {
        Self { config }
    }

    /// The config this generator uses.
    #[must_use]
    pub fn config(&self) -> &GridConfig {
        &self.config
    }

    /// Generates a grid for `lane_count` lanes.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInput`] if `lane_count < 2` or the config is invalid.
    ///
    /// [`InvalidInput`]: crate::LadderError::InvalidInput
    pub fn generate<R>(&self, lane_count: usize, random: &mut R) -> LadderResult<RungGrid>
    where
        R: RandomSource + ?Sized,
    {
        check_lanes(lane_count)?;
        self.config.validate()?;
        build(lane_count, &self.config, random)
    }
}

fn check_lanes(lane_count: usize) -> LadderResult<()> {
    if lane_count < MIN_LANES {
        return Err(InvalidInputKind::TooFewLanes {
            lanes: lane_count,
            min: MIN_LANES,
        }
        .into());
    }
    Ok(())
}

/// Runs the three phases. Only the grid shape is checked here.
fn build<R>(lane_count: usize, config: &GridConfig, random: &mut R) -> LadderResult<RungGrid>
where
    R: RandomSource + ?Sized,
{
    let mut grid = RungGrid::empty(lane_count, config.row_count)?;
    draw_candidates(&mut grid, config, random);
    let repaired = repair_adjacent_rungs(&mut grid);
    clear_terminal_row(&mut grid);

    trace!(
        lanes = lane_count,
        rows = grid.row_count(),
        rungs = grid.rung_count(),
        repaired,
        "generated rung grid"
    );
    debug_check_invariants!(grid, "after generation");
    Ok(grid)
}

/// Generates a grid with the default probabilities and `row_count` rows.
///
/// # Errors
///
/// Returns [`InvalidInput`] if `lane_count < 2` or `row_count < 1`. Unlike
/// [`GridConfig`], no upper row bound applies.
///
/// # Examples
///
/// ```
/// use amidakuji::{generate, Pcg32, SeedableRng};
///
/// let grid = generate(4, 10, &mut Pcg32::seed_from_u64(1))?;
/// assert_eq!(grid.rungs_in_row(9).count(), 0);
/// # Ok::<(), amidakuji::LadderError>(())
/// ```
///
/// [`InvalidInput`]: crate::LadderError::InvalidInput
pub fn generate<R>(lane_count: usize, row_count: usize, random: &mut R) -> LadderResult<RungGrid>
where
    R: RandomSource + ?Sized,
{
    check_lanes(lane_count)?;
    let config = GridConfig {
        row_count,
        ..GridConfig::default()
    };
    build(lane_count, &config, random)
}

/// Phase 1: draws one candidate per cell and keeps it unless the cell above or
/// the cell to the left holds a rung.
pub fn draw_candidates<R>(grid: &mut RungGrid, config: &GridConfig, random: &mut R)
where
    R: RandomSource + ?Sized,
{
    for column in 0..grid.column_count() {
        for row in 0..grid.row_count() {
            let candidate = random.gen_bool(config.probability_for_row(row));
            let above = row > 0 && grid.has_rung(column, row - 1);
            let left = column > 0 && grid.has_rung(column - 1, row);
            grid.set(column, row, candidate && !above && !left);
        }
    }
}

/// Phase 2: removes the right-hand rung of every adjacent pair. Returns the
/// number of rungs removed.
pub fn repair_adjacent_rungs(grid: &mut RungGrid) -> usize {
    let mut removed = 0;
    for row in 0..grid.row_count() {
        for column in 0..grid.column_count().saturating_sub(1) {
            if grid.has_rung(column, row) && grid.has_rung(column + 1, row) {
                grid.set(column + 1, row, false);
                removed += 1;
            }
        }
    }
    removed
}

/// Phase 3: removes every rung from the last row.
pub fn clear_terminal_row(grid: &mut RungGrid) {
    let terminal = grid.row_count() - 1;
    for column in 0..grid.column_count() {
        grid.set(column, terminal, false);
    }
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use super::*;
    use crate::rng::{Pcg32, SeedableRng};
    use crate::test_config::miri_case_count;
    use crate::LadderError;
    use proptest::prelude::*;

    /// Returns the same value forever.
    struct Constant(u32);

    impl RandomSource for Constant {
        fn next_u32(&mut self) -> u32 {
            self.0
        }

        fn next_u64(&mut self) -> u64 {
            u64::from(self.0)
        }
    }

    #[test]
    fn rejects_too_few_lanes() {
        let result = generate(1, 10, &mut Pcg32::seed_from_u64(0));
        assert!(matches!(
            result,
            Err(LadderError::InvalidInput {
                kind: InvalidInputKind::TooFewLanes { lanes: 1, min: 2 }
            })
        ));
    }

    #[test]
    fn rejects_zero_rows() {
        let result = generate(3, 0, &mut Pcg32::seed_from_u64(0));
        assert!(matches!(
            result,
            Err(LadderError::InvalidInput {
                kind: InvalidInputKind::TooFewRows { rows: 0, min: 1 }
            })
        ));
    }

    #[test]
    fn free_generate_has_no_row_ceiling() {
        let rows = crate::sessions::config::MAX_ROWS + 1;
        let grid = generate(3, rows, &mut Pcg32::seed_from_u64(1)).unwrap();
        assert_eq!(grid.row_count(), rows);
        assert!(grid.is_well_formed());

        // the configured generator keeps the bound
        let bounded = RungGridGenerator::new(GridConfig {
            row_count: rows,
            ..GridConfig::default()
        })
        .generate(3, &mut Pcg32::seed_from_u64(1));
        assert!(matches!(
            bounded,
            Err(LadderError::InvalidInput {
                kind: InvalidInputKind::ConfigValueOutOfRange { field: "row_count", .. }
            })
        ));
    }

    #[test]
    fn single_row_grid_is_empty() {
        // always-true source: every candidate is drawn, the terminal row clears them
        let grid = generate(6, 1, &mut Constant(0)).unwrap();
        assert_eq!(grid.rung_count(), 0);
    }

    #[test]
    fn always_true_source_staggers_rungs() {
        let grid = generate(4, 4, &mut Constant(0)).unwrap();
        // column 0 alternates, column 1 is blocked wherever column 0 has a rung
        assert_eq!(grid.column(0).unwrap(), &[true, false, true, false]);
        assert_eq!(grid.column(1).unwrap(), &[false, true, false, false]);
        assert_eq!(grid.column(2).unwrap(), &[true, false, true, false]);
        assert!(grid.is_well_formed());
    }

    #[test]
    fn always_false_source_places_nothing() {
        let grid = generate(5, 8, &mut Constant(u32::MAX)).unwrap();
        assert_eq!(grid.rung_count(), 0);
    }

    #[test]
    fn repair_removes_right_hand_rung() {
        let mut grid =
            RungGrid::from_columns(vec![vec![true, false], vec![true, false], vec![true, false]])
                .unwrap();
        let removed = repair_adjacent_rungs(&mut grid);
        assert_eq!(removed, 1);
        assert_eq!(grid.rungs_in_row(0).collect::<Vec<_>>(), vec![0, 2]);
    }

    #[test]
    fn clear_terminal_row_only_touches_last_row() {
        let mut grid = RungGrid::from_columns(vec![vec![true, false, true]]).unwrap();
        clear_terminal_row(&mut grid);
        assert_eq!(grid.column(0).unwrap(), &[true, false, false]);
    }

    #[test]
    fn same_seed_same_grid() {
        let generator = RungGridGenerator::new(GridConfig::dense());
        let a = generator
            .generate(8, &mut Pcg32::seed_from_u64(1234))
            .unwrap();
        let b = generator
            .generate(8, &mut Pcg32::seed_from_u64(1234))
            .unwrap();
        assert_eq!(a, b);
    }

    #[test]
    fn consumes_one_draw_per_cell() {
        let mut used = Pcg32::seed_from_u64(77);
        let _ = generate(4, 5, &mut used).unwrap();

        let mut expected = Pcg32::seed_from_u64(77);
        for _ in 0..(3 * 5) {
            let _ = expected.next_u32();
        }
        assert_eq!(used.next_u32(), expected.next_u32());
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: miri_case_count(),
            ..ProptestConfig::default()
        })]

        #[test]
        fn generated_grids_are_well_formed(
            lanes in 2usize..=12,
            rows in 1usize..=30,
            seed in any::<u64>(),
            first in 0.0f64..=1.0,
            rest in 0.0f64..=1.0,
        ) {
            let config = GridConfig {
                row_count: rows,
                first_row_probability: first,
                rung_probability: rest,
            };
            let grid = RungGridGenerator::new(config)
                .generate(lanes, &mut Pcg32::seed_from_u64(seed))
                .unwrap();
            prop_assert_eq!(grid.lane_count(), lanes);
            prop_assert_eq!(grid.row_count(), rows);
            prop_assert_eq!(grid.first_adjacent_pair(), None);
            prop_assert_eq!(grid.rungs_in_row(rows - 1).count(), 0);
        }
    }
}
