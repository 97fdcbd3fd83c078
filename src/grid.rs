//! The rung grid: which adjacent lane pairs are connected in which rows.
//!
//! A grid with `N` lanes and `R` rows has `N - 1` columns. Column `c` sits
//! between lane `c` and lane `c + 1`; `grid.has_rung(c, r)` says whether a
//! horizontal rung joins those lanes at row `r`. Row 0 is the top.
//!
//! Grids produced by the [`generator`](crate::generator) always satisfy:
//!
//! 1. no two rungs in the same row share a lane (`rung(c, r)` and
//!    `rung(c + 1, r)` are never both set),
//! 2. the terminal row `R - 1` has no rungs.
//!
//! Grids built by hand through [`RungGrid::from_columns`] are only checked for
//! shape. The tracer accepts any well-shaped grid; [`resolve_all`] rejects the
//! ones whose paths do not form a permutation.
//!
//! [`resolve_all`]: crate::tracer::resolve_all

use std::fmt;

use crate::error::{InvalidInputKind, LadderResult};
use crate::telemetry::{BrokenInvariant, InvariantChecker};
use crate::{MIN_LANES, MIN_ROWS};

/// Column-major storage of rung flags.
///
/// Immutable once built; sessions share it behind an `Arc`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "GridRepr", into = "GridRepr")]
pub struct RungGrid {
    lane_count: usize,
    row_count: usize,
    /// `rungs[c * row_count + r]`
    rungs: Vec<bool>,
}

/// Serialized form: one `Vec<bool>` per column.
#[derive(serde::Serialize, serde::Deserialize)]
struct GridRepr {
    columns: Vec<Vec<bool>>,
}

impl TryFrom<GridRepr> for RungGrid {
    type Error = crate::LadderError;

    fn try_from(repr: GridRepr) -> Result<Self, Self::Error> {
        Self::from_columns(repr.columns)
    }
}

impl From<RungGrid> for GridRepr {
    fn from(grid: RungGrid) -> Self {
        Self {
            columns: grid.columns().map(<[bool]>::to_vec).collect(),
        }
    }
}

impl RungGrid {
    /// Creates a grid without any rungs.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInput`] if `lane_count < 2` or `row_count < 1`.
    ///
    /// [`InvalidInput`]: crate::LadderError::InvalidInput
    pub fn empty(lane_count: usize, row_count: usize) -> LadderResult<Self> {
        check_shape(lane_count, row_count)?;
        Ok(Self {
            lane_count,
            row_count,
            rungs: vec![false; (lane_count - 1) * row_count],
        })
    }

    /// Builds a grid from explicit columns, `columns[c][r]` being the rung
    /// between lane `c` and `c + 1` at row `r`.
    ///
    /// Only the shape is validated. Rungs in the terminal row and adjacent
    /// rungs are accepted so hand-written and fuzzed grids can be traced.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInput`] if there are no columns, the columns are empty
    /// or they differ in height.
    ///
    /// # Examples
    ///
    /// ```
    /// use amidakuji::RungGrid;
    ///
    /// let grid = RungGrid::from_columns(vec![vec![true], vec![false]])?;
    /// assert_eq!(grid.lane_count(), 3);
    /// assert_eq!(grid.row_count(), 1);
    /// assert!(grid.has_rung(0, 0));
    /// # Ok::<(), amidakuji::LadderError>(())
    /// ```
    ///
    /// [`InvalidInput`]: crate::LadderError::InvalidInput
    pub fn from_columns(columns: Vec<Vec<bool>>) -> LadderResult<Self> {
        let lane_count = columns.len() + 1;
        let row_count = columns.first().map_or(0, Vec::len);
        check_shape(lane_count, row_count)?;

        let mut rungs = Vec::with_capacity(columns.len() * row_count);
        for (column, rows) in columns.into_iter().enumerate() {
            if rows.len() != row_count {
                return Err(InvalidInputKind::RaggedGrid {
                    column,
                    expected_rows: row_count,
                    actual_rows: rows.len(),
                }
                .into());
            }
            rungs.extend(rows);
        }

        Ok(Self {
            lane_count,
            row_count,
            rungs,
        })
    }

    /// Number of vertical lanes.
    #[must_use]
    pub fn lane_count(&self) -> usize {
        self.lane_count
    }

    /// Number of rows.
    #[must_use]
    pub fn row_count(&self) -> usize {
        self.row_count
    }

    /// Number of columns, `lane_count - 1`.
    #[must_use]
    pub fn column_count(&self) -> usize {
        self.lane_count - 1
    }

    /// Returns `true` if a rung joins lane `column` and `column + 1` at `row`.
    ///
    /// Coordinates outside the grid have no rung.
    #[must_use]
    pub fn has_rung(&self, column: usize, row: usize) -> bool {
        self.index(column, row)
            .and_then(|index| self.rungs.get(index))
            .copied()
            .unwrap_or(false)
    }

    /// Returns one column as a slice of row flags.
    #[must_use]
    pub fn column(&self, column: usize) -> Option<&[bool]> {
        let start = column.checked_mul(self.row_count)?;
        self.rungs.get(start..start.checked_add(self.row_count)?)
    }

    /// Iterates over the columns from left to right.
    pub fn columns(&self) -> impl Iterator<Item = &[bool]> + '_ {
        self.rungs.chunks(self.row_count.max(1))
    }

    /// Iterates over the columns that have a rung in `row`.
    pub fn rungs_in_row(&self, row: usize) -> impl Iterator<Item = usize> + '_ {
        (0..self.column_count()).filter(move |&column| self.has_rung(column, row))
    }

    /// Total number of rungs.
    #[must_use]
    pub fn rung_count(&self) -> usize {
        self.rungs.iter().filter(|&&rung| rung).count()
    }

    /// Finds the first row where two rungs share a lane, as `(column, row)`
    /// with rungs at both `column` and `column + 1`.
    #[must_use]
    pub fn first_adjacent_pair(&self) -> Option<(usize, usize)> {
        (0..self.row_count).find_map(|row| {
            (0..self.column_count().saturating_sub(1))
                .find(|&column| self.has_rung(column, row) && self.has_rung(column + 1, row))
                .map(|column| (column, row))
        })
    }

    /// Returns `true` if the grid satisfies both generator rules.
    #[must_use]
    pub fn is_well_formed(&self) -> bool {
        self.check_invariants().is_ok()
    }

    pub(crate) fn set(&mut self, column: usize, row: usize, rung: bool) {
        if let Some(slot) = self
            .index(column, row)
            .and_then(|index| self.rungs.get_mut(index))
        {
            *slot = rung;
        }
    }

    fn index(&self, column: usize, row: usize) -> Option<usize> {
        (column < self.column_count() && row < self.row_count)
            .then(|| column * self.row_count + row)
    }
}

fn check_shape(lane_count: usize, row_count: usize) -> LadderResult<()> {
    if lane_count < MIN_LANES {
        return Err(InvalidInputKind::TooFewLanes {
            lanes: lane_count,
            min: MIN_LANES,
        }
        .into());
    }
    if row_count < MIN_ROWS {
        return Err(InvalidInputKind::TooFewRows {
            rows: row_count,
            min: MIN_ROWS,
        }
        .into());
    }
    Ok(())
}

impl InvariantChecker for RungGrid {
    fn check_invariants(&self) -> Result<(), BrokenInvariant> {
        if self.rungs.len() != self.column_count() * self.row_count {
            return Err(
                BrokenInvariant::new("RungGrid", "cell count does not match the shape").at(
                    format!(
                        "{} lanes x {} rows, {} cells",
                        self.lane_count,
                        self.row_count,
                        self.rungs.len()
                    ),
                ),
            );
        }
        if let Some((column, row)) = self.first_adjacent_pair() {
            return Err(BrokenInvariant::new("RungGrid", "adjacent rungs share a lane")
                .at(format!("columns {column} and {} at row {row}", column + 1)));
        }
        let terminal = self.row_count - 1;
        if let Some(column) = self.rungs_in_row(terminal).next() {
            return Err(BrokenInvariant::new("RungGrid", "terminal row has a rung")
                .at(format!("column {column}")));
        }
        Ok(())
    }
}

/// Draws the grid top to bottom, one line per row:
///
/// ```text
/// |--|  |
/// |  |--|
/// |  |  |
/// ```
impl fmt::Display for RungGrid {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for row in 0..self.row_count {
            if row > 0 {
                writeln!(f)?;
            }
            f.write_str("|")?;
            for column in 0..self.column_count() {
                f.write_str(if self.has_rung(column, row) { "--|" } else { "  |" })?;
            }
        }
        Ok(())
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
    use crate::LadderError;

    #[test]
    fn empty_grid_has_no_rungs() {
        let grid = RungGrid::empty(4, 3).unwrap();
        assert_eq!(grid.lane_count(), 4);
        assert_eq!(grid.column_count(), 3);
        assert_eq!(grid.rung_count(), 0);
        assert!(grid.is_well_formed());
    }

    #[test]
    fn shape_is_validated() {
        assert!(matches!(
            RungGrid::empty(1, 3),
            Err(LadderError::InvalidInput {
                kind: InvalidInputKind::TooFewLanes { lanes: 1, min: 2 }
            })
        ));
        assert!(matches!(
            RungGrid::empty(3, 0),
            Err(LadderError::InvalidInput {
                kind: InvalidInputKind::TooFewRows { rows: 0, min: 1 }
            })
        ));
        assert!(matches!(
            RungGrid::from_columns(vec![]),
            Err(LadderError::InvalidInput {
                kind: InvalidInputKind::TooFewLanes { .. }
            })
        ));
        assert!(matches!(
            RungGrid::from_columns(vec![vec![true, false], vec![false]]),
            Err(LadderError::InvalidInput {
                kind: InvalidInputKind::RaggedGrid {
                    column: 1,
                    expected_rows: 2,
                    actual_rows: 1
                }
            })
        ));
    }

    #[test]
    fn out_of_range_coordinates_have_no_rung() {
        let grid = RungGrid::from_columns(vec![vec![true, true]]).unwrap();
        assert!(grid.has_rung(0, 1));
        assert!(!grid.has_rung(0, 2));
        assert!(!grid.has_rung(1, 0));
        assert!(grid.column(1).is_none());
        assert!(grid.column(usize::MAX / 2).is_none());
        assert!(grid.column(usize::MAX).is_none());
        assert!(!grid.has_rung(usize::MAX, usize::MAX));
    }

    #[test]
    fn adjacent_rungs_break_invariants() {
        let grid = RungGrid::from_columns(vec![vec![true, false], vec![true, false]]).unwrap();
        assert_eq!(grid.first_adjacent_pair(), Some((0, 0)));
        let violation = grid.check_invariants().unwrap_err();
        assert_eq!(violation.rule, "adjacent rungs share a lane");
    }

    #[test]
    fn terminal_rung_breaks_invariants() {
        let grid = RungGrid::from_columns(vec![vec![false, true]]).unwrap();
        let violation = grid.check_invariants().unwrap_err();
        assert_eq!(violation.rule, "terminal row has a rung");
    }

    #[test]
    fn set_ignores_out_of_range() {
        let mut grid = RungGrid::empty(3, 2).unwrap();
        grid.set(1, 0, true);
        grid.set(5, 5, true);
        assert_eq!(grid.rungs_in_row(0).collect::<Vec<_>>(), vec![1]);
        assert_eq!(grid.rung_count(), 1);
    }

    #[test]
    fn display_draws_rows() {
        let grid = RungGrid::from_columns(vec![
            vec![true, false, false],
            vec![false, true, false],
        ])
        .unwrap();
        assert_eq!(grid.to_string(), "|--|  |\n|  |--|\n|  |  |");
    }

    #[test]
    fn serde_uses_columns_and_validates() {
        let grid = RungGrid::from_columns(vec![vec![true, false], vec![false, false]]).unwrap();
        let json = serde_json::to_string(&grid).unwrap();
        assert_eq!(json, r#"{"columns":[[true,false],[false,false]]}"#);
        let back: RungGrid = serde_json::from_str(&json).unwrap();
        assert_eq!(back, grid);

        let ragged = r#"{"columns":[[true],[false,false]]}"#;
        assert!(serde_json::from_str::<RungGrid>(ragged).is_err());
    }
}
