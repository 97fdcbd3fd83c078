//! Pure path tracing over a [`RungGrid`].
//!
//! A token dropped at the top of lane `s` walks down one row at a time. At row
//! `r` it first looks left: a rung in column `lane - 1` moves it one lane left.
//! Otherwise a rung in column `lane` moves it one lane right. Otherwise it
//! stays. After the last row its lane is the final lane.
//!
//! Checking the left rung first means a malformed grid with two rungs on the
//! same lane is still traced deterministically; [`resolve_all`] then notices
//! the collision and refuses the grid.
//!
//! # Waypoints
//!
//! A [`Path`] lists points `(lane, row)` on the ladder drawing. For each row
//! it records where the token stands before moving, then the lane it moved to
//! if it crossed a rung, and finally `(final_lane, row_count)` at the bottom
//! edge. Consecutive waypoints therefore differ by exactly one lane or one row,
//! so a renderer can draw the path as straight segments.

use smallvec::SmallVec;

use crate::error::{InvalidInputKind, LadderError, LadderResult};
use crate::grid::RungGrid;
use crate::Lane;

/// Waypoints stored inline before spilling to the heap. A default ten-row
/// ladder never needs more.
const INLINE_WAYPOINTS: usize = 24;

/// A point on the ladder drawing.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Waypoint {
    /// The lane the point sits on.
    pub lane: Lane,
    /// The row, `0..=row_count`. `row_count` is the bottom edge.
    pub row: usize,
}

impl Waypoint {
    /// Creates a waypoint.
    #[must_use]
    pub const fn new(lane: Lane, row: usize) -> Self {
        Self { lane, row }
    }
}

/// The route a token takes from its start lane to its final lane.
///
/// Deserializing checks that the waypoints form a walk from `(start, 0)` down
/// to `end` in unit steps.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(try_from = "PathRepr")]
pub struct Path {
    start: Lane,
    end: Lane,
    waypoints: SmallVec<[Waypoint; INLINE_WAYPOINTS]>,
}

#[derive(serde::Deserialize)]
struct PathRepr {
    start: Lane,
    end: Lane,
    waypoints: SmallVec<[Waypoint; INLINE_WAYPOINTS]>,
}

impl TryFrom<PathRepr> for Path {
    type Error = LadderError;

    fn try_from(repr: PathRepr) -> Result<Self, Self::Error> {
        let malformed = |reason| LadderError::from(InvalidInputKind::MalformedPath { reason });
        let (Some(first), Some(last)) = (repr.waypoints.first(), repr.waypoints.last()) else {
            return Err(malformed("no waypoints"));
        };
        if first.lane != repr.start || first.row != 0 {
            return Err(malformed("first waypoint is not (start, 0)"));
        }
        if last.lane != repr.end {
            return Err(malformed("last waypoint is not on the end lane"));
        }
        let unit_steps = repr.waypoints.windows(2).all(|pair| {
            let (from, to) = (pair[0], pair[1]);
            let sideways =
                from.row == to.row && from.lane.as_usize().abs_diff(to.lane.as_usize()) == 1;
            let down = from.lane == to.lane && from.row.checked_add(1) == Some(to.row);
            sideways || down
        });
        if !unit_steps {
            return Err(malformed("waypoints are not unit steps down the ladder"));
        }
        Ok(Self {
            start: repr.start,
            end: repr.end,
            waypoints: repr.waypoints,
        })
    }
}

impl Path {
    /// The lane the path starts on.
    #[must_use]
    pub fn start(&self) -> Lane {
        self.start
    }

    /// The lane the path ends on.
    #[must_use]
    pub fn end(&self) -> Lane {
        self.end
    }

    /// All waypoints from `(start, 0)` to `(end, row_count)`.
    #[must_use]
    pub fn waypoints(&self) -> &[Waypoint] {
        &self.waypoints
    }

    /// Number of waypoints. Never zero.
    #[must_use]
    pub fn len(&self) -> usize {
        self.waypoints.len()
    }

    /// Always `false`; traced and deserialized paths have at least their start
    /// and end points.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.waypoints.is_empty()
    }

    /// Number of rungs crossed.
    #[must_use]
    pub fn crossings(&self) -> usize {
        self.waypoints
            .windows(2)
            .filter(|pair| pair[0].lane != pair[1].lane)
            .count()
    }

    /// The waypoints a renderer should draw at `fraction` of the reveal,
    /// always at least one.
    #[must_use]
    pub fn prefix(&self, fraction: f64) -> &[Waypoint] {
        let fraction = if fraction.is_nan() {
            0.0
        } else {
            fraction.clamp(0.0, 1.0)
        };
        let total = self.waypoints.len();
        let shown = ((total as f64) * fraction).ceil() as usize;
        self.waypoints.get(..shown.max(1).min(total)).unwrap_or_default()
    }
}

/// The final lane of every start lane.
///
/// `targets[i]` is where a token starting on lane `i` ends up. Results from
/// [`resolve_all`] are always bijections.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
#[serde(transparent)]
pub struct Assignment {
    targets: Vec<Lane>,
}

impl Assignment {
    /// The final lane for `start`.
    #[must_use]
    pub fn get(&self, start: Lane) -> Option<Lane> {
        self.targets.get(start.as_usize()).copied()
    }

    /// Number of lanes.
    #[must_use]
    pub fn len(&self) -> usize {
        self.targets.len()
    }

    /// `true` if there are no lanes.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.targets.is_empty()
    }

    /// Final lanes indexed by start lane.
    #[must_use]
    pub fn as_slice(&self) -> &[Lane] {
        &self.targets
    }

    /// Iterates over `(start, end)` pairs in start order.
    pub fn iter(&self) -> impl Iterator<Item = (Lane, Lane)> + '_ {
        self.targets
            .iter()
            .enumerate()
            .map(|(start, &end)| (Lane::new(start), end))
    }

    /// Returns `true` if every lane is reached exactly once.
    #[must_use]
    pub fn is_bijection(&self) -> bool {
        check_bijection(&self.targets).is_ok()
    }

    /// Maps final lanes back to start lanes.
    ///
    /// Returns `None` unless this is a bijection.
    #[must_use]
    pub fn inverse(&self) -> Option<Self> {
        let mut sources = vec![Lane::default(); self.targets.len()];
        check_bijection(&self.targets).ok()?;
        for (start, end) in self.iter() {
            sources[end.as_usize()] = start;
        }
        Some(Self { targets: sources })
    }
}

/// The paths of every lane of a grid together with their [`Assignment`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Tracing {
    /// Path of every lane, indexed by start lane.
    pub paths: Vec<Path>,
    /// Final lane of every start lane.
    pub assignment: Assignment,
}

/// Traces the token starting on `start`.
///
/// # Errors
///
/// Returns [`LadderError::LaneOutOfRange`] if `start` is not a lane of `grid`.
///
/// # Examples
///
/// ```
/// use amidakuji::{trace, Lane, RungGrid};
///
/// // one rung between lanes 0 and 1
/// let grid = RungGrid::from_columns(vec![vec![true], vec![false]])?;
/// let path = trace(&grid, Lane::new(0))?;
/// assert_eq!(path.end(), Lane::new(1));
/// assert_eq!(path.len(), 3);
/// # Ok::<(), amidakuji::LadderError>(())
/// ```
pub fn trace(grid: &RungGrid, start: Lane) -> LadderResult<Path> {
    if !start.is_valid_for(grid.lane_count()) {
        return Err(LadderError::LaneOutOfRange {
            lane: start,
            lane_count: grid.lane_count(),
        });
    }

    let mut waypoints = SmallVec::new();
    let mut lane = start.as_usize();
    for row in 0..grid.row_count() {
        waypoints.push(Waypoint::new(Lane::new(lane), row));
        let next = if lane > 0 && grid.has_rung(lane - 1, row) {
            lane - 1
        } else if grid.has_rung(lane, row) {
            lane + 1
        } else {
            lane
        };
        if next != lane {
            waypoints.push(Waypoint::new(Lane::new(next), row));
            lane = next;
        }
    }
    waypoints.push(Waypoint::new(Lane::new(lane), grid.row_count()));

    Ok(Path {
        start,
        end: Lane::new(lane),
        waypoints,
    })
}

/// Traces every lane and checks that the final lanes form a permutation.
///
/// # Errors
///
/// Returns [`LadderError::InvalidGrid`] naming the first final lane reached
/// twice. The generator never produces such grids.
pub fn trace_all(grid: &RungGrid) -> LadderResult<Tracing> {
    let paths = (0..grid.lane_count())
        .map(|start| trace(grid, Lane::new(start)))
        .collect::<LadderResult<Vec<_>>>()?;
    let targets: Vec<Lane> = paths.iter().map(Path::end).collect();
    check_bijection(&targets)?;
    Ok(Tracing {
        paths,
        assignment: Assignment { targets },
    })
}

/// Computes the final lane of every start lane.
///
/// # Errors
///
/// Returns [`LadderError::InvalidGrid`] if two lanes end on the same lane.
///
/// # Examples
///
/// ```
/// use amidakuji::{resolve_all, Lane, RungGrid};
///
/// let grid = RungGrid::from_columns(vec![
///     vec![true, false],
///     vec![false, true],
///     vec![false, false],
/// ])?;
/// let assignment = resolve_all(&grid)?;
/// let ends: Vec<usize> = assignment.as_slice().iter().map(|lane| lane.as_usize()).collect();
/// assert_eq!(ends, vec![2, 0, 1, 3]);
/// # Ok::<(), amidakuji::LadderError>(())
/// ```
pub fn resolve_all(grid: &RungGrid) -> LadderResult<Assignment> {
    trace_all(grid).map(|tracing| tracing.assignment)
}

/// Confirms that `targets` hits every lane in `0..targets.len()` exactly once.
///
/// # Errors
///
/// Returns [`LadderError::InvalidGrid`] for the first duplicate and
/// [`LadderError::LaneOutOfRange`] for a target outside the lane range.
pub fn check_bijection(targets: &[Lane]) -> LadderResult<()> {
    let mut seen: Vec<Option<Lane>> = vec![None; targets.len()];
    for (start, &end) in targets.iter().enumerate() {
        let slot = seen
            .get_mut(end.as_usize())
            .ok_or(LadderError::LaneOutOfRange {
                lane: end,
                lane_count: targets.len(),
            })?;
        if let Some(first) = *slot {
            return Err(LadderError::InvalidGrid {
                duplicate: end,
                sources: (first, Lane::new(start)),
            });
        }
        *slot = Some(Lane::new(start));
    }
    Ok(())
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
    use crate::test_config::{arbitrary_grid, generated_grid, miri_case_count};
    use proptest::prelude::*;

    fn lanes(raw: &[usize]) -> Vec<Lane> {
        raw.iter().copied().map(Lane::new).collect()
    }

    #[test]
    fn single_rung_swaps_two_lanes() {
        let grid = RungGrid::from_columns(vec![vec![true], vec![false]]).unwrap();
        let assignment = resolve_all(&grid).unwrap();
        assert_eq!(assignment.as_slice(), lanes(&[1, 0, 2]).as_slice());
    }

    #[test]
    fn waypoints_are_unit_steps() {
        let grid = RungGrid::from_columns(vec![vec![true, false], vec![false, true]]).unwrap();
        let path = trace(&grid, Lane::new(0)).unwrap();
        assert_eq!(
            path.waypoints(),
            &[
                Waypoint::new(Lane::new(0), 0),
                Waypoint::new(Lane::new(1), 0),
                Waypoint::new(Lane::new(1), 1),
                Waypoint::new(Lane::new(2), 1),
                Waypoint::new(Lane::new(2), 2),
            ]
        );
        assert_eq!(path.crossings(), 2);
    }

    #[test]
    fn left_rung_wins_on_malformed_grid() {
        // rungs on both sides of lane 1 in row 0
        let grid = RungGrid::from_columns(vec![vec![true], vec![true]]).unwrap();
        assert_eq!(trace(&grid, Lane::new(1)).unwrap().end(), Lane::new(0));
        assert_eq!(trace(&grid, Lane::new(0)).unwrap().end(), Lane::new(1));
        assert_eq!(trace(&grid, Lane::new(2)).unwrap().end(), Lane::new(1));
        assert_eq!(
            resolve_all(&grid),
            Err(LadderError::InvalidGrid {
                duplicate: Lane::new(1),
                sources: (Lane::new(0), Lane::new(2)),
            })
        );
    }

    #[test]
    fn out_of_range_start_is_rejected() {
        let grid = RungGrid::empty(3, 2).unwrap();
        assert_eq!(
            trace(&grid, Lane::new(3)),
            Err(LadderError::LaneOutOfRange {
                lane: Lane::new(3),
                lane_count: 3,
            })
        );
    }

    #[test]
    fn empty_grid_is_identity() {
        let grid = RungGrid::empty(5, 4).unwrap();
        let tracing = trace_all(&grid).unwrap();
        for (start, end) in tracing.assignment.iter() {
            assert_eq!(start, end);
        }
        assert!(tracing.paths.iter().all(|path| path.len() == 5));
    }

    #[test]
    fn inverse_undoes_assignment() {
        let grid = RungGrid::from_columns(vec![
            vec![true, false, false],
            vec![false, true, false],
            vec![true, false, false],
        ])
        .unwrap();
        let assignment = resolve_all(&grid).unwrap();
        let inverse = assignment.inverse().unwrap();
        for (start, end) in assignment.iter() {
            assert_eq!(inverse.get(end), Some(start));
        }
    }

    #[test]
    fn check_bijection_reports_out_of_range_target() {
        assert_eq!(
            check_bijection(&lanes(&[0, 5])),
            Err(LadderError::LaneOutOfRange {
                lane: Lane::new(5),
                lane_count: 2,
            })
        );
        assert!(check_bijection(&lanes(&[1, 2, 0])).is_ok());
    }

    #[test]
    fn path_survives_json() {
        let grid = RungGrid::from_columns(vec![vec![true, false], vec![false, false]]).unwrap();
        let path = trace(&grid, Lane::new(0)).unwrap();
        let json = serde_json::to_string(&path).unwrap();
        let back: Path = serde_json::from_str(&json).unwrap();
        assert_eq!(back, path);
    }

    #[test]
    fn malformed_paths_are_rejected() {
        let rejected = [
            r#"{"start":0,"end":1,"waypoints":[]}"#,
            // first point is not on the start lane
            r#"{"start":0,"end":1,"waypoints":[{"lane":1,"row":0},{"lane":1,"row":1}]}"#,
            // last point is not on the end lane
            r#"{"start":0,"end":1,"waypoints":[{"lane":0,"row":0},{"lane":0,"row":1}]}"#,
            // jumps two lanes
            r#"{"start":0,"end":2,"waypoints":[{"lane":0,"row":0},{"lane":2,"row":0}]}"#,
            // climbs back up
            r#"{"start":0,"end":0,"waypoints":[{"lane":0,"row":0},{"lane":0,"row":1},{"lane":0,"row":0}]}"#,
        ];
        for json in rejected {
            let error = serde_json::from_str::<Path>(json).unwrap_err();
            assert!(error.to_string().contains("malformed path"), "{json}: {error}");
        }
    }

    #[test]
    fn prefix_of_deserialized_path_is_bounded() {
        let json = r#"{"start":1,"end":0,"waypoints":[{"lane":1,"row":0},{"lane":0,"row":0},{"lane":0,"row":1}]}"#;
        let path: Path = serde_json::from_str(json).unwrap();
        assert!(!path.is_empty());
        assert_eq!(path.prefix(0.0).len(), 1);
        assert_eq!(path.prefix(0.5).len(), 2);
        assert_eq!(path.prefix(f64::NAN).len(), 1);
        assert_eq!(path.prefix(7.0).len(), 3);
    }

    #[test]
    fn prefix_grows_with_fraction() {
        let grid = RungGrid::from_columns(vec![vec![true, false, false]]).unwrap();
        let path = trace(&grid, Lane::new(0)).unwrap();
        assert_eq!(path.len(), 5);
        assert_eq!(path.prefix(0.0).len(), 1);
        assert_eq!(path.prefix(0.5).len(), 3);
        assert_eq!(path.prefix(1.0).len(), 5);
        assert_eq!(path.prefix(f64::NAN).len(), 1);
    }

    proptest! {
        #![proptest_config(ProptestConfig {
            cases: miri_case_count(),
            ..ProptestConfig::default()
        })]

        #[test]
        fn generated_grids_resolve_to_permutations(grid in generated_grid()) {
            let assignment = resolve_all(&grid).unwrap();
            prop_assert_eq!(assignment.len(), grid.lane_count());
            prop_assert!(assignment.is_bijection());
        }

        #[test]
        fn paths_are_connected_unit_steps(grid in arbitrary_grid()) {
            for start in 0..grid.lane_count() {
                let path = trace(&grid, Lane::new(start)).unwrap();
                let points = path.waypoints();
                prop_assert_eq!(points[0], Waypoint::new(Lane::new(start), 0));
                prop_assert_eq!(
                    *points.last().unwrap(),
                    Waypoint::new(path.end(), grid.row_count())
                );
                for pair in points.windows(2) {
                    let lane_step = pair[0].lane.as_usize().abs_diff(pair[1].lane.as_usize());
                    let row_step = pair[1].row - pair[0].row;
                    prop_assert_eq!(lane_step + row_step, 1);
                }
            }
        }

        #[test]
        fn tracing_is_pure(grid in arbitrary_grid()) {
            let first: Vec<_> = (0..grid.lane_count())
                .map(|start| trace(&grid, Lane::new(start)).unwrap())
                .collect();
            let second: Vec<_> = (0..grid.lane_count())
                .map(|start| trace(&grid, Lane::new(start)).unwrap())
                .collect();
            prop_assert_eq!(first, second);
        }

        #[test]
        fn grids_without_adjacent_rungs_always_resolve(grid in arbitrary_grid()) {
            prop_assume!(grid.first_adjacent_pair().is_none());
            prop_assert!(resolve_all(&grid).is_ok());
        }
    }
}
