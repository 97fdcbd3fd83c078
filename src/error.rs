use std::error::Error;
use std::fmt;
use std::fmt::Display;

use crate::{GameId, GameState, Lane};

/// Alias for results returned throughout this crate.
pub type LadderResult<T> = Result<T, LadderError>;

/// Further specifies why an input was rejected.
///
/// Carried by [`LadderError::InvalidInput`]. Every rejection happens before any
/// state is touched, so a caller can fix the input and retry.
#[derive(Debug, Clone, PartialEq)]
#[non_exhaustive]
pub enum InvalidInputKind {
    /// The player and result label lists have different lengths.
    LaneCountMismatch {
        /// Number of player labels supplied.
        players: usize,
        /// Number of result labels supplied.
        results: usize,
    },
    /// Fewer lanes than a ladder needs.
    TooFewLanes {
        /// Number of lanes requested.
        lanes: usize,
        /// Minimum number of lanes.
        min: usize,
    },
    /// Fewer rows than a ladder needs.
    TooFewRows {
        /// Number of rows requested.
        rows: usize,
        /// Minimum number of rows.
        min: usize,
    },
    /// A numeric configuration value was outside its accepted range.
    ConfigValueOutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// Smallest accepted value.
        min: u64,
        /// Largest accepted value.
        max: u64,
        /// Value that was supplied.
        actual: u64,
    },
    /// A probability was not a finite value in `[0, 1]`.
    ProbabilityOutOfRange {
        /// Name of the offending field.
        field: &'static str,
        /// Value that was supplied.
        actual: f64,
    },
    /// An explicit grid had columns of different heights.
    RaggedGrid {
        /// Index of the first column whose height differs.
        column: usize,
        /// Height of column 0.
        expected_rows: usize,
        /// Height of the offending column.
        actual_rows: usize,
    },
    /// A deserialized path was not a walk down the ladder.
    MalformedPath {
        /// Which rule the path broke.
        reason: &'static str,
    },
}

impl Display for InvalidInputKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            InvalidInputKind::LaneCountMismatch { players, results } => {
                write!(
                    f,
                    "{} players but {} results; every player needs exactly one result",
                    players, results
                )
            }
            InvalidInputKind::TooFewLanes { lanes, min } => {
                write!(f, "{} lanes requested, at least {} required", lanes, min)
            }
            InvalidInputKind::TooFewRows { rows, min } => {
                write!(f, "{} rows requested, at least {} required", rows, min)
            }
            InvalidInputKind::ConfigValueOutOfRange {
                field,
                min,
                max,
                actual,
            } => {
                write!(
                    f,
                    "{} = {} is outside the accepted range [{}, {}]",
                    field, actual, min, max
                )
            }
            InvalidInputKind::ProbabilityOutOfRange { field, actual } => {
                write!(f, "{} = {} is not a probability in [0, 1]", field, actual)
            }
            InvalidInputKind::RaggedGrid {
                column,
                expected_rows,
                actual_rows,
            } => {
                write!(
                    f,
                    "column {} has {} rows, expected {}",
                    column, actual_rows, expected_rows
                )
            }
            InvalidInputKind::MalformedPath { reason } => {
                write!(f, "malformed path: {}", reason)
            }
        }
    }
}

/// This enum contains all errors this library can return. Most API functions
/// return a [`LadderResult<T>`].
///
/// Aborting a reveal (through [`GameSession::reset`] or
/// [`GameSession::new_game`]) is ordinary control flow and never produces an error.
///
/// [`GameSession::reset`]: crate::GameSession::reset
/// [`GameSession::new_game`]: crate::GameSession::new_game
#[derive(Debug, Clone, PartialEq)]
pub enum LadderError {
    /// Player/result lists or configuration values were rejected.
    InvalidInput {
        /// Further specifies why the input was invalid.
        kind: InvalidInputKind,
    },
    /// Tracing a grid did not produce a permutation of its lanes.
    ///
    /// Grids built by the generator never trigger this. Seeing it means the
    /// grid broke the no-adjacent-rungs rule and is reported as a bug.
    InvalidGrid {
        /// The final lane reached by more than one starting lane.
        duplicate: Lane,
        /// Two starting lanes that both ended on `duplicate`.
        sources: (Lane, Lane),
    },
    /// A lane index outside `[0, lane_count)` was supplied.
    LaneOutOfRange {
        /// The offending lane.
        lane: Lane,
        /// Number of lanes in the grid.
        lane_count: usize,
    },
    /// The operation is not allowed in the session's current state.
    InvalidState {
        /// The operation that was attempted.
        operation: &'static str,
        /// The state the session was in.
        state: GameState,
    },
    /// The given game id does not name the session's current game.
    UnknownGame {
        /// The id the caller asked for.
        requested: GameId,
        /// The id of the current game, if any.
        current: Option<GameId>,
    },
    /// The reveal has not finished, so the assignment is still hidden.
    NotResolved {
        /// The game that was queried.
        game: GameId,
        /// The state the game was in.
        state: GameState,
    },
}

impl Display for LadderError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            LadderError::InvalidInput { kind } => {
                write!(f, "Invalid input: {}", kind)
            }
            LadderError::InvalidGrid {
                duplicate,
                sources,
            } => {
                write!(
                    f,
                    "Invalid grid (please report as bug): lanes {} and {} both end on lane {}",
                    sources.0, sources.1, duplicate
                )
            }
            LadderError::LaneOutOfRange { lane, lane_count } => {
                write!(
                    f,
                    "Lane {} is out of range: the ladder has {} lanes",
                    lane, lane_count
                )
            }
            LadderError::InvalidState { operation, state } => {
                write!(f, "Cannot {} while the session is {}", operation, state)
            }
            LadderError::UnknownGame { requested, current } => match current {
                Some(current) => write!(
                    f,
                    "Game {} is not the current game (current is {})",
                    requested, current
                ),
                None => write!(f, "Game {} is unknown: no game has been started", requested),
            },
            LadderError::NotResolved { game, state } => {
                write!(
                    f,
                    "Game {} is {}; its assignment is revealed once it is resolved",
                    game, state
                )
            }
        }
    }
}

impl Error for LadderError {}

impl From<InvalidInputKind> for LadderError {
    fn from(kind: InvalidInputKind) -> Self {
        LadderError::InvalidInput { kind }
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

    #[test]
    fn invalid_input_display_includes_kind() {
        let err: LadderError = InvalidInputKind::LaneCountMismatch {
            players: 3,
            results: 2,
        }
        .into();
        let text = err.to_string();
        assert!(text.starts_with("Invalid input:"));
        assert!(text.contains("3 players but 2 results"));
    }

    #[test]
    fn invalid_grid_display_names_lanes() {
        let err = LadderError::InvalidGrid {
            duplicate: Lane::new(1),
            sources: (Lane::new(0), Lane::new(2)),
        };
        let text = err.to_string();
        assert!(text.contains("lanes 0 and 2 both end on lane 1"));
    }

    #[test]
    fn unknown_game_display_with_and_without_current() {
        let with = LadderError::UnknownGame {
            requested: GameId::new(1),
            current: Some(GameId::new(2)),
        };
        assert!(with.to_string().contains("current is 2"));

        let without = LadderError::UnknownGame {
            requested: GameId::new(1),
            current: None,
        };
        assert!(without.to_string().contains("no game has been started"));
    }

    #[test]
    fn errors_are_std_errors() {
        fn assert_error<E: Error>(_: &E) {}
        assert_error(&LadderError::LaneOutOfRange {
            lane: Lane::new(5),
            lane_count: 3,
        });
    }
}
