//! # amidakuji
//!
//! A ladder-lottery ("Amidakuji") engine. Players stand on top of vertical
//! lanes, results sit at the bottom, and randomly placed horizontal rungs
//! decide who gets what. Three guarantees make it a game rather than a coin
//! toss:
//!
//! - every generated [`RungGrid`] keeps rungs from sharing a lane in the same
//!   row, so tracing always yields a **permutation** of the lanes,
//! - tracing is pure: the same grid always produces the same [`Path`]s and
//!   [`Assignment`],
//! - the staged reveal driven by a [`TimerSource`] can be aborted at any point
//!   and no callback fires after [`RevealHandle::abort`] returns.
//!
//! The callback-heavy UI flow the engine was lifted from is replaced by an
//! explicit [`GameSession`] state machine:
//! `Idle → Ready → Revealing → Resolved`, with `reset` returning to `Ready`.
//!
//! ```
//! use amidakuji::{GameState, ManualTimer, SessionBuilder};
//!
//! # fn main() -> Result<(), amidakuji::LadderError> {
//! let timer = ManualTimer::new();
//! let mut session = SessionBuilder::new()
//!     .with_seed(7)
//!     .start_session(timer.clone())?;
//!
//! let game = session.new_game(["Ann", "Bo", "Cy"], ["tea", "coffee", "juice"])?;
//! session.start(game)?;
//! timer.run_until_idle(10_000);
//!
//! assert_eq!(session.state(), GameState::Resolved);
//! let assignment = session.assignment(game)?;
//! assert!(assignment.is_bijection());
//! # Ok(())
//! # }
//! ```

#![forbid(unsafe_code)]
#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

pub use error::{InvalidInputKind, LadderError, LadderResult};
pub use generator::{generate, RungGridGenerator};
pub use grid::RungGrid;
pub use reveal::timer::{ManualTimer, TimerCallback, TimerHandle, TimerSource};
#[cfg(feature = "tokio")]
pub use reveal::tokio_timer::TokioTimer;
pub use reveal::{reveal, FnListener, RevealHandle, RevealListener};
pub use rng::{Pcg32, RandomSource, SeedableRng};
pub use sessions::builder::SessionBuilder;
pub use sessions::config::{GridConfig, RevealConfig};
pub use sessions::event_drain::EventDrain;
pub use sessions::game_session::{GameSession, Outcome};
pub use tracer::{resolve_all, trace, trace_all, Assignment, Path, Tracing, Waypoint};

#[doc(hidden)]
pub mod error;
pub mod generator;
pub mod grid;
pub mod prelude;
pub mod reveal;
/// Deterministic random sources based on PCG32.
///
/// See the module documentation for usage details.
pub mod rng;
pub mod telemetry;
#[cfg(test)]
pub(crate) mod test_config;
pub mod tracer;
#[doc(hidden)]
pub mod sessions {
    #[doc(hidden)]
    pub mod builder;
    #[doc(hidden)]
    pub mod config;
    #[doc(hidden)]
    pub mod event_drain;
    #[doc(hidden)]
    pub mod game_session;
}

/// Internal module exposing implementation details for testing, fuzzing and benches.
///
/// # ⚠️ WARNING: No Stability Guarantees
///
/// **This module is NOT part of the public API.** Everything here may change
/// without notice. It exists so property tests and fuzz targets can drive the
/// generator phases and the trace check directly.
#[doc(hidden)]
pub mod __internal {
    pub use crate::generator::{clear_terminal_row, draw_candidates, repair_adjacent_rungs};
    pub use crate::grid::RungGrid;
    pub use crate::tracer::check_bijection;
}

// #############
// # CONSTANTS #
// #############

/// Fewest lanes a ladder can have.
pub const MIN_LANES: usize = 2;

/// Fewest rows a ladder can have.
pub const MIN_ROWS: usize = 1;

/// Row count used when none is configured.
pub const DEFAULT_ROWS: usize = 10;

/// A vertical slot of the ladder, `0..lane_count`.
///
/// Lane `i` is where player `i` starts and where result `i` sits.
///
/// # Examples
///
/// ```
/// use amidakuji::Lane;
///
/// let lane = Lane::new(2);
/// assert_eq!(lane.as_usize(), 2);
/// assert!(lane.is_valid_for(3));
/// assert!(!lane.is_valid_for(2));
/// ```
#[derive(
    Debug,
    Copy,
    Clone,
    PartialEq,
    Eq,
    PartialOrd,
    Ord,
    Hash,
    Default,
    serde::Serialize,
    serde::Deserialize,
)]
#[serde(transparent)]
pub struct Lane(usize);

impl Lane {
    /// Creates a lane from its index.
    #[inline]
    #[must_use]
    pub const fn new(index: usize) -> Self {
        Self(index)
    }

    /// Returns the lane index.
    #[inline]
    #[must_use]
    pub const fn as_usize(self) -> usize {
        self.0
    }

    /// Returns `true` if this lane exists in a ladder with `lane_count` lanes.
    #[inline]
    #[must_use]
    pub const fn is_valid_for(self, lane_count: usize) -> bool {
        self.0 < lane_count
    }
}

impl std::fmt::Display for Lane {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl From<usize> for Lane {
    fn from(index: usize) -> Self {
        Self(index)
    }
}

/// Identifies one generated ladder within a [`GameSession`].
///
/// Every [`GameSession::new_game`] and [`GameSession::reset`] mints a new id;
/// queries made with an older id fail with [`LadderError::UnknownGame`].
#[derive(
    Debug, Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize, serde::Deserialize,
)]
#[serde(transparent)]
pub struct GameId(u64);

impl GameId {
    /// Creates a game id from its raw value.
    #[inline]
    #[must_use]
    pub const fn new(raw: u64) -> Self {
        Self(raw)
    }

    /// Returns the raw value.
    #[inline]
    #[must_use]
    pub const fn as_u64(self) -> u64 {
        self.0
    }
}

impl std::fmt::Display for GameId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// The state of a [`GameSession`].
#[derive(Debug, Copy, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub enum GameState {
    /// No ladder has been generated yet.
    Idle,
    /// A ladder and its paths exist; the reveal has not started.
    Ready,
    /// The reveal is running.
    Revealing,
    /// The reveal finished; the assignment is visible.
    Resolved,
}

impl GameState {
    /// Returns a lowercase label for logs and error messages.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Idle => "idle",
            Self::Ready => "ready",
            Self::Revealing => "revealing",
            Self::Resolved => "resolved",
        }
    }
}

impl std::fmt::Display for GameState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Notifications recorded by a [`GameSession`] while it runs a game.
///
/// Drain them with [`GameSession::events`]. Callers that prefer callbacks can
/// use [`GameSession::subscribe`] instead; both see the same sequence.
///
/// # Forward Compatibility
///
/// This enum is marked `#[non_exhaustive]`. Always include a wildcard arm when matching:
///
/// ```ignore
/// match event {
///     RevealEvent::Resolved { game } => { /* show results */ }
///     _ => { /* handle unknown events */ }
/// }
/// ```
#[derive(Debug, Copy, Clone, PartialEq)]
#[non_exhaustive]
pub enum RevealEvent {
    /// The reveal of `game` started.
    Started {
        /// The game being revealed.
        game: GameId,
    },
    /// A lane's reveal progressed.
    Progress {
        /// The game being revealed.
        game: GameId,
        /// The lane being revealed.
        lane: Lane,
        /// Progress in `(0, 1]`, non-decreasing per lane.
        fraction: f64,
    },
    /// A lane's path has been fully revealed.
    LaneRevealed {
        /// The game being revealed.
        game: GameId,
        /// The lane that finished.
        lane: Lane,
    },
    /// Every lane has been revealed; the assignment is now visible.
    Resolved {
        /// The game that resolved.
        game: GameId,
    },
    /// The reveal was abandoned by `reset` or `new_game`.
    Aborted {
        /// The game whose reveal was abandoned.
        game: GameId,
    },
}

impl RevealEvent {
    /// Returns the game this event belongs to.
    #[must_use]
    pub const fn game(&self) -> GameId {
        match *self {
            Self::Started { game }
            | Self::Progress { game, .. }
            | Self::LaneRevealed { game, .. }
            | Self::Resolved { game }
            | Self::Aborted { game } => game,
        }
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
    fn lane_validity() {
        assert!(Lane::new(0).is_valid_for(2));
        assert!(Lane::new(1).is_valid_for(2));
        assert!(!Lane::new(2).is_valid_for(2));
        assert_eq!(Lane::from(4), Lane::new(4));
    }

    #[test]
    fn lane_and_game_id_serialize_transparently() {
        let json = serde_json::to_string(&(Lane::new(3), GameId::new(11))).unwrap();
        assert_eq!(json, "[3,11]");
    }

    #[test]
    fn game_state_labels() {
        assert_eq!(GameState::Idle.to_string(), "idle");
        assert_eq!(GameState::Revealing.as_str(), "revealing");
    }

    #[test]
    fn event_reports_its_game() {
        let event = RevealEvent::Progress {
            game: GameId::new(5),
            lane: Lane::new(1),
            fraction: 0.5,
        };
        assert_eq!(event.game(), GameId::new(5));
        assert_eq!(RevealEvent::Aborted { game: GameId::new(2) }.game(), GameId::new(2));
    }
}
