//! The game state machine.
//!
//! ```text
//!   Idle --new_game--> Ready --start--> Revealing --on_done--> Resolved
//!                        ^                  |                      |
//!                        +------ reset -----+---------- reset -----+
//! ```
//!
//! Every `new_game` and `reset` generates a fresh grid and mints a new
//! [`GameId`]. Any running reveal of the replaced game is aborted first, so
//! no callback for an old game is ever delivered after the call returns.

use std::collections::VecDeque;
use std::sync::Arc;

use parking_lot::Mutex;
use tracing::debug;

use crate::error::{InvalidInputKind, LadderError, LadderResult};
use crate::generator::RungGridGenerator;
use crate::grid::RungGrid;
use crate::report_violation_to;
use crate::reveal::timer::TimerSource;
use crate::reveal::{reveal, RevealHandle, RevealListener};
use crate::rng::RandomSource;
use crate::sessions::config::{GridConfig, RevealConfig};
use crate::sessions::event_drain::EventDrain;
use crate::telemetry::{ViolationKind, ViolationObserver, ViolationSeverity};
use crate::tracer::{trace_all, Assignment, Path};
use crate::{GameId, GameState, Lane, RevealEvent, MIN_LANES};

/// What a player won, available once the game is resolved.
#[derive(Debug, Clone, PartialEq, Eq, Hash, serde::Serialize, serde::Deserialize)]
pub struct Outcome {
    /// The player's label.
    pub player: String,
    /// The label of the result the player reached.
    pub result: String,
    /// The lane the player started on.
    pub start_lane: Lane,
    /// The lane the player's path ended on.
    pub final_lane: Lane,
}

/// Everything a [`SessionBuilder`](crate::SessionBuilder) hands to a new session.
pub(crate) struct SessionParts {
    pub(crate) grid_config: GridConfig,
    pub(crate) reveal_config: RevealConfig,
    pub(crate) random: Box<dyn RandomSource + Send>,
    pub(crate) timer: Arc<dyn TimerSource>,
    pub(crate) violation_observer: Option<Arc<dyn ViolationObserver>>,
    pub(crate) event_queue_size: usize,
}

/// Runs ladder games: generates grids, drives the reveal and exposes the
/// results once they are revealed.
///
/// Build one with [`SessionBuilder`](crate::SessionBuilder). Sessions are
/// independent; nothing is shared between two of them.
///
/// # Examples
///
/// ```
/// use amidakuji::{GameState, LadderError, ManualTimer, SessionBuilder};
///
/// # fn main() -> Result<(), LadderError> {
/// let timer = ManualTimer::new();
/// let mut session = SessionBuilder::new().with_seed(42).start_session(timer.clone())?;
///
/// let game = session.new_game(["Ann", "Bo"], ["win", "lose"])?;
/// assert!(matches!(session.assignment(game), Err(LadderError::NotResolved { .. })));
///
/// session.start(game)?;
/// timer.run_until_idle(1_000);
///
/// for outcome in session.outcomes(game)? {
///     println!("{} gets {}", outcome.player, outcome.result);
/// }
/// # Ok(())
/// # }
/// ```
pub struct GameSession {
    generator: RungGridGenerator,
    reveal_config: RevealConfig,
    random: Box<dyn RandomSource + Send>,
    timer: Arc<dyn TimerSource>,
    violation_observer: Option<Arc<dyn ViolationObserver>>,
    events: Arc<Mutex<EventQueue>>,
    next_game: u64,
    game: Option<Game>,
}

/// One generated ladder. Immutable except for its board.
struct Game {
    id: GameId,
    players: Arc<[String]>,
    results: Arc<[String]>,
    grid: Arc<RungGrid>,
    paths: Arc<[Path]>,
    assignment: Arc<Assignment>,
    board: Arc<Mutex<Board>>,
    reveal: Option<RevealHandle>,
}

/// The part of a game the reveal writes to.
struct Board {
    state: GameState,
    progress: Vec<f64>,
    subscribers: Vec<Arc<dyn RevealListener>>,
}

impl Board {
    fn new(lane_count: usize) -> Self {
        Self {
            state: GameState::Ready,
            progress: vec![0.0; lane_count],
            subscribers: Vec::new(),
        }
    }
}

/// Bounded FIFO of events; the oldest event is dropped when full.
struct EventQueue {
    events: VecDeque<RevealEvent>,
    capacity: usize,
    violation_observer: Option<Arc<dyn ViolationObserver>>,
}

impl EventQueue {
    fn push(&mut self, event: RevealEvent) {
        if self.events.len() >= self.capacity {
            if let Some(dropped) = self.events.pop_front() {
                report_violation_to!(
                    &self.violation_observer,
                    ViolationSeverity::Warning,
                    ViolationKind::Session,
                    game = dropped.game(),
                    "event queue full ({} events), dropped oldest event {:?}",
                    self.capacity,
                    dropped
                );
            }
        }
        self.events.push_back(event);
    }
}

impl GameSession {
    pub(crate) fn from_parts(parts: SessionParts) -> Self {
        let SessionParts {
            grid_config,
            reveal_config,
            random,
            timer,
            violation_observer,
            event_queue_size,
        } = parts;
        Self {
            generator: RungGridGenerator::new(grid_config),
            reveal_config,
            random,
            timer,
            events: Arc::new(Mutex::new(EventQueue {
                events: VecDeque::with_capacity(event_queue_size.min(1024)),
                capacity: event_queue_size,
                violation_observer: violation_observer.clone(),
            })),
            violation_observer,
            next_game: 1,
            game: None,
        }
    }

    /// Generates a ladder for the given player and result labels and moves to
    /// [`GameState::Ready`].
    ///
    /// Allowed in every state. A reveal in progress is aborted and an
    /// [`RevealEvent::Aborted`] is recorded for the replaced game.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInput`] if the lists differ in length or have fewer
    /// than two entries. The session is left untouched in that case.
    ///
    /// [`InvalidInput`]: LadderError::InvalidInput
    pub fn new_game<P, R>(&mut self, players: P, results: R) -> LadderResult<GameId>
    where
        P: IntoIterator,
        P::Item: Into<String>,
        R: IntoIterator,
        R::Item: Into<String>,
    {
        let players: Vec<String> = players.into_iter().map(Into::into).collect();
        let results: Vec<String> = results.into_iter().map(Into::into).collect();
        if players.len() != results.len() {
            return Err(InvalidInputKind::LaneCountMismatch {
                players: players.len(),
                results: results.len(),
            }
            .into());
        }
        if players.len() < MIN_LANES {
            return Err(InvalidInputKind::TooFewLanes {
                lanes: players.len(),
                min: MIN_LANES,
            }
            .into());
        }

        let game = self.prepare_game(players.into(), results.into())?;
        Ok(self.install(game))
    }

    /// Starts the reveal of `game`: [`GameState::Ready`] → [`GameState::Revealing`].
    ///
    /// # Errors
    ///
    /// Returns [`UnknownGame`] if `game` is not the current game and
    /// [`InvalidState`] unless the game is ready.
    ///
    /// [`UnknownGame`]: LadderError::UnknownGame
    /// [`InvalidState`]: LadderError::InvalidState
    pub fn start(&mut self, game: GameId) -> LadderResult<()> {
        let timer = self.timer.clone();
        let config = self.reveal_config;
        let events = self.events.clone();
        let violation_observer = self.violation_observer.clone();
        let current = self.current_mut(game)?;

        {
            let mut board = current.board.lock();
            if board.state != GameState::Ready {
                return Err(LadderError::InvalidState {
                    operation: "start the reveal",
                    state: board.state,
                });
            }
            board.state = GameState::Revealing;
        }
        events.lock().push(RevealEvent::Started { game });

        let listener = Arc::new(SessionListener {
            game,
            board: current.board.clone(),
            events,
            violation_observer,
        });
        current.reveal = Some(reveal(&current.paths, listener, timer, config));
        debug!(game = %game, lanes = current.paths.len(), "reveal started");
        Ok(())
    }

    /// Regenerates the ladder for the same labels: any state → [`GameState::Ready`].
    ///
    /// A reveal in progress is aborted first. Returns the id of the new game;
    /// `game` becomes unknown.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownGame`] if `game` is not the current game.
    ///
    /// [`UnknownGame`]: LadderError::UnknownGame
    pub fn reset(&mut self, game: GameId) -> LadderResult<GameId> {
        let current = self.current(game)?;
        let players = current.players.clone();
        let results = current.results.clone();
        let next = self.prepare_game(players, results)?;
        Ok(self.install(next))
    }

    /// Registers a listener for the reveal of `game`.
    ///
    /// The listener receives the same progress and completion callbacks the
    /// session records as events, on the timer's thread. Subscriptions end
    /// with the game; `reset` and `new_game` start with no subscribers.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownGame`] if `game` is not the current game.
    ///
    /// [`UnknownGame`]: LadderError::UnknownGame
    pub fn subscribe(
        &mut self,
        game: GameId,
        listener: Arc<dyn RevealListener>,
    ) -> LadderResult<()> {
        self.current(game)?.board.lock().subscribers.push(listener);
        Ok(())
    }

    /// Takes every event recorded since the last call.
    pub fn events(&mut self) -> EventDrain {
        EventDrain::from_queue(std::mem::take(&mut self.events.lock().events))
    }

    /// State of the current game, [`GameState::Idle`] before the first game.
    #[must_use]
    pub fn state(&self) -> GameState {
        self.game
            .as_ref()
            .map_or(GameState::Idle, |current| current.board.lock().state)
    }

    /// Id of the current game.
    #[must_use]
    pub fn current_game(&self) -> Option<GameId> {
        self.game.as_ref().map(|current| current.id)
    }

    /// State of `game`.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownGame`](LadderError::UnknownGame) for any id but the current one.
    pub fn game_state(&self, game: GameId) -> LadderResult<GameState> {
        Ok(self.current(game)?.board.lock().state)
    }

    /// The rung grid of `game`. Read-only and shared; holding it past a reset
    /// keeps the old grid alive unchanged.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownGame`](LadderError::UnknownGame) for any id but the current one.
    pub fn grid(&self, game: GameId) -> LadderResult<Arc<RungGrid>> {
        Ok(self.current(game)?.grid.clone())
    }

    /// Player labels of `game`, indexed by start lane.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownGame`](LadderError::UnknownGame) for any id but the current one.
    pub fn players(&self, game: GameId) -> LadderResult<&[String]> {
        Ok(&*self.current(game)?.players)
    }

    /// Result labels of `game`, indexed by final lane.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownGame`](LadderError::UnknownGame) for any id but the current one.
    pub fn results(&self, game: GameId) -> LadderResult<&[String]> {
        Ok(&*self.current(game)?.results)
    }

    /// Reveal progress of every lane, each in `[0, 1]`.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownGame`](LadderError::UnknownGame) for any id but the current one.
    pub fn progress(&self, game: GameId) -> LadderResult<Vec<f64>> {
        Ok(self.current(game)?.board.lock().progress.clone())
    }

    /// Lanes whose path has been fully revealed, in reveal order.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownGame`](LadderError::UnknownGame) for any id but the current one.
    pub fn revealed_lanes(&self, game: GameId) -> LadderResult<Vec<Lane>> {
        let board = self.current(game)?.board.lock();
        Ok(board
            .progress
            .iter()
            .enumerate()
            .filter(|(_, &fraction)| fraction >= 1.0)
            .map(|(lane, _)| Lane::new(lane))
            .collect())
    }

    /// The path of `lane`, once its reveal has started.
    ///
    /// Returns `Ok(None)` while the lane is still hidden so a renderer cannot
    /// read the outcome early.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownGame`] for any id but the current one and
    /// [`LaneOutOfRange`] for a lane the ladder does not have.
    ///
    /// [`UnknownGame`]: LadderError::UnknownGame
    /// [`LaneOutOfRange`]: LadderError::LaneOutOfRange
    pub fn visible_path(&self, game: GameId, lane: Lane) -> LadderResult<Option<Path>> {
        let current = self.current(game)?;
        let path = current
            .paths
            .get(lane.as_usize())
            .ok_or(LadderError::LaneOutOfRange {
                lane,
                lane_count: current.paths.len(),
            })?;
        let board = current.board.lock();
        let visible = board.state == GameState::Resolved
            || board
                .progress
                .get(lane.as_usize())
                .is_some_and(|&fraction| fraction > 0.0);
        Ok(visible.then(|| path.clone()))
    }

    /// The final lane of every start lane. Only available once resolved.
    ///
    /// # Errors
    ///
    /// Returns [`UnknownGame`] for any id but the current one and
    /// [`NotResolved`] before the reveal has finished.
    ///
    /// [`UnknownGame`]: LadderError::UnknownGame
    /// [`NotResolved`]: LadderError::NotResolved
    pub fn assignment(&self, game: GameId) -> LadderResult<Arc<Assignment>> {
        let current = self.resolved(game)?;
        Ok(current.assignment.clone())
    }

    /// Pairs every player with the result at the end of their path. Only
    /// available once resolved.
    ///
    /// # Errors
    ///
    /// Same as [`assignment`](Self::assignment).
    pub fn outcomes(&self, game: GameId) -> LadderResult<Vec<Outcome>> {
        let current = self.resolved(game)?;
        current
            .assignment
            .iter()
            .map(|(start, end)| {
                let player = current.players.get(start.as_usize());
                let result = current.results.get(end.as_usize());
                match (player, result) {
                    (Some(player), Some(result)) => Ok(Outcome {
                        player: player.clone(),
                        result: result.clone(),
                        start_lane: start,
                        final_lane: end,
                    }),
                    _ => Err(LadderError::LaneOutOfRange {
                        lane: end,
                        lane_count: current.results.len(),
                    }),
                }
            })
            .collect()
    }

    /// The grid configuration new games are generated with.
    #[must_use]
    pub fn grid_config(&self) -> &GridConfig {
        self.generator.config()
    }

    /// The reveal pacing.
    #[must_use]
    pub fn reveal_config(&self) -> &RevealConfig {
        &self.reveal_config
    }

    fn current(&self, game: GameId) -> LadderResult<&Game> {
        match &self.game {
            Some(current) if current.id == game => Ok(current),
            other => Err(LadderError::UnknownGame {
                requested: game,
                current: other.as_ref().map(|current| current.id),
            }),
        }
    }

    fn current_mut(&mut self, game: GameId) -> LadderResult<&mut Game> {
        let current = self.current_game();
        match &mut self.game {
            Some(active) if active.id == game => Ok(active),
            _ => Err(LadderError::UnknownGame {
                requested: game,
                current,
            }),
        }
    }

    fn resolved(&self, game: GameId) -> LadderResult<&Game> {
        let current = self.current(game)?;
        let state = current.board.lock().state;
        if state != GameState::Resolved {
            return Err(LadderError::NotResolved { game, state });
        }
        Ok(current)
    }

    /// Generates and traces a new ladder without touching the current game.
    fn prepare_game(
        &mut self,
        players: Arc<[String]>,
        results: Arc<[String]>,
    ) -> LadderResult<Game> {
        let lane_count = players.len();
        let grid = self.generator.generate(lane_count, &mut *self.random)?;
        let tracing = trace_all(&grid).map_err(|err| {
            report_violation_to!(
                &self.violation_observer,
                ViolationSeverity::Critical,
                ViolationKind::Trace,
                "generated grid did not resolve to a permutation: {}",
                err
            );
            err
        })?;

        let id = GameId::new(self.next_game);
        self.next_game += 1;
        Ok(Game {
            id,
            players,
            results,
            grid: Arc::new(grid),
            paths: tracing.paths.into(),
            assignment: Arc::new(tracing.assignment),
            board: Arc::new(Mutex::new(Board::new(lane_count))),
            reveal: None,
        })
    }

    /// Replaces the current game, aborting its reveal.
    fn install(&mut self, game: Game) -> GameId {
        if let Some(previous) = self.game.take() {
            self.retire(previous);
        }
        let id = game.id;
        debug!(
            game = %id,
            lanes = game.grid.lane_count(),
            rows = game.grid.row_count(),
            rungs = game.grid.rung_count(),
            "game ready"
        );
        self.game = Some(game);
        id
    }

    fn retire(&self, mut game: Game) {
        let Some(handle) = game.reveal.take() else {
            return;
        };
        // the board lock must not be held here: a tick in flight needs it
        handle.abort();
        let interrupted = game.board.lock().state == GameState::Revealing;
        if interrupted {
            self.events
                .lock()
                .push(RevealEvent::Aborted { game: game.id });
            debug!(game = %game.id, "reveal aborted");
        }
    }
}

impl std::fmt::Debug for GameSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("GameSession")
            .field("grid_config", self.generator.config())
            .field("reveal_config", &self.reveal_config)
            .field("current_game", &self.current_game())
            .field("state", &self.state())
            .field("queued_events", &self.events.lock().events.len())
            .field(
                "has_violation_observer",
                &self.violation_observer.is_some(),
            )
            .finish_non_exhaustive()
    }
}

/// Bridges reveal callbacks into the board, the event queue and the
/// subscribers of one game.
struct SessionListener {
    game: GameId,
    board: Arc<Mutex<Board>>,
    events: Arc<Mutex<EventQueue>>,
    violation_observer: Option<Arc<dyn ViolationObserver>>,
}

impl RevealListener for SessionListener {
    fn on_progress(&self, lane: Lane, fraction: f64) {
        let subscribers = {
            let mut board = self.board.lock();
            if board.state != GameState::Revealing {
                return;
            }
            let Some(slot) = board.progress.get_mut(lane.as_usize()) else {
                report_violation_to!(
                    &self.violation_observer,
                    ViolationSeverity::Error,
                    ViolationKind::Reveal,
                    game = self.game,
                    "progress reported for lane {}, which the ladder does not have",
                    lane
                );
                return;
            };
            if fraction < *slot {
                report_violation_to!(
                    &self.violation_observer,
                    ViolationSeverity::Error,
                    ViolationKind::Reveal,
                    game = self.game,
                    "progress of lane {} went back from {} to {}",
                    lane,
                    *slot,
                    fraction
                );
            }
            *slot = slot.max(fraction);
            board.subscribers.clone()
        };

        {
            let mut events = self.events.lock();
            events.push(RevealEvent::Progress {
                game: self.game,
                lane,
                fraction,
            });
            if fraction >= 1.0 {
                events.push(RevealEvent::LaneRevealed {
                    game: self.game,
                    lane,
                });
            }
        }

        for subscriber in &subscribers {
            subscriber.on_progress(lane, fraction);
        }
    }

    fn on_done(&self) {
        let subscribers = {
            let mut board = self.board.lock();
            if board.state != GameState::Revealing {
                return;
            }
            board.state = GameState::Resolved;
            board.subscribers.clone()
        };
        self.events
            .lock()
            .push(RevealEvent::Resolved { game: self.game });
        debug!(game = %self.game, "game resolved");

        for subscriber in &subscribers {
            subscriber.on_done();
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
    use crate::reveal::timer::ManualTimer;
    use crate::rng::{Pcg32, SeedableRng};
    use crate::telemetry::CollectingObserver;

    fn session_with(timer: &ManualTimer, queue: usize) -> GameSession {
        GameSession::from_parts(SessionParts {
            grid_config: GridConfig::default(),
            reveal_config: RevealConfig::default(),
            random: Box::new(Pcg32::seed_from_u64(9)),
            timer: Arc::new(timer.clone()),
            violation_observer: None,
            event_queue_size: queue,
        })
    }

    #[test]
    fn starts_idle() {
        let session = session_with(&ManualTimer::new(), 64);
        assert_eq!(session.state(), GameState::Idle);
        assert_eq!(session.current_game(), None);
    }

    #[test]
    fn rejects_mismatched_labels_without_touching_state() {
        let mut session = session_with(&ManualTimer::new(), 64);
        let game = session.new_game(["a", "b"], ["x", "y"]).unwrap();

        let err = session.new_game(["a", "b", "c"], ["x", "y"]).unwrap_err();
        assert_eq!(
            err,
            LadderError::InvalidInput {
                kind: InvalidInputKind::LaneCountMismatch {
                    players: 3,
                    results: 2
                }
            }
        );
        assert_eq!(session.current_game(), Some(game));
        assert_eq!(session.state(), GameState::Ready);
    }

    #[test]
    fn rejects_single_lane() {
        let mut session = session_with(&ManualTimer::new(), 64);
        assert!(matches!(
            session.new_game(["solo"], ["prize"]),
            Err(LadderError::InvalidInput {
                kind: InvalidInputKind::TooFewLanes { lanes: 1, min: 2 }
            })
        ));
        assert_eq!(session.state(), GameState::Idle);
    }

    #[test]
    fn start_twice_is_invalid() {
        let mut session = session_with(&ManualTimer::new(), 64);
        let game = session.new_game(["a", "b"], ["x", "y"]).unwrap();
        session.start(game).unwrap();
        assert_eq!(
            session.start(game),
            Err(LadderError::InvalidState {
                operation: "start the reveal",
                state: GameState::Revealing,
            })
        );
    }

    #[test]
    fn event_queue_drops_oldest_and_reports() {
        let timer = ManualTimer::new();
        let observer = Arc::new(CollectingObserver::new());
        let mut session = GameSession::from_parts(SessionParts {
            grid_config: GridConfig::default(),
            reveal_config: RevealConfig::instant(),
            random: Box::new(Pcg32::seed_from_u64(1)),
            timer: Arc::new(timer.clone()),
            violation_observer: Some(observer.clone()),
            event_queue_size: 10,
        });
        let game = session.new_game(["a", "b", "c"], ["x", "y", "z"]).unwrap();
        session.start(game).unwrap();
        timer.run_until_idle(1_000);

        let events: Vec<_> = session.events().collect();
        assert_eq!(events.len(), 10);
        assert_eq!(events.last(), Some(&RevealEvent::Resolved { game }));
        assert!(observer.has_violation(ViolationKind::Session));
        assert!(observer.violations().iter().all(|v| v.game == Some(game)));
    }

    #[test]
    fn retired_game_records_abort_only_when_revealing() {
        let timer = ManualTimer::new();
        let mut session = session_with(&timer, 256);
        let first = session.new_game(["a", "b"], ["x", "y"]).unwrap();
        let second = session.reset(first).unwrap();
        assert!(session.events().next().is_none());

        session.start(second).unwrap();
        timer.advance(web_time::Duration::from_millis(60));
        let third = session.reset(second).unwrap();
        let events: Vec<_> = session.events().collect();
        assert_eq!(
            events.last(),
            Some(&RevealEvent::Aborted { game: second })
        );
        assert_eq!(timer.pending(), 0);
        assert_eq!(session.game_state(third), Ok(GameState::Ready));
    }

    #[test]
    fn session_is_send() {
        fn assert_send<T: Send>() {}
        assert_send::<GameSession>();
    }
}
