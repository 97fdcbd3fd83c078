use std::sync::Arc;

use crate::error::{InvalidInputKind, LadderResult};
use crate::reveal::timer::TimerSource;
use crate::rng::{Pcg32, RandomSource, SeedableRng};
use crate::sessions::game_session::{GameSession, SessionParts};
use crate::telemetry::ViolationObserver;

pub use crate::sessions::config::{GridConfig, RevealConfig};

/// Default event queue size.
///
/// A default ten-lane reveal records a little over 200 events, so this holds
/// a whole game between two polls.
const DEFAULT_EVENT_QUEUE_SIZE: usize = 512;
const MIN_EVENT_QUEUE_SIZE: usize = 10;
const MAX_EVENT_QUEUE_SIZE: usize = 1 << 20;

/// The [`SessionBuilder`] builds [`GameSession`]s.
///
/// After setting all appropriate values, call [`start_session`](Self::start_session)
/// with the timer that should drive the reveal.
///
/// # Example
///
/// ```
/// use amidakuji::{GridConfig, ManualTimer, RevealConfig, SessionBuilder};
///
/// let session = SessionBuilder::new()
///     .with_grid_config(GridConfig::compact())
///     .with_reveal_config(RevealConfig::instant())
///     .with_seed(2024)
///     .start_session(ManualTimer::new())?;
/// assert_eq!(session.grid_config().row_count, 6);
/// # Ok::<(), amidakuji::LadderError>(())
/// ```
#[must_use = "SessionBuilder must be consumed by calling start_session"]
pub struct SessionBuilder {
    grid_config: GridConfig,
    reveal_config: RevealConfig,
    /// `None` seeds a [`Pcg32`] from entropy when the session starts.
    random: Option<Box<dyn RandomSource + Send>>,
    /// Optional observer for invariant violations.
    violation_observer: Option<Arc<dyn ViolationObserver>>,
    /// Maximum number of events to queue before the oldest are dropped.
    event_queue_size: usize,
}

impl std::fmt::Debug for SessionBuilder {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        // Destructure so a new field cannot be forgotten here.
        let Self {
            grid_config,
            reveal_config,
            random,
            violation_observer,
            event_queue_size,
        } = self;

        f.debug_struct("SessionBuilder")
            .field("grid_config", grid_config)
            .field("reveal_config", reveal_config)
            .field("has_random_source", &random.is_some())
            .field("has_violation_observer", &violation_observer.is_some())
            .field("event_queue_size", event_queue_size)
            .finish()
    }
}

impl Default for SessionBuilder {
    fn default() -> Self {
        Self::new()
    }
}

impl SessionBuilder {
    /// Construct a new builder with all values set to their defaults.
    pub fn new() -> Self {
        Self {
            grid_config: GridConfig::default(),
            reveal_config: RevealConfig::default(),
            random: None,
            violation_observer: None,
            event_queue_size: DEFAULT_EVENT_QUEUE_SIZE,
        }
    }

    /// Sets the row count and rung probabilities of generated grids.
    ///
    /// Validated by [`start_session`](Self::start_session).
    pub fn with_grid_config(mut self, grid_config: GridConfig) -> Self {
        self.grid_config = grid_config;
        self
    }

    /// Sets only the row count, keeping the configured probabilities.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInput`] if `rows` is outside `[1, 1000]`.
    ///
    /// [`InvalidInput`]: crate::LadderError::InvalidInput
    pub fn with_row_count(mut self, rows: usize) -> LadderResult<Self> {
        let grid_config = GridConfig {
            row_count: rows,
            ..self.grid_config
        };
        grid_config.validate()?;
        self.grid_config = grid_config;
        Ok(self)
    }

    /// Sets the pacing of the reveal.
    ///
    /// Validated by [`start_session`](Self::start_session).
    pub fn with_reveal_config(mut self, reveal_config: RevealConfig) -> Self {
        self.reveal_config = reveal_config;
        self
    }

    /// Seeds the session's [`Pcg32`] so every generated ladder is reproducible.
    ///
    /// Replaces any source set with [`with_random_source`](Self::with_random_source).
    pub fn with_seed(mut self, seed: u64) -> Self {
        self.random = Some(Box::new(Pcg32::seed_from_u64(seed)));
        self
    }

    /// Uses a custom random source for rung generation.
    ///
    /// Replaces any seed set with [`with_seed`](Self::with_seed).
    pub fn with_random_source(mut self, random: impl RandomSource + Send + 'static) -> Self {
        self.random = Some(Box::new(random));
        self
    }

    /// Sets the maximum number of events queued between two calls to
    /// [`GameSession::events`]. When full, the oldest event is dropped and a
    /// violation is reported.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInput`] if `size` is outside `[10, 1048576]`.
    ///
    /// [`InvalidInput`]: crate::LadderError::InvalidInput
    pub fn with_event_queue_size(mut self, size: usize) -> LadderResult<Self> {
        if !(MIN_EVENT_QUEUE_SIZE..=MAX_EVENT_QUEUE_SIZE).contains(&size) {
            return Err(InvalidInputKind::ConfigValueOutOfRange {
                field: "event_queue_size",
                min: MIN_EVENT_QUEUE_SIZE as u64,
                max: MAX_EVENT_QUEUE_SIZE as u64,
                actual: size as u64,
            }
            .into());
        }
        self.event_queue_size = size;
        Ok(self)
    }

    /// Sets a custom observer for invariant violations.
    ///
    /// If no observer is set, violations are logged via the `tracing` crate.
    ///
    /// # Example
    ///
    /// ```
    /// use amidakuji::{telemetry::CollectingObserver, SessionBuilder};
    /// use std::sync::Arc;
    ///
    /// let observer = Arc::new(CollectingObserver::new());
    /// let builder = SessionBuilder::new().with_violation_observer(observer.clone());
    /// # let _ = builder;
    /// ```
    pub fn with_violation_observer(mut self, observer: Arc<dyn ViolationObserver>) -> Self {
        self.violation_observer = Some(observer);
        self
    }

    /// Consumes the builder to construct a [`GameSession`] driven by `timer`.
    ///
    /// Pass a clone of a [`ManualTimer`](crate::ManualTimer) to keep control
    /// of the clock.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInput`] if the grid or reveal configuration is invalid.
    ///
    /// [`InvalidInput`]: crate::LadderError::InvalidInput
    pub fn start_session(self, timer: impl TimerSource + 'static) -> LadderResult<GameSession> {
        self.grid_config.validate()?;
        self.reveal_config.validate()?;

        let random: Box<dyn RandomSource + Send> = match self.random {
            Some(random) => random,
            None => Box::new(Pcg32::from_entropy()),
        };

        Ok(GameSession::from_parts(SessionParts {
            grid_config: self.grid_config,
            reveal_config: self.reveal_config,
            random,
            timer: Arc::new(timer),
            violation_observer: self.violation_observer,
            event_queue_size: self.event_queue_size,
        }))
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
    use crate::LadderError;

    #[test]
    fn test_builder_debug_lists_every_field() {
        let text = format!("{:?}", SessionBuilder::new().with_seed(1));
        assert!(text.contains("grid_config"));
        assert!(text.contains("has_random_source: true"));
        assert!(text.contains("has_violation_observer: false"));
        assert!(text.contains("event_queue_size: 512"));
    }

    #[test]
    fn test_event_queue_size_bounds() {
        assert!(SessionBuilder::new().with_event_queue_size(10).is_ok());
        assert!(matches!(
            SessionBuilder::new().with_event_queue_size(9),
            Err(LadderError::InvalidInput {
                kind: InvalidInputKind::ConfigValueOutOfRange {
                    field: "event_queue_size",
                    actual: 9,
                    ..
                }
            })
        ));
    }

    #[test]
    fn test_with_row_count_validates() {
        let builder = SessionBuilder::new().with_row_count(4).unwrap();
        assert_eq!(builder.grid_config.row_count, 4);
        assert_eq!(builder.grid_config.rung_probability, 0.3);
        assert!(SessionBuilder::new().with_row_count(0).is_err());
    }

    #[test]
    fn test_start_session_validates_configs() {
        let bad = SessionBuilder::new().with_grid_config(GridConfig {
            rung_probability: 2.0,
            ..GridConfig::default()
        });
        assert!(matches!(
            bad.start_session(ManualTimer::new()),
            Err(LadderError::InvalidInput {
                kind: InvalidInputKind::ProbabilityOutOfRange { .. }
            })
        ));
    }

    #[test]
    fn test_same_seed_same_grids() {
        let mut a = SessionBuilder::new()
            .with_seed(99)
            .start_session(ManualTimer::new())
            .unwrap();
        let mut b = SessionBuilder::new()
            .with_seed(99)
            .start_session(ManualTimer::new())
            .unwrap();
        let game_a = a.new_game(["p", "q", "r"], ["x", "y", "z"]).unwrap();
        let game_b = b.new_game(["p", "q", "r"], ["x", "y", "z"]).unwrap();
        assert_eq!(a.grid(game_a).unwrap(), b.grid(game_b).unwrap());
    }
}
