//! Shared helpers for integration tests.

#![allow(clippy::unwrap_used, clippy::expect_used, dead_code)]

use std::sync::Once;

use amidakuji::{
    GameId, GameSession, GameState, GridConfig, ManualTimer, RevealConfig, SessionBuilder,
};

/// Upper bound on timer callbacks for one reveal; far above any real ladder.
pub const MAX_CALLBACKS: usize = 100_000;

static TRACING: Once = Once::new();

/// Installs a test-writer subscriber once per test binary so a failing test
/// shows the session's debug logs.
pub fn init_tracing() {
    TRACING.call_once(|| {
        let _ = tracing_subscriber::fmt()
            .with_max_level(tracing::Level::DEBUG)
            .with_test_writer()
            .try_init();
    });
}

/// `count` labels `prefix0`, `prefix1`, ...
#[must_use]
pub fn labels(prefix: &str, count: usize) -> Vec<String> {
    (0..count).map(|i| format!("{prefix}{i}")).collect()
}

/// A seeded session with default configs on a fresh [`ManualTimer`].
#[must_use]
pub fn seeded_session(seed: u64) -> (GameSession, ManualTimer) {
    session_with(seed, GridConfig::default(), RevealConfig::default())
}

/// A seeded session with the given configs on a fresh [`ManualTimer`].
#[must_use]
pub fn session_with(
    seed: u64,
    grid: GridConfig,
    reveal: RevealConfig,
) -> (GameSession, ManualTimer) {
    init_tracing();
    let timer = ManualTimer::new();
    let session = SessionBuilder::new()
        .with_seed(seed)
        .with_grid_config(grid)
        .with_reveal_config(reveal)
        .start_session(timer.clone())
        .expect("valid session configuration");
    (session, timer)
}

/// Starts `game` and drains the timer until the reveal finishes.
pub fn run_to_completion(session: &mut GameSession, timer: &ManualTimer, game: GameId) {
    session.start(game).expect("game is ready");
    timer.run_until_idle(MAX_CALLBACKS);
    assert_eq!(session.game_state(game), Ok(GameState::Resolved));
}
