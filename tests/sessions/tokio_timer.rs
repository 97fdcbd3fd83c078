//! Reveals driven by a tokio runtime instead of the manual clock.

// Allow test-specific patterns that are appropriate for test code
#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]

use std::sync::Arc;

use amidakuji::{FnListener, GameState, Lane, SessionBuilder, TokioTimer};
use tokio::sync::Notify;
use web_time::Duration;

use crate::common::{init_tracing, labels};

#[tokio::test(start_paused = true)]
async fn test_reveal_resolves_on_tokio() {
    init_tracing();
    let mut session = SessionBuilder::new()
        .with_seed(51)
        .start_session(TokioTimer::current())
        .unwrap();
    let game = session.new_game(labels("p", 4), labels("r", 4)).unwrap();

    let done = Arc::new(Notify::new());
    let signal = done.clone();
    session
        .subscribe(
            game,
            Arc::new(FnListener::new(|_: Lane, _: f64| {}, move || {
                signal.notify_one();
            })),
        )
        .unwrap();

    session.start(game).unwrap();
    tokio::time::timeout(Duration::from_secs(60), done.notified())
        .await
        .expect("reveal finished in virtual time");

    assert_eq!(session.state(), GameState::Resolved);
    assert!(session.assignment(game).unwrap().is_bijection());
}

#[tokio::test(start_paused = true)]
async fn test_reset_cancels_tokio_tasks() {
    init_tracing();
    let mut session = SessionBuilder::new()
        .with_seed(52)
        .start_session(TokioTimer::current())
        .unwrap();
    let game = session.new_game(labels("p", 3), labels("r", 3)).unwrap();

    let done = Arc::new(Notify::new());
    let signal = done.clone();
    session
        .subscribe(
            game,
            Arc::new(FnListener::new(|_: Lane, _: f64| {}, move || {
                signal.notify_one();
            })),
        )
        .unwrap();
    session.start(game).unwrap();
    tokio::time::sleep(Duration::from_millis(120)).await;

    let next = session.reset(game).unwrap();
    let finished = tokio::time::timeout(Duration::from_secs(60), done.notified()).await;
    assert!(finished.is_err(), "aborted reveal must not complete");
    assert_eq!(session.game_state(next), Ok(GameState::Ready));
}
