//! Interrupting a reveal with `reset` or `new_game`.

// Allow test-specific patterns that are appropriate for test code
#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]

use amidakuji::{GameState, LadderError, RevealEvent};
use web_time::Duration;

use crate::common::stubs::RecordingListener;
use crate::common::{labels, seeded_session, MAX_CALLBACKS};

#[test]
fn test_reset_mid_reveal_silences_old_listener() {
    let (mut session, timer) = seeded_session(31);
    let game = session.new_game(labels("p", 4), labels("r", 4)).unwrap();
    let listener = RecordingListener::new(&timer);
    session.subscribe(game, listener.clone()).unwrap();
    session.start(game).unwrap();

    timer.advance(Duration::from_millis(175));
    let seen = listener.calls().len();
    assert!(seen > 0);

    let next = session.reset(game).unwrap();
    assert_eq!(session.state(), GameState::Ready);
    // the aborted reveal leaves nothing behind on the timer
    assert_eq!(timer.pending(), 0);

    timer.run_until_idle(MAX_CALLBACKS);
    assert_eq!(listener.calls().len(), seen);
    assert_eq!(listener.done_count(), 0);

    assert_eq!(
        session.assignment(game),
        Err(LadderError::UnknownGame {
            requested: game,
            current: Some(next),
        })
    );
    assert_eq!(session.game_state(next), Ok(GameState::Ready));
    assert_eq!(session.progress(next).unwrap(), vec![0.0; 4]);
}

#[test]
fn test_reset_mid_reveal_records_abort_event() {
    let (mut session, timer) = seeded_session(32);
    let game = session.new_game(["a", "b"], ["x", "y"]).unwrap();
    session.start(game).unwrap();
    timer.advance(Duration::from_millis(60));

    let next = session.reset(game).unwrap();
    let events: Vec<RevealEvent> = session.events().collect();
    assert_eq!(events.first(), Some(&RevealEvent::Started { game }));
    assert_eq!(events.last(), Some(&RevealEvent::Aborted { game }));
    assert!(events.iter().all(|event| event.game() == game));
    assert!(!events.contains(&RevealEvent::Resolved { game }));

    // the new game reveals normally afterwards
    session.start(next).unwrap();
    timer.run_until_idle(MAX_CALLBACKS);
    let events: Vec<RevealEvent> = session.events().collect();
    assert_eq!(events.first(), Some(&RevealEvent::Started { game: next }));
    assert_eq!(events.last(), Some(&RevealEvent::Resolved { game: next }));
}

#[test]
fn test_new_game_mid_reveal_aborts() {
    let (mut session, timer) = seeded_session(33);
    let game = session.new_game(labels("p", 3), labels("r", 3)).unwrap();
    let listener = RecordingListener::new(&timer);
    session.subscribe(game, listener.clone()).unwrap();
    session.start(game).unwrap();
    timer.advance(Duration::from_millis(100));
    let seen = listener.calls().len();

    let next = session.new_game(labels("q", 5), labels("s", 5)).unwrap();
    assert_eq!(session.state(), GameState::Ready);
    assert_eq!(session.grid(next).unwrap().lane_count(), 5);

    timer.run_until_idle(MAX_CALLBACKS);
    assert_eq!(listener.calls().len(), seen);
    assert!(session
        .events()
        .any(|event| event == RevealEvent::Aborted { game }));
}

#[test]
fn test_reset_before_start_records_no_abort() {
    let (mut session, _timer) = seeded_session(34);
    let game = session.new_game(["a", "b"], ["x", "y"]).unwrap();
    let _next = session.reset(game).unwrap();
    assert_eq!(session.events().len(), 0);
}

#[test]
fn test_reset_after_resolution_records_no_abort() {
    let (mut session, timer) = seeded_session(35);
    let game = session.new_game(["a", "b"], ["x", "y"]).unwrap();
    session.start(game).unwrap();
    timer.run_until_idle(MAX_CALLBACKS);
    let _ = session.events().count();

    let _next = session.reset(game).unwrap();
    assert_eq!(session.events().len(), 0);
}

#[test]
fn test_dropping_session_stops_reveal() {
    let (mut session, timer) = seeded_session(36);
    let game = session.new_game(labels("p", 3), labels("r", 3)).unwrap();
    let listener = RecordingListener::new(&timer);
    session.subscribe(game, listener.clone()).unwrap();
    session.start(game).unwrap();
    timer.advance(Duration::from_millis(50));
    let seen = listener.calls().len();

    drop(session);
    timer.run_until_idle(MAX_CALLBACKS);
    assert_eq!(listener.calls().len(), seen);
}

#[test]
fn test_subscribers_do_not_carry_over() {
    let (mut session, timer) = seeded_session(37);
    let game = session.new_game(["a", "b"], ["x", "y"]).unwrap();
    let listener = RecordingListener::new(&timer);
    session.subscribe(game, listener.clone()).unwrap();

    let next = session.reset(game).unwrap();
    session.start(next).unwrap();
    timer.run_until_idle(MAX_CALLBACKS);
    assert!(listener.calls().is_empty());
}
