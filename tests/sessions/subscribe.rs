//! Listener callbacks and the session event queue.

// Allow test-specific patterns that are appropriate for test code
#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use amidakuji::{FnListener, GridConfig, Lane, RevealConfig, RevealEvent};
use web_time::Duration;

use crate::common::stubs::{Call, RecordingListener};
use crate::common::{labels, run_to_completion, seeded_session, session_with};

#[test]
fn test_lanes_revealed_in_order() {
    let (mut session, timer) = seeded_session(41);
    let game = session.new_game(labels("p", 6), labels("r", 6)).unwrap();
    let listener = RecordingListener::new(&timer);
    session.subscribe(game, listener.clone()).unwrap();
    run_to_completion(&mut session, &timer, game);

    assert_eq!(listener.lane_order(), vec![0, 1, 2, 3, 4, 5]);
    assert_eq!(listener.done_count(), 1);
    assert!(matches!(listener.calls().last(), Some(Call::Done { .. })));
}

#[test]
fn test_fractions_rise_to_one() {
    let (mut session, timer) = seeded_session(42);
    let game = session.new_game(labels("p", 4), labels("r", 4)).unwrap();
    let listener = RecordingListener::new(&timer);
    session.subscribe(game, listener.clone()).unwrap();
    run_to_completion(&mut session, &timer, game);

    for lane in 0..4 {
        let fractions = listener.fractions(lane);
        assert!(!fractions.is_empty(), "lane {lane} never reported");
        assert!(fractions.windows(2).all(|pair| pair[0] <= pair[1]));
        assert!(fractions.iter().all(|f| *f > 0.0 && *f <= 1.0));
        assert_eq!(fractions.last(), Some(&1.0));
    }
}

#[test]
fn test_tick_count_matches_path_length() {
    let (mut session, timer) = seeded_session(43);
    let game = session.new_game(labels("p", 3), labels("r", 3)).unwrap();
    let listener = RecordingListener::new(&timer);
    session.subscribe(game, listener.clone()).unwrap();
    let grid = session.grid(game).unwrap();
    run_to_completion(&mut session, &timer, game);

    for lane in 0..3 {
        let path = amidakuji::trace(&grid, Lane::new(lane)).unwrap();
        assert_eq!(listener.fractions(lane).len(), path.len());
    }
}

#[test]
fn test_callbacks_follow_reveal_cadence() {
    let reveal = RevealConfig {
        step_delay: Duration::from_millis(10),
        lane_delay: Duration::from_millis(30),
    };
    let (mut session, timer) = session_with(44, GridConfig::compact(), reveal);
    let game = session.new_game(["a", "b"], ["x", "y"]).unwrap();
    let listener = RecordingListener::new(&timer);
    session.subscribe(game, listener.clone()).unwrap();
    let ticks: Vec<usize> = {
        let grid = session.grid(game).unwrap();
        (0..2)
            .map(|lane| amidakuji::trace(&grid, Lane::new(lane)).unwrap().len())
            .collect()
    };
    run_to_completion(&mut session, &timer, game);

    let times: Vec<Duration> = listener
        .calls()
        .iter()
        .filter_map(|call| match call {
            Call::Progress { at, .. } => Some(*at),
            Call::Done { .. } => None,
        })
        .collect();
    assert_eq!(times.len(), ticks[0] + ticks[1]);
    assert_eq!(times[0], Duration::from_millis(10));
    // the pause between lanes is lane_delay plus one step
    let gap = times[ticks[0]] - times[ticks[0] - 1];
    assert_eq!(gap, Duration::from_millis(40));

    let done_at = listener
        .calls()
        .iter()
        .find_map(|call| match call {
            Call::Done { at } => Some(*at),
            Call::Progress { .. } => None,
        })
        .unwrap();
    assert_eq!(done_at, *times.last().unwrap());
    assert_eq!(done_at, reveal.total_duration(&ticks));
}

#[test]
fn test_event_stream_mirrors_callbacks() {
    let (mut session, timer) = seeded_session(45);
    let game = session.new_game(labels("p", 3), labels("r", 3)).unwrap();
    let listener = RecordingListener::new(&timer);
    session.subscribe(game, listener.clone()).unwrap();
    run_to_completion(&mut session, &timer, game);

    let events: Vec<RevealEvent> = session.events().collect();
    assert_eq!(events.first(), Some(&RevealEvent::Started { game }));
    assert_eq!(events.last(), Some(&RevealEvent::Resolved { game }));

    let progress: Vec<(usize, f64)> = events
        .iter()
        .filter_map(|event| match event {
            RevealEvent::Progress { lane, fraction, .. } => Some((lane.as_usize(), *fraction)),
            _ => None,
        })
        .collect();
    let callbacks: Vec<(usize, f64)> = listener
        .calls()
        .iter()
        .filter_map(|call| match call {
            Call::Progress { lane, fraction, .. } => Some((*lane, *fraction)),
            Call::Done { .. } => None,
        })
        .collect();
    assert_eq!(progress, callbacks);

    let revealed: Vec<Lane> = events
        .iter()
        .filter_map(|event| match event {
            RevealEvent::LaneRevealed { lane, .. } => Some(*lane),
            _ => None,
        })
        .collect();
    assert_eq!(revealed, vec![Lane::new(0), Lane::new(1), Lane::new(2)]);

    // drained
    assert_eq!(session.events().len(), 0);
}

#[test]
fn test_multiple_subscribers_each_get_everything() {
    let (mut session, timer) = seeded_session(46);
    let game = session.new_game(labels("p", 3), labels("r", 3)).unwrap();
    let first = RecordingListener::new(&timer);
    let second = RecordingListener::new(&timer);
    let done = Arc::new(AtomicUsize::new(0));
    let counter = done.clone();
    session.subscribe(game, first.clone()).unwrap();
    session.subscribe(game, second.clone()).unwrap();
    session
        .subscribe(
            game,
            Arc::new(FnListener::new(
                |_: Lane, _: f64| {},
                move || {
                    counter.fetch_add(1, Ordering::SeqCst);
                },
            )),
        )
        .unwrap();
    run_to_completion(&mut session, &timer, game);

    assert_eq!(first.calls(), second.calls());
    assert_eq!(done.load(Ordering::SeqCst), 1);
}

#[test]
fn test_subscribe_mid_reveal_sees_remaining_ticks() {
    let (mut session, timer) = seeded_session(47);
    let game = session.new_game(labels("p", 3), labels("r", 3)).unwrap();
    session.start(game).unwrap();
    timer.advance(Duration::from_millis(100));

    let late = RecordingListener::new(&timer);
    session.subscribe(game, late.clone()).unwrap();
    timer.run_until_idle(crate::common::MAX_CALLBACKS);

    let calls = late.calls();
    assert!(!calls.is_empty());
    assert!(calls
        .iter()
        .all(|call| match call {
            Call::Progress { at, .. } | Call::Done { at } => *at > Duration::from_millis(100),
        }));
    assert_eq!(late.done_count(), 1);
}

#[test]
fn test_instant_reveal_still_asynchronous() {
    let (mut session, timer) = session_with(48, GridConfig::default(), RevealConfig::instant());
    let game = session.new_game(["a", "b"], ["x", "y"]).unwrap();
    let listener = RecordingListener::new(&timer);
    session.subscribe(game, listener.clone()).unwrap();

    session.start(game).unwrap();
    assert!(listener.calls().is_empty());
    assert_eq!(session.state(), amidakuji::GameState::Revealing);

    timer.run_until_idle(crate::common::MAX_CALLBACKS);
    assert_eq!(listener.done_count(), 1);
    assert_eq!(session.state(), amidakuji::GameState::Resolved);
}
