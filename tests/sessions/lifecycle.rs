//! State transitions and queries of a single game.

// Allow test-specific patterns that are appropriate for test code
#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]

use std::collections::BTreeSet;

use amidakuji::{
    GameId, GameState, GridConfig, InvalidInputKind, Lane, LadderError, RevealConfig,
    SessionBuilder,
};

use crate::common::stubs::ScriptedRandom;
use crate::common::{labels, run_to_completion, seeded_session, session_with};

#[test]
fn test_full_lifecycle() {
    let (mut session, timer) = seeded_session(11);
    assert_eq!(session.state(), GameState::Idle);

    let game = session
        .new_game(labels("player", 5), labels("prize", 5))
        .unwrap();
    assert_eq!(session.state(), GameState::Ready);
    assert_eq!(session.current_game(), Some(game));

    session.start(game).unwrap();
    assert_eq!(session.state(), GameState::Revealing);

    timer.run_until_idle(crate::common::MAX_CALLBACKS);
    assert_eq!(session.state(), GameState::Resolved);

    let assignment = session.assignment(game).unwrap();
    assert_eq!(assignment.len(), 5);
    assert!(assignment.is_bijection());
    assert_eq!(session.progress(game).unwrap(), vec![1.0; 5]);
    assert_eq!(session.revealed_lanes(game).unwrap().len(), 5);
}

#[test]
fn test_assignment_hidden_until_resolved() {
    let (mut session, timer) = seeded_session(3);
    let game = session.new_game(["a", "b", "c"], ["x", "y", "z"]).unwrap();

    assert_eq!(
        session.assignment(game),
        Err(LadderError::NotResolved {
            game,
            state: GameState::Ready,
        })
    );

    session.start(game).unwrap();
    timer.advance(web_time::Duration::from_millis(120));
    assert!(matches!(
        session.outcomes(game),
        Err(LadderError::NotResolved {
            state: GameState::Revealing,
            ..
        })
    ));
}

#[test]
fn test_outcomes_pair_players_with_results() {
    let (mut session, timer) = seeded_session(21);
    let players = labels("p", 6);
    let results = labels("r", 6);
    let game = session.new_game(players.clone(), results.clone()).unwrap();
    run_to_completion(&mut session, &timer, game);

    let assignment = session.assignment(game).unwrap();
    let outcomes = session.outcomes(game).unwrap();
    assert_eq!(outcomes.len(), 6);

    let mut won = BTreeSet::new();
    for (start, outcome) in outcomes.iter().enumerate() {
        assert_eq!(outcome.start_lane, Lane::new(start));
        assert_eq!(outcome.player, players[start]);
        assert_eq!(Some(outcome.final_lane), assignment.get(Lane::new(start)));
        assert_eq!(outcome.result, results[outcome.final_lane.as_usize()]);
        won.insert(outcome.result.clone());
    }
    // every result is handed out exactly once
    assert_eq!(won.len(), 6);
}

#[test]
fn test_explicit_grid_scenario_through_session() {
    // N=3, R=2: candidates are drawn column by column, then the last row is cleared.
    // Column 0: [true, -], column 1: [true (suppressed by column 0), -].
    let (mut session, timer) = {
        let timer = amidakuji::ManualTimer::new();
        let session = SessionBuilder::new()
            .with_row_count(2)
            .unwrap()
            .with_random_source(ScriptedRandom::constant(true))
            .start_session(timer.clone())
            .unwrap();
        (session, timer)
    };
    let game = session.new_game(["a", "b", "c"], ["x", "y", "z"]).unwrap();
    let grid = session.grid(game).unwrap();
    assert_eq!(grid.column(0).unwrap(), &[true, false]);
    assert_eq!(grid.column(1).unwrap(), &[false, false]);

    run_to_completion(&mut session, &timer, game);
    let ends: Vec<usize> = session
        .assignment(game)
        .unwrap()
        .as_slice()
        .iter()
        .map(|lane| lane.as_usize())
        .collect();
    assert_eq!(ends, vec![1, 0, 2]);
}

#[test]
fn test_label_validation() {
    let (mut session, _timer) = seeded_session(1);
    assert_eq!(
        session.new_game(["a", "b"], ["x"]),
        Err(LadderError::InvalidInput {
            kind: InvalidInputKind::LaneCountMismatch {
                players: 2,
                results: 1,
            }
        })
    );
    assert_eq!(
        session.new_game(Vec::<String>::new(), Vec::<String>::new()),
        Err(LadderError::InvalidInput {
            kind: InvalidInputKind::TooFewLanes { lanes: 0, min: 2 }
        })
    );
    assert_eq!(session.state(), GameState::Idle);
}

#[test]
fn test_unknown_game_ids() {
    let (mut session, _timer) = seeded_session(1);
    let stranger = GameId::new(999);
    assert_eq!(
        session.start(stranger),
        Err(LadderError::UnknownGame {
            requested: stranger,
            current: None,
        })
    );

    let first = session.new_game(["a", "b"], ["x", "y"]).unwrap();
    let second = session.new_game(["a", "b"], ["x", "y"]).unwrap();
    assert_ne!(first, second);
    assert_eq!(
        session.grid(first),
        Err(LadderError::UnknownGame {
            requested: first,
            current: Some(second),
        })
    );
    assert!(session.reset(first).is_err());
}

#[test]
fn test_start_requires_ready() {
    let (mut session, timer) = seeded_session(5);
    let game = session.new_game(["a", "b"], ["x", "y"]).unwrap();
    run_to_completion(&mut session, &timer, game);
    assert_eq!(
        session.start(game),
        Err(LadderError::InvalidState {
            operation: "start the reveal",
            state: GameState::Resolved,
        })
    );
}

#[test]
fn test_reset_from_resolved_keeps_labels() {
    let (mut session, timer) = seeded_session(8);
    let game = session.new_game(["a", "b", "c"], ["x", "y", "z"]).unwrap();
    run_to_completion(&mut session, &timer, game);

    let next = session.reset(game).unwrap();
    assert_ne!(next, game);
    assert_eq!(session.state(), GameState::Ready);
    assert_eq!(session.players(next).unwrap(), ["a", "b", "c"]);
    assert_eq!(session.results(next).unwrap(), ["x", "y", "z"]);
    assert_eq!(session.progress(next).unwrap(), vec![0.0; 3]);

    run_to_completion(&mut session, &timer, next);
}

#[test]
fn test_grid_shape_follows_config() {
    let (mut session, _timer) = session_with(4, GridConfig::compact(), RevealConfig::instant());
    let game = session.new_game(labels("p", 7), labels("r", 7)).unwrap();
    let grid = session.grid(game).unwrap();
    assert_eq!(grid.lane_count(), 7);
    assert_eq!(grid.row_count(), 6);
    assert!(grid.is_well_formed());
}

#[test]
fn test_old_grid_reference_is_frozen() {
    let (mut session, _timer) = seeded_session(17);
    let game = session.new_game(labels("p", 4), labels("r", 4)).unwrap();
    let grid = session.grid(game).unwrap();
    let snapshot = (*grid).clone();

    let next = session.reset(game).unwrap();
    assert_eq!(*grid, snapshot);
    assert!(session.grid(next).is_ok());
}

#[test]
fn test_visible_path_only_after_lane_starts() {
    let (mut session, timer) = seeded_session(2);
    let game = session.new_game(["a", "b", "c"], ["x", "y", "z"]).unwrap();
    assert_eq!(session.visible_path(game, Lane::new(0)), Ok(None));
    assert_eq!(
        session.visible_path(game, Lane::new(3)),
        Err(LadderError::LaneOutOfRange {
            lane: Lane::new(3),
            lane_count: 3,
        })
    );

    session.start(game).unwrap();
    assert!(timer.fire_next());
    let path = session.visible_path(game, Lane::new(0)).unwrap().unwrap();
    assert_eq!(path.start(), Lane::new(0));
    assert_eq!(session.visible_path(game, Lane::new(1)), Ok(None));

    timer.run_until_idle(crate::common::MAX_CALLBACKS);
    let assignment = session.assignment(game).unwrap();
    for lane in 0..3 {
        let path = session.visible_path(game, Lane::new(lane)).unwrap().unwrap();
        assert_eq!(Some(path.end()), assignment.get(Lane::new(lane)));
    }
}

#[test]
fn test_sessions_are_independent() {
    let (mut a, timer_a) = seeded_session(1);
    let (mut b, _timer_b) = seeded_session(1);
    let game_a = a.new_game(["a", "b"], ["x", "y"]).unwrap();
    let game_b = b.new_game(["a", "b"], ["x", "y"]).unwrap();

    run_to_completion(&mut a, &timer_a, game_a);
    assert_eq!(b.game_state(game_b), Ok(GameState::Ready));
}
