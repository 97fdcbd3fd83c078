//! Fuzz target for session operations.
//!
//! # Safety Properties Tested
//! - No panics on any sequence of session calls
//! - Stale game ids are always rejected
//! - A finished reveal always leaves a permutation behind

#![no_main]

use arbitrary::Arbitrary;
use libfuzzer_sys::fuzz_target;

use amidakuji::{GameId, GameState, ManualTimer, SessionBuilder};
use web_time::Duration;

#[derive(Debug, Arbitrary)]
enum Op {
    NewGame { lanes: u8 },
    Start,
    Reset,
    Advance { millis: u16 },
    FireNext,
    StaleStart { id: u64 },
    Drain,
}

#[derive(Debug, Arbitrary)]
struct FuzzSession {
    seed: u64,
    ops: Vec<Op>,
}

fuzz_target!(|input: FuzzSession| {
    let timer = ManualTimer::new();
    let Ok(mut session) = SessionBuilder::new()
        .with_seed(input.seed)
        .start_session(timer.clone())
    else {
        return;
    };
    let mut current: Option<GameId> = None;

    for op in input.ops.into_iter().take(64) {
        match op {
            Op::NewGame { lanes } => {
                let lanes = usize::from(lanes % 12);
                let labels: Vec<String> = (0..lanes).map(|i| i.to_string()).collect();
                match session.new_game(labels.clone(), labels) {
                    Ok(game) => current = Some(game),
                    Err(_) => assert!(lanes < amidakuji::MIN_LANES),
                }
            }
            Op::Start => {
                if let Some(game) = current {
                    let ready = session.state() == GameState::Ready;
                    assert_eq!(session.start(game).is_ok(), ready);
                }
            }
            Op::Reset => {
                if let Some(game) = current {
                    let next = session.reset(game).expect("current game resets");
                    assert!(session.start(game).is_err());
                    current = Some(next);
                }
            }
            Op::Advance { millis } => {
                timer.advance(Duration::from_millis(u64::from(millis)));
            }
            Op::FireNext => {
                timer.fire_next();
            }
            Op::StaleStart { id } => {
                let id = GameId::new(id);
                if Some(id) != current {
                    assert!(session.start(id).is_err());
                }
            }
            Op::Drain => {
                let _ = session.events().count();
            }
        }

        if let Some(game) = current {
            if session.state() == GameState::Resolved {
                let assignment = session.assignment(game).expect("resolved game");
                assert!(assignment.is_bijection());
            }
        }
    }
});
