//! # Headless Reveal
//!
//! Draws a ladder for a handful of players, reveals it on a virtual clock
//! and prints the grid, every revealed lane and the final pairing.
//!
//! Run with: `cargo run --example headless_reveal -- [seed]`

// Allow example-specific patterns
#![allow(
    clippy::print_stdout,
    clippy::print_stderr,
    clippy::disallowed_macros,
    clippy::unwrap_used,
    clippy::expect_used
)]

use amidakuji::{GridConfig, LadderError, ManualTimer, RevealConfig, RevealEvent, SessionBuilder};

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // configure logging: output session logs to standard out
    tracing::subscriber::set_global_default(
        tracing_subscriber::FmtSubscriber::builder()
            .with_max_level(tracing::Level::DEBUG)
            .finish(),
    )
    .expect("setting up tracing subscriber failed");

    let seed = std::env::args()
        .nth(1)
        .map(|arg| arg.parse::<u64>())
        .transpose()?
        .unwrap_or(2024);

    let timer = ManualTimer::new();
    let mut session = SessionBuilder::new()
        .with_seed(seed)
        .with_grid_config(GridConfig::compact())
        .with_reveal_config(RevealConfig::default())
        .start_session(timer.clone())?;

    let game = session.new_game(
        ["Aiko", "Botan", "Chiyo", "Daichi", "Emi"],
        ["tea", "dishes", "laundry", "free", "shopping"],
    )?;
    println!("{}\n", session.grid(game)?);

    session.start(game)?;
    while timer.fire_next() {
        for event in session.events() {
            if let RevealEvent::LaneRevealed { lane, .. } = event {
                println!("[{:>5}ms] lane {lane} revealed", timer.now().as_millis());
            }
        }
    }

    print_outcomes(&session, game)?;
    Ok(())
}

fn print_outcomes(
    session: &amidakuji::GameSession,
    game: amidakuji::GameId,
) -> Result<(), LadderError> {
    println!();
    for outcome in session.outcomes(game)? {
        println!("{:<8} -> {}", outcome.player, outcome.result);
    }
    Ok(())
}
