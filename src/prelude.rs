//! Convenient re-exports for common usage.
//!
//! ```rust
//! use amidakuji::prelude::*;
//!
//! # fn main() -> LadderResult<()> {
//! let timer = ManualTimer::new();
//! let mut session = SessionBuilder::new().with_seed(1).start_session(timer.clone())?;
//! let game = session.new_game(["a", "b"], ["x", "y"])?;
//! assert_eq!(session.state(), GameState::Ready);
//! # let _ = game;
//! # Ok(())
//! # }
//! ```
//!
//! # What's Included
//!
//! - **Session**: [`GameSession`], [`SessionBuilder`], [`GameId`], [`GameState`], [`Outcome`]
//! - **Events**: [`RevealEvent`], [`RevealListener`], [`FnListener`]
//! - **Timers**: [`TimerSource`], [`ManualTimer`]
//! - **Ladder**: [`RungGrid`], [`Lane`], [`Path`], [`Assignment`]
//! - **Randomness**: [`RandomSource`], [`Pcg32`], [`SeedableRng`]
//! - **Configuration**: [`GridConfig`], [`RevealConfig`]
//! - **Error handling**: [`LadderError`], [`LadderResult`]

pub use crate::sessions::builder::SessionBuilder;
pub use crate::sessions::game_session::{GameSession, Outcome};

pub use crate::{GameId, GameState, Lane, RevealEvent};

pub use crate::reveal::timer::{ManualTimer, TimerSource};
pub use crate::reveal::{FnListener, RevealListener};

pub use crate::grid::RungGrid;
pub use crate::tracer::{Assignment, Path};

pub use crate::rng::{Pcg32, RandomSource, SeedableRng};

pub use crate::sessions::config::{GridConfig, RevealConfig};

pub use crate::{LadderError, LadderResult};
