//! A [`TimerSource`] backed by the tokio runtime.
//!
//! Each scheduled callback becomes a task that sleeps and then runs the
//! callback; cancelling aborts the task.
//!
//! # Example
//!
//! ```ignore
//! use amidakuji::{SessionBuilder, TokioTimer};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), amidakuji::LadderError> {
//!     let mut session = SessionBuilder::new().start_session(TokioTimer::current())?;
//!     let game = session.new_game(["a", "b"], ["x", "y"])?;
//!     session.start(game)?;
//!     Ok(())
//! }
//! ```

use tokio::runtime::Handle;
use tokio::task::AbortHandle;
use web_time::Duration;

use super::timer::{TimerCallback, TimerHandle, TimerSource};

/// Schedules reveal ticks as tokio tasks.
#[derive(Debug, Clone)]
pub struct TokioTimer {
    runtime: Handle,
}

impl TokioTimer {
    /// Uses the given runtime.
    #[must_use]
    pub fn new(runtime: Handle) -> Self {
        Self { runtime }
    }

    /// Uses the runtime the caller is running on.
    ///
    /// # Panics
    ///
    /// Panics when called outside a tokio runtime. Use
    /// [`try_current`](Self::try_current) to handle that case.
    #[must_use]
    pub fn current() -> Self {
        Self::new(Handle::current())
    }

    /// Uses the runtime the caller is running on, if any.
    #[must_use]
    pub fn try_current() -> Option<Self> {
        Handle::try_current().ok().map(Self::new)
    }
}

impl TimerSource for TokioTimer {
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> Box<dyn TimerHandle> {
        let task = self.runtime.spawn(async move {
            tokio::time::sleep(delay).await;
            callback();
        });
        Box::new(TokioTimerHandle {
            task: task.abort_handle(),
        })
    }
}

struct TokioTimerHandle {
    task: AbortHandle,
}

impl TimerHandle for TokioTimerHandle {
    fn cancel(&self) {
        self.task.abort();
    }
}
