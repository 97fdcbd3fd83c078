//! Timer abstraction driving the reveal, and a virtual-clock implementation.
//!
//! The reveal never sleeps; it asks a [`TimerSource`] to run a callback after
//! a delay and keeps the returned [`TimerHandle`] so it can cancel it.
//! [`ManualTimer`] implements the trait over a virtual clock that only moves
//! when told to, which makes reveals fully deterministic in tests and in
//! headless hosts that step the game from their own loop.

use std::collections::BTreeMap;
use std::sync::{Arc, Weak};

use parking_lot::Mutex;
use web_time::Duration;

/// A one-shot callback run by a [`TimerSource`].
pub type TimerCallback = Box<dyn FnOnce() + Send + 'static>;

/// Cancels a scheduled callback.
pub trait TimerHandle: Send + Sync {
    /// Prevents the callback from running if it has not run yet.
    ///
    /// Calling this more than once, or after the callback ran, does nothing.
    fn cancel(&self);
}

/// Runs callbacks after a delay.
///
/// Implementations must not invoke the callback from inside
/// [`schedule`](Self::schedule), and must run callbacks scheduled with the same
/// deadline in scheduling order.
pub trait TimerSource: Send + Sync {
    /// Schedules `callback` to run once `delay` has elapsed.
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> Box<dyn TimerHandle>;
}

impl<T: TimerSource + ?Sized> TimerSource for Arc<T> {
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> Box<dyn TimerHandle> {
        (**self).schedule(delay, callback)
    }
}

/// Deadline plus a sequence number to keep equal deadlines in FIFO order.
type TimerKey = (Duration, u64);

#[derive(Default)]
struct VirtualClock {
    now: Duration,
    next_seq: u64,
    queue: BTreeMap<TimerKey, TimerCallback>,
}

/// A [`TimerSource`] over a virtual clock.
///
/// Time starts at zero and advances only through [`advance`](Self::advance),
/// [`fire_next`](Self::fire_next) and [`run_until_idle`](Self::run_until_idle).
/// Clones share the same clock, so a test can hand one clone to a session and
/// drive it through another.
///
/// Callbacks run on the calling thread, outside the clock's lock, so they may
/// schedule or cancel other callbacks.
///
/// # Examples
///
/// ```
/// use amidakuji::{ManualTimer, TimerSource};
/// use std::sync::atomic::{AtomicUsize, Ordering};
/// use std::sync::Arc;
/// use web_time::Duration;
///
/// let timer = ManualTimer::new();
/// let fired = Arc::new(AtomicUsize::new(0));
/// let counter = fired.clone();
/// let _handle = timer.schedule(
///     Duration::from_millis(50),
///     Box::new(move || {
///         counter.fetch_add(1, Ordering::SeqCst);
///     }),
/// );
///
/// timer.advance(Duration::from_millis(49));
/// assert_eq!(fired.load(Ordering::SeqCst), 0);
/// timer.advance(Duration::from_millis(1));
/// assert_eq!(fired.load(Ordering::SeqCst), 1);
/// ```
#[derive(Clone, Default)]
pub struct ManualTimer {
    clock: Arc<Mutex<VirtualClock>>,
}

impl std::fmt::Debug for ManualTimer {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let clock = self.clock.lock();
        f.debug_struct("ManualTimer")
            .field("now", &clock.now)
            .field("pending", &clock.queue.len())
            .finish()
    }
}

impl ManualTimer {
    /// Creates a timer whose clock reads zero.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Current virtual time.
    #[must_use]
    pub fn now(&self) -> Duration {
        self.clock.lock().now
    }

    /// Number of callbacks waiting to run.
    #[must_use]
    pub fn pending(&self) -> usize {
        self.clock.lock().queue.len()
    }

    /// Deadline of the next callback, if any.
    #[must_use]
    pub fn next_deadline(&self) -> Option<Duration> {
        self.clock
            .lock()
            .queue
            .first_key_value()
            .map(|(&(deadline, _), _)| deadline)
    }

    /// Moves the clock forward by `by`, running every callback that comes due,
    /// including ones scheduled by earlier callbacks. Returns how many ran.
    pub fn advance(&self, by: Duration) -> usize {
        let target = self.now().saturating_add(by);
        let mut fired = 0;
        while let Some(callback) = self.pop_due(Some(target)) {
            callback();
            fired += 1;
        }
        let mut clock = self.clock.lock();
        if clock.now < target {
            clock.now = target;
        }
        fired
    }

    /// Jumps to the next deadline and runs that one callback.
    ///
    /// Returns `false` if nothing was pending.
    pub fn fire_next(&self) -> bool {
        match self.pop_due(None) {
            Some(callback) => {
                callback();
                true
            }
            None => false,
        }
    }

    /// Runs callbacks in deadline order until none are left or `max_callbacks`
    /// have run. Returns how many ran.
    pub fn run_until_idle(&self, max_callbacks: usize) -> usize {
        let mut fired = 0;
        while fired < max_callbacks && self.fire_next() {
            fired += 1;
        }
        fired
    }

    /// Removes the earliest callback if its deadline is at or before `limit`,
    /// moving the clock to that deadline.
    fn pop_due(&self, limit: Option<Duration>) -> Option<TimerCallback> {
        let mut clock = self.clock.lock();
        let (&key, _) = clock.queue.first_key_value()?;
        if limit.is_some_and(|limit| key.0 > limit) {
            return None;
        }
        if clock.now < key.0 {
            clock.now = key.0;
        }
        clock.queue.remove(&key)
    }
}

impl TimerSource for ManualTimer {
    fn schedule(&self, delay: Duration, callback: TimerCallback) -> Box<dyn TimerHandle> {
        let mut clock = self.clock.lock();
        let key = (clock.now.saturating_add(delay), clock.next_seq);
        clock.next_seq += 1;
        clock.queue.insert(key, callback);
        Box::new(ManualTimerHandle {
            clock: Arc::downgrade(&self.clock),
            key,
        })
    }
}

struct ManualTimerHandle {
    clock: Weak<Mutex<VirtualClock>>,
    key: TimerKey,
}

impl TimerHandle for ManualTimerHandle {
    fn cancel(&self) {
        if let Some(clock) = self.clock.upgrade() {
            // the callback is dropped after the lock is released
            let removed = clock.lock().queue.remove(&self.key);
            drop(removed);
        }
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

    fn recorder() -> (Arc<Mutex<Vec<u32>>>, impl Fn(u32) -> TimerCallback) {
        let log = Arc::new(Mutex::new(Vec::new()));
        let sink = log.clone();
        let make = move |id: u32| -> TimerCallback {
            let sink = sink.clone();
            Box::new(move || sink.lock().push(id))
        };
        (log, make)
    }

    #[test]
    fn callbacks_run_in_deadline_then_schedule_order() {
        let timer = ManualTimer::new();
        let (log, make) = recorder();
        let _a = timer.schedule(Duration::from_millis(20), make(1));
        let _b = timer.schedule(Duration::from_millis(10), make(2));
        let _c = timer.schedule(Duration::from_millis(10), make(3));

        assert_eq!(timer.advance(Duration::from_millis(30)), 3);
        assert_eq!(*log.lock(), vec![2, 3, 1]);
        assert_eq!(timer.now(), Duration::from_millis(30));
    }

    #[test]
    fn cancel_prevents_callback() {
        let timer = ManualTimer::new();
        let (log, make) = recorder();
        let handle = timer.schedule(Duration::from_millis(5), make(1));
        handle.cancel();
        handle.cancel();
        assert_eq!(timer.pending(), 0);
        assert_eq!(timer.advance(Duration::from_millis(10)), 0);
        assert!(log.lock().is_empty());
    }

    #[test]
    fn callbacks_can_schedule_more_work() {
        let timer = ManualTimer::new();
        let log = Arc::new(Mutex::new(Vec::new()));
        let inner_timer = timer.clone();
        let inner_log = log.clone();
        let _handle = timer.schedule(
            Duration::from_millis(10),
            Box::new(move || {
                inner_log.lock().push(inner_timer.now());
                let again = inner_log.clone();
                let clock = inner_timer.clone();
                let _next = inner_timer.schedule(
                    Duration::from_millis(10),
                    Box::new(move || again.lock().push(clock.now())),
                );
            }),
        );

        timer.advance(Duration::from_millis(25));
        assert_eq!(
            *log.lock(),
            vec![Duration::from_millis(10), Duration::from_millis(20)]
        );
    }

    #[test]
    fn fire_next_jumps_the_clock() {
        let timer = ManualTimer::new();
        let (log, make) = recorder();
        let _a = timer.schedule(Duration::from_secs(3), make(7));
        assert_eq!(timer.next_deadline(), Some(Duration::from_secs(3)));
        assert!(timer.fire_next());
        assert_eq!(timer.now(), Duration::from_secs(3));
        assert!(!timer.fire_next());
        assert_eq!(*log.lock(), vec![7]);
    }

    #[test]
    fn run_until_idle_respects_limit() {
        let timer = ManualTimer::new();
        let (log, make) = recorder();
        let _handles: Vec<_> = (0..5)
            .map(|id| timer.schedule(Duration::from_millis(u64::from(id)), make(id)))
            .collect();
        assert_eq!(timer.run_until_idle(3), 3);
        assert_eq!(timer.pending(), 2);
        assert_eq!(timer.run_until_idle(100), 2);
        assert_eq!(*log.lock(), vec![0, 1, 2, 3, 4]);
    }

    #[test]
    fn clock_saturates_at_duration_max() {
        let timer = ManualTimer::new();
        let (log, make) = recorder();
        timer.advance(Duration::from_millis(5));
        let _late = timer.schedule(Duration::MAX, make(1));
        assert_eq!(timer.next_deadline(), Some(Duration::MAX));

        assert_eq!(timer.advance(Duration::MAX), 1);
        assert_eq!(timer.now(), Duration::MAX);
        assert_eq!(timer.advance(Duration::from_secs(1)), 0);
        assert_eq!(*log.lock(), vec![1]);
    }

    #[test]
    fn handle_outliving_timer_is_harmless() {
        let handle = {
            let timer = ManualTimer::new();
            timer.schedule(Duration::ZERO, Box::new(|| {}))
        };
        handle.cancel();
    }
}
