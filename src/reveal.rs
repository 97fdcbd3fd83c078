//! The staged, cancellable reveal of every lane's path.
//!
//! [`reveal`] walks the lanes strictly in order. Lane `i` gets one tick per
//! waypoint of its path, `step_delay` apart, and reports
//! `on_progress(i, step / ticks)` on each; the last tick reports `1.0`. The
//! next lane's first tick comes `lane_delay + step_delay` after the previous
//! lane's last one. `on_done` fires once, right after the last lane completes.
//!
//! # Cancellation
//!
//! Every tick runs while holding the reveal's delivery lock. [`RevealHandle::abort`]
//! takes the same lock, sets the cancelled flag and cancels the pending timer,
//! so once `abort` returns no listener method runs again. The lock is
//! re-entrant, which lets a listener abort the reveal from inside a callback.
//! Dropping the handle aborts too.

pub mod timer;
#[cfg(feature = "tokio")]
pub mod tokio_timer;

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};

use parking_lot::{Mutex, ReentrantMutex};
use tracing::{debug, trace};
use web_time::Duration;

use crate::report_violation;
use crate::sessions::config::RevealConfig;
use crate::telemetry::{ViolationKind, ViolationSeverity};
use crate::tracer::Path;
use crate::Lane;
use timer::{TimerHandle, TimerSource};

/// Receives reveal progress.
///
/// Both methods are called from whatever thread the [`TimerSource`] runs
/// callbacks on, never concurrently for the same reveal.
pub trait RevealListener: Send + Sync {
    /// `lane` has been revealed up to `fraction`, in `(0, 1]`.
    fn on_progress(&self, lane: Lane, fraction: f64);

    /// Every lane has been revealed.
    fn on_done(&self);
}

/// A [`RevealListener`] made of two closures.
///
/// # Examples
///
/// ```
/// use amidakuji::{FnListener, Lane, RevealListener};
///
/// let listener = FnListener::new(
///     |lane: Lane, fraction: f64| assert!(fraction > 0.0, "lane {lane}"),
///     || {},
/// );
/// listener.on_progress(Lane::new(0), 0.5);
/// ```
pub struct FnListener<P, D> {
    progress: P,
    done: D,
}

impl<P, D> FnListener<P, D>
where
    P: Fn(Lane, f64) + Send + Sync,
    D: Fn() + Send + Sync,
{
    /// Wraps the two closures.
    pub fn new(progress: P, done: D) -> Self {
        Self { progress, done }
    }
}

impl<P, D> RevealListener for FnListener<P, D>
where
    P: Fn(Lane, f64) + Send + Sync,
    D: Fn() + Send + Sync,
{
    fn on_progress(&self, lane: Lane, fraction: f64) {
        (self.progress)(lane, fraction);
    }

    fn on_done(&self) {
        (self.done)();
    }
}

impl<P, D> std::fmt::Debug for FnListener<P, D> {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("FnListener").finish_non_exhaustive()
    }
}

/// Starts revealing `paths` and returns the handle that controls it.
///
/// Nothing is delivered synchronously: the first tick is scheduled on `timer`
/// `step_delay` from now.
///
/// # Examples
///
/// ```
/// use amidakuji::{reveal, trace_all, FnListener, Lane, ManualTimer, RevealConfig, RungGrid};
/// use std::sync::atomic::{AtomicBool, Ordering};
/// use std::sync::Arc;
///
/// let grid = RungGrid::from_columns(vec![vec![true, false]])?;
/// let paths = trace_all(&grid)?.paths;
/// let done = Arc::new(AtomicBool::new(false));
/// let flag = done.clone();
///
/// let timer = ManualTimer::new();
/// let handle = reveal(
///     &paths,
///     Arc::new(FnListener::new(|_: Lane, _: f64| {}, move || flag.store(true, Ordering::SeqCst))),
///     Arc::new(timer.clone()),
///     RevealConfig::default(),
/// );
///
/// timer.run_until_idle(100);
/// assert!(done.load(Ordering::SeqCst));
/// assert!(handle.is_finished());
/// # Ok::<(), amidakuji::LadderError>(())
/// ```
pub fn reveal(
    paths: &[Path],
    listener: Arc<dyn RevealListener>,
    timer: Arc<dyn TimerSource>,
    config: RevealConfig,
) -> RevealHandle {
    let shared = Arc::new(RevealShared {
        cancelled: AtomicBool::new(false),
        delivery: ReentrantMutex::new(()),
        cursor: Mutex::new(Cursor::default()),
        ticks: paths.iter().map(|path| path.len().max(1)).collect(),
        listener,
        timer,
        config,
    });

    debug!(
        lanes = shared.ticks.len(),
        step_ms = config.step_delay.as_millis() as u64,
        lane_ms = config.lane_delay.as_millis() as u64,
        "reveal scheduled"
    );

    {
        let _delivery = shared.delivery.lock();
        shared.schedule_tick(config.step_delay);
    }

    RevealHandle { shared }
}

/// Controls a running reveal. Dropping it aborts the reveal.
#[must_use = "dropping a RevealHandle aborts the reveal"]
pub struct RevealHandle {
    shared: Arc<RevealShared>,
}

impl RevealHandle {
    /// Stops the reveal. No listener method runs after this returns.
    ///
    /// Safe to call repeatedly, after completion and from inside a listener.
    pub fn abort(&self) {
        let _delivery = self.shared.delivery.lock();
        if self.shared.cancelled.swap(true, Ordering::AcqRel) {
            return;
        }
        let (pending, finished) = {
            let mut cursor = self.shared.cursor.lock();
            (cursor.pending.take(), cursor.finished)
        };
        if let Some(pending) = pending {
            pending.cancel();
        }
        if !finished {
            debug!("reveal aborted");
        }
    }

    /// `true` once [`abort`](Self::abort) has been called.
    #[must_use]
    pub fn is_aborted(&self) -> bool {
        self.shared.cancelled.load(Ordering::Acquire)
    }

    /// `true` once `on_done` has been delivered.
    #[must_use]
    pub fn is_finished(&self) -> bool {
        self.shared.cursor.lock().finished
    }

    /// The lane currently being revealed, `None` before the first tick and
    /// after completion.
    #[must_use]
    pub fn current_lane(&self) -> Option<Lane> {
        let cursor = self.shared.cursor.lock();
        (cursor.started && !cursor.finished).then_some(Lane::new(cursor.lane))
    }
}

impl Drop for RevealHandle {
    fn drop(&mut self) {
        self.abort();
    }
}

impl std::fmt::Debug for RevealHandle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let cursor = self.shared.cursor.lock();
        f.debug_struct("RevealHandle")
            .field("lanes", &self.shared.ticks.len())
            .field("lane", &cursor.lane)
            .field("step", &cursor.step)
            .field("finished", &cursor.finished)
            .field("aborted", &self.shared.cancelled.load(Ordering::Acquire))
            .finish()
    }
}

#[derive(Default)]
struct Cursor {
    lane: usize,
    step: usize,
    started: bool,
    finished: bool,
    pending: Option<Box<dyn TimerHandle>>,
}

struct RevealShared {
    cancelled: AtomicBool,
    /// Held for the whole of a tick and by `abort`.
    delivery: ReentrantMutex<()>,
    cursor: Mutex<Cursor>,
    /// Tick count of every lane.
    ticks: Vec<usize>,
    listener: Arc<dyn RevealListener>,
    timer: Arc<dyn TimerSource>,
    config: RevealConfig,
}

/// What a tick delivers, decided under the cursor lock and delivered outside it.
enum Delivery {
    Progress {
        lane: usize,
        fraction: f64,
        lane_complete: bool,
    },
    Done,
    Nothing,
}

impl RevealShared {
    /// Must be called with the delivery lock held.
    fn schedule_tick(self: &Arc<Self>, delay: Duration) {
        let weak: Weak<Self> = Arc::downgrade(self);
        let handle = self.timer.schedule(
            delay,
            Box::new(move || {
                if let Some(shared) = weak.upgrade() {
                    shared.tick();
                }
            }),
        );
        if self.cancelled.load(Ordering::Acquire) {
            handle.cancel();
            return;
        }
        self.cursor.lock().pending = Some(handle);
    }

    fn tick(self: &Arc<Self>) {
        let _delivery = self.delivery.lock();
        if self.cancelled.load(Ordering::Acquire) {
            return;
        }

        match self.advance_cursor() {
            Delivery::Nothing => {}
            Delivery::Done => self.listener.on_done(),
            Delivery::Progress {
                lane,
                fraction,
                lane_complete,
            } => {
                trace!(lane, fraction, "reveal tick");
                self.listener.on_progress(Lane::new(lane), fraction);
                if self.cancelled.load(Ordering::Acquire) {
                    return;
                }
                if !lane_complete {
                    self.schedule_tick(self.config.step_delay);
                } else if self.finish_lane() {
                    debug!(lanes = self.ticks.len(), "reveal finished");
                    self.listener.on_done();
                } else {
                    self.schedule_tick(self.config.lane_delay + self.config.step_delay);
                }
            }
        }
    }

    fn advance_cursor(&self) -> Delivery {
        let mut cursor = self.cursor.lock();
        cursor.pending = None;
        if cursor.finished {
            drop(cursor);
            report_violation!(
                ViolationSeverity::Error,
                ViolationKind::Reveal,
                "tick delivered after the reveal finished"
            );
            return Delivery::Nothing;
        }
        cursor.started = true;
        let Some(&total) = self.ticks.get(cursor.lane) else {
            // no lanes at all
            cursor.finished = true;
            return Delivery::Done;
        };
        cursor.step += 1;
        Delivery::Progress {
            lane: cursor.lane,
            fraction: (cursor.step as f64 / total as f64).min(1.0),
            lane_complete: cursor.step >= total,
        }
    }

    /// Moves to the next lane. Returns `true` if that was the last one.
    fn finish_lane(&self) -> bool {
        let mut cursor = self.cursor.lock();
        cursor.lane += 1;
        cursor.step = 0;
        cursor.finished = cursor.lane >= self.ticks.len();
        cursor.finished
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
    use crate::grid::RungGrid;
    use crate::tracer::trace_all;
    use timer::ManualTimer;

    #[derive(Debug, Clone, PartialEq)]
    enum Seen {
        Progress(usize, f64, Duration),
        Done(Duration),
    }

    struct Recorder {
        timer: ManualTimer,
        seen: Mutex<Vec<Seen>>,
    }

    impl Recorder {
        fn new(timer: &ManualTimer) -> Arc<Self> {
            Arc::new(Self {
                timer: timer.clone(),
                seen: Mutex::new(Vec::new()),
            })
        }
    }

    impl RevealListener for Recorder {
        fn on_progress(&self, lane: Lane, fraction: f64) {
            self.seen
                .lock()
                .push(Seen::Progress(lane.as_usize(), fraction, self.timer.now()));
        }

        fn on_done(&self) {
            self.seen.lock().push(Seen::Done(self.timer.now()));
        }
    }

    fn ms(millis: u64) -> Duration {
        Duration::from_millis(millis)
    }

    fn two_lane_paths() -> Vec<Path> {
        // one row: both paths have three waypoints
        trace_all(&RungGrid::from_columns(vec![vec![true]]).unwrap())
            .unwrap()
            .paths
    }

    #[test]
    fn ticks_follow_configured_cadence() {
        let timer = ManualTimer::new();
        let recorder = Recorder::new(&timer);
        let handle = reveal(
            &two_lane_paths(),
            recorder.clone(),
            Arc::new(timer.clone()),
            RevealConfig::default(),
        );
        timer.run_until_idle(100);

        let third = 1.0 / 3.0;
        let two_thirds = 2.0 / 3.0;
        assert_eq!(
            *recorder.seen.lock(),
            vec![
                Seen::Progress(0, third, ms(50)),
                Seen::Progress(0, two_thirds, ms(100)),
                Seen::Progress(0, 1.0, ms(150)),
                Seen::Progress(1, third, ms(300)),
                Seen::Progress(1, two_thirds, ms(350)),
                Seen::Progress(1, 1.0, ms(400)),
                Seen::Done(ms(400)),
            ]
        );
        assert!(handle.is_finished());
        assert_eq!(handle.current_lane(), None);
        assert_eq!(timer.pending(), 0);
    }

    #[test]
    fn nothing_fires_synchronously() {
        let timer = ManualTimer::new();
        let recorder = Recorder::new(&timer);
        let handle = reveal(
            &two_lane_paths(),
            recorder.clone(),
            Arc::new(timer.clone()),
            RevealConfig::default(),
        );
        assert!(recorder.seen.lock().is_empty());
        assert_eq!(handle.current_lane(), None);
        assert_eq!(timer.pending(), 1);
    }

    #[test]
    fn abort_stops_delivery_and_clears_timer() {
        let timer = ManualTimer::new();
        let recorder = Recorder::new(&timer);
        let handle = reveal(
            &two_lane_paths(),
            recorder.clone(),
            Arc::new(timer.clone()),
            RevealConfig::default(),
        );
        timer.advance(ms(100));
        assert_eq!(handle.current_lane(), Some(Lane::new(0)));
        handle.abort();
        handle.abort();
        assert!(handle.is_aborted());
        assert_eq!(timer.pending(), 0);

        timer.advance(ms(10_000));
        assert_eq!(recorder.seen.lock().len(), 2);
        assert!(!handle.is_finished());
    }

    #[test]
    fn dropping_handle_aborts() {
        let timer = ManualTimer::new();
        let recorder = Recorder::new(&timer);
        drop(reveal(
            &two_lane_paths(),
            recorder.clone(),
            Arc::new(timer.clone()),
            RevealConfig::default(),
        ));
        assert_eq!(timer.pending(), 0);
        timer.run_until_idle(100);
        assert!(recorder.seen.lock().is_empty());
    }

    #[test]
    fn listener_may_abort_from_inside_callback() {
        struct AbortOnFirst {
            handle: Mutex<Option<RevealHandle>>,
            calls: Mutex<usize>,
        }

        impl RevealListener for AbortOnFirst {
            fn on_progress(&self, _lane: Lane, _fraction: f64) {
                *self.calls.lock() += 1;
                if let Some(handle) = self.handle.lock().as_ref() {
                    handle.abort();
                }
            }

            fn on_done(&self) {
                *self.calls.lock() += 1;
            }
        }

        let timer = ManualTimer::new();
        let listener = Arc::new(AbortOnFirst {
            handle: Mutex::new(None),
            calls: Mutex::new(0),
        });
        let handle = reveal(
            &two_lane_paths(),
            listener.clone(),
            Arc::new(timer.clone()),
            RevealConfig::default(),
        );
        *listener.handle.lock() = Some(handle);

        timer.run_until_idle(100);
        assert_eq!(*listener.calls.lock(), 1);
        assert_eq!(timer.pending(), 0);
        // break the listener -> handle cycle
        drop(listener.handle.lock().take());
    }

    #[test]
    fn empty_reveal_only_reports_done() {
        let timer = ManualTimer::new();
        let recorder = Recorder::new(&timer);
        let handle = reveal(
            &[],
            recorder.clone(),
            Arc::new(timer.clone()),
            RevealConfig::instant(),
        );
        timer.run_until_idle(10);
        assert_eq!(*recorder.seen.lock(), vec![Seen::Done(Duration::ZERO)]);
        assert!(handle.is_finished());
    }
}
