//! Test doubles for random sources and reveal listeners.

// Allow test-specific patterns that are appropriate for test code
#![allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing,
    dead_code
)]

use std::sync::Arc;

use amidakuji::{Lane, ManualTimer, RandomSource, RevealListener};
use parking_lot::Mutex;
use web_time::Duration;

/// Replays a fixed list of coin flips, then repeats `fallback`.
///
/// Each flip is turned into a raw value that `gen_bool` maps back to the same
/// boolean for any probability strictly between 0 and 1.
pub struct ScriptedRandom {
    flips: std::vec::IntoIter<bool>,
    fallback: bool,
    pub draws: usize,
}

impl ScriptedRandom {
    #[must_use]
    pub fn new(flips: Vec<bool>, fallback: bool) -> Self {
        Self {
            flips: flips.into_iter(),
            fallback,
            draws: 0,
        }
    }

    /// A source whose every flip is `value`.
    #[must_use]
    pub fn constant(value: bool) -> Self {
        Self::new(Vec::new(), value)
    }
}

impl RandomSource for ScriptedRandom {
    fn next_u32(&mut self) -> u32 {
        self.draws += 1;
        let flip = self.flips.next().unwrap_or(self.fallback);
        if flip {
            0
        } else {
            u32::MAX
        }
    }

    fn next_u64(&mut self) -> u64 {
        u64::from(self.next_u32())
    }
}

/// One listener call, stamped with the virtual time it arrived at.
#[derive(Debug, Clone, PartialEq)]
pub enum Call {
    Progress {
        lane: usize,
        fraction: f64,
        at: Duration,
    },
    Done {
        at: Duration,
    },
}

/// Records every call it receives.
pub struct RecordingListener {
    timer: ManualTimer,
    calls: Mutex<Vec<Call>>,
}

impl RecordingListener {
    #[must_use]
    pub fn new(timer: &ManualTimer) -> Arc<Self> {
        Arc::new(Self {
            timer: timer.clone(),
            calls: Mutex::new(Vec::new()),
        })
    }

    #[must_use]
    pub fn calls(&self) -> Vec<Call> {
        self.calls.lock().clone()
    }

    #[must_use]
    pub fn done_count(&self) -> usize {
        self.calls
            .lock()
            .iter()
            .filter(|call| matches!(call, Call::Done { .. }))
            .count()
    }

    /// Lanes in the order their progress was first reported.
    #[must_use]
    pub fn lane_order(&self) -> Vec<usize> {
        let mut order = Vec::new();
        for call in self.calls.lock().iter() {
            if let Call::Progress { lane, .. } = call {
                if order.last() != Some(lane) {
                    order.push(*lane);
                }
            }
        }
        order
    }

    /// Fractions reported for `lane`, in order.
    #[must_use]
    pub fn fractions(&self, lane: usize) -> Vec<f64> {
        self.calls
            .lock()
            .iter()
            .filter_map(|call| match call {
                Call::Progress {
                    lane: seen,
                    fraction,
                    ..
                } if *seen == lane => Some(*fraction),
                _ => None,
            })
            .collect()
    }
}

impl RevealListener for RecordingListener {
    fn on_progress(&self, lane: Lane, fraction: f64) {
        self.calls.lock().push(Call::Progress {
            lane: lane.as_usize(),
            fraction,
            at: self.timer.now(),
        });
    }

    fn on_done(&self) {
        self.calls.lock().push(Call::Done {
            at: self.timer.now(),
        });
    }
}
