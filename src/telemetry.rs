//! Violation reporting for the ladder engine.
//!
//! A generated grid that shares a lane between two rungs, a trace that maps
//! two players onto the same result, a reveal tick that arrives after the
//! reveal finished: none of these should ever happen, and none of them may
//! pass silently. Each is described by a [`Violation`] and handed to a
//! [`ViolationObserver`]. Without an observer the violation is logged through
//! `tracing` by [`TracingObserver`].
//!
//! Tests install a [`CollectingObserver`] through
//! [`SessionBuilder::with_violation_observer`](crate::SessionBuilder::with_violation_observer)
//! and assert on what it saw:
//!
//! ```
//! use amidakuji::telemetry::{CollectingObserver, ViolationKind};
//! use amidakuji::{ManualTimer, SessionBuilder};
//! use std::sync::Arc;
//!
//! let observer = Arc::new(CollectingObserver::new());
//! let mut session = SessionBuilder::new()
//!     .with_seed(1)
//!     .with_violation_observer(observer.clone())
//!     .start_session(ManualTimer::new())?;
//! session.new_game(["a", "b"], ["x", "y"])?;
//! assert!(!observer.has_violation(ViolationKind::Grid));
//! # Ok::<(), amidakuji::LadderError>(())
//! ```

use parking_lot::Mutex;

use crate::{GameId, Lane};

/// How bad a violation is. Ordered from least to most severe.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ViolationSeverity {
    /// Something was dropped or clamped; the operation went on.
    Warning,
    /// The operation was skipped.
    Error,
    /// A ladder invariant is broken; the game's outcome cannot be trusted.
    Critical,
}

impl ViolationSeverity {
    /// Lower-case label for log fields.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Warning => "warning",
            Self::Error => "error",
            Self::Critical => "critical",
        }
    }
}

impl std::fmt::Display for ViolationSeverity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Which part of the engine noticed the violation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, serde::Serialize)]
#[serde(rename_all = "snake_case")]
#[non_exhaustive]
pub enum ViolationKind {
    /// A rung grid with a shared lane or a rung on the terminal row.
    Grid,
    /// Tracing produced something other than a permutation.
    Trace,
    /// A tick out of order, after completion, or for a missing lane.
    Reveal,
    /// Session bookkeeping, such as an overflowing event queue.
    Session,
    /// A configuration value was clamped at use.
    Configuration,
    /// A value failed [`InvariantChecker::check_invariants`].
    Invariant,
}

impl ViolationKind {
    /// Lower-case label for log fields.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Grid => "grid",
            Self::Trace => "trace",
            Self::Reveal => "reveal",
            Self::Session => "session",
            Self::Configuration => "configuration",
            Self::Invariant => "invariant",
        }
    }
}

impl std::fmt::Display for ViolationKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One reported violation.
///
/// ```
/// use amidakuji::telemetry::{Violation, ViolationKind, ViolationSeverity};
/// use amidakuji::{GameId, Lane};
///
/// let violation = Violation::new(
///     ViolationSeverity::Error,
///     ViolationKind::Reveal,
///     "progress went backwards",
///     "reveal.rs:10",
/// )
/// .with_game(GameId::new(3))
/// .with_lane(Lane::new(1));
///
/// assert_eq!(
///     violation.to_string(),
///     "[error/reveal] progress went backwards (game 3, lane 1, at reveal.rs:10)"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, serde::Serialize)]
pub struct Violation {
    /// How bad it is.
    pub severity: ViolationSeverity,
    /// Where it was noticed.
    pub kind: ViolationKind,
    /// What went wrong.
    pub message: String,
    /// `file:line` of the report.
    pub location: &'static str,
    /// The game involved, if known.
    pub game: Option<GameId>,
    /// The lane involved, if any.
    pub lane: Option<Lane>,
}

impl Violation {
    /// A violation not yet tied to a game or lane.
    #[must_use]
    pub fn new(
        severity: ViolationSeverity,
        kind: ViolationKind,
        message: impl Into<String>,
        location: &'static str,
    ) -> Self {
        Self {
            severity,
            kind,
            message: message.into(),
            location,
            game: None,
            lane: None,
        }
    }

    /// Ties the violation to `game`.
    #[must_use]
    pub fn with_game(mut self, game: GameId) -> Self {
        self.game = Some(game);
        self
    }

    /// Ties the violation to `lane`.
    #[must_use]
    pub fn with_lane(mut self, lane: Lane) -> Self {
        self.lane = Some(lane);
        self
    }

    /// Serializes the violation as one line of JSON.
    #[cfg(feature = "json")]
    #[must_use]
    pub fn to_json(&self) -> Option<String> {
        serde_json::to_string(self).ok()
    }
}

impl std::fmt::Display for Violation {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "[{}/{}] {} (", self.severity, self.kind, self.message)?;
        if let Some(game) = self.game {
            write!(f, "game {game}, ")?;
        }
        if let Some(lane) = self.lane {
            write!(f, "lane {lane}, ")?;
        }
        write!(f, "at {})", self.location)
    }
}

/// Receives violations.
///
/// Observers are called from whichever thread drives the timer, possibly in
/// the middle of a reveal tick, so they must be `Send + Sync` and quick.
pub trait ViolationObserver: Send + Sync {
    /// Called once per violation.
    fn on_violation(&self, violation: &Violation);
}

/// Logs violations: `Warning` at warn level, anything worse at error level.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingObserver;

impl ViolationObserver for TracingObserver {
    fn on_violation(&self, violation: &Violation) {
        let game = violation.game.map(GameId::as_u64);
        let lane = violation.lane.map(Lane::as_usize);
        if violation.severity == ViolationSeverity::Warning {
            tracing::warn!(
                kind = violation.kind.as_str(),
                game,
                lane,
                location = violation.location,
                "{}",
                violation.message
            );
        } else {
            tracing::error!(
                severity = violation.severity.as_str(),
                kind = violation.kind.as_str(),
                game,
                lane,
                location = violation.location,
                "{}",
                violation.message
            );
        }
    }
}

/// Keeps every violation it receives.
#[derive(Debug, Default)]
pub struct CollectingObserver {
    seen: Mutex<Vec<Violation>>,
}

impl CollectingObserver {
    /// An observer that has seen nothing yet.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Everything seen so far, oldest first.
    #[must_use]
    pub fn violations(&self) -> Vec<Violation> {
        self.seen.lock().clone()
    }

    /// Removes and returns everything seen so far.
    pub fn take(&self) -> Vec<Violation> {
        std::mem::take(&mut *self.seen.lock())
    }

    /// Number of violations seen.
    #[must_use]
    pub fn len(&self) -> usize {
        self.seen.lock().len()
    }

    /// `true` if nothing was seen.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.seen.lock().is_empty()
    }

    /// `true` if at least one violation of `kind` was seen.
    #[must_use]
    pub fn has_violation(&self, kind: ViolationKind) -> bool {
        self.count(kind) > 0
    }

    /// Number of violations of `kind` seen.
    #[must_use]
    pub fn count(&self, kind: ViolationKind) -> usize {
        self.seen.lock().iter().filter(|v| v.kind == kind).count()
    }
}

impl ViolationObserver for CollectingObserver {
    fn on_violation(&self, violation: &Violation) {
        self.seen.lock().push(violation.clone());
    }
}

/// Sends `violation` to `observer`, or to [`TracingObserver`] when there is none.
pub fn report(observer: Option<&dyn ViolationObserver>, violation: &Violation) {
    observer.unwrap_or(&TracingObserver).on_violation(violation);
}

/// Reports a violation to the log.
///
/// ```
/// use amidakuji::report_violation;
/// use amidakuji::telemetry::{ViolationKind, ViolationSeverity};
///
/// report_violation!(ViolationSeverity::Warning, ViolationKind::Reveal, "late tick for lane {}", 3);
/// ```
#[macro_export]
macro_rules! report_violation {
    ($severity:expr, $kind:expr, $($message:tt)+) => {
        $crate::telemetry::report(
            ::core::option::Option::None,
            &$crate::telemetry::Violation::new(
                $severity,
                $kind,
                ::std::format!($($message)+),
                ::core::concat!(::core::file!(), ":", ::core::line!()),
            ),
        )
    };
}

/// Reports a violation to an `&Option<Arc<dyn ViolationObserver>>`, falling
/// back to the log. A leading `game = id,` ties it to a game.
///
/// ```
/// use amidakuji::report_violation_to;
/// use amidakuji::telemetry::{CollectingObserver, ViolationKind, ViolationObserver, ViolationSeverity};
/// use amidakuji::GameId;
/// use std::sync::Arc;
///
/// let collector = Arc::new(CollectingObserver::new());
/// let observer: Option<Arc<dyn ViolationObserver>> = Some(collector.clone());
/// report_violation_to!(&observer, ViolationSeverity::Warning, ViolationKind::Session,
///     game = GameId::new(2), "dropped {} events", 1);
/// assert_eq!(collector.violations()[0].game, Some(GameId::new(2)));
/// ```
#[macro_export]
macro_rules! report_violation_to {
    ($observer:expr, $severity:expr, $kind:expr, game = $game:expr, $($message:tt)+) => {
        $crate::telemetry::report(
            $observer.as_deref(),
            &$crate::telemetry::Violation::new(
                $severity,
                $kind,
                ::std::format!($($message)+),
                ::core::concat!(::core::file!(), ":", ::core::line!()),
            )
            .with_game($game),
        )
    };
    ($observer:expr, $severity:expr, $kind:expr, $($message:tt)+) => {
        $crate::telemetry::report(
            $observer.as_deref(),
            &$crate::telemetry::Violation::new(
                $severity,
                $kind,
                ::std::format!($($message)+),
                ::core::concat!(::core::file!(), ":", ::core::line!()),
            ),
        )
    };
}

/// Fails the test unless `observer` saw a violation of `kind`.
#[macro_export]
macro_rules! assert_violation {
    ($observer:expr, $kind:expr) => {
        assert!(
            $observer.has_violation($kind),
            "no {} violation among {:#?}",
            $kind,
            $observer.violations()
        )
    };
}

/// Fails the test if `observer` saw any violation.
#[macro_export]
macro_rules! assert_no_violations {
    ($observer:expr) => {
        assert!(
            $observer.is_empty(),
            "unexpected violations: {:#?}",
            $observer.violations()
        )
    };
}

// ==========================================
// Runtime Invariant Checking
// ==========================================

/// The first rule a value was found to break.
#[derive(Debug, Clone, PartialEq, Eq, serde::Serialize)]
pub struct BrokenInvariant {
    /// Type of the value, e.g. `"RungGrid"`.
    pub subject: &'static str,
    /// The rule, e.g. `"terminal row has a rung"`.
    pub rule: &'static str,
    /// Where in the value it broke.
    pub detail: Option<String>,
}

impl BrokenInvariant {
    /// A broken `rule` of `subject`.
    #[must_use]
    pub const fn new(subject: &'static str, rule: &'static str) -> Self {
        Self {
            subject,
            rule,
            detail: None,
        }
    }

    /// Says where the rule broke.
    #[must_use]
    pub fn at(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }
}

impl std::fmt::Display for BrokenInvariant {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.detail {
            Some(detail) => write!(f, "{}: {} ({detail})", self.subject, self.rule),
            None => write!(f, "{}: {}", self.subject, self.rule),
        }
    }
}

/// Types that can check their own invariants.
pub trait InvariantChecker {
    /// `Ok` if every invariant holds, otherwise the first one broken.
    fn check_invariants(&self) -> Result<(), BrokenInvariant>;
}

/// Checks a value's invariants in debug builds (or with the `paranoid`
/// feature) and reports a failure as a `Critical` violation.
#[macro_export]
#[cfg(any(debug_assertions, feature = "paranoid"))]
macro_rules! debug_check_invariants {
    ($value:expr) => {
        if let Err(broken) = $crate::telemetry::InvariantChecker::check_invariants(&$value) {
            $crate::report_violation!(
                $crate::telemetry::ViolationSeverity::Critical,
                $crate::telemetry::ViolationKind::Invariant,
                "{}",
                broken
            );
        }
    };
    ($value:expr, $when:expr) => {
        if let Err(broken) = $crate::telemetry::InvariantChecker::check_invariants(&$value) {
            $crate::report_violation!(
                $crate::telemetry::ViolationSeverity::Critical,
                $crate::telemetry::ViolationKind::Invariant,
                "{} {}",
                broken,
                $when
            );
        }
    };
}

/// Release builds without `paranoid` skip the check.
#[macro_export]
#[cfg(not(any(debug_assertions, feature = "paranoid")))]
macro_rules! debug_check_invariants {
    ($value:expr) => {};
    ($value:expr, $when:expr) => {};
}

#[cfg(test)]
#[allow(
    clippy::panic,
    clippy::unwrap_used,
    clippy::expect_used,
    clippy::indexing_slicing
)]
mod tests {
    use std::sync::Arc;

    use super::*;

    fn violation(kind: ViolationKind) -> Violation {
        Violation::new(ViolationSeverity::Error, kind, "boom", "telemetry.rs:1")
    }

    #[test]
    fn test_severity_is_ordered() {
        assert!(ViolationSeverity::Warning < ViolationSeverity::Error);
        assert!(ViolationSeverity::Error < ViolationSeverity::Critical);
    }

    #[test]
    fn test_display_without_game_or_lane() {
        assert_eq!(
            violation(ViolationKind::Grid).to_string(),
            "[error/grid] boom (at telemetry.rs:1)"
        );
    }

    #[test]
    fn test_collecting_observer_counts_and_takes() {
        let observer = CollectingObserver::new();
        observer.on_violation(&violation(ViolationKind::Grid));
        observer.on_violation(&violation(ViolationKind::Grid));
        observer.on_violation(&violation(ViolationKind::Reveal));

        assert_eq!(observer.count(ViolationKind::Grid), 2);
        assert!(!observer.has_violation(ViolationKind::Trace));
        assert_violation!(observer, ViolationKind::Reveal);

        assert_eq!(observer.take().len(), 3);
        assert_no_violations!(observer);
    }

    #[test]
    fn test_report_violation_to_falls_back_without_observer() {
        let observer: Option<Arc<dyn ViolationObserver>> = None;
        report_violation_to!(
            &observer,
            ViolationSeverity::Warning,
            ViolationKind::Session,
            "logged"
        );
    }

    #[test]
    fn test_report_violation_to_records_location_and_game() {
        let collector = Arc::new(CollectingObserver::new());
        let observer: Option<Arc<dyn ViolationObserver>> = Some(collector.clone());
        report_violation_to!(
            &observer,
            ViolationSeverity::Critical,
            ViolationKind::Trace,
            game = GameId::new(5),
            "lane {} reached twice",
            2
        );
        let seen = collector.take();
        assert_eq!(seen.len(), 1);
        assert_eq!(seen[0].message, "lane 2 reached twice");
        assert_eq!(seen[0].game, Some(GameId::new(5)));
        assert!(seen[0].location.contains("telemetry.rs:"));
    }

    #[test]
    fn test_broken_invariant_display() {
        let broken = BrokenInvariant::new("RungGrid", "terminal row has a rung").at("column 2");
        assert_eq!(broken.to_string(), "RungGrid: terminal row has a rung (column 2)");
        assert_eq!(
            BrokenInvariant::new("Path", "empty").to_string(),
            "Path: empty"
        );
    }

    #[cfg(feature = "json")]
    #[test]
    fn test_violation_json_fields() {
        let json = violation(ViolationKind::Trace)
            .with_game(GameId::new(4))
            .with_lane(Lane::new(1))
            .to_json()
            .unwrap();
        assert!(json.contains(r#""severity":"error""#));
        assert!(json.contains(r#""kind":"trace""#));
        assert!(json.contains(r#""game":4"#));
        assert!(json.contains(r#""lane":1"#));
    }
}
