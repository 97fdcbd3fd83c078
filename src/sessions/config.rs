//! Configuration types for ladder generation and reveal pacing.
//!
//! # Overview
//!
//! | Config Type | Purpose | Key Presets |
//! |-------------|---------|-------------|
//! | `GridConfig` | Row count and rung probabilities | `sparse()`, `dense()`, `compact()` |
//! | `RevealConfig` | Delays between reveal ticks | `instant()`, `relaxed()` |
//!
//! # Example
//!
//! ```
//! use amidakuji::{GridConfig, RevealConfig, SessionBuilder};
//!
//! let builder = SessionBuilder::new()
//!     .with_grid_config(GridConfig::dense())
//!     .with_reveal_config(RevealConfig::relaxed());
//! # let _ = builder;
//! ```

use web_time::Duration;

use crate::error::{InvalidInputKind, LadderResult};
use crate::{DEFAULT_ROWS, MIN_ROWS};

/// Largest row count a [`GridConfig`] accepts.
pub const MAX_ROWS: usize = 1000;

/// Longest delay a [`RevealConfig`] accepts.
pub const MAX_REVEAL_DELAY: Duration = Duration::from_secs(60);

/// Controls how the generator lays out rungs.
///
/// # Forward Compatibility
///
/// New fields may be added to this struct in future versions. Construct
/// instances with the `..GridConfig::default()` pattern.
///
/// # Example
///
/// ```
/// use amidakuji::GridConfig;
///
/// let tall = GridConfig {
///     row_count: 24,
///     ..GridConfig::default()
/// };
/// assert!(tall.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, serde::Serialize, serde::Deserialize)]
#[must_use = "GridConfig has no effect unless passed to SessionBuilder::with_grid_config()"]
pub struct GridConfig {
    /// Number of rows in every generated grid. The last one never has rungs.
    ///
    /// Default: 10
    pub row_count: usize,

    /// Chance of a rung candidate in row 0.
    ///
    /// Default: 0.5
    pub first_row_probability: f64,

    /// Chance of a rung candidate in every later row.
    ///
    /// Default: 0.3
    pub rung_probability: f64,
}

impl Default for GridConfig {
    fn default() -> Self {
        Self {
            row_count: DEFAULT_ROWS,
            first_row_probability: 0.5,
            rung_probability: 0.3,
        }
    }
}

impl GridConfig {
    /// Creates a new `GridConfig` with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Few rungs; most players stay close to their starting lane.
    pub fn sparse() -> Self {
        Self {
            row_count: DEFAULT_ROWS,
            first_row_probability: 0.3,
            rung_probability: 0.15,
        }
    }

    /// Many rungs; outcomes are well mixed.
    ///
    /// Suppression still keeps rungs from sharing a lane, so the effective
    /// density is lower than the probabilities suggest.
    pub fn dense() -> Self {
        Self {
            row_count: 16,
            first_row_probability: 0.7,
            rung_probability: 0.5,
        }
    }

    /// A short ladder for small screens.
    pub fn compact() -> Self {
        Self {
            row_count: 6,
            ..Self::default()
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInput`] if `row_count` is outside `[1, 1000]` or a
    /// probability is not a finite value in `[0, 1]`.
    ///
    /// [`InvalidInput`]: crate::LadderError::InvalidInput
    pub fn validate(&self) -> LadderResult<()> {
        if self.row_count < MIN_ROWS {
            return Err(InvalidInputKind::TooFewRows {
                rows: self.row_count,
                min: MIN_ROWS,
            }
            .into());
        }
        if self.row_count > MAX_ROWS {
            return Err(InvalidInputKind::ConfigValueOutOfRange {
                field: "row_count",
                min: MIN_ROWS as u64,
                max: MAX_ROWS as u64,
                actual: self.row_count as u64,
            }
            .into());
        }
        check_probability("first_row_probability", self.first_row_probability)?;
        check_probability("rung_probability", self.rung_probability)?;
        Ok(())
    }

    /// Probability used for candidates in `row`.
    #[must_use]
    pub fn probability_for_row(&self, row: usize) -> f64 {
        if row == 0 {
            self.first_row_probability
        } else {
            self.rung_probability
        }
    }
}

fn check_probability(field: &'static str, actual: f64) -> LadderResult<()> {
    if actual.is_finite() && (0.0..=1.0).contains(&actual) {
        Ok(())
    } else {
        Err(InvalidInputKind::ProbabilityOutOfRange { field, actual }.into())
    }
}

/// Controls the pacing of the staged reveal.
///
/// Lanes are revealed one after another. Within a lane a tick fires every
/// `step_delay`; between lanes the scheduler waits an extra `lane_delay`.
///
/// # Example
///
/// ```
/// use amidakuji::RevealConfig;
/// use web_time::Duration;
///
/// let slow = RevealConfig {
///     step_delay: Duration::from_millis(120),
///     ..RevealConfig::default()
/// };
/// assert!(slow.validate().is_ok());
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[must_use = "RevealConfig has no effect unless passed to SessionBuilder::with_reveal_config()"]
pub struct RevealConfig {
    /// Delay between two progress ticks of the same lane.
    ///
    /// Default: 50ms
    pub step_delay: Duration,

    /// Extra pause after a lane finishes, before the next lane starts.
    ///
    /// Default: 100ms
    pub lane_delay: Duration,
}

impl Default for RevealConfig {
    fn default() -> Self {
        Self {
            step_delay: Duration::from_millis(50),
            lane_delay: Duration::from_millis(100),
        }
    }
}

impl RevealConfig {
    /// Creates a new `RevealConfig` with default values.
    pub fn new() -> Self {
        Self::default()
    }

    /// Every tick is scheduled with zero delay. Useful for tests and headless runs.
    pub fn instant() -> Self {
        Self {
            step_delay: Duration::ZERO,
            lane_delay: Duration::ZERO,
        }
    }

    /// Twice as slow as the default, for presenting on a big screen.
    pub fn relaxed() -> Self {
        Self {
            step_delay: Duration::from_millis(100),
            lane_delay: Duration::from_millis(400),
        }
    }

    /// Validates the configuration.
    ///
    /// # Errors
    ///
    /// Returns [`InvalidInput`] if either delay exceeds 60 seconds.
    ///
    /// [`InvalidInput`]: crate::LadderError::InvalidInput
    pub fn validate(&self) -> LadderResult<()> {
        for (field, delay) in [
            ("step_delay", self.step_delay),
            ("lane_delay", self.lane_delay),
        ] {
            if delay > MAX_REVEAL_DELAY {
                return Err(InvalidInputKind::ConfigValueOutOfRange {
                    field,
                    min: 0,
                    max: MAX_REVEAL_DELAY.as_millis() as u64,
                    actual: delay.as_millis() as u64,
                }
                .into());
            }
        }
        Ok(())
    }

    /// Total time a reveal of lanes with the given tick counts takes.
    #[must_use]
    pub fn total_duration(&self, ticks_per_lane: &[usize]) -> Duration {
        let ticks: u32 = ticks_per_lane
            .iter()
            .map(|&ticks| u32::try_from(ticks).unwrap_or(u32::MAX))
            .fold(0, u32::saturating_add);
        let pauses = u32::try_from(ticks_per_lane.len().saturating_sub(1)).unwrap_or(u32::MAX);
        self.step_delay.saturating_mul(ticks) + self.lane_delay.saturating_mul(pauses)
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
    use crate::LadderError;

    #[test]
    fn test_grid_config_default_values() {
        let config = GridConfig::default();
        assert_eq!(config.row_count, 10);
        assert_eq!(config.first_row_probability, 0.5);
        assert_eq!(config.rung_probability, 0.3);
        assert_eq!(GridConfig::new(), config);
    }

    #[test]
    fn test_grid_config_presets_validate() {
        for config in [
            GridConfig::default(),
            GridConfig::sparse(),
            GridConfig::dense(),
            GridConfig::compact(),
        ] {
            assert!(config.validate().is_ok(), "{config:?}");
        }
    }

    #[test]
    fn test_grid_config_rejects_row_count() {
        let zero = GridConfig {
            row_count: 0,
            ..GridConfig::default()
        };
        assert!(matches!(
            zero.validate(),
            Err(LadderError::InvalidInput {
                kind: InvalidInputKind::TooFewRows { rows: 0, min: 1 }
            })
        ));

        let huge = GridConfig {
            row_count: MAX_ROWS + 1,
            ..GridConfig::default()
        };
        assert!(matches!(
            huge.validate(),
            Err(LadderError::InvalidInput {
                kind: InvalidInputKind::ConfigValueOutOfRange {
                    field: "row_count",
                    ..
                }
            })
        ));
    }

    #[test]
    fn test_grid_config_rejects_bad_probabilities() {
        for bad in [-0.1, 1.5, f64::NAN, f64::INFINITY] {
            let config = GridConfig {
                rung_probability: bad,
                ..GridConfig::default()
            };
            assert!(matches!(
                config.validate(),
                Err(LadderError::InvalidInput {
                    kind: InvalidInputKind::ProbabilityOutOfRange {
                        field: "rung_probability",
                        ..
                    }
                })
            ));
        }

        let edges = GridConfig {
            first_row_probability: 0.0,
            rung_probability: 1.0,
            ..GridConfig::default()
        };
        assert!(edges.validate().is_ok());
    }

    #[test]
    fn test_probability_for_row() {
        let config = GridConfig::default();
        assert_eq!(config.probability_for_row(0), 0.5);
        assert_eq!(config.probability_for_row(1), 0.3);
        assert_eq!(config.probability_for_row(9), 0.3);
    }

    #[test]
    fn test_reveal_config_defaults_and_presets() {
        let config = RevealConfig::default();
        assert_eq!(config.step_delay, Duration::from_millis(50));
        assert_eq!(config.lane_delay, Duration::from_millis(100));
        assert!(RevealConfig::instant().validate().is_ok());
        assert!(RevealConfig::relaxed().validate().is_ok());
    }

    #[test]
    fn test_reveal_config_rejects_long_delays() {
        let config = RevealConfig {
            lane_delay: Duration::from_secs(61),
            ..RevealConfig::default()
        };
        assert!(matches!(
            config.validate(),
            Err(LadderError::InvalidInput {
                kind: InvalidInputKind::ConfigValueOutOfRange {
                    field: "lane_delay",
                    actual: 61_000,
                    ..
                }
            })
        ));
    }

    #[test]
    fn test_total_duration() {
        let config = RevealConfig::default();
        // 3 + 4 ticks at 50ms, one 100ms pause between the lanes
        assert_eq!(config.total_duration(&[3, 4]), Duration::from_millis(450));
        assert_eq!(config.total_duration(&[]), Duration::ZERO);
    }
}
