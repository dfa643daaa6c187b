//! Configuration for weight recalibration
//!
//! Defines the learning rate, retry limit and schedule.

use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::{LearnerError, RecalibrationWindow};

/// Longest schedule the worker accepts: one year
pub const MAX_INTERVAL_MINUTES: u64 = 366 * 24 * 60;

/// Configuration for the weight learner
///
/// # Examples
///
/// ```
/// use skald_learner::LearnerConfig;
///
/// // Default configuration (balanced)
/// let config = LearnerConfig::default();
/// assert_eq!(config.learning_rate, 0.1);
///
/// // Small, infrequent adjustments
/// let config = LearnerConfig::conservative();
/// assert_eq!(config.learning_rate, 0.05);
///
/// // Large, frequent adjustments
/// let config = LearnerConfig::aggressive();
/// assert_eq!(config.learning_rate, 0.25);
/// ```
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LearnerConfig {
    /// Scale applied to the averaged feedback signal
    /// Default: 0.1
    pub learning_rate: f64,

    /// Attempts before giving up on a version conflict
    /// Default: 3
    pub max_attempts: u32,

    /// Deltas smaller than this (in absolute value) are not written
    /// Default: 0.001
    pub min_delta: f64,

    /// How often the worker recalibrates (in minutes)
    /// Default: every 60 minutes
    pub interval_minutes: u64,

    /// Only learn from feedback recorded within this many hours
    /// Default: unset (everything since the last calibration)
    #[serde(default)]
    pub window_hours: Option<u64>,

    /// Dry-run mode: log the adjustments without committing them
    /// Default: false
    #[serde(default)]
    pub dry_run: bool,
}

impl Default for LearnerConfig {
    fn default() -> Self {
        Self {
            learning_rate: 0.1,
            max_attempts: 3,
            min_delta: 0.001,
            interval_minutes: 60,
            window_hours: None,
            dry_run: false,
        }
    }
}

impl LearnerConfig {
    /// Small adjustments, recalibrating every four hours
    pub fn conservative() -> Self {
        Self {
            learning_rate: 0.05,
            max_attempts: 3,
            min_delta: 0.005,
            interval_minutes: 240,
            window_hours: None,
            dry_run: false,
        }
    }

    /// Large adjustments, recalibrating every 15 minutes
    pub fn aggressive() -> Self {
        Self {
            learning_rate: 0.25,
            max_attempts: 5,
            min_delta: 0.0,
            interval_minutes: 15,
            window_hours: None,
            dry_run: false,
        }
    }

    /// Get the recalibration interval as Duration
    pub fn interval(&self) -> Duration {
        Duration::from_secs(self.interval_minutes.saturating_mul(60))
    }

    /// The feedback window each run uses
    pub fn window(&self) -> RecalibrationWindow {
        self.window_hours
            .map(RecalibrationWindow::trailing_hours)
            .unwrap_or_default()
    }

    /// Check the configuration before use
    pub fn validate(&self) -> Result<(), LearnerError> {
        if !(self.learning_rate > 0.0 && self.learning_rate <= 1.0) {
            return Err(LearnerError::Config(format!(
                "learning_rate must be in (0, 1], got {}",
                self.learning_rate
            )));
        }
        if self.max_attempts == 0 {
            return Err(LearnerError::Config("max_attempts must be at least 1".to_string()));
        }
        if !self.min_delta.is_finite() || self.min_delta < 0.0 {
            return Err(LearnerError::Config(format!(
                "min_delta must be a non-negative number, got {}",
                self.min_delta
            )));
        }
        if self.interval_minutes == 0 {
            // tokio::time::interval panics on a zero period
            return Err(LearnerError::Config("interval_minutes must be at least 1".to_string()));
        }
        if self.interval_minutes > MAX_INTERVAL_MINUTES {
            return Err(LearnerError::Config(format!(
                "interval_minutes must be at most {}, got {}",
                MAX_INTERVAL_MINUTES, self.interval_minutes
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = LearnerConfig::default();
        assert_eq!(config.learning_rate, 0.1);
        assert_eq!(config.max_attempts, 3);
        assert_eq!(config.interval_minutes, 60);
        assert!(!config.dry_run);
        assert_eq!(config.window(), RecalibrationWindow::SinceLastCalibration);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_presets() {
        let conservative = LearnerConfig::conservative();
        let aggressive = LearnerConfig::aggressive();
        assert!(conservative.learning_rate < LearnerConfig::default().learning_rate);
        assert!(aggressive.learning_rate > LearnerConfig::default().learning_rate);
        assert!(conservative.interval() > aggressive.interval());
        assert!(conservative.validate().is_ok());
        assert!(aggressive.validate().is_ok());
    }

    #[test]
    fn test_window_and_interval() {
        let config = LearnerConfig {
            window_hours: Some(24),
            ..LearnerConfig::default()
        };
        assert_eq!(config.interval(), Duration::from_secs(3600));
        assert_eq!(
            config.window(),
            RecalibrationWindow::Trailing(Duration::from_secs(24 * 3600))
        );
    }

    #[test]
    fn test_validate_rejects_bad_values() {
        let bad = [
            LearnerConfig { learning_rate: 0.0, ..LearnerConfig::default() },
            LearnerConfig { learning_rate: f64::NAN, ..LearnerConfig::default() },
            LearnerConfig { max_attempts: 0, ..LearnerConfig::default() },
            LearnerConfig { min_delta: -0.1, ..LearnerConfig::default() },
            LearnerConfig { interval_minutes: 0, ..LearnerConfig::default() },
            LearnerConfig { interval_minutes: u64::MAX, ..LearnerConfig::default() },
        ];
        for config in bad {
            assert!(matches!(config.validate(), Err(LearnerError::Config(_))));
        }
    }

    #[test]
    fn test_huge_values_do_not_overflow() {
        let config = LearnerConfig {
            interval_minutes: u64::MAX,
            window_hours: Some(u64::MAX),
            ..LearnerConfig::default()
        };
        assert_eq!(config.interval(), Duration::from_secs(u64::MAX));
        assert_eq!(config.window().since(1_000_000), Some(0));
    }

    #[test]
    fn test_serde_roundtrip() {
        let config = LearnerConfig::aggressive();
        let serialized = serde_json::to_string(&config).unwrap();
        let deserialized: LearnerConfig = serde_json::from_str(&serialized).unwrap();
        assert_eq!(config, deserialized);

        let from_toml: LearnerConfig = toml::from_str(
            "learning_rate = 0.2\nmax_attempts = 2\nmin_delta = 0.0\ninterval_minutes = 5\n",
        )
        .unwrap();
        assert_eq!(from_toml.window_hours, None);
        assert!(!from_toml.dry_run);
    }
}
