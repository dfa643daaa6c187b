//! Background worker for scheduled recalibration

use crate::{LearnerConfig, LearnerError, LearnerMetrics, RecalibrationWindow, WeightLearner};
use skald_domain::traits::{SuggestionStore, WeightStore};
use std::fmt::Display;
use tokio::time::{interval, Duration};

/// Background worker that recalibrates weights on a schedule
///
/// # Examples
///
/// ```no_run
/// use skald_learner::{LearnerConfig, LearnerWorker};
/// use skald_store::SqliteStore;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn std::error::Error>> {
///     let store = SqliteStore::new("skald.db")?;
///     let mut worker = LearnerWorker::new(LearnerConfig::default())?;
///
///     // Run indefinitely (until Ctrl+C)
///     worker.run(store).await?;
///     Ok(())
/// }
/// ```
pub struct LearnerWorker {
    learner: WeightLearner,
    interval: Duration,
    window: RecalibrationWindow,
}

impl LearnerWorker {
    /// Create a new background worker with the given configuration
    pub fn new(config: LearnerConfig) -> Result<Self, LearnerError> {
        let interval = config.interval();
        let window = config.window();
        let learner = WeightLearner::new(config)?;
        Ok(Self {
            learner,
            interval,
            window,
        })
    }

    /// Create a worker with default configuration
    pub fn default_config() -> Result<Self, LearnerError> {
        Self::new(LearnerConfig::default())
    }

    /// Run the worker until a shutdown signal (Ctrl+C) is received
    ///
    /// A failed run is logged and retried at the next tick.
    pub async fn run<S>(&mut self, mut store: S) -> Result<(), LearnerError>
    where
        S: SuggestionStore + WeightStore,
        <S as SuggestionStore>::Error: Display,
        <S as WeightStore>::Error: Display,
    {
        let mut ticker = interval(self.interval);

        tracing::info!("Learner worker started (interval: {:?})", self.interval);

        loop {
            tokio::select! {
                _ = ticker.tick() => {
                    tracing::debug!("Starting recalibration");

                    if let Err(e) = self.learner.recalibrate(&mut store, self.window) {
                        tracing::error!("Recalibration failed: {}", e);
                    }
                }
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Shutdown signal received, stopping learner");
                    break;
                }
            }
        }

        tracing::info!("Learner stopped. Final metrics:\n{}", self.learner.metrics().summary());

        Ok(())
    }

    /// Run for a specific number of cycles (useful for testing)
    pub async fn run_cycles<S>(&mut self, mut store: S, cycles: usize) -> Result<S, LearnerError>
    where
        S: SuggestionStore + WeightStore,
        <S as SuggestionStore>::Error: Display,
        <S as WeightStore>::Error: Display,
    {
        let mut ticker = interval(self.interval);

        tracing::info!(
            "Learner worker started for {} cycles (interval: {:?})",
            cycles,
            self.interval
        );

        for cycle in 0..cycles {
            ticker.tick().await;

            tracing::debug!("Starting recalibration {}/{}", cycle + 1, cycles);

            if let Err(e) = self.learner.recalibrate(&mut store, self.window) {
                tracing::error!("Recalibration {}/{} failed: {}", cycle + 1, cycles, e);
                return Err(e);
            }
        }

        tracing::info!(
            "Learner finished {} cycles. Final metrics:\n{}",
            cycles,
            self.learner.metrics().summary()
        );

        Ok(store)
    }

    /// Get a reference to the learner's current metrics
    pub fn metrics(&self) -> &LearnerMetrics {
        self.learner.metrics()
    }

    /// Reset the learner's metrics counters
    pub fn reset_metrics(&mut self) {
        self.learner.reset_metrics();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skald_store::SqliteStore;

    #[tokio::test]
    async fn test_worker_creation() {
        let worker = LearnerWorker::default_config().unwrap();
        assert_eq!(worker.metrics().run_count, 0);
    }

    #[tokio::test]
    async fn test_invalid_config_refused() {
        let config = LearnerConfig {
            interval_minutes: 0,
            ..LearnerConfig::default()
        };
        assert!(LearnerWorker::new(config).is_err());
    }

    #[tokio::test]
    async fn test_run_cycles_on_empty_store() {
        let store = SqliteStore::in_memory().unwrap();
        let config = LearnerConfig {
            interval_minutes: 1, // the first tick completes immediately
            ..LearnerConfig::default()
        };
        let mut worker = LearnerWorker::new(config).unwrap();

        let store = worker.run_cycles(store, 1).await.unwrap();

        assert_eq!(worker.metrics().run_count, 1);
        assert_eq!(store.snapshot().unwrap().version(), 0);
    }

    #[tokio::test]
    async fn test_reset_metrics() {
        let store = SqliteStore::in_memory().unwrap();
        let config = LearnerConfig {
            interval_minutes: 1,
            ..LearnerConfig::default()
        };
        let mut worker = LearnerWorker::new(config).unwrap();

        worker.run_cycles(store, 1).await.unwrap();
        assert_eq!(worker.metrics().run_count, 1);

        worker.reset_metrics();
        assert_eq!(worker.metrics().run_count, 0);
    }
}
