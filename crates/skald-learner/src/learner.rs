//! Feedback-driven weight recalibration
//!
//! For every feature type seen in the batch:
//!
//! ```text
//! delta      = learning_rate * Σ(learning_value · sign · feature.value) / samples
//! new_weight = clamp(old_weight + delta, 0, 1)
//! ```
//!
//! where `sign` is +1 for accept/modify, -1 for reject, and dismissals are
//! left out. Each type is committed on its own, conditional on the weight
//! version the run expects, and records the last feedback sequence it was
//! learned from. A type never learns from feedback at or below that mark,
//! so a run cut short by conflicts can be repeated safely.

use crate::{LearnerConfig, LearnerError, LearnerMetrics};
use skald_domain::traits::{Clock, RecordedFeedback, SuggestionStore, SystemClock, WeightCommit, WeightStore};
use skald_domain::{FeatureType, WeightSnapshot};
use std::collections::BTreeMap;
use std::fmt::Display;
use std::time::{Duration, Instant};
use tracing::{debug, info, warn};

/// Which feedback a recalibration run learns from
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum RecalibrationWindow {
    /// Everything recorded since the previous successful run
    #[default]
    SinceLastCalibration,
    /// Only unconsumed feedback recorded within the trailing duration
    Trailing(Duration),
}

impl RecalibrationWindow {
    /// Trailing window of `hours`; absurdly large values cover all history
    pub fn trailing_hours(hours: u64) -> Self {
        RecalibrationWindow::Trailing(Duration::from_secs(hours.saturating_mul(3600)))
    }

    /// Earliest `created_at` admitted at time `now`
    pub fn since(&self, now: u64) -> Option<u64> {
        match self {
            RecalibrationWindow::SinceLastCalibration => None,
            RecalibrationWindow::Trailing(d) => Some(now.saturating_sub(d.as_secs())),
        }
    }
}

/// One computed weight change
#[derive(Debug, Clone, PartialEq)]
pub struct WeightAdjustment {
    /// Feature type adjusted
    pub feature_type: FeatureType,
    /// Weight before the run
    pub old_weight: f64,
    /// Weight after the run (clamped)
    pub new_weight: f64,
    /// Unclamped delta
    pub delta: f64,
    /// Learnable samples that carried this feature type
    pub samples: usize,
}

/// Outcome of one recalibration run
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CalibrationReport {
    /// Weight version read at the start of the final attempt
    pub version_before: u64,
    /// Weight version after the last commit
    pub version_after: u64,
    /// Feedback records in the batch
    pub feedback_consumed: usize,
    /// Records left out (dismissals, missing snapshots)
    pub samples_excluded: usize,
    /// Adjustments committed (or, in dry-run mode, computed)
    pub adjustments: Vec<WeightAdjustment>,
    /// Types whose delta was too small to write
    pub skipped: Vec<FeatureType>,
    /// Types whose commit failed
    pub failed: Vec<(FeatureType, String)>,
    /// Attempts used
    pub attempts: u32,
    /// Whether this was a dry run (nothing committed)
    pub dry_run: bool,
    /// Feedback sequence the cursor advanced to
    pub cursor: Option<u64>,
}

impl CalibrationReport {
    /// Whether the run changed any weight
    pub fn changed(&self) -> bool {
        !self.dry_run && !self.adjustments.is_empty()
    }

    /// One-line description for logs and the CLI
    pub fn summary(&self) -> String {
        format!(
            "{} feedback, {} adjusted, {} skipped, {} failed, version {} -> {}{}",
            self.feedback_consumed,
            self.adjustments.len(),
            self.skipped.len(),
            self.failed.len(),
            self.version_before,
            self.version_after,
            if self.dry_run { " (dry run)" } else { "" }
        )
    }
}

#[derive(Debug, Default)]
struct TypeSignal {
    samples: usize,
    sum: f64,
}

/// Accumulate the learning signal of a batch per feature type
///
/// Feedback a type has already consumed according to `snapshot` is left
/// out for that type. Returns the per-type signals and the number of
/// excluded records.
fn accumulate(
    batch: &[RecordedFeedback],
    snapshot: &WeightSnapshot,
) -> (BTreeMap<FeatureType, TypeSignal>, usize) {
    let mut signals: BTreeMap<FeatureType, TypeSignal> = BTreeMap::new();
    let mut excluded = 0;

    for record in batch {
        let feedback = &record.feedback;
        let (Some(sign), Some(features)) = (feedback.action.outcome_sign(), &feedback.feature_snapshot) else {
            excluded += 1;
            continue;
        };
        for feature in features {
            if record.sequence <= snapshot.consumed_through(feature.feature_type) {
                continue;
            }
            let signal = signals.entry(feature.feature_type).or_default();
            signal.samples += 1;
            signal.sum += feedback.learning_value * sign * feature.value;
        }
    }

    (signals, excluded)
}

/// Recalibrates feature weights from accumulated feedback
///
/// # Examples
///
/// ```no_run
/// use skald_learner::{RecalibrationWindow, WeightLearner};
/// use skald_store::SqliteStore;
///
/// # fn main() -> Result<(), Box<dyn std::error::Error>> {
/// let mut store = SqliteStore::new("skald.db")?;
/// let mut learner = WeightLearner::default_config()?;
///
/// let report = learner.recalibrate(&mut store, RecalibrationWindow::SinceLastCalibration)?;
/// println!("{}", report.summary());
/// # Ok(())
/// # }
/// ```
pub struct WeightLearner<C = SystemClock> {
    config: LearnerConfig,
    metrics: LearnerMetrics,
    clock: C,
}

impl WeightLearner<SystemClock> {
    /// Create a learner using wall-clock time
    pub fn new(config: LearnerConfig) -> Result<Self, LearnerError> {
        Self::with_clock(config, SystemClock)
    }

    /// Create a learner with the default configuration
    pub fn default_config() -> Result<Self, LearnerError> {
        Self::new(LearnerConfig::default())
    }
}

impl<C: Clock> WeightLearner<C> {
    /// Create a learner with an explicit clock
    pub fn with_clock(config: LearnerConfig, clock: C) -> Result<Self, LearnerError> {
        config.validate()?;
        Ok(Self {
            config,
            metrics: LearnerMetrics::new(),
            clock,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &LearnerConfig {
        &self.config
    }

    /// Get a reference to the current metrics
    pub fn metrics(&self) -> &LearnerMetrics {
        &self.metrics
    }

    /// Reset metrics counters
    pub fn reset_metrics(&mut self) {
        self.metrics.reset();
    }

    /// Restore every weight to its default
    pub fn reset<S>(&mut self, store: &mut S) -> Result<WeightSnapshot, LearnerError>
    where
        S: WeightStore,
        S::Error: Display,
    {
        let snapshot = store
            .reset_weights(self.clock.now())
            .map_err(|e| LearnerError::Store(e.to_string()))?;
        info!("Weights reset to defaults at version {}", snapshot.version());
        Ok(snapshot)
    }

    /// Run one recalibration over the feedback selected by `window`
    ///
    /// The feedback batch is read once. On a version conflict the run starts
    /// over with fresh weights against the same batch, skipping types that
    /// already consumed it, until the configured attempts are used up. The
    /// calibration cursor only advances when every type committed.
    pub fn recalibrate<S>(
        &mut self,
        store: &mut S,
        window: RecalibrationWindow,
    ) -> Result<CalibrationReport, LearnerError>
    where
        S: SuggestionStore + WeightStore,
        <S as SuggestionStore>::Error: Display,
        <S as WeightStore>::Error: Display,
    {
        let started = Instant::now();
        let now = self.clock.now();
        let mut report = CalibrationReport {
            dry_run: self.config.dry_run,
            ..CalibrationReport::default()
        };

        let cursor = store
            .calibration_cursor()
            .map_err(|e| LearnerError::Store(e.to_string()))?;
        let batch = store
            .feedback_after(cursor, window.since(now))
            .map_err(|e| LearnerError::Store(e.to_string()))?;
        let through = batch.last().map(|r| r.sequence);
        report.feedback_consumed = batch.len();

        for attempt in 1..=self.config.max_attempts {
            report.attempts = attempt;
            report.skipped.clear();
            report.failed.clear();

            let snapshot = store
                .snapshot()
                .map_err(|e| LearnerError::Store(e.to_string()))?;
            let (signals, excluded) = accumulate(&batch, &snapshot);
            report.version_before = snapshot.version();
            report.version_after = snapshot.version();
            report.samples_excluded = excluded;

            let consumed_through = through.unwrap_or(cursor);
            if self.apply(store, &snapshot, &signals, consumed_through, now, &mut report) {
                match through {
                    Some(last) if !self.config.dry_run && report.failed.is_empty() => {
                        store
                            .advance_calibration_cursor(last, now)
                            .map_err(|e| LearnerError::Store(e.to_string()))?;
                        report.cursor = Some(last);
                    }
                    Some(_) if !report.failed.is_empty() => {
                        warn!(
                            "Calibration cursor held at {}: {} type(s) failed to commit",
                            cursor,
                            report.failed.len()
                        );
                    }
                    _ => {}
                }

                self.metrics.record_run(&report);
                self.metrics.total_runtime_ms += started.elapsed().as_millis() as u64;
                info!("Recalibration complete: {}", report.summary());
                return Ok(report);
            }

            warn!(
                "Weight version moved during recalibration (attempt {}/{})",
                attempt, self.config.max_attempts
            );
        }

        self.metrics.record_conflict(self.config.max_attempts);
        self.metrics.total_runtime_ms += started.elapsed().as_millis() as u64;
        Err(LearnerError::Conflict {
            attempts: self.config.max_attempts,
        })
    }

    /// Commit the per-type updates; false when a version conflict interrupted
    fn apply<S>(
        &self,
        store: &mut S,
        snapshot: &WeightSnapshot,
        signals: &BTreeMap<FeatureType, TypeSignal>,
        consumed_through: u64,
        now: u64,
        report: &mut CalibrationReport,
    ) -> bool
    where
        S: WeightStore,
        S::Error: Display,
    {
        let mut expected = snapshot.version();

        for (&feature_type, signal) in signals {
            if signal.samples == 0 {
                continue;
            }

            let delta = self.config.learning_rate * signal.sum / signal.samples as f64;
            let old_weight = snapshot.weight(feature_type);
            let new_weight = (old_weight + delta).clamp(0.0, 1.0);
            debug!(
                "{}: {} samples, delta {:+.4}, {:.4} -> {:.4}",
                feature_type, signal.samples, delta, old_weight, new_weight
            );

            if delta.abs() < self.config.min_delta || new_weight == old_weight {
                report.skipped.push(feature_type);
                continue;
            }

            let adjustment = WeightAdjustment {
                feature_type,
                old_weight,
                new_weight,
                delta,
                samples: signal.samples,
            };

            if self.config.dry_run {
                info!(
                    "[dry run] would set {} from {:.4} to {:.4}",
                    feature_type, old_weight, new_weight
                );
                report.adjustments.push(adjustment);
                continue;
            }

            match store.commit_weight(expected, feature_type, new_weight, consumed_through, now) {
                Ok(WeightCommit::Committed(record)) => {
                    expected = record.version;
                    report.version_after = record.version;
                    report.adjustments.push(adjustment);
                }
                Ok(WeightCommit::Conflict { current_version }) => {
                    warn!(
                        "Commit of {} refused: expected version {}, store at {}",
                        feature_type, expected, current_version
                    );
                    return false;
                }
                Err(e) => {
                    warn!("Commit of {} failed: {}", feature_type, e);
                    report.failed.push((feature_type, e.to_string()));
                }
            }
        }

        true
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skald_domain::{
        Decision, EntityId, Feature, Feedback, FeedbackAction, GenerationMethod, RelationshipLabel,
        Score, Suggestion, SuggestionId, SuggestionStatus,
    };

    fn recorded(sequence: u64, action: FeedbackAction, features: Option<Vec<Feature>>) -> RecordedFeedback {
        let suggestion = Suggestion {
            id: SuggestionId::new(),
            scope: "saga-1".to_string(),
            source_entity_id: EntityId(1),
            target_entity_id: EntityId(2),
            relationship_type: RelationshipLabel::new("ally").unwrap(),
            confidence: Score::new(60.0).unwrap(),
            strength: Score::new(60.0).unwrap(),
            priority: Score::new(60.0).unwrap(),
            method: GenerationMethod::Content,
            status: SuggestionStatus::Pending,
            reasoning: None,
            evidence: Vec::new(),
            created_at: 0,
            updated_at: 0,
            reviewed_by: None,
            reviewed_at: None,
        };
        RecordedFeedback {
            sequence,
            feedback: Feedback::record(&suggestion, Decision::by(action, "alice"), features, 5),
        }
    }

    #[test]
    fn test_window_since() {
        assert_eq!(RecalibrationWindow::SinceLastCalibration.since(10_000), None);
        assert_eq!(
            RecalibrationWindow::Trailing(Duration::from_secs(3_600)).since(10_000),
            Some(6_400)
        );
        assert_eq!(
            RecalibrationWindow::Trailing(Duration::from_secs(3_600)).since(100),
            Some(0)
        );
        assert_eq!(RecalibrationWindow::trailing_hours(u64::MAX).since(10_000), Some(0));
    }

    #[test]
    fn test_accumulate_signs_and_exclusions() {
        let co = |v: f64| Feature::new(FeatureType::CoOccurrence, v, 0.8).unwrap();
        let batch = vec![
            recorded(1, FeedbackAction::Accept, Some(vec![co(1.0)])),
            recorded(2, FeedbackAction::Reject, Some(vec![co(0.5)])),
            recorded(3, FeedbackAction::Dismiss, Some(vec![co(1.0)])),
            recorded(4, FeedbackAction::Accept, None),
        ];

        let (signals, excluded) = accumulate(&batch, &WeightSnapshot::defaults());
        let co_signal = &signals[&FeatureType::CoOccurrence];

        assert_eq!(excluded, 2);
        assert_eq!(co_signal.samples, 2);
        // accept: 0.7 * 1.0, reject: -(0.7 * 0.5)
        let expected = batch[0].feedback.learning_value * 1.0 - batch[1].feedback.learning_value * 0.5;
        assert!((co_signal.sum - expected).abs() < 1e-12);
    }

    #[test]
    fn test_accumulate_skips_consumed_feedback_per_type() {
        let co = Feature::new(FeatureType::CoOccurrence, 1.0, 0.8).unwrap();
        let faction = Feature::new(FeatureType::SharedFaction, 1.0, 0.7).unwrap();
        let batch = vec![
            recorded(1, FeedbackAction::Accept, Some(vec![co.clone(), faction.clone()])),
            recorded(2, FeedbackAction::Accept, Some(vec![co, faction])),
        ];
        let snapshot = WeightSnapshot::from_records(
            1,
            &[skald_domain::WeightRecord {
                feature_type: FeatureType::CoOccurrence,
                weight: 0.87,
                version: 1,
                last_calibrated_at: Some(5),
                consumed_through: 2,
            }],
        );

        let (signals, excluded) = accumulate(&batch, &snapshot);

        assert_eq!(excluded, 0);
        assert!(!signals.contains_key(&FeatureType::CoOccurrence));
        assert_eq!(signals[&FeatureType::SharedFaction].samples, 2);
    }

    #[test]
    fn test_report_summary() {
        let report = CalibrationReport {
            feedback_consumed: 3,
            version_before: 4,
            version_after: 6,
            dry_run: true,
            ..CalibrationReport::default()
        };
        assert_eq!(
            report.summary(),
            "3 feedback, 0 adjusted, 0 skipped, 0 failed, version 4 -> 6 (dry run)"
        );
        assert!(!report.changed());
    }
}
