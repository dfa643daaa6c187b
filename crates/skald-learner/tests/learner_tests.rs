//! Recalibration against a SQLite store

use skald_domain::traits::{
    Clock, RecordedFeedback, SuggestionQuery, SuggestionStore, TransitionOutcome, WeightCommit,
    WeightStore,
};
use skald_domain::{
    Decision, EntityId, Feature, FeatureType, Feedback, FeedbackAction, GenerationMethod,
    RelationshipLabel, Score, Suggestion, SuggestionId, SuggestionStatus, WeightChangeReason,
    WeightHistoryEntry, WeightRecord, WeightSnapshot,
};
use skald_learner::{LearnerConfig, LearnerError, RecalibrationWindow, WeightLearner};
use skald_store::{SqliteStore, StoreError};
use std::time::Duration;

struct FixedClock(u64);

impl Clock for FixedClock {
    fn now(&self) -> u64 {
        self.0
    }
}

/// Store a pending suggestion and decide it at `at`
fn decided(store: &mut SqliteStore, target: u64, action: FeedbackAction, features: Vec<Feature>, at: u64) {
    let suggestion = Suggestion {
        id: SuggestionId::new(),
        scope: "saga-1".to_string(),
        source_entity_id: EntityId(1),
        target_entity_id: EntityId(target),
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
    store.insert_suggestion(&suggestion, &features, None).unwrap();

    let updated = suggestion
        .transitioned(action.resulting_status(), "alice", at)
        .unwrap();
    let feedback = Feedback::record(&suggestion, Decision::by(action, "alice"), Some(features), at);
    assert_eq!(
        store.apply_transition(&updated, &feedback).unwrap(),
        TransitionOutcome::Applied
    );
}

fn feature(feature_type: FeatureType, value: f64) -> Feature {
    Feature::new(feature_type, value, feature_type.default_weight()).unwrap()
}

fn learner(config: LearnerConfig) -> WeightLearner<FixedClock> {
    WeightLearner::with_clock(config, FixedClock(10_000)).unwrap()
}

#[test]
fn test_acceptances_raise_and_rejections_lower() {
    let mut store = SqliteStore::in_memory().unwrap();
    for target in [2, 3] {
        decided(&mut store, target, FeedbackAction::Accept, vec![feature(FeatureType::CoOccurrence, 1.0)], 100);
    }
    decided(&mut store, 4, FeedbackAction::Reject, vec![feature(FeatureType::MentionFrequency, 1.0)], 100);

    let mut learner = learner(LearnerConfig::default());
    let report = learner
        .recalibrate(&mut store, RecalibrationWindow::SinceLastCalibration)
        .unwrap();

    // Each sample: learning value 0.7 (mid confidence, snapshot, human)
    let co = store.weight(FeatureType::CoOccurrence).unwrap();
    let mention = store.weight(FeatureType::MentionFrequency).unwrap();
    assert!((co - 0.87).abs() < 1e-9);
    assert!((mention - 0.33).abs() < 1e-9);

    assert_eq!(report.adjustments.len(), 2);
    assert_eq!(report.feedback_consumed, 3);
    assert_eq!(report.version_before, 0);
    assert_eq!(report.version_after, 2);
    assert!(report.cursor.is_some());
    assert_eq!(learner.metrics().total_updates(), 2);

    let history = store.weight_history(FeatureType::CoOccurrence).unwrap();
    assert_eq!(history.len(), 1);
    assert_eq!(history[0].reason, WeightChangeReason::Calibration);
    assert_eq!(history[0].previous_weight, 0.8);
    let record = store
        .weight_records()
        .unwrap()
        .into_iter()
        .find(|r| r.feature_type == FeatureType::CoOccurrence)
        .unwrap();
    assert_eq!(record.last_calibrated_at, Some(10_000));
}

#[test]
fn test_second_run_without_new_feedback_is_a_no_op() {
    let mut store = SqliteStore::in_memory().unwrap();
    decided(&mut store, 2, FeedbackAction::Accept, vec![feature(FeatureType::SharedFaction, 0.8)], 100);

    let mut learner = learner(LearnerConfig::default());
    learner
        .recalibrate(&mut store, RecalibrationWindow::SinceLastCalibration)
        .unwrap();
    let after_first = store.snapshot().unwrap();

    let second = learner
        .recalibrate(&mut store, RecalibrationWindow::SinceLastCalibration)
        .unwrap();

    assert_eq!(second.feedback_consumed, 0);
    assert!(!second.changed());
    assert_eq!(store.snapshot().unwrap(), after_first);
    assert_eq!(learner.metrics().run_count, 2);
}

#[test]
fn test_dismissals_are_not_learned() {
    let mut store = SqliteStore::in_memory().unwrap();
    decided(&mut store, 2, FeedbackAction::Dismiss, vec![feature(FeatureType::CoOccurrence, 1.0)], 100);

    let mut learner = learner(LearnerConfig::default());
    let report = learner
        .recalibrate(&mut store, RecalibrationWindow::SinceLastCalibration)
        .unwrap();

    assert_eq!(report.samples_excluded, 1);
    assert!(report.adjustments.is_empty());
    assert_eq!(store.snapshot().unwrap().version(), 0);
    // Consumed anyway
    assert_eq!(store.calibration_cursor().unwrap(), report.cursor.unwrap());
}

#[test]
fn test_small_deltas_are_skipped() {
    let mut store = SqliteStore::in_memory().unwrap();
    decided(&mut store, 2, FeedbackAction::Accept, vec![feature(FeatureType::CoOccurrence, 0.01)], 100);

    let config = LearnerConfig {
        min_delta: 0.01,
        ..LearnerConfig::default()
    };
    let report = learner(config)
        .recalibrate(&mut store, RecalibrationWindow::SinceLastCalibration)
        .unwrap();

    assert_eq!(report.skipped, vec![FeatureType::CoOccurrence]);
    assert_eq!(store.snapshot().unwrap().version(), 0);
}

#[test]
fn test_dry_run_commits_nothing() {
    let mut store = SqliteStore::in_memory().unwrap();
    decided(&mut store, 2, FeedbackAction::Accept, vec![feature(FeatureType::CoOccurrence, 1.0)], 100);

    let config = LearnerConfig {
        dry_run: true,
        ..LearnerConfig::default()
    };
    let report = learner(config)
        .recalibrate(&mut store, RecalibrationWindow::SinceLastCalibration)
        .unwrap();

    assert_eq!(report.adjustments.len(), 1);
    assert!(!report.changed());
    assert_eq!(store.snapshot().unwrap().version(), 0);
    assert_eq!(store.calibration_cursor().unwrap(), 0);
}

#[test]
fn test_trailing_window_drops_old_feedback() {
    let mut store = SqliteStore::in_memory().unwrap();
    decided(&mut store, 2, FeedbackAction::Reject, vec![feature(FeatureType::CoOccurrence, 1.0)], 1_000);
    decided(&mut store, 3, FeedbackAction::Accept, vec![feature(FeatureType::CoOccurrence, 1.0)], 9_500);

    let report = learner(LearnerConfig::default())
        .recalibrate(
            &mut store,
            RecalibrationWindow::Trailing(Duration::from_secs(3_600)),
        )
        .unwrap();

    assert_eq!(report.feedback_consumed, 1);
    assert!(store.weight(FeatureType::CoOccurrence).unwrap() > 0.8);
}

#[test]
fn test_reset_restores_defaults() {
    let mut store = SqliteStore::in_memory().unwrap();
    store.set_weight(FeatureType::SharedLocation, 0.1, 1).unwrap();

    let snapshot = learner(LearnerConfig::default()).reset(&mut store).unwrap();

    assert_eq!(snapshot.weight(FeatureType::SharedLocation), 0.55);
    assert_eq!(store.weight(FeatureType::SharedLocation).unwrap(), 0.55);
}

/// Store whose weight version is moved by a concurrent writer on chosen
/// commit calls, and whose commits of `failing` error out
struct RacingStore {
    inner: SqliteStore,
    calls: usize,
    interfere_on: Vec<usize>,
    failing: Option<FeatureType>,
}

impl RacingStore {
    fn new(inner: SqliteStore, interfere_on: Vec<usize>) -> Self {
        Self {
            inner,
            calls: 0,
            interfere_on,
            failing: None,
        }
    }
}

impl SuggestionStore for RacingStore {
    type Error = StoreError;

    fn insert_suggestion(&mut self, s: &Suggestion, f: &[Feature], fb: Option<&Feedback>) -> Result<(), StoreError> {
        self.inner.insert_suggestion(s, f, fb)
    }

    fn get_suggestion(&self, id: SuggestionId) -> Result<Option<Suggestion>, StoreError> {
        self.inner.get_suggestion(id)
    }

    fn get_features(&self, id: SuggestionId) -> Result<Vec<Feature>, StoreError> {
        self.inner.get_features(id)
    }

    fn query_suggestions(&self, query: &SuggestionQuery) -> Result<Vec<Suggestion>, StoreError> {
        self.inner.query_suggestions(query)
    }

    fn apply_transition(&mut self, updated: &Suggestion, feedback: &Feedback) -> Result<TransitionOutcome, StoreError> {
        self.inner.apply_transition(updated, feedback)
    }

    fn get_feedback(&self, id: SuggestionId) -> Result<Option<Feedback>, StoreError> {
        self.inner.get_feedback(id)
    }

    fn feedback_after(&self, after: u64, since: Option<u64>) -> Result<Vec<RecordedFeedback>, StoreError> {
        self.inner.feedback_after(after, since)
    }
}

impl WeightStore for RacingStore {
    type Error = StoreError;

    fn weight(&self, ft: FeatureType) -> Result<f64, StoreError> {
        self.inner.weight(ft)
    }

    fn set_weight(&mut self, ft: FeatureType, w: f64, at: u64) -> Result<WeightRecord, StoreError> {
        self.inner.set_weight(ft, w, at)
    }

    fn snapshot(&self) -> Result<WeightSnapshot, StoreError> {
        self.inner.snapshot()
    }

    fn weight_records(&self) -> Result<Vec<WeightRecord>, StoreError> {
        self.inner.weight_records()
    }

    fn reset_weights(&mut self, at: u64) -> Result<WeightSnapshot, StoreError> {
        self.inner.reset_weights(at)
    }

    fn commit_weight(
        &mut self,
        expected: u64,
        ft: FeatureType,
        w: f64,
        consumed_through: u64,
        at: u64,
    ) -> Result<WeightCommit, StoreError> {
        if self.failing == Some(ft) {
            return Err(StoreError::InvalidData(format!("{} column unavailable", ft)));
        }
        self.calls += 1;
        if self.interfere_on.contains(&self.calls) {
            // Another writer touches a type the batch does not carry
            self.inner.set_weight(FeatureType::NetworkCentrality, 0.5, at)?;
        }
        self.inner.commit_weight(expected, ft, w, consumed_through, at)
    }

    fn weight_history(&self, ft: FeatureType) -> Result<Vec<WeightHistoryEntry>, StoreError> {
        self.inner.weight_history(ft)
    }

    fn calibration_cursor(&self) -> Result<u64, StoreError> {
        self.inner.calibration_cursor()
    }

    fn advance_calibration_cursor(&mut self, sequence: u64, at: u64) -> Result<(), StoreError> {
        self.inner.advance_calibration_cursor(sequence, at)
    }
}

fn calibrations<S: WeightStore<Error = StoreError>>(store: &S, feature_type: FeatureType) -> usize {
    store
        .weight_history(feature_type)
        .unwrap()
        .into_iter()
        .filter(|e| e.reason == WeightChangeReason::Calibration)
        .count()
}

fn two_type_store() -> SqliteStore {
    let mut store = SqliteStore::in_memory().unwrap();
    decided(
        &mut store,
        2,
        FeedbackAction::Accept,
        vec![
            feature(FeatureType::CoOccurrence, 1.0),
            feature(FeatureType::TimelineProximity, 1.0),
        ],
        100,
    );
    store
}

#[test]
fn test_conflict_retry_skips_committed_types() {
    // The second commit (timeline_proximity) races with another writer
    let mut store = RacingStore::new(two_type_store(), vec![2]);

    let report = learner(LearnerConfig::default())
        .recalibrate(&mut store, RecalibrationWindow::SinceLastCalibration)
        .unwrap();

    assert_eq!(report.attempts, 2);
    assert_eq!(report.adjustments.len(), 2);
    assert_eq!(calibrations(&store, FeatureType::CoOccurrence), 1);
    assert_eq!(calibrations(&store, FeatureType::TimelineProximity), 1);
}

#[test]
fn test_conflict_exhaustion_keeps_committed_steps() {
    // Every commit after the first races
    let mut store = RacingStore::new(two_type_store(), (2..100).collect());

    let result = learner(LearnerConfig::default())
        .recalibrate(&mut store, RecalibrationWindow::SinceLastCalibration);

    assert!(matches!(result, Err(LearnerError::Conflict { attempts: 3 })));
    assert!((store.weight(FeatureType::CoOccurrence).unwrap() - 0.87).abs() < 1e-9);
    assert_eq!(store.weight(FeatureType::TimelineProximity).unwrap(), 0.6);
    assert_eq!(store.calibration_cursor().unwrap(), 0);
}

#[test]
fn test_rerun_after_conflict_does_not_learn_twice() {
    let mut store = RacingStore::new(two_type_store(), (2..100).collect());
    let mut learner = learner(LearnerConfig::default());

    let result = learner.recalibrate(&mut store, RecalibrationWindow::SinceLastCalibration);
    assert!(matches!(result, Err(LearnerError::Conflict { .. })));

    // The other writer is gone; the same batch is read again
    store.interfere_on.clear();
    let report = learner
        .recalibrate(&mut store, RecalibrationWindow::SinceLastCalibration)
        .unwrap();

    assert_eq!(report.feedback_consumed, 1);
    assert_eq!(report.adjustments.len(), 1);
    assert_eq!(report.adjustments[0].feature_type, FeatureType::TimelineProximity);
    assert!((store.weight(FeatureType::CoOccurrence).unwrap() - 0.87).abs() < 1e-9);
    assert!((store.weight(FeatureType::TimelineProximity).unwrap() - 0.67).abs() < 1e-9);
    assert_eq!(calibrations(&store, FeatureType::CoOccurrence), 1);
    assert_eq!(calibrations(&store, FeatureType::TimelineProximity), 1);
    assert_eq!(store.calibration_cursor().unwrap(), report.cursor.unwrap());

    // Later feedback is still learned by the type that committed early
    decided(&mut store.inner, 3, FeedbackAction::Accept, vec![feature(FeatureType::CoOccurrence, 1.0)], 200);
    let report = learner
        .recalibrate(&mut store, RecalibrationWindow::SinceLastCalibration)
        .unwrap();

    assert_eq!(report.feedback_consumed, 1);
    assert!((store.weight(FeatureType::CoOccurrence).unwrap() - 0.94).abs() < 1e-9);
    assert_eq!(calibrations(&store, FeatureType::CoOccurrence), 2);
    assert_eq!(calibrations(&store, FeatureType::TimelineProximity), 1);
}

#[test]
fn test_failed_type_does_not_stop_the_others() {
    let mut store = RacingStore::new(two_type_store(), Vec::new());
    store.failing = Some(FeatureType::TimelineProximity);
    let mut learner = learner(LearnerConfig::default());

    let report = learner
        .recalibrate(&mut store, RecalibrationWindow::SinceLastCalibration)
        .unwrap();

    assert_eq!(report.attempts, 1);
    assert_eq!(report.adjustments.len(), 1);
    assert_eq!(report.adjustments[0].feature_type, FeatureType::CoOccurrence);
    assert_eq!(report.failed.len(), 1);
    assert_eq!(report.failed[0].0, FeatureType::TimelineProximity);
    assert!(report.failed[0].1.contains("unavailable"));
    assert!((store.weight(FeatureType::CoOccurrence).unwrap() - 0.87).abs() < 1e-9);
    assert_eq!(store.weight(FeatureType::TimelineProximity).unwrap(), 0.6);
    // Held so the failed type can learn the batch later
    assert_eq!(report.cursor, None);
    assert_eq!(store.calibration_cursor().unwrap(), 0);

    store.failing = None;
    let report = learner
        .recalibrate(&mut store, RecalibrationWindow::SinceLastCalibration)
        .unwrap();

    assert!(report.failed.is_empty());
    assert!((store.weight(FeatureType::TimelineProximity).unwrap() - 0.67).abs() < 1e-9);
    assert_eq!(calibrations(&store, FeatureType::CoOccurrence), 1);
    assert!(store.calibration_cursor().unwrap() > 0);
}
