//! Trait definitions for external interactions
//!
//! These traits define the boundaries between domain logic and infrastructure.
//! Infrastructure implementations live in other crates.

use crate::{
    Candidate, Feature, FeatureType, Feedback, RawSignal, Suggestion, SuggestionId,
    SuggestionStatus, WeightHistoryEntry, WeightRecord, WeightSnapshot,
};
use std::time::{SystemTime, UNIX_EPOCH};

/// Outcome of a conditional lifecycle transition
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionOutcome {
    /// The suggestion was pending; status and feedback were committed together
    Applied,
    /// The suggestion had already left pending; nothing was written
    NotPending(SuggestionStatus),
    /// No suggestion with that id exists
    NotFound,
}

/// Feedback together with its store-assigned sequence number
///
/// Sequence numbers increase in commit order and serve as the learner's
/// cursor.
#[derive(Debug, Clone, PartialEq)]
pub struct RecordedFeedback {
    /// Commit-order sequence number
    pub sequence: u64,
    /// The feedback record
    pub feedback: Feedback,
}

/// Query criteria for retrieving suggestions
#[derive(Debug, Clone, Default)]
pub struct SuggestionQuery {
    /// Filter by scope (saga)
    pub scope: Option<String>,

    /// Filter by status
    pub status: Option<SuggestionStatus>,

    /// Filter by minimum priority
    pub min_priority: Option<f64>,

    /// Maximum results to return
    pub limit: Option<usize>,
}

impl SuggestionQuery {
    /// Pending suggestions, optionally limited to one scope
    pub fn pending(scope: Option<String>) -> Self {
        Self {
            scope,
            status: Some(SuggestionStatus::Pending),
            ..Default::default()
        }
    }
}

/// Trait for storing suggestions and their feedback
///
/// Implemented by the infrastructure layer (skald-store). Query results are
/// ordered by priority (descending), then creation time (ascending).
pub trait SuggestionStore {
    /// Error type for store operations
    type Error;

    /// Insert a freshly scored suggestion with its features
    ///
    /// Suggestions created in a terminal state (auto-accepted) carry their
    /// feedback, which must be committed in the same transaction.
    fn insert_suggestion(
        &mut self,
        suggestion: &Suggestion,
        features: &[Feature],
        feedback: Option<&Feedback>,
    ) -> Result<(), Self::Error>;

    /// Get a suggestion by ID
    fn get_suggestion(&self, id: SuggestionId) -> Result<Option<Suggestion>, Self::Error>;

    /// Get the features recorded for a suggestion
    fn get_features(&self, id: SuggestionId) -> Result<Vec<Feature>, Self::Error>;

    /// Query suggestions matching criteria
    fn query_suggestions(&self, query: &SuggestionQuery) -> Result<Vec<Suggestion>, Self::Error>;

    /// Move a pending suggestion to `updated.status` and append `feedback`
    ///
    /// The status change is conditional on the stored status still being
    /// pending; both writes commit atomically or not at all.
    fn apply_transition(
        &mut self,
        updated: &Suggestion,
        feedback: &Feedback,
    ) -> Result<TransitionOutcome, Self::Error>;

    /// Get the feedback recorded for a suggestion
    fn get_feedback(&self, id: SuggestionId) -> Result<Option<Feedback>, Self::Error>;

    /// Feedback with a sequence number greater than `after_sequence`,
    /// optionally restricted to records created at or after `created_since`
    fn feedback_after(
        &self,
        after_sequence: u64,
        created_since: Option<u64>,
    ) -> Result<Vec<RecordedFeedback>, Self::Error>;
}

/// Result of a conditional weight write
#[derive(Debug, Clone, PartialEq)]
pub enum WeightCommit {
    /// The version matched and the new record was written
    Committed(WeightRecord),
    /// The store version moved; nothing was written
    Conflict {
        /// Version found in the store
        current_version: u64,
    },
}

/// Trait for the versioned feature weight store
///
/// Every mutation bumps the store version. Implemented by the
/// infrastructure layer (skald-store).
pub trait WeightStore {
    /// Error type for store operations
    type Error;

    /// Weight for a feature type, falling back to its default
    fn weight(&self, feature_type: FeatureType) -> Result<f64, Self::Error>;

    /// Set a weight explicitly; fails when the weight is outside [0, 1]
    fn set_weight(
        &mut self,
        feature_type: FeatureType,
        weight: f64,
        at: u64,
    ) -> Result<WeightRecord, Self::Error>;

    /// Consistent view of every weight and the version it was read at
    fn snapshot(&self) -> Result<WeightSnapshot, Self::Error>;

    /// Live weight records (explicitly set types only)
    fn weight_records(&self) -> Result<Vec<WeightRecord>, Self::Error>;

    /// Restore every feature type to its default weight
    fn reset_weights(&mut self, at: u64) -> Result<WeightSnapshot, Self::Error>;

    /// Write a calibrated weight only if the store is still at `expected_version`
    ///
    /// `consumed_through` is the last feedback sequence the weight was
    /// learned from; it is recorded with the weight in the same write and
    /// never moves backwards.
    fn commit_weight(
        &mut self,
        expected_version: u64,
        feature_type: FeatureType,
        weight: f64,
        consumed_through: u64,
        at: u64,
    ) -> Result<WeightCommit, Self::Error>;

    /// Audit trail of one feature type, oldest first
    fn weight_history(&self, feature_type: FeatureType) -> Result<Vec<WeightHistoryEntry>, Self::Error>;

    /// Sequence number of the last feedback consumed by a calibration
    fn calibration_cursor(&self) -> Result<u64, Self::Error>;

    /// Record that feedback up to `sequence` has been consumed
    ///
    /// Does not change the weight version.
    fn advance_calibration_cursor(&mut self, sequence: u64, at: u64) -> Result<(), Self::Error>;
}

/// Trait for the external feature extraction service
pub trait FeatureExtractor {
    /// Error type for extraction
    type Error;

    /// Raw signals for a candidate entity pair
    fn extract(&self, candidate: &Candidate) -> Result<Vec<RawSignal>, Self::Error>;
}

/// Justification attached verbatim to a suggestion
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Reasoning {
    /// Human-readable justification
    pub text: Option<String>,
    /// Strength estimate [0, 100]
    pub strength: Option<f64>,
    /// Evidence snippets
    pub evidence: Vec<String>,
}

/// Trait for the external reasoning / explanation collaborator
pub trait Reasoner {
    /// Error type for reasoning
    type Error;

    /// Explain a candidate given its weighted features
    fn explain(&self, candidate: &Candidate, features: &[Feature]) -> Result<Reasoning, Self::Error>;
}

/// Source of the current time in seconds since the Unix epoch
pub trait Clock {
    /// Current timestamp
    fn now(&self) -> u64;
}

/// Wall-clock time
#[derive(Debug, Clone, Copy, Default)]
pub struct SystemClock;

impl Clock for SystemClock {
    fn now(&self) -> u64 {
        SystemTime::now()
            .duration_since(UNIX_EPOCH)
            .map(|d| d.as_secs())
            .unwrap_or(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_system_clock_is_recent() {
        // After 2020-01-01
        assert!(SystemClock.now() > 1_577_836_800);
    }

    #[test]
    fn test_pending_query() {
        let query = SuggestionQuery::pending(Some("saga-1".to_string()));
        assert_eq!(query.status, Some(SuggestionStatus::Pending));
        assert_eq!(query.scope.as_deref(), Some("saga-1"));
        assert!(query.limit.is_none());
    }
}
