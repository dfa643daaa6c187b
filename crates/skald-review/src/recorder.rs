//! Feedback capture

use skald_domain::{Decision, Feature, Feedback, Suggestion};
use tracing::warn;

/// Captures the decision context whenever a suggestion leaves pending
#[derive(Debug, Clone, Copy, Default)]
pub struct FeedbackRecorder;

impl FeedbackRecorder {
    /// Create a recorder
    pub fn new() -> Self {
        Self
    }

    /// Build the feedback record for a decision taken at `at`
    ///
    /// A missing snapshot degrades the learning value but never blocks the
    /// decision.
    pub fn record(
        &self,
        suggestion: &Suggestion,
        decision: Decision,
        features: Vec<Feature>,
        at: u64,
    ) -> Feedback {
        if features.is_empty() {
            warn!(
                "No feature snapshot for suggestion {}; recording degraded feedback",
                suggestion.id
            );
        }
        if at < suggestion.created_at {
            warn!(
                "Decision on suggestion {} predates its creation ({} < {})",
                suggestion.id, at, suggestion.created_at
            );
        }

        Feedback::record(suggestion, decision, Some(features), at)
    }
}
