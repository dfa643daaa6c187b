//! Feedback module - append-only records of review decisions
//!
//! Every terminal transition of a suggestion produces exactly one feedback
//! record. Besides the decision itself, the record keeps a verbatim copy of
//! the confidence and features the reviewer saw, plus three derived measures
//! used by the weight learner:
//!
//! - whether the decision agreed with the confidence ("appropriateness")
//! - a 0-100 quality score of the decision
//! - a 0-1 learning value: how informative the sample is for recalibration
//!
//! Learning values are accumulated in integer hundredths so threshold
//! comparisons such as `>= 0.8` are exact.

use crate::{Feature, RelationshipLabel, Score, Suggestion, SuggestionId, SuggestionStatus, ValidationError};
use std::fmt;

/// Unique identifier for a feedback record based on UUIDv7
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct FeedbackId(u128);

impl FeedbackId {
    /// Generate a new UUIDv7-based FeedbackId
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create a FeedbackId from a raw u128 value (storage deserialization)
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl Default for FeedbackId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for FeedbackId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

/// Decision taken on a suggestion
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FeedbackAction {
    /// Relationship accepted as proposed
    Accept,
    /// Relationship rejected
    Reject,
    /// Relationship accepted with corrections
    Modify,
    /// Suggestion set aside without judging it; excluded from learning
    Dismiss,
}

impl FeedbackAction {
    /// Get the action name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            FeedbackAction::Accept => "accept",
            FeedbackAction::Reject => "reject",
            FeedbackAction::Modify => "modify",
            FeedbackAction::Dismiss => "dismiss",
        }
    }

    /// Parse an action from its name
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "accept" => Some(FeedbackAction::Accept),
            "reject" => Some(FeedbackAction::Reject),
            "modify" => Some(FeedbackAction::Modify),
            "dismiss" => Some(FeedbackAction::Dismiss),
            _ => None,
        }
    }

    /// Whether the action confirms the relationship
    pub fn is_positive(&self) -> bool {
        matches!(self, FeedbackAction::Accept | FeedbackAction::Modify)
    }

    /// Polarity used by the learner; `None` excludes the sample
    pub fn outcome_sign(&self) -> Option<f64> {
        match self {
            FeedbackAction::Accept | FeedbackAction::Modify => Some(1.0),
            FeedbackAction::Reject => Some(-1.0),
            FeedbackAction::Dismiss => None,
        }
    }

    /// Status a pending suggestion moves to under this action
    pub fn resulting_status(&self) -> SuggestionStatus {
        match self {
            FeedbackAction::Accept => SuggestionStatus::Accepted,
            FeedbackAction::Reject | FeedbackAction::Dismiss => SuggestionStatus::Rejected,
            FeedbackAction::Modify => SuggestionStatus::Modified,
        }
    }
}

impl fmt::Display for FeedbackAction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FeedbackAction {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ValidationError::UnknownAction(s.to_string()))
    }
}

/// How long a reviewer took to decide
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum DecisionSpeed {
    /// Under 10 seconds
    Instant,
    /// Under a minute
    Quick,
    /// Under five minutes
    Considered,
    /// Five minutes or more
    Slow,
}

impl DecisionSpeed {
    /// Bucket a decision time in seconds
    pub fn from_seconds(seconds: u64) -> Self {
        match seconds {
            0..=9 => DecisionSpeed::Instant,
            10..=59 => DecisionSpeed::Quick,
            60..=299 => DecisionSpeed::Considered,
            _ => DecisionSpeed::Slow,
        }
    }

    /// Get the bucket name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            DecisionSpeed::Instant => "instant",
            DecisionSpeed::Quick => "quick",
            DecisionSpeed::Considered => "considered",
            DecisionSpeed::Slow => "slow",
        }
    }

    /// Parse a bucket from its name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "instant" => Some(DecisionSpeed::Instant),
            "quick" => Some(DecisionSpeed::Quick),
            "considered" => Some(DecisionSpeed::Considered),
            "slow" => Some(DecisionSpeed::Slow),
            _ => None,
        }
    }

    fn quality_bonus(&self) -> i32 {
        match self {
            DecisionSpeed::Instant => 15,
            DecisionSpeed::Quick => 10,
            DecisionSpeed::Considered => 5,
            DecisionSpeed::Slow => 0,
        }
    }
}

/// Corrections a reviewer supplied with a modify decision
#[derive(Debug, Clone, PartialEq, Default)]
pub struct UserCorrection {
    /// Corrected relationship label
    pub relationship_type: Option<RelationshipLabel>,
    /// Corrected strength [0, 100]
    pub strength: Option<Score>,
}

impl UserCorrection {
    /// Whether the correction changes nothing
    pub fn is_empty(&self) -> bool {
        self.relationship_type.is_none() && self.strength.is_none()
    }
}

/// Confidence at or above which a positive decision is expected
pub const HIGH_CONFIDENCE: f64 = 75.0;

/// Confidence below which a rejection is expected
pub const LOW_CONFIDENCE: f64 = 50.0;

/// Confidence at or above which decision speed affects quality
pub const SPEED_BONUS_CONFIDENCE: f64 = 80.0;

/// Feedback text longer than this (in characters) earns a quality bonus
pub const DETAILED_FEEDBACK_CHARS: usize = 20;

/// Whether a decision agrees with the confidence the reviewer was shown
///
/// High confidence (>= 75) expects a positive action, low confidence (< 50)
/// expects a rejection, and the middle band accepts any decision.
pub fn is_confidence_appropriate(confidence: Score, action: FeedbackAction) -> bool {
    let c = confidence.value();
    if c >= HIGH_CONFIDENCE {
        action.is_positive()
    } else if c < LOW_CONFIDENCE {
        action == FeedbackAction::Reject
    } else {
        true
    }
}

/// Quality of a decision on the 0-100 scale
pub fn quality_score(
    confidence: Score,
    action: FeedbackAction,
    speed: DecisionSpeed,
    feedback_text: Option<&str>,
) -> Score {
    let mut score: i32 = 50;
    score += if is_confidence_appropriate(confidence, action) { 25 } else { -15 };
    if confidence.value() >= SPEED_BONUS_CONFIDENCE {
        score += speed.quality_bonus();
    }
    if action == FeedbackAction::Modify {
        score += 10;
    }
    if feedback_text.is_some_and(|t| t.chars().count() > DETAILED_FEEDBACK_CHARS) {
        score += 10;
    }
    Score::clamped(f64::from(score.clamp(0, 100)))
}

/// Whether the decision strongly contradicts the confidence
fn is_strong_surprise(confidence: Score, action: FeedbackAction) -> bool {
    let c = confidence.value();
    (c >= 90.0 && action == FeedbackAction::Reject) || (c <= 30.0 && action == FeedbackAction::Accept)
}

/// How informative a decision is for recalibration, in [0, 1]
///
/// Starts at 0.5. A strong surprise (rejecting >= 90 or accepting <= 30)
/// adds 0.3; any other confidence-inappropriate decision adds 0.1.
/// Modifications add 0.2, a present feature snapshot 0.1 and a human
/// (not auto-accepted) decision 0.1. The result is capped at 1.0.
pub fn learning_value(
    confidence: Score,
    action: FeedbackAction,
    snapshot_present: bool,
    was_auto_accepted: bool,
) -> f64 {
    let mut hundredths: u32 = 50;
    if is_strong_surprise(confidence, action) {
        hundredths += 30;
    } else if !is_confidence_appropriate(confidence, action) {
        hundredths += 10;
    }
    if action == FeedbackAction::Modify {
        hundredths += 20;
    }
    if snapshot_present {
        hundredths += 10;
    }
    if !was_auto_accepted {
        hundredths += 10;
    }
    f64::from(hundredths.min(100)) / 100.0
}

/// The decision handed to [`Feedback::record`]
#[derive(Debug, Clone, PartialEq)]
pub struct Decision {
    /// What was decided
    pub action: FeedbackAction,
    /// Who decided ("system" for auto-accepts)
    pub actor: String,
    /// Reviewer corrections (modify only)
    pub corrections: Option<UserCorrection>,
    /// Free-text reviewer comment
    pub feedback_text: Option<String>,
    /// Whether the auto-accept policy took the decision
    pub was_auto_accepted: bool,
}

impl Decision {
    /// A human decision without corrections or text
    pub fn by(action: FeedbackAction, actor: impl Into<String>) -> Self {
        Self {
            action,
            actor: actor.into(),
            corrections: None,
            feedback_text: None,
            was_auto_accepted: false,
        }
    }

    /// Attach reviewer text
    pub fn with_text(mut self, text: Option<String>) -> Self {
        self.feedback_text = text.filter(|t| !t.trim().is_empty());
        self
    }

    /// Attach corrections
    pub fn with_corrections(mut self, corrections: UserCorrection) -> Self {
        self.corrections = Some(corrections);
        self
    }
}

/// An immutable record of one decision on one suggestion
#[derive(Debug, Clone, PartialEq)]
pub struct Feedback {
    /// Unique identifier
    pub id: FeedbackId,
    /// Suggestion the decision was taken on
    pub suggestion_id: SuggestionId,
    /// What was decided
    pub action: FeedbackAction,
    /// Who decided
    pub actor: String,
    /// Reviewer corrections
    pub corrections: Option<UserCorrection>,
    /// Reviewer comment
    pub feedback_text: Option<String>,
    /// Confidence of the suggestion when the decision was taken
    pub confidence_at_decision: Score,
    /// Features of the suggestion when the decision was taken
    pub feature_snapshot: Option<Vec<Feature>>,
    /// Seconds between suggestion creation and decision
    pub time_to_decision: u64,
    /// Bucketed decision time
    pub decision_speed: DecisionSpeed,
    /// Whether the decision agreed with the confidence
    pub confidence_appropriate: bool,
    /// Decision quality [0, 100]
    pub quality_score: Score,
    /// Whether the auto-accept policy took the decision
    pub was_auto_accepted: bool,
    /// Informativeness for the learner [0, 1]
    pub learning_value: f64,
    /// When the decision was recorded
    pub created_at: u64,
}

impl Feedback {
    /// Record a decision taken on `suggestion` at `decided_at`
    ///
    /// An absent or empty feature snapshot does not prevent recording; it
    /// lowers the learning value instead.
    pub fn record(
        suggestion: &Suggestion,
        decision: Decision,
        feature_snapshot: Option<Vec<Feature>>,
        decided_at: u64,
    ) -> Self {
        let feature_snapshot = feature_snapshot.filter(|features| !features.is_empty());
        let confidence = suggestion.confidence;
        let time_to_decision = suggestion.age_at(decided_at);
        let decision_speed = DecisionSpeed::from_seconds(time_to_decision);

        Self {
            id: FeedbackId::new(),
            suggestion_id: suggestion.id,
            action: decision.action,
            confidence_appropriate: is_confidence_appropriate(confidence, decision.action),
            quality_score: quality_score(
                confidence,
                decision.action,
                decision_speed,
                decision.feedback_text.as_deref(),
            ),
            learning_value: learning_value(
                confidence,
                decision.action,
                feature_snapshot.is_some(),
                decision.was_auto_accepted,
            ),
            actor: decision.actor,
            corrections: decision.corrections.filter(|c| !c.is_empty()),
            feedback_text: decision.feedback_text,
            confidence_at_decision: confidence,
            feature_snapshot,
            time_to_decision,
            decision_speed,
            was_auto_accepted: decision.was_auto_accepted,
            created_at: decided_at,
        }
    }

    /// Whether the learner should use this sample
    pub fn is_learnable(&self) -> bool {
        self.action.outcome_sign().is_some()
    }
}
