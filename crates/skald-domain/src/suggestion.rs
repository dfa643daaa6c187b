//! Suggestion module - candidate relationships awaiting or past review

use crate::{UserCorrection, ValidationError};
use std::fmt;

/// Unique identifier for a suggestion based on UUIDv7
///
/// UUIDv7 keeps identifiers chronologically sortable, so suggestions created
/// later compare greater.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct SuggestionId(u128);

impl SuggestionId {
    /// Generate a new UUIDv7-based SuggestionId
    ///
    /// # Examples
    ///
    /// ```
    /// use skald_domain::SuggestionId;
    ///
    /// let id = SuggestionId::new();
    /// assert!(id.value() > 0);
    /// ```
    pub fn new() -> Self {
        Self(uuid::Uuid::now_v7().as_u128())
    }

    /// Create a SuggestionId from a raw u128 value (storage deserialization)
    pub fn from_value(value: u128) -> Self {
        Self(value)
    }

    /// Parse a SuggestionId from a UUID string
    pub fn from_string(s: &str) -> Result<Self, String> {
        uuid::Uuid::parse_str(s.trim())
            .map(|u| Self(u.as_u128()))
            .map_err(|e| format!("Invalid suggestion id: {}", e))
    }

    /// Get the raw u128 value
    pub fn value(&self) -> u128 {
        self.0
    }
}

impl Default for SuggestionId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for SuggestionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", uuid::Uuid::from_u128(self.0))
    }
}

/// Identifier of a narrative entity (character, faction, ...) in the saga
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct EntityId(pub u64);

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Labels that earn a priority bonus because reviewers care most about them
pub const IMPORTANT_LABELS: [&str; 4] = ["family", "mentor", "enemy", "ally"];

/// Maximum length of a relationship label
pub const MAX_LABEL_LEN: usize = 64;

/// Proposed relationship label (e.g. "ally", "mentor")
///
/// Labels are trimmed and lowercased; empty or overlong labels are rejected.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct RelationshipLabel(String);

impl RelationshipLabel {
    /// Validate and normalize a label
    pub fn new(label: &str) -> Result<Self, ValidationError> {
        let normalized = label.trim().to_lowercase();
        if normalized.is_empty() || normalized.chars().count() > MAX_LABEL_LEN {
            return Err(ValidationError::InvalidLabel(label.to_string()));
        }
        Ok(Self(normalized))
    }

    /// The normalized label text
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the label belongs to the important set
    pub fn is_important(&self) -> bool {
        IMPORTANT_LABELS.contains(&self.0.as_str())
    }
}

impl fmt::Display for RelationshipLabel {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// How a suggestion was generated
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum GenerationMethod {
    /// Content analysis
    Content,
    /// Timeline analysis
    Timeline,
    /// Attribute comparison
    Attribute,
    /// Embedding similarity
    Semantic,
    /// Combination of several methods
    Hybrid,
}

impl GenerationMethod {
    /// All methods, in declaration order
    pub const ALL: [GenerationMethod; 5] = [
        GenerationMethod::Content,
        GenerationMethod::Timeline,
        GenerationMethod::Attribute,
        GenerationMethod::Semantic,
        GenerationMethod::Hybrid,
    ];

    /// Get the method name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            GenerationMethod::Content => "content",
            GenerationMethod::Timeline => "timeline",
            GenerationMethod::Attribute => "attribute",
            GenerationMethod::Semantic => "semantic",
            GenerationMethod::Hybrid => "hybrid",
        }
    }

    /// Parse a method from its name
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "content" => Some(GenerationMethod::Content),
            "timeline" => Some(GenerationMethod::Timeline),
            "attribute" => Some(GenerationMethod::Attribute),
            "semantic" => Some(GenerationMethod::Semantic),
            "hybrid" => Some(GenerationMethod::Hybrid),
            _ => None,
        }
    }

    /// Priority bonus for suggestions produced by this method
    pub fn priority_bonus(&self) -> f64 {
        match self {
            GenerationMethod::Hybrid => 10.0,
            GenerationMethod::Semantic => 5.0,
            GenerationMethod::Content => 3.0,
            GenerationMethod::Timeline => 2.0,
            GenerationMethod::Attribute => 1.0,
        }
    }
}

impl fmt::Display for GenerationMethod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for GenerationMethod {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ValidationError::UnknownMethod(s.to_string()))
    }
}

/// Review status of a suggestion
///
/// `Pending` is the only non-terminal state. Every other state is reached at
/// most once and never left.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SuggestionStatus {
    /// Awaiting review
    Pending,
    /// Accepted by a reviewer
    Accepted,
    /// Rejected (or dismissed) by a reviewer
    Rejected,
    /// Accepted with corrections
    Modified,
    /// Accepted by the auto-accept policy without review
    AutoAccepted,
}

impl SuggestionStatus {
    /// Get the status name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            SuggestionStatus::Pending => "pending",
            SuggestionStatus::Accepted => "accepted",
            SuggestionStatus::Rejected => "rejected",
            SuggestionStatus::Modified => "modified",
            SuggestionStatus::AutoAccepted => "auto_accepted",
        }
    }

    /// Parse a status from its name
    pub fn parse(s: &str) -> Option<Self> {
        match s.trim().to_lowercase().as_str() {
            "pending" => Some(SuggestionStatus::Pending),
            "accepted" => Some(SuggestionStatus::Accepted),
            "rejected" => Some(SuggestionStatus::Rejected),
            "modified" => Some(SuggestionStatus::Modified),
            "auto_accepted" => Some(SuggestionStatus::AutoAccepted),
            _ => None,
        }
    }

    /// Whether the status is final
    pub fn is_terminal(&self) -> bool {
        !matches!(self, SuggestionStatus::Pending)
    }

    /// Whether `self -> next` is a legal lifecycle transition
    pub fn can_transition_to(&self, next: SuggestionStatus) -> bool {
        matches!(self, SuggestionStatus::Pending) && next.is_terminal()
    }
}

impl fmt::Display for SuggestionStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for SuggestionStatus {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ValidationError::UnknownStatus(s.to_string()))
    }
}

/// A score on the [0, 100] scale (confidence, strength, priority)
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd)]
pub struct Score(f64);

impl Score {
    /// Lowest possible score
    pub const MIN: Score = Score(0.0);

    /// Highest possible score
    pub const MAX: Score = Score(100.0);

    /// Create a score, rejecting values outside [0, 100]
    pub fn new(value: f64) -> Result<Self, ValidationError> {
        ValidationError::check_range("score", value, 0.0, 100.0).map(Self)
    }

    /// Create a score for a named field, rejecting values outside [0, 100]
    pub fn for_field(field: &'static str, value: f64) -> Result<Self, ValidationError> {
        ValidationError::check_range(field, value, 0.0, 100.0).map(Self)
    }

    /// Create a score by clamping into [0, 100] (NaN becomes 0)
    pub fn clamped(value: f64) -> Self {
        if value.is_nan() {
            return Self(0.0);
        }
        Self(value.clamp(0.0, 100.0))
    }

    /// The raw value
    pub fn value(&self) -> f64 {
        self.0
    }
}

impl fmt::Display for Score {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.0}", self.0)
    }
}

/// Coarse bucket of a confidence score
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfidenceLabel {
    /// >= 90
    VeryHigh,
    /// >= 75
    High,
    /// >= 60
    Medium,
    /// below 60
    Low,
}

impl ConfidenceLabel {
    /// Bucket a confidence score
    pub fn from_confidence(confidence: Score) -> Self {
        let c = confidence.value();
        if c >= 90.0 {
            ConfidenceLabel::VeryHigh
        } else if c >= 75.0 {
            ConfidenceLabel::High
        } else if c >= 60.0 {
            ConfidenceLabel::Medium
        } else {
            ConfidenceLabel::Low
        }
    }

    /// Get the label name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            ConfidenceLabel::VeryHigh => "very_high",
            ConfidenceLabel::High => "high",
            ConfidenceLabel::Medium => "medium",
            ConfidenceLabel::Low => "low",
        }
    }
}

/// A candidate entity pair handed in by the (external) candidate generator
#[derive(Debug, Clone, PartialEq)]
pub struct Candidate {
    /// Saga the candidate belongs to
    pub scope: String,
    /// Source entity
    pub source_entity_id: EntityId,
    /// Target entity
    pub target_entity_id: EntityId,
    /// Proposed relationship label
    pub relationship_type: RelationshipLabel,
    /// How the candidate was generated
    pub method: GenerationMethod,
}

impl Candidate {
    /// Create a candidate, rejecting self-relationships and empty scopes
    pub fn new(
        scope: impl Into<String>,
        source_entity_id: EntityId,
        target_entity_id: EntityId,
        relationship_type: RelationshipLabel,
        method: GenerationMethod,
    ) -> Result<Self, ValidationError> {
        let scope = scope.into();
        if scope.trim().is_empty() {
            return Err(ValidationError::EmptyScope);
        }
        if source_entity_id == target_entity_id {
            return Err(ValidationError::SelfRelationship(source_entity_id.0));
        }
        Ok(Self {
            scope,
            source_entity_id,
            target_entity_id,
            relationship_type,
            method,
        })
    }
}

/// A suggested directed relationship between two saga entities
///
/// Suggestions are created once by the scorer and change only through
/// lifecycle transitions, which produce a new record via
/// [`Suggestion::transitioned`] (and [`Suggestion::corrected`] for a
/// modification). They are never deleted.
#[derive(Debug, Clone, PartialEq)]
pub struct Suggestion {
    /// Unique identifier
    pub id: SuggestionId,

    /// Saga the suggestion belongs to
    pub scope: String,

    /// Source entity
    pub source_entity_id: EntityId,

    /// Target entity (never equal to the source)
    pub target_entity_id: EntityId,

    /// Proposed relationship label
    pub relationship_type: RelationshipLabel,

    /// Weight-normalized feature average [0, 100]
    pub confidence: Score,

    /// Relationship strength from the reasoning collaborator [0, 100]
    pub strength: Score,

    /// Review ranking [0, 100]
    pub priority: Score,

    /// How the suggestion was generated
    pub method: GenerationMethod,

    /// Review status
    pub status: SuggestionStatus,

    /// Justification text, attached verbatim
    pub reasoning: Option<String>,

    /// Evidence snippets, attached verbatim
    pub evidence: Vec<String>,

    /// Creation timestamp (seconds since Unix epoch)
    pub created_at: u64,

    /// Last status change timestamp
    pub updated_at: u64,

    /// Who took the terminal decision
    pub reviewed_by: Option<String>,

    /// When the terminal decision was taken
    pub reviewed_at: Option<u64>,
}

impl Suggestion {
    /// Check the structural invariants of a suggestion
    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.scope.trim().is_empty() {
            return Err(ValidationError::EmptyScope);
        }
        if self.source_entity_id == self.target_entity_id {
            return Err(ValidationError::SelfRelationship(self.source_entity_id.0));
        }
        Score::for_field("confidence", self.confidence.value())?;
        Score::for_field("strength", self.strength.value())?;
        Score::for_field("priority", self.priority.value())?;
        Ok(())
    }

    /// Bucketed confidence
    pub fn confidence_label(&self) -> ConfidenceLabel {
        ConfidenceLabel::from_confidence(self.confidence)
    }

    /// Seconds between creation and `at`, clamped to zero
    pub fn age_at(&self, at: u64) -> u64 {
        at.saturating_sub(self.created_at)
    }

    /// A copy of this suggestion moved to a terminal status
    ///
    /// Fails when the suggestion has already left `Pending` or when `next` is
    /// not terminal.
    pub fn transitioned(
        &self,
        next: SuggestionStatus,
        actor: &str,
        at: u64,
    ) -> Result<Suggestion, ValidationError> {
        if !self.status.can_transition_to(next) {
            return Err(ValidationError::InvalidTransition {
                from: self.status.as_str().to_string(),
                to: next.as_str().to_string(),
            });
        }
        Ok(Suggestion {
            status: next,
            updated_at: at,
            reviewed_by: Some(actor.to_string()),
            reviewed_at: Some(at),
            ..self.clone()
        })
    }

    /// A copy carrying a reviewer's corrected label and strength
    ///
    /// Confidence and priority keep the values the suggestion was scored with.
    pub fn corrected(&self, corrections: &UserCorrection) -> Suggestion {
        Suggestion {
            relationship_type: corrections
                .relationship_type
                .clone()
                .unwrap_or_else(|| self.relationship_type.clone()),
            strength: corrections.strength.unwrap_or(self.strength),
            ..self.clone()
        }
    }
}
