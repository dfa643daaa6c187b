//! Suggestion scoring
//!
//! Turns a candidate plus its weighted features into a pending suggestion
//! with confidence, strength and priority filled in.

use skald_domain::scoring::{compute_confidence, weigh_signals, PriorityBreakdown};
use skald_domain::traits::{FeatureExtractor, Reasoner, Reasoning};
use skald_domain::{
    Candidate, Feature, Score, Suggestion, SuggestionId, SuggestionStatus, WeightSnapshot,
};
use std::fmt::Display;
use tracing::debug;

use crate::ReviewError;

/// A freshly scored suggestion with the features it was scored from
#[derive(Debug, Clone, PartialEq)]
pub struct ScoredSuggestion {
    /// The suggestion, still pending
    pub suggestion: Suggestion,
    /// Weighted features, one per feature type
    pub features: Vec<Feature>,
    /// How the priority was assembled
    pub breakdown: PriorityBreakdown,
    /// Weight version the features were weighted at
    pub weights_version: u64,
}

/// Scores candidates against one weight snapshot
#[derive(Debug, Clone, Copy, Default)]
pub struct SuggestionScorer;

impl SuggestionScorer {
    /// Create a scorer
    pub fn new() -> Self {
        Self
    }

    /// Score a candidate from already weighted features
    ///
    /// The strength comes from `reasoning`; without one, the confidence is
    /// used.
    pub fn score(
        &self,
        candidate: &Candidate,
        features: Vec<Feature>,
        reasoning: Reasoning,
        weights_version: u64,
        at: u64,
    ) -> Result<ScoredSuggestion, ReviewError> {
        for feature in &features {
            feature.validate()?;
        }

        let confidence = compute_confidence(&features);
        let strength = match reasoning.strength {
            Some(s) => Score::for_field("strength", s)?,
            None => confidence,
        };
        let breakdown =
            PriorityBreakdown::new(confidence, strength, candidate.method, &candidate.relationship_type);

        let suggestion = Suggestion {
            id: SuggestionId::new(),
            scope: candidate.scope.clone(),
            source_entity_id: candidate.source_entity_id,
            target_entity_id: candidate.target_entity_id,
            relationship_type: candidate.relationship_type.clone(),
            confidence,
            strength,
            priority: breakdown.priority(),
            method: candidate.method,
            status: SuggestionStatus::Pending,
            reasoning: reasoning.text,
            evidence: reasoning.evidence,
            created_at: at,
            updated_at: at,
            reviewed_by: None,
            reviewed_at: None,
        };
        suggestion.validate()?;

        debug!(
            "Scored {} -[{}]-> {}: confidence {}, strength {}, priority {} (raw {:.1})",
            suggestion.source_entity_id,
            suggestion.relationship_type,
            suggestion.target_entity_id,
            suggestion.confidence,
            suggestion.strength,
            suggestion.priority,
            breakdown.raw()
        );

        Ok(ScoredSuggestion {
            suggestion,
            features,
            breakdown,
            weights_version,
        })
    }

    /// Drive the collaborators for one candidate and score it
    ///
    /// Raw signals come from `extractor`, weights from `snapshot` and
    /// strength plus justification from `reasoner`.
    pub fn score_candidate<E, R>(
        &self,
        candidate: &Candidate,
        extractor: &E,
        reasoner: &R,
        snapshot: &WeightSnapshot,
        at: u64,
    ) -> Result<ScoredSuggestion, ReviewError>
    where
        E: FeatureExtractor,
        E::Error: Display,
        R: Reasoner,
        R::Error: Display,
    {
        let signals = extractor
            .extract(candidate)
            .map_err(|e| ReviewError::Extraction(e.to_string()))?;
        let features = weigh_signals(&signals, snapshot)?;
        let reasoning = reasoner
            .explain(candidate, &features)
            .map_err(|e| ReviewError::Reasoning(e.to_string()))?;

        self.score(candidate, features, reasoning, snapshot.version(), at)
    }
}

/// Reasoner that supplies no justification and no strength
#[derive(Debug, Clone, Copy, Default)]
pub struct NoReasoning;

impl Reasoner for NoReasoning {
    type Error = std::convert::Infallible;

    fn explain(&self, _candidate: &Candidate, _features: &[Feature]) -> Result<Reasoning, Self::Error> {
        Ok(Reasoning::default())
    }
}
