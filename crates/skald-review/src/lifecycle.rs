//! Suggestion lifecycle
//!
//! The operational surface of the review workflow: create scored
//! suggestions, list the review queue and take exactly one terminal decision
//! per suggestion. Every decision writes its status change and feedback in
//! one store transaction; losing a race yields [`ReviewError::Conflict`].

use skald_domain::traits::{
    Clock, FeatureExtractor, Reasoner, SuggestionQuery, SuggestionStore, SystemClock,
    TransitionOutcome, WeightStore,
};
use skald_domain::{
    Candidate, Decision, FeedbackAction, Feedback, RelationshipLabel, Score, Suggestion,
    SuggestionId, SuggestionStatus, UserCorrection,
};
use std::fmt::Display;
use tracing::{info, warn};

use crate::{AutoAcceptPolicy, FeedbackRecorder, ReviewConfig, ReviewError, ScoredSuggestion, SuggestionScorer};

/// A terminal decision and the feedback it produced
#[derive(Debug, Clone, PartialEq)]
pub struct ReviewOutcome {
    /// The suggestion after the decision
    pub suggestion: Suggestion,
    /// The feedback written with it
    pub feedback: Feedback,
}

/// Review workflow over any [`SuggestionStore`]
pub struct SuggestionLifecycle<C = SystemClock> {
    config: ReviewConfig,
    policy: AutoAcceptPolicy,
    scorer: SuggestionScorer,
    recorder: FeedbackRecorder,
    clock: C,
}

impl SuggestionLifecycle<SystemClock> {
    /// Create a lifecycle using wall-clock time
    pub fn new(config: ReviewConfig) -> Result<Self, ReviewError> {
        Self::with_clock(config, SystemClock)
    }

    /// Create a lifecycle with the default configuration
    pub fn default_config() -> Result<Self, ReviewError> {
        Self::new(ReviewConfig::default())
    }
}

impl<C: Clock> SuggestionLifecycle<C> {
    /// Create a lifecycle with an explicit clock
    pub fn with_clock(config: ReviewConfig, clock: C) -> Result<Self, ReviewError> {
        let policy = AutoAcceptPolicy::from_config(&config)?;
        Ok(Self {
            config,
            policy,
            scorer: SuggestionScorer::new(),
            recorder: FeedbackRecorder::new(),
            clock,
        })
    }

    /// Active configuration
    pub fn config(&self) -> &ReviewConfig {
        &self.config
    }

    /// Score a candidate against the current weights and store it
    ///
    /// Suggestions the auto-accept policy approves are stored already
    /// `auto_accepted`, together with their feedback.
    pub fn create<S, E, R>(
        &self,
        store: &mut S,
        candidate: &Candidate,
        extractor: &E,
        reasoner: &R,
    ) -> Result<Suggestion, ReviewError>
    where
        S: SuggestionStore + WeightStore,
        <S as SuggestionStore>::Error: Display,
        <S as WeightStore>::Error: Display,
        E: FeatureExtractor,
        E::Error: Display,
        R: Reasoner,
        R::Error: Display,
    {
        let snapshot = store
            .snapshot()
            .map_err(|e| ReviewError::Store(e.to_string()))?;
        let scored = self
            .scorer
            .score_candidate(candidate, extractor, reasoner, &snapshot, self.clock.now())?;
        self.submit(store, scored)
    }

    /// Apply the auto-accept policy to a scored suggestion and store it
    pub fn submit<S>(&self, store: &mut S, scored: ScoredSuggestion) -> Result<Suggestion, ReviewError>
    where
        S: SuggestionStore,
        S::Error: Display,
    {
        let ScoredSuggestion {
            suggestion,
            features,
            weights_version,
            ..
        } = scored;

        if !self.policy.should_auto_accept(&suggestion) {
            store
                .insert_suggestion(&suggestion, &features, None)
                .map_err(|e| ReviewError::Store(e.to_string()))?;
            info!(
                "Queued suggestion {} ({} -[{}]-> {}, confidence {}, priority {}, weights v{})",
                suggestion.id,
                suggestion.source_entity_id,
                suggestion.relationship_type,
                suggestion.target_entity_id,
                suggestion.confidence,
                suggestion.priority,
                weights_version
            );
            return Ok(suggestion);
        }

        let at = suggestion.created_at;
        let actor = self.config.system_actor.as_str();
        let accepted = suggestion.transitioned(SuggestionStatus::AutoAccepted, actor, at)?;
        let decision = Decision {
            was_auto_accepted: true,
            ..Decision::by(FeedbackAction::Accept, actor)
        };
        let feedback = self.recorder.record(&suggestion, decision, features.clone(), at);

        store
            .insert_suggestion(&accepted, &features, Some(&feedback))
            .map_err(|e| ReviewError::Store(e.to_string()))?;
        info!(
            "Auto-accepted suggestion {} ({} -[{}]-> {}, confidence {}, method {})",
            accepted.id,
            accepted.source_entity_id,
            accepted.relationship_type,
            accepted.target_entity_id,
            accepted.confidence,
            accepted.method
        );
        Ok(accepted)
    }

    /// Pending suggestions, highest priority first, oldest first on ties
    pub fn list_pending<S>(
        &self,
        store: &S,
        scope: Option<String>,
        limit: Option<usize>,
    ) -> Result<Vec<Suggestion>, ReviewError>
    where
        S: SuggestionStore,
        S::Error: Display,
    {
        let query = SuggestionQuery {
            limit,
            ..SuggestionQuery::pending(scope)
        };
        store
            .query_suggestions(&query)
            .map_err(|e| ReviewError::Store(e.to_string()))
    }

    /// Look up one suggestion
    pub fn get<S>(&self, store: &S, id: SuggestionId) -> Result<Suggestion, ReviewError>
    where
        S: SuggestionStore,
        S::Error: Display,
    {
        store
            .get_suggestion(id)
            .map_err(|e| ReviewError::Store(e.to_string()))?
            .ok_or(ReviewError::NotFound(id))
    }

    /// Accept a pending suggestion as proposed
    pub fn accept<S>(&self, store: &mut S, id: SuggestionId, actor: &str) -> Result<ReviewOutcome, ReviewError>
    where
        S: SuggestionStore,
        S::Error: Display,
    {
        self.decide(store, id, Decision::by(FeedbackAction::Accept, actor))
    }

    /// Reject a pending suggestion
    pub fn reject<S>(
        &self,
        store: &mut S,
        id: SuggestionId,
        actor: &str,
        feedback_text: Option<String>,
    ) -> Result<ReviewOutcome, ReviewError>
    where
        S: SuggestionStore,
        S::Error: Display,
    {
        let decision = Decision::by(FeedbackAction::Reject, actor).with_text(feedback_text);
        self.decide(store, id, decision)
    }

    /// Accept a pending suggestion with corrections
    ///
    /// The stored suggestion takes the corrected label and strength. The
    /// feedback record keeps both the corrections and the confidence the
    /// suggestion was decided at.
    pub fn modify<S>(
        &self,
        store: &mut S,
        id: SuggestionId,
        actor: &str,
        new_type: Option<&str>,
        new_strength: Option<f64>,
        feedback_text: Option<String>,
    ) -> Result<ReviewOutcome, ReviewError>
    where
        S: SuggestionStore,
        S::Error: Display,
    {
        let corrections = UserCorrection {
            relationship_type: new_type.map(RelationshipLabel::new).transpose()?,
            strength: new_strength
                .map(|s| Score::for_field("strength", s))
                .transpose()?,
        };
        let decision = Decision::by(FeedbackAction::Modify, actor)
            .with_corrections(corrections)
            .with_text(feedback_text);
        self.decide(store, id, decision)
    }

    /// Set a pending suggestion aside without judging it
    ///
    /// The suggestion becomes `rejected`; its feedback is never learned from.
    pub fn dismiss<S>(&self, store: &mut S, id: SuggestionId, actor: &str) -> Result<ReviewOutcome, ReviewError>
    where
        S: SuggestionStore,
        S::Error: Display,
    {
        self.decide(store, id, Decision::by(FeedbackAction::Dismiss, actor))
    }

    fn decide<S>(&self, store: &mut S, id: SuggestionId, decision: Decision) -> Result<ReviewOutcome, ReviewError>
    where
        S: SuggestionStore,
        S::Error: Display,
    {
        let current = self.get(&*store, id)?;
        if current.status.is_terminal() {
            warn!(
                "{} on suggestion {} refused: already {}",
                decision.action, id, current.status
            );
            return Err(ReviewError::Conflict {
                id,
                status: current.status,
            });
        }

        let features = store
            .get_features(id)
            .map_err(|e| ReviewError::Store(e.to_string()))?;
        let at = self.clock.now();
        let action = decision.action;
        let actor = decision.actor.clone();
        let mut updated = current.transitioned(action.resulting_status(), &actor, at)?;
        if let Some(corrections) = &decision.corrections {
            updated = updated.corrected(corrections);
        }
        let feedback = self.recorder.record(&current, decision, features, at);

        match store
            .apply_transition(&updated, &feedback)
            .map_err(|e| ReviewError::Store(e.to_string()))?
        {
            TransitionOutcome::Applied => {
                info!(
                    "Suggestion {} {} by {} (confidence {}, appropriate: {}, learning value {:.2})",
                    id, updated.status, actor, current.confidence, feedback.confidence_appropriate, feedback.learning_value
                );
                Ok(ReviewOutcome {
                    suggestion: updated,
                    feedback,
                })
            }
            TransitionOutcome::NotPending(status) => {
                warn!("{} on suggestion {} lost a race: already {}", action, id, status);
                Err(ReviewError::Conflict { id, status })
            }
            TransitionOutcome::NotFound => Err(ReviewError::NotFound(id)),
        }
    }
}
