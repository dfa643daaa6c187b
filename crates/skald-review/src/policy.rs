//! Auto-accept policy

use skald_domain::{GenerationMethod, Suggestion};

use crate::{ReviewConfig, ReviewError};

/// Decides once, right after scoring, whether a suggestion skips review
#[derive(Debug, Clone, PartialEq)]
pub struct AutoAcceptPolicy {
    enabled: bool,
    min_confidence: f64,
    methods: Vec<GenerationMethod>,
}

impl AutoAcceptPolicy {
    /// Build the policy from validated configuration
    pub fn from_config(config: &ReviewConfig) -> Result<Self, ReviewError> {
        config.validate()?;
        Ok(Self {
            enabled: config.auto_accept_enabled,
            min_confidence: config.auto_accept_min_confidence,
            methods: config.eligible_methods()?,
        })
    }

    /// A policy that never auto-accepts
    pub fn disabled() -> Self {
        Self {
            enabled: false,
            min_confidence: 100.0,
            methods: Vec::new(),
        }
    }

    /// Whether a freshly scored suggestion should be auto-accepted
    pub fn should_auto_accept(&self, suggestion: &Suggestion) -> bool {
        self.enabled
            && suggestion.confidence.value() >= self.min_confidence
            && self.methods.contains(&suggestion.method)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use skald_domain::{EntityId, RelationshipLabel, Score, SuggestionId, SuggestionStatus};

    fn scored(confidence: f64, method: GenerationMethod) -> Suggestion {
        Suggestion {
            id: SuggestionId::new(),
            scope: "saga-1".to_string(),
            source_entity_id: EntityId(1),
            target_entity_id: EntityId(2),
            relationship_type: RelationshipLabel::new("ally").unwrap(),
            confidence: Score::new(confidence).unwrap(),
            strength: Score::new(confidence).unwrap(),
            priority: Score::new(confidence).unwrap(),
            method,
            status: SuggestionStatus::Pending,
            reasoning: None,
            evidence: Vec::new(),
            created_at: 0,
            updated_at: 0,
            reviewed_by: None,
            reviewed_at: None,
        }
    }

    #[test]
    fn test_default_policy() {
        let policy = AutoAcceptPolicy::from_config(&ReviewConfig::default()).unwrap();
        assert!(policy.should_auto_accept(&scored(96.0, GenerationMethod::Hybrid)));
        assert!(policy.should_auto_accept(&scored(95.0, GenerationMethod::Hybrid)));
        assert!(!policy.should_auto_accept(&scored(96.0, GenerationMethod::Semantic)));
        assert!(!policy.should_auto_accept(&scored(94.0, GenerationMethod::Hybrid)));
    }

    #[test]
    fn test_disabled_policy() {
        let policy = AutoAcceptPolicy::from_config(&ReviewConfig::strict()).unwrap();
        assert!(!policy.should_auto_accept(&scored(100.0, GenerationMethod::Hybrid)));
        assert!(!AutoAcceptPolicy::disabled().should_auto_accept(&scored(100.0, GenerationMethod::Hybrid)));
    }

    #[test]
    fn test_permissive_policy() {
        let policy = AutoAcceptPolicy::from_config(&ReviewConfig::permissive()).unwrap();
        assert!(policy.should_auto_accept(&scored(91.0, GenerationMethod::Semantic)));
        assert!(!policy.should_auto_accept(&scored(91.0, GenerationMethod::Content)));
    }
}
