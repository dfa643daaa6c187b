//! Scoring module
//!
//! Implements the deterministic formulas that turn weighted features into a
//! suggestion's confidence and review priority.
//!
//! 1. Normalize raw signals and attach weights from a single snapshot
//! 2. Confidence: weight-normalized average of feature values, 0-100
//! 3. Priority: confidence plus strength, method and label bonuses, capped at 100

use crate::{
    Feature, FeatureType, GenerationMethod, RawSignal, RelationshipLabel, Score, ValidationError,
    WeightSnapshot,
};
use std::collections::HashSet;

/// Strength at or above which the large strength bonus applies
pub const STRONG_STRENGTH: f64 = 80.0;

/// Strength at or above which the small strength bonus applies
pub const MODERATE_STRENGTH: f64 = 60.0;

/// Priority bonus for strong relationships
pub const STRONG_STRENGTH_BONUS: f64 = 10.0;

/// Priority bonus for moderately strong relationships
pub const MODERATE_STRENGTH_BONUS: f64 = 5.0;

/// Priority bonus for important relationship labels
pub const IMPORTANT_TYPE_BONUS: f64 = 5.0;

/// Turn raw extraction signals into features weighted from `snapshot`
///
/// Every feature of one candidate is weighted from the same snapshot so a
/// concurrent recalibration cannot mix weight versions inside one score.
/// A feature type may appear at most once.
pub fn weigh_signals(
    signals: &[RawSignal],
    snapshot: &WeightSnapshot,
) -> Result<Vec<Feature>, ValidationError> {
    let mut seen: HashSet<FeatureType> = HashSet::new();
    let mut features = Vec::with_capacity(signals.len());

    for signal in signals {
        if !seen.insert(signal.feature_type) {
            return Err(ValidationError::DuplicateFeature(
                signal.feature_type.as_str().to_string(),
            ));
        }
        let value = signal.normalized()?;
        let weight = snapshot.weight(signal.feature_type);
        features.push(Feature::new(signal.feature_type, value, weight)?.with_metadata(signal.metadata.clone()));
    }

    Ok(features)
}

/// Weight-normalized average of feature values on the 0-100 scale
///
/// `100 * Σ(value * weight) / Σ(weight)`, rounded to the nearest integer.
/// Zero-weight features contribute nothing to either sum; with no total
/// weight the confidence is 0.
pub fn compute_confidence(features: &[Feature]) -> Score {
    let total_weight: f64 = features.iter().map(|f| f.weight).sum();
    if total_weight <= 0.0 {
        return Score::MIN;
    }

    let weighted_sum: f64 = features.iter().map(Feature::weighted_value).sum();
    Score::clamped((100.0 * weighted_sum / total_weight).round())
}

/// Priority bonus earned by the relationship strength
pub fn strength_bonus(strength: Score) -> f64 {
    let s = strength.value();
    if s >= STRONG_STRENGTH {
        STRONG_STRENGTH_BONUS
    } else if s >= MODERATE_STRENGTH {
        MODERATE_STRENGTH_BONUS
    } else {
        0.0
    }
}

/// Priority bonus earned by the proposed label
pub fn type_bonus(label: &RelationshipLabel) -> f64 {
    if label.is_important() {
        IMPORTANT_TYPE_BONUS
    } else {
        0.0
    }
}

/// Components of a priority score
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct PriorityBreakdown {
    /// Confidence the priority starts from
    pub confidence: f64,
    /// Bonus from relationship strength
    pub strength_bonus: f64,
    /// Bonus from the generation method
    pub method_bonus: f64,
    /// Bonus from the relationship label
    pub type_bonus: f64,
}

impl PriorityBreakdown {
    /// Compute the breakdown for a scored candidate
    pub fn new(
        confidence: Score,
        strength: Score,
        method: GenerationMethod,
        label: &RelationshipLabel,
    ) -> Self {
        Self {
            confidence: confidence.value(),
            strength_bonus: strength_bonus(strength),
            method_bonus: method.priority_bonus(),
            type_bonus: type_bonus(label),
        }
    }

    /// Sum before capping
    pub fn raw(&self) -> f64 {
        self.confidence + self.strength_bonus + self.method_bonus + self.type_bonus
    }

    /// Final priority, capped at 100
    pub fn priority(&self) -> Score {
        Score::clamped(self.raw())
    }
}

/// Review priority for a scored candidate
pub fn compute_priority(
    confidence: Score,
    strength: Score,
    method: GenerationMethod,
    label: &RelationshipLabel,
) -> Score {
    PriorityBreakdown::new(confidence, strength, method, label).priority()
}

#[cfg(test)]
mod tests {
    use super::*;

    fn feature(ft: FeatureType, value: f64, weight: f64) -> Feature {
        Feature::new(ft, value, weight).unwrap()
    }

    #[test]
    fn test_confidence_example() {
        let features = vec![
            feature(FeatureType::CoOccurrence, 0.9, 0.7),
            feature(FeatureType::TimelineProximity, 0.5, 0.3),
        ];

        // 100 * (0.63 + 0.15) / 1.0 = 78
        assert_eq!(compute_confidence(&features).value(), 78.0);
    }

    #[test]
    fn test_zero_weight_feature_does_not_distort() {
        let with_zero = vec![
            feature(FeatureType::CoOccurrence, 0.8, 0.5),
            feature(FeatureType::MentionFrequency, 0.0, 0.0),
        ];
        let without = vec![feature(FeatureType::CoOccurrence, 0.8, 0.5)];

        assert_eq!(compute_confidence(&with_zero), compute_confidence(&without));
        assert_eq!(compute_confidence(&without).value(), 80.0);
    }

    #[test]
    fn test_confidence_without_weight() {
        assert_eq!(compute_confidence(&[]), Score::MIN);
        let features = vec![feature(FeatureType::CoOccurrence, 1.0, 0.0)];
        assert_eq!(compute_confidence(&features), Score::MIN);
    }

    #[test]
    fn test_priority_example_capped() {
        let breakdown = PriorityBreakdown::new(
            Score::new(78.0).unwrap(),
            Score::new(85.0).unwrap(),
            GenerationMethod::Hybrid,
            &RelationshipLabel::new("ally").unwrap(),
        );

        assert_eq!(breakdown.strength_bonus, 10.0);
        assert_eq!(breakdown.method_bonus, 10.0);
        assert_eq!(breakdown.type_bonus, 5.0);
        assert_eq!(breakdown.raw(), 103.0);
        assert_eq!(breakdown.priority(), Score::MAX);
    }

    #[test]
    fn test_priority_uncapped() {
        let priority = compute_priority(
            Score::new(50.0).unwrap(),
            Score::new(65.0).unwrap(),
            GenerationMethod::Timeline,
            &RelationshipLabel::new("rival").unwrap(),
        );

        // 50 + 5 + 2 + 0
        assert_eq!(priority.value(), 57.0);
    }

    #[test]
    fn test_strength_bonus_edges() {
        assert_eq!(strength_bonus(Score::new(80.0).unwrap()), 10.0);
        assert_eq!(strength_bonus(Score::new(79.9).unwrap()), 5.0);
        assert_eq!(strength_bonus(Score::new(60.0).unwrap()), 5.0);
        assert_eq!(strength_bonus(Score::new(59.9).unwrap()), 0.0);
    }

    #[test]
    fn test_weigh_signals_uses_snapshot() {
        let snapshot = WeightSnapshot::defaults().with_weight(FeatureType::SharedFaction, 0.2);
        let signals = vec![
            RawSignal::new(FeatureType::SharedFaction, 3.0, 0.0, 4.0),
            RawSignal::new(FeatureType::CoOccurrence, 10.0, 10.0, 10.0),
        ];

        let features = weigh_signals(&signals, &snapshot).unwrap();
        assert_eq!(features[0].value, 0.75);
        assert_eq!(features[0].weight, 0.2);
        assert_eq!(features[1].value, 0.5);
        assert_eq!(features[1].weight, FeatureType::CoOccurrence.default_weight());
    }

    #[test]
    fn test_weigh_signals_rejects_duplicates() {
        let signals = vec![
            RawSignal::new(FeatureType::SharedFaction, 1.0, 0.0, 4.0),
            RawSignal::new(FeatureType::SharedFaction, 2.0, 0.0, 4.0),
        ];
        assert_eq!(
            weigh_signals(&signals, &WeightSnapshot::defaults()),
            Err(ValidationError::DuplicateFeature("shared_faction".to_string()))
        );
    }
}
