//! Feature module - normalized signals contributing to a suggestion's confidence

use crate::ValidationError;
use std::collections::BTreeMap;
use std::fmt;

/// Kind of signal a feature measures
///
/// The set is closed: every feature type carries a description and a default
/// weight used until the learner calibrates it.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum FeatureType {
    /// Entities appear together in the same passages
    CoOccurrence,

    /// Entities are active close together on the saga timeline
    TimelineProximity,

    /// Entities share attribute values
    AttributeSimilarity,

    /// Text describing the entities is similar
    ContentSimilarity,

    /// Entities are central in the existing relationship graph
    NetworkCentrality,

    /// Embeddings of the entities are close
    SemanticSimilarity,

    /// Entities are tied to the same location
    SharedLocation,

    /// Entities belong to the same faction
    SharedFaction,

    /// How often the entities are mentioned
    MentionFrequency,
}

impl FeatureType {
    /// Every feature type, in declaration order
    pub const ALL: [FeatureType; 9] = [
        FeatureType::CoOccurrence,
        FeatureType::TimelineProximity,
        FeatureType::AttributeSimilarity,
        FeatureType::ContentSimilarity,
        FeatureType::NetworkCentrality,
        FeatureType::SemanticSimilarity,
        FeatureType::SharedLocation,
        FeatureType::SharedFaction,
        FeatureType::MentionFrequency,
    ];

    /// Get the feature type name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            FeatureType::CoOccurrence => "co_occurrence",
            FeatureType::TimelineProximity => "timeline_proximity",
            FeatureType::AttributeSimilarity => "attribute_similarity",
            FeatureType::ContentSimilarity => "content_similarity",
            FeatureType::NetworkCentrality => "network_centrality",
            FeatureType::SemanticSimilarity => "semantic_similarity",
            FeatureType::SharedLocation => "shared_location",
            FeatureType::SharedFaction => "shared_faction",
            FeatureType::MentionFrequency => "mention_frequency",
        }
    }

    /// Parse a feature type from its name
    pub fn parse(s: &str) -> Option<Self> {
        let name = s.trim().to_lowercase();
        Self::ALL.iter().copied().find(|ft| ft.as_str() == name)
    }

    /// Human-readable description
    pub fn description(&self) -> &'static str {
        match self {
            FeatureType::CoOccurrence => "Entities appear together in the same content",
            FeatureType::TimelineProximity => "Entities are active at nearby points in the timeline",
            FeatureType::AttributeSimilarity => "Entities share similar attributes",
            FeatureType::ContentSimilarity => "Content describing the entities is similar",
            FeatureType::NetworkCentrality => "Entities are well connected in the relationship graph",
            FeatureType::SemanticSimilarity => "Entities are semantically close in embedding space",
            FeatureType::SharedLocation => "Entities are associated with the same location",
            FeatureType::SharedFaction => "Entities belong to the same faction",
            FeatureType::MentionFrequency => "Entities are frequently mentioned",
        }
    }

    /// Weight used before any calibration, in [0, 1]
    pub fn default_weight(&self) -> f64 {
        match self {
            FeatureType::CoOccurrence => 0.8,
            FeatureType::TimelineProximity => 0.6,
            FeatureType::AttributeSimilarity => 0.7,
            FeatureType::ContentSimilarity => 0.75,
            FeatureType::NetworkCentrality => 0.5,
            FeatureType::SemanticSimilarity => 0.85,
            FeatureType::SharedLocation => 0.55,
            FeatureType::SharedFaction => 0.65,
            FeatureType::MentionFrequency => 0.4,
        }
    }
}

impl fmt::Display for FeatureType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl std::str::FromStr for FeatureType {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s).ok_or_else(|| ValidationError::UnknownFeatureType(s.to_string()))
    }
}

/// A single weighted signal attached to a suggestion
///
/// Features are immutable once created; re-weighting goes through
/// [`Feature::with_weight`], which returns a new record.
#[derive(Debug, Clone, PartialEq)]
pub struct Feature {
    /// What the signal measures
    pub feature_type: FeatureType,

    /// Normalized signal value [0.0, 1.0]
    pub value: f64,

    /// Weight at the time the feature was recorded [0.0, 1.0]
    pub weight: f64,

    /// Free-form metadata from the extraction service
    pub metadata: BTreeMap<String, String>,
}

impl Feature {
    /// Create a new feature, validating value and weight bounds
    pub fn new(feature_type: FeatureType, value: f64, weight: f64) -> Result<Self, ValidationError> {
        let feature = Self {
            feature_type,
            value,
            weight,
            metadata: BTreeMap::new(),
        };
        feature.validate()?;
        Ok(feature)
    }

    /// Attach metadata, consuming and returning the feature
    pub fn with_metadata(mut self, metadata: BTreeMap<String, String>) -> Self {
        self.metadata = metadata;
        self
    }

    /// A copy of this feature carrying a different weight
    pub fn with_weight(&self, weight: f64) -> Result<Self, ValidationError> {
        Self::new(self.feature_type, self.value, weight).map(|f| f.with_metadata(self.metadata.clone()))
    }

    /// `value * weight`
    pub fn weighted_value(&self) -> f64 {
        self.value * self.weight
    }

    /// Re-check the bounds of a feature (used for rehydrated records)
    pub fn validate(&self) -> Result<(), ValidationError> {
        ValidationError::check_range("feature value", self.value, 0.0, 1.0)?;
        ValidationError::check_range("feature weight", self.weight, 0.0, 1.0)?;
        Ok(())
    }
}

/// A raw signal as returned by the feature extraction service
#[derive(Debug, Clone, PartialEq)]
pub struct RawSignal {
    /// What the signal measures
    pub feature_type: FeatureType,

    /// Raw, unnormalized value
    pub value: f64,

    /// Smallest value observed for this signal in the scope
    pub observed_min: f64,

    /// Largest value observed for this signal in the scope
    pub observed_max: f64,

    /// Metadata passed through to the resulting feature
    pub metadata: BTreeMap<String, String>,
}

impl RawSignal {
    /// Create a raw signal without metadata
    pub fn new(feature_type: FeatureType, value: f64, observed_min: f64, observed_max: f64) -> Self {
        Self {
            feature_type,
            value,
            observed_min,
            observed_max,
            metadata: BTreeMap::new(),
        }
    }

    /// Normalize the raw value into [0, 1]
    pub fn normalized(&self) -> Result<f64, ValidationError> {
        for (field, v) in [
            ("raw value", self.value),
            ("observed min", self.observed_min),
            ("observed max", self.observed_max),
        ] {
            if !v.is_finite() {
                return Err(ValidationError::OutOfRange {
                    field,
                    value: v,
                    min: f64::MIN,
                    max: f64::MAX,
                });
            }
        }
        Ok(normalize(self.value, self.observed_min, self.observed_max))
    }
}

/// Value returned for a degenerate observed range (`max <= min`)
pub const DEGENERATE_RANGE_VALUE: f64 = 0.5;

/// Min-max normalization clamped to [0, 1]
pub fn normalize(raw: f64, min: f64, max: f64) -> f64 {
    if max <= min {
        return DEGENERATE_RANGE_VALUE;
    }
    ((raw - min) / (max - min)).clamp(0.0, 1.0)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_feature_type_roundtrip() {
        for ft in FeatureType::ALL {
            assert_eq!(FeatureType::parse(ft.as_str()), Some(ft));
        }
        assert_eq!(FeatureType::parse("Shared_Faction"), Some(FeatureType::SharedFaction));
        assert!("sentiment".parse::<FeatureType>().is_err());
    }

    #[test]
    fn test_default_weights_in_range() {
        for ft in FeatureType::ALL {
            let w = ft.default_weight();
            assert!((0.0..=1.0).contains(&w), "{} default {} out of range", ft, w);
            assert!(!ft.description().is_empty());
        }
    }

    #[test]
    fn test_feature_bounds() {
        assert!(Feature::new(FeatureType::CoOccurrence, 0.9, 0.7).is_ok());
        assert!(Feature::new(FeatureType::CoOccurrence, 1.2, 0.7).is_err());
        assert!(Feature::new(FeatureType::CoOccurrence, 0.5, -0.1).is_err());
        assert!(Feature::new(FeatureType::CoOccurrence, f64::NAN, 0.5).is_err());
    }

    #[test]
    fn test_with_weight_returns_new_record() {
        let original = Feature::new(FeatureType::SharedLocation, 0.4, 0.5).unwrap();
        let reweighted = original.with_weight(0.9).unwrap();

        assert_eq!(original.weight, 0.5);
        assert_eq!(reweighted.weight, 0.9);
        assert_eq!(reweighted.value, original.value);
        assert!(original.with_weight(1.5).is_err());
    }

    #[test]
    fn test_normalize() {
        assert_eq!(normalize(5.0, 0.0, 10.0), 0.5);
        assert_eq!(normalize(-3.0, 0.0, 10.0), 0.0);
        assert_eq!(normalize(30.0, 0.0, 10.0), 1.0);
    }

    #[test]
    fn test_normalize_degenerate_range() {
        assert_eq!(normalize(7.0, 3.0, 3.0), DEGENERATE_RANGE_VALUE);
        assert_eq!(normalize(7.0, 10.0, 3.0), DEGENERATE_RANGE_VALUE);
    }

    #[test]
    fn test_raw_signal_rejects_non_finite() {
        let signal = RawSignal::new(FeatureType::MentionFrequency, f64::NAN, 0.0, 1.0);
        assert!(signal.normalized().is_err());

        let signal = RawSignal::new(FeatureType::MentionFrequency, 12.0, 0.0, 48.0);
        assert_eq!(signal.normalized().unwrap(), 0.25);
    }
}
