//! Feature weight records, history and snapshots

use crate::{FeatureType, ValidationError};
use std::collections::BTreeMap;

/// Check that a weight lies in [0, 1]
pub fn validate_weight(weight: f64) -> Result<f64, ValidationError> {
    ValidationError::check_range("weight", weight, 0.0, 1.0)
}

/// The live weight of one feature type
#[derive(Debug, Clone, PartialEq)]
pub struct WeightRecord {
    /// Feature type the weight applies to
    pub feature_type: FeatureType,

    /// Current weight [0.0, 1.0]
    pub weight: f64,

    /// Store version at which this weight was written
    pub version: u64,

    /// When the learner last calibrated this weight
    pub last_calibrated_at: Option<u64>,

    /// Last feedback sequence the learner folded into this weight
    pub consumed_through: u64,
}

/// Why a weight changed
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum WeightChangeReason {
    /// Set explicitly by an operator
    Manual,
    /// Adjusted by the weight learner
    Calibration,
    /// Restored to the default
    Reset,
}

impl WeightChangeReason {
    /// Get the reason name as a string
    pub fn as_str(&self) -> &'static str {
        match self {
            WeightChangeReason::Manual => "manual",
            WeightChangeReason::Calibration => "calibration",
            WeightChangeReason::Reset => "reset",
        }
    }

    /// Parse a reason from its name
    pub fn parse(s: &str) -> Option<Self> {
        match s {
            "manual" => Some(WeightChangeReason::Manual),
            "calibration" => Some(WeightChangeReason::Calibration),
            "reset" => Some(WeightChangeReason::Reset),
            _ => None,
        }
    }
}

/// One append-only audit row of a weight change
#[derive(Debug, Clone, PartialEq)]
pub struct WeightHistoryEntry {
    /// Feature type that changed
    pub feature_type: FeatureType,
    /// Weight before the change
    pub previous_weight: f64,
    /// Weight after the change
    pub weight: f64,
    /// Store version produced by the change
    pub version: u64,
    /// Why it changed
    pub reason: WeightChangeReason,
    /// When it changed
    pub changed_at: u64,
}

/// Immutable view of all weights at one store version
///
/// The scorer takes one snapshot per suggestion so every feature of a
/// candidate is weighted consistently, even while the learner commits.
#[derive(Debug, Clone, PartialEq)]
pub struct WeightSnapshot {
    version: u64,
    weights: BTreeMap<FeatureType, f64>,
    consumed: BTreeMap<FeatureType, u64>,
}

impl WeightSnapshot {
    /// Snapshot holding only the default weights at version 0
    pub fn defaults() -> Self {
        Self {
            version: 0,
            weights: BTreeMap::new(),
            consumed: BTreeMap::new(),
        }
    }

    /// Build a snapshot from live records
    pub fn from_records(version: u64, records: &[WeightRecord]) -> Self {
        Self {
            version,
            weights: records.iter().map(|r| (r.feature_type, r.weight)).collect(),
            consumed: records
                .iter()
                .map(|r| (r.feature_type, r.consumed_through))
                .collect(),
        }
    }

    /// Store version this snapshot was read at
    pub fn version(&self) -> u64 {
        self.version
    }

    /// Weight for a feature type, falling back to its default
    pub fn weight(&self, feature_type: FeatureType) -> f64 {
        self.weights
            .get(&feature_type)
            .copied()
            .unwrap_or_else(|| feature_type.default_weight())
    }

    /// Last feedback sequence already learned into a type's weight
    ///
    /// Feedback at or below this sequence must not be applied to the type
    /// again.
    pub fn consumed_through(&self, feature_type: FeatureType) -> u64 {
        self.consumed.get(&feature_type).copied().unwrap_or(0)
    }

    /// Whether the weight was set explicitly (not a default)
    pub fn is_explicit(&self, feature_type: FeatureType) -> bool {
        self.weights.contains_key(&feature_type)
    }

    /// A copy with one weight replaced (clamped into [0, 1])
    pub fn with_weight(&self, feature_type: FeatureType, weight: f64) -> Self {
        let mut weights = self.weights.clone();
        weights.insert(feature_type, weight.clamp(0.0, 1.0));
        Self {
            version: self.version,
            weights,
            consumed: self.consumed.clone(),
        }
    }

    /// Effective weight of every feature type
    pub fn effective(&self) -> Vec<(FeatureType, f64)> {
        FeatureType::ALL.iter().map(|&ft| (ft, self.weight(ft))).collect()
    }
}

impl Default for WeightSnapshot {
    fn default() -> Self {
        Self::defaults()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults_fallback() {
        let snapshot = WeightSnapshot::defaults();
        for ft in FeatureType::ALL {
            assert_eq!(snapshot.weight(ft), ft.default_weight());
            assert!(!snapshot.is_explicit(ft));
        }
    }

    #[test]
    fn test_from_records() {
        let records = vec![WeightRecord {
            feature_type: FeatureType::SharedLocation,
            weight: 0.9,
            version: 4,
            last_calibrated_at: Some(100),
            consumed_through: 12,
        }];
        let snapshot = WeightSnapshot::from_records(4, &records);

        assert_eq!(snapshot.version(), 4);
        assert_eq!(snapshot.weight(FeatureType::SharedLocation), 0.9);
        assert_eq!(
            snapshot.weight(FeatureType::CoOccurrence),
            FeatureType::CoOccurrence.default_weight()
        );
        assert_eq!(snapshot.effective().len(), FeatureType::ALL.len());
        assert_eq!(snapshot.consumed_through(FeatureType::SharedLocation), 12);
        assert_eq!(snapshot.consumed_through(FeatureType::CoOccurrence), 0);
    }

    #[test]
    fn test_with_weight_is_copy() {
        let base = WeightSnapshot::defaults();
        let changed = base.with_weight(FeatureType::MentionFrequency, 1.7);

        assert_eq!(changed.weight(FeatureType::MentionFrequency), 1.0);
        assert_eq!(
            base.weight(FeatureType::MentionFrequency),
            FeatureType::MentionFrequency.default_weight()
        );
    }

    #[test]
    fn test_validate_weight() {
        assert!(validate_weight(0.0).is_ok());
        assert!(validate_weight(1.0).is_ok());
        assert!(validate_weight(-0.01).is_err());
        assert!(validate_weight(1.01).is_err());
    }

    #[test]
    fn test_reason_roundtrip() {
        for reason in [
            WeightChangeReason::Manual,
            WeightChangeReason::Calibration,
            WeightChangeReason::Reset,
        ] {
            assert_eq!(WeightChangeReason::parse(reason.as_str()), Some(reason));
        }
    }
}
