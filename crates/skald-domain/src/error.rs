//! Validation errors raised while constructing domain values
//!
//! Domain values are validated at construction and never persisted when
//! invalid. The crate stays free of error-derive dependencies, so `Display`
//! is written out by hand.

use std::fmt;

/// Reasons a domain value failed validation
#[derive(Debug, Clone, PartialEq)]
pub enum ValidationError {
    /// A numeric field fell outside its allowed range (or was not finite)
    OutOfRange {
        /// Name of the offending field
        field: &'static str,
        /// The rejected value
        value: f64,
        /// Inclusive lower bound
        min: f64,
        /// Inclusive upper bound
        max: f64,
    },

    /// Source and target entity are the same
    SelfRelationship(u64),

    /// Feature type name not in the closed set
    UnknownFeatureType(String),

    /// Generation method name not in the closed set
    UnknownMethod(String),

    /// Suggestion status name not in the closed set
    UnknownStatus(String),

    /// Feedback action name not in the closed set
    UnknownAction(String),

    /// Relationship label empty or too long
    InvalidLabel(String),

    /// The same feature type was supplied twice for one candidate
    DuplicateFeature(String),

    /// Scope (saga identifier) was empty
    EmptyScope,

    /// Requested status change is not a legal lifecycle transition
    InvalidTransition {
        /// Current status
        from: String,
        /// Requested status
        to: String,
    },
}

impl ValidationError {
    /// Check that `value` is finite and lies in `[min, max]`
    pub fn check_range(field: &'static str, value: f64, min: f64, max: f64) -> Result<f64, Self> {
        if value.is_finite() && value >= min && value <= max {
            Ok(value)
        } else {
            Err(ValidationError::OutOfRange { field, value, min, max })
        }
    }
}

impl fmt::Display for ValidationError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ValidationError::OutOfRange { field, value, min, max } => {
                write!(f, "{} = {} is outside [{}, {}]", field, value, min, max)
            }
            ValidationError::SelfRelationship(id) => {
                write!(f, "source and target entity are both {}", id)
            }
            ValidationError::UnknownFeatureType(s) => write!(f, "Unknown feature type: {}", s),
            ValidationError::UnknownMethod(s) => write!(f, "Unknown generation method: {}", s),
            ValidationError::UnknownStatus(s) => write!(f, "Unknown suggestion status: {}", s),
            ValidationError::UnknownAction(s) => write!(f, "Unknown feedback action: {}", s),
            ValidationError::InvalidLabel(s) => write!(f, "Invalid relationship label: '{}'", s),
            ValidationError::DuplicateFeature(s) => {
                write!(f, "Feature type {} supplied more than once", s)
            }
            ValidationError::EmptyScope => write!(f, "Scope must not be empty"),
            ValidationError::InvalidTransition { from, to } => {
                write!(f, "Cannot transition suggestion from {} to {}", from, to)
            }
        }
    }
}

impl std::error::Error for ValidationError {}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_check_range() {
        assert_eq!(ValidationError::check_range("weight", 0.5, 0.0, 1.0), Ok(0.5));
        assert_eq!(ValidationError::check_range("weight", 1.0, 0.0, 1.0), Ok(1.0));
        assert!(ValidationError::check_range("weight", 1.01, 0.0, 1.0).is_err());
        assert!(ValidationError::check_range("weight", f64::NAN, 0.0, 1.0).is_err());
        assert!(ValidationError::check_range("weight", f64::INFINITY, 0.0, 1.0).is_err());
    }

    #[test]
    fn test_display() {
        let err = ValidationError::check_range("confidence", 120.0, 0.0, 100.0).unwrap_err();
        assert_eq!(err.to_string(), "confidence = 120 is outside [0, 100]");
    }
}
