//! Skald Domain Layer
//!
//! This crate contains the core business logic and domain model for Skald's
//! relationship suggestion engine. It depends only on `uuid` and defines the
//! value objects, scoring math, and trait interfaces that all other layers
//! depend upon.
//!
//! ## Key Concepts
//!
//! - **Feature**: A normalized signal in [0, 1] paired with a learned weight
//! - **Suggestion**: A candidate directed relationship between two saga entities
//! - **Feedback**: An append-only record of the decision taken on a suggestion
//! - **Weights**: Versioned per-feature-type weights recalibrated from feedback
//!
//! ## Architecture
//!
//! This crate follows Clean Architecture:
//! - Pure business logic only
//! - Infrastructure implementations live in other crates
//! - Trait definitions for all external interactions

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod error;
pub mod feature;
pub mod feedback;
pub mod scoring;
pub mod suggestion;
pub mod traits;
pub mod weights;

// Re-exports for convenience
pub use error::ValidationError;
pub use feature::{Feature, FeatureType, RawSignal};
pub use feedback::{Decision, DecisionSpeed, Feedback, FeedbackAction, FeedbackId, UserCorrection};
pub use suggestion::{
    Candidate, ConfidenceLabel, EntityId, GenerationMethod, RelationshipLabel, Score, Suggestion,
    SuggestionId, SuggestionStatus,
};
pub use weights::{WeightChangeReason, WeightHistoryEntry, WeightRecord, WeightSnapshot};
