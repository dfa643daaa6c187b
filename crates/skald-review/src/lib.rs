//! Skald Review
//!
//! Scores candidate relationships and drives them through review.
//!
//! The review layer provides:
//! - Suggestion scoring (confidence, strength, priority) from one weight snapshot
//! - The auto-accept policy applied once after scoring
//! - Exactly-once terminal decisions (accept, reject, modify, dismiss)
//! - Feedback capture for the weight learner
//!
//! # Examples
//!
//! ```no_run
//! use skald_review::{ReviewConfig, SuggestionLifecycle};
//! use skald_store::SqliteStore;
//!
//! let lifecycle = SuggestionLifecycle::new(ReviewConfig::default()).unwrap();
//! let store = SqliteStore::new("skald.db").unwrap();
//!
//! for suggestion in lifecycle.list_pending(&store, None, Some(10)).unwrap() {
//!     println!("{} {}", suggestion.id, suggestion.priority);
//! }
//! ```

#![warn(missing_docs)]

mod config;
mod error;
mod lifecycle;
mod policy;
mod recorder;
mod scorer;

pub use config::ReviewConfig;
pub use error::ReviewError;
pub use lifecycle::{ReviewOutcome, SuggestionLifecycle};
pub use policy::AutoAcceptPolicy;
pub use recorder::FeedbackRecorder;
pub use scorer::{NoReasoning, ScoredSuggestion, SuggestionScorer};
