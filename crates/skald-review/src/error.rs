//! Review error types

use skald_domain::{SuggestionId, SuggestionStatus, ValidationError};
use thiserror::Error;

/// Errors that can occur while scoring or reviewing suggestions
#[derive(Error, Debug)]
pub enum ReviewError {
    /// Input rejected by domain validation
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// The suggestion already left pending
    #[error("Suggestion {id} is already {status}")]
    Conflict {
        /// Suggestion acted upon
        id: SuggestionId,
        /// Status found in the store
        status: SuggestionStatus,
    },

    /// No suggestion with that id
    #[error("Suggestion not found: {0}")]
    NotFound(SuggestionId),

    /// Store error
    #[error("Store error: {0}")]
    Store(String),

    /// Feature extraction service error
    #[error("Extraction error: {0}")]
    Extraction(String),

    /// Reasoning collaborator error
    #[error("Reasoning error: {0}")]
    Reasoning(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
