//! Error types for the CLI application.

use thiserror::Error;

/// Result type alias for CLI operations.
pub type Result<T> = std::result::Result<T, CliError>;

/// CLI-specific errors.
#[derive(Debug, Error)]
pub enum CliError {
    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Storage error
    #[error(transparent)]
    Store(#[from] skald_store::StoreError),

    /// Review workflow error (conflicts, unknown suggestions, bad input)
    #[error(transparent)]
    Review(#[from] skald_review::ReviewError),

    /// Recalibration error
    #[error(transparent)]
    Learner(#[from] skald_learner::LearnerError),

    /// Domain validation error
    #[error("Invalid input: {0}")]
    Validation(#[from] skald_domain::ValidationError),

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// TOML parsing error
    #[error("TOML parsing error: {0}")]
    Toml(#[from] toml::de::Error),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),
}
