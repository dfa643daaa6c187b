//! Error types for weight learning

use thiserror::Error;

/// Errors that can occur during recalibration
#[derive(Error, Debug)]
pub enum LearnerError {
    /// The weight version kept moving; per-type commits already made stay
    #[error("Weight version conflict persisted after {attempts} attempts")]
    Conflict {
        /// Attempts made
        attempts: u32,
    },

    /// Storage layer error
    #[error("Storage error: {0}")]
    Store(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
