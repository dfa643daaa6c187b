//! Skald Storage Layer
//!
//! Implements the `SuggestionStore` and `WeightStore` traits on SQLite.
//!
//! # Architecture
//!
//! - Suggestions and their features as rows; evidence and metadata as JSON
//! - Append-only feedback with a commit-ordered sequence (the learner's cursor)
//! - Versioned feature weights with an append-only history
//!
//! Lifecycle transitions and weight commits run inside `BEGIN IMMEDIATE`
//! transactions so that concurrent connections to the same database file
//! serialise instead of interleaving.
//!
//! # Examples
//!
//! ```no_run
//! use skald_store::SqliteStore;
//!
//! let store = SqliteStore::new("skald.db").unwrap();
//! // Store is now ready for suggestion and weight operations
//! ```

#![warn(missing_docs)]

mod codec;
mod suggestions;
mod weights;

use rusqlite::Connection;
use skald_domain::ValidationError;
use std::path::Path;
use std::time::Duration;
use thiserror::Error;

/// How long a connection waits for another writer before giving up
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Errors that can occur during storage operations
#[derive(Error, Debug)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// JSON column could not be encoded or decoded
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Value rejected by domain validation
    #[error("Validation error: {0}")]
    Validation(#[from] ValidationError),

    /// Suggestion not found
    #[error("Suggestion not found: {0}")]
    NotFound(String),

    /// Invalid data format
    #[error("Invalid data: {0}")]
    InvalidData(String),

    /// An open suggestion for the same scope, entity pair and label exists
    #[error("Duplicate suggestion: {0}")]
    Duplicate(String),
}

/// SQLite-based implementation of `SuggestionStore` and `WeightStore`
///
/// # Thread Safety
///
/// SQLite connections are not thread-safe. Each thread should open its own
/// SqliteStore on the same database file; writes are serialised by SQLite.
pub struct SqliteStore {
    conn: Connection,
}

impl SqliteStore {
    /// Create a new SqliteStore with the given database path
    ///
    /// Use `:memory:` for an in-memory database (useful for testing).
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use skald_store::SqliteStore;
    ///
    /// let store = SqliteStore::new("skald.db").unwrap();
    /// ```
    pub fn new<P: AsRef<Path>>(path: P) -> Result<Self, StoreError> {
        let conn = Connection::open(path)?;
        conn.busy_timeout(BUSY_TIMEOUT)?;
        let mut store = Self { conn };
        store.initialize_schema()?;
        Ok(store)
    }

    /// Open a private in-memory database
    pub fn in_memory() -> Result<Self, StoreError> {
        Self::new(":memory:")
    }

    /// Initialize the database schema
    fn initialize_schema(&mut self) -> Result<(), StoreError> {
        let schema = include_str!("schema.sql");
        self.conn.execute_batch(schema)?;
        Ok(())
    }
}

/// Whether a database error is a UNIQUE / PRIMARY KEY violation
fn is_constraint_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_initialization() {
        assert!(SqliteStore::in_memory().is_ok());
    }

    #[test]
    fn test_schema_is_idempotent() {
        let mut store = SqliteStore::in_memory().unwrap();
        assert!(store.initialize_schema().is_ok());
    }
}
