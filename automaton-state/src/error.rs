//! Store errors and their mapping onto the workspace taxonomy.

use thiserror::Error;

/// Failures originating inside the state store.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum StoreError {
    /// The SQLite driver reported an error (locked, I/O, constraint).
    #[error("database error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// `PRAGMA integrity_check` returned something other than "ok".
    #[error("integrity check failed: {0}")]
    Integrity(String),

    /// A migration could not be applied. Boot must abort.
    #[error("migration to version {version} failed: {message}")]
    Migration {
        /// The version that failed to apply.
        version: i64,
        /// Driver error text.
        message: String,
    },

    /// The database directory could not be prepared.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// A row exists that must not (identity written twice).
    #[error("conflict: {0}")]
    Conflict(String),
}

impl From<StoreError> for automaton_core::Error {
    fn from(err: StoreError) -> Self {
        match err {
            StoreError::Integrity(msg) => automaton_core::Error::Integrity(msg),
            StoreError::Migration { version, message } => automaton_core::Error::Fatal(format!(
                "migration to version {version} failed: {message}"
            )),
            StoreError::Conflict(msg) => automaton_core::Error::InvalidInput(msg),
            other => automaton_core::Error::Unavailable(other.to_string()),
        }
    }
}
