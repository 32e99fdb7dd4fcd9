//! The error taxonomy shared by every crate in the workspace.
//!
//! Propagation policy: heartbeat tasks catch everything and log; memory
//! ingestion catches everything; the turn loop contains tool failures in
//! the tool's own result row. Only [`Error::Fatal`] may terminate the
//! process, and only at boot before the scheduler starts.

use thiserror::Error;

/// Result alias used across the workspace.
pub type Result<T> = std::result::Result<T, Error>;

/// Every failure the runtime can surface, by kind.
#[non_exhaustive]
#[derive(Debug, Error)]
pub enum Error {
    /// An entity was looked up and does not exist.
    #[error("{entity} not found: {id}")]
    NotFound {
        /// Kind of entity that was missing (child, turn, task...).
        entity: &'static str,
        /// The identifier that failed to resolve.
        id: String,
    },

    /// Input violated a schema or bound before any side effect happened.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The policy engine rejected a tool call.
    #[error("policy denied ({code}): {message}")]
    PolicyDenied {
        /// Machine-readable reason code (e.g. `self_harm`, `treasury_limit`).
        code: String,
        /// Human-readable explanation surfaced in the tool result.
        message: String,
    },

    /// A spend or rate limit was exceeded.
    #[error("limit exceeded: {0}")]
    LimitExceeded(String),

    /// An external collaborator is reachable but refusing to serve
    /// (HTTP 5xx, insufficient gas, empty model response).
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Network failure or timeout before a response was obtained.
    #[error("transport: {0}")]
    Transport(String),

    /// Data failed a correctness check: database corruption, signature
    /// mismatch, constitution hash mismatch.
    #[error("integrity: {0}")]
    Integrity(String),

    /// Unrecoverable. Allowed to abort the process only during boot.
    #[error("fatal: {0}")]
    Fatal(String),

    /// Catch-all. Include context.
    #[error("{0}")]
    Other(#[from] Box<dyn std::error::Error + Send + Sync>),
}

impl Error {
    /// Shorthand for a [`Error::NotFound`].
    pub fn not_found(entity: &'static str, id: impl Into<String>) -> Self {
        Self::NotFound {
            entity,
            id: id.into(),
        }
    }

    /// Shorthand for a [`Error::PolicyDenied`].
    pub fn denied(code: impl Into<String>, message: impl Into<String>) -> Self {
        Self::PolicyDenied {
            code: code.into(),
            message: message.into(),
        }
    }

    /// Whether this error may abort the process.
    pub fn is_fatal(&self) -> bool {
        matches!(self, Self::Fatal(_))
    }
}
