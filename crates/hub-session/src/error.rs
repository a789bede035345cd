//! Session error types.

use hub_cache::CacheError;
use thiserror::Error;

use crate::id::SessionId;

/// Errors that can occur during session operations.
#[derive(Debug, Error)]
pub enum SessionError {
    /// Session not found.
    #[error("session not found: {0}")]
    NotFound(SessionId),

    /// A session with this id already exists.
    #[error("session already exists: {0}")]
    AlreadyExisting(SessionId),

    /// The session is not in the state the caller expected.
    #[error("session {id} is in state {actual}, expected {expected}")]
    WrongState {
        /// Session id.
        id: SessionId,
        /// State the caller expected.
        expected: String,
        /// State actually stored.
        actual: String,
    },

    /// A stored record could not be encoded or decoded.
    #[error("session serialization error: {0}")]
    Serialization(String),

    /// Shared store error.
    #[error("session storage error: {0}")]
    Storage(#[from] CacheError),
}

impl SessionError {
    /// Checks if this is a not found error.
    #[must_use]
    pub const fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Checks if the caller supplied a bad id or expected the wrong state.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::AlreadyExisting(_) | Self::WrongState { .. }
        )
    }
}

impl From<serde_json::Error> for SessionError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

/// Result type for session operations.
pub type SessionResult<T> = Result<T, SessionError>;
