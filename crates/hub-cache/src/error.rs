//! Cache error types.

use std::fmt;

/// Shared store operation errors.
#[derive(Debug)]
pub enum CacheError {
    /// Connection to the store backend failed.
    Connection(String),
    /// A stored value could not be encoded or decoded.
    Serialization(String),
    /// Store operation timed out.
    Timeout,
    /// Invalid store configuration.
    Configuration(String),
    /// Internal store error.
    Internal(String),
}

impl CacheError {
    /// Returns true if retrying the operation may succeed.
    #[must_use]
    pub const fn is_transient(&self) -> bool {
        matches!(self, Self::Connection(_) | Self::Timeout)
    }
}

impl fmt::Display for CacheError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Connection(msg) => write!(f, "cache connection error: {msg}"),
            Self::Serialization(msg) => write!(f, "cache serialization error: {msg}"),
            Self::Timeout => write!(f, "cache operation timed out"),
            Self::Configuration(msg) => write!(f, "cache configuration error: {msg}"),
            Self::Internal(msg) => write!(f, "internal cache error: {msg}"),
        }
    }
}

impl std::error::Error for CacheError {}

/// Result type for cache operations.
pub type CacheResult<T> = Result<T, CacheError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_display() {
        let err = CacheError::Timeout;
        assert_eq!(err.to_string(), "cache operation timed out");

        let err = CacheError::Connection("refused".to_string());
        assert!(err.to_string().contains("refused"));
        assert!(err.is_transient());
        assert!(!CacheError::Internal("x".to_string()).is_transient());
    }
}
