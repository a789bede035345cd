//! Error handling for hub core types.
//!
//! Messages never include key material or message payloads.

use thiserror::Error;

/// Result type alias using the core error type.
pub type Result<T> = std::result::Result<T, Error>;

/// Errors raised by core configuration and value parsing.
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Unknown level of assurance value.
    #[error("unknown level of assurance: {0}")]
    UnknownLevelOfAssurance(String),
}

impl Error {
    /// Returns whether this error was caused by operator-supplied configuration.
    #[must_use]
    pub const fn is_config_error(&self) -> bool {
        matches!(self, Self::Config(_))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_errors_are_flagged() {
        assert!(Error::Config("missing entity id".to_string()).is_config_error());
        assert!(!Error::UnknownLevelOfAssurance("LEVEL_9".to_string()).is_config_error());
    }
}
