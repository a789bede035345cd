//! Health check error types.

use hub_saml::ValidationFailure;
use thiserror::Error;

/// Why a single matching service was judged unhealthy.
#[derive(Debug, Clone, Error)]
pub enum HealthCheckError {
    /// The request could not be delivered or the answer not read.
    #[error("transport error: {0}")]
    Transport(String),

    /// The answer failed envelope validation.
    #[error("invalid response: {0}")]
    InvalidResponse(ValidationFailure),

    /// The answer came from another entity.
    #[error("response issued by {actual}, expected {expected}")]
    WrongIssuer {
        /// Matching service that was asked.
        expected: String,
        /// Issuer of the answer.
        actual: String,
    },

    /// The answer does not echo the request id.
    #[error("response answers {actual}, expected {expected}")]
    WrongInResponseTo {
        /// Health check request id.
        expected: String,
        /// Received InResponseTo.
        actual: String,
    },

    /// The matching service answered with an error status.
    #[error("matching service reported {0}")]
    NotHealthy(String),
}

impl From<ValidationFailure> for HealthCheckError {
    fn from(failure: ValidationFailure) -> Self {
        Self::InvalidResponse(failure)
    }
}

/// Result type for health check operations.
pub type HealthResult<T> = Result<T, HealthCheckError>;
