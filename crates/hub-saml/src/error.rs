//! SAML error types.
//!
//! Errors raised by the collaborators around the validation pipeline: the
//! codec, the metadata key service and the crypto primitives. Validation
//! outcomes themselves are [`ValidationFailure`](crate::validation::ValidationFailure)s.

use thiserror::Error;

/// Result type for SAML operations.
pub type SamlResult<T> = Result<T, SamlError>;

/// SAML collaborator errors.
#[derive(Debug, Error)]
pub enum SamlError {
    /// A message could not be turned into (or out of) its canonical form.
    #[error("serialization error: {0}")]
    Serialization(String),

    /// Metadata has no entry for the entity.
    #[error("unknown entity: {0}")]
    UnknownEntity(String),

    /// Cryptographic operation error.
    #[error("crypto error: {0}")]
    Crypto(String),

    /// An encrypted assertion could not be opened with the supplied key.
    #[error("unable to decrypt assertion")]
    Decryption,
}

impl From<serde_json::Error> for SamlError {
    fn from(err: serde_json::Error) -> Self {
        Self::Serialization(err.to_string())
    }
}

impl From<hub_crypto::CryptoError> for SamlError {
    fn from(err: hub_crypto::CryptoError) -> Self {
        match err {
            hub_crypto::CryptoError::Decryption => Self::Decryption,
            other => Self::Crypto(other.to_string()),
        }
    }
}
