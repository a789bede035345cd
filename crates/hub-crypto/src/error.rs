//! Crypto error type.

use thiserror::Error;

/// Result type for crypto operations.
pub type CryptoResult<T> = Result<T, CryptoError>;

/// Error type for signature and encryption operations.
#[derive(Debug, Error)]
pub enum CryptoError {
    /// Key generation failed.
    #[error("key generation failed: {0}")]
    KeyGeneration(String),

    /// Invalid key material.
    #[error("invalid key format: {0}")]
    InvalidKey(String),

    /// Signing failed.
    #[error("signing failed: {0}")]
    Signing(String),

    /// Verification failed.
    #[error("signature verification failed")]
    Verification,

    /// Encryption failed.
    #[error("encryption failed")]
    Encryption,

    /// Decryption failed.
    #[error("decryption failed")]
    Decryption,
}
