//! Assertion encryption and decryption.
//!
//! The hub may hold several decryption keys at once during rollover. The
//! pipeline tries each in turn; an individual failure is expected and only
//! logged, while failure of every key is a hard validation error whose
//! message never reveals which key was tried.

use hub_crypto::EncryptionKey;

use crate::error::{SamlError, SamlResult};
use crate::types::{Assertion, EncryptedAssertion};

/// Decryption collaborator.
pub trait AssertionDecrypter: Send + Sync {
    /// Opens `encrypted` with `key`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::Decryption`] if the key does not open the payload,
    /// or a serialization error if the plaintext is not an assertion.
    fn decrypt(&self, encrypted: &EncryptedAssertion, key: &EncryptionKey) -> SamlResult<Assertion>;
}

/// AES-256-GCM decrypter backed by aws-lc-rs.
#[derive(Debug, Clone, Copy, Default)]
pub struct AesGcmAssertionDecrypter;

impl AssertionDecrypter for AesGcmAssertionDecrypter {
    fn decrypt(&self, encrypted: &EncryptedAssertion, key: &EncryptionKey) -> SamlResult<Assertion> {
        let plaintext = key.decrypt(&encrypted.payload)?;
        serde_json::from_slice(&plaintext).map_err(|_| SamlError::Decryption)
    }
}

/// Encrypts `assertion` for the holder of `key`.
///
/// # Errors
///
/// Returns an error if serialization or sealing fails.
pub fn encrypt_assertion(assertion: &Assertion, key: &EncryptionKey) -> SamlResult<EncryptedAssertion> {
    let plaintext = serde_json::to_vec(assertion)?;
    let payload = key.encrypt(&plaintext)?;
    Ok(EncryptedAssertion {
        key_name: Some(key.key_id().to_string()),
        payload,
    })
}
