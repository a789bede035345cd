//! Assertion encryption.
//!
//! AES-256-GCM with a random 96-bit nonce per payload.

use std::fmt;

use aws_lc_rs::aead::{Aad, LessSafeKey, Nonce, UnboundKey, AES_256_GCM, NONCE_LEN};
use aws_lc_rs::rand::{SecureRandom, SystemRandom};
use serde::{Deserialize, Serialize};

use crate::error::{CryptoError, CryptoResult};
use crate::hash::key_id;

const KEY_LEN: usize = 32;

/// Ciphertext plus the nonce it was sealed with.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SealedPayload {
    /// GCM nonce.
    pub nonce: Vec<u8>,
    /// Ciphertext with the authentication tag appended.
    pub ciphertext: Vec<u8>,
}

/// Symmetric key for assertion encryption.
#[derive(Clone)]
pub struct EncryptionKey {
    bytes: [u8; KEY_LEN],
    key_id: String,
}

impl EncryptionKey {
    /// Generates a fresh random key.
    ///
    /// # Errors
    ///
    /// Returns an error if the system random source fails.
    pub fn generate() -> CryptoResult<Self> {
        let mut bytes = [0u8; KEY_LEN];
        SystemRandom::new()
            .fill(&mut bytes)
            .map_err(|e| CryptoError::KeyGeneration(format!("random source failed: {e}")))?;
        Ok(Self::from_array(bytes))
    }

    /// Loads a key from raw bytes.
    ///
    /// # Errors
    ///
    /// Returns an error unless exactly 32 bytes are supplied.
    pub fn from_bytes(bytes: &[u8]) -> CryptoResult<Self> {
        let array: [u8; KEY_LEN] = bytes.try_into().map_err(|_| {
            CryptoError::InvalidKey(format!("expected {KEY_LEN} key bytes, got {}", bytes.len()))
        })?;
        Ok(Self::from_array(array))
    }

    fn from_array(bytes: [u8; KEY_LEN]) -> Self {
        let key_id = key_id(&bytes);
        Self { bytes, key_id }
    }

    /// Returns the key id.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    fn aead_key(&self) -> CryptoResult<LessSafeKey> {
        let unbound = UnboundKey::new(&AES_256_GCM, &self.bytes)
            .map_err(|e| CryptoError::InvalidKey(format!("AES key rejected: {e}")))?;
        Ok(LessSafeKey::new(unbound))
    }

    /// Encrypts `plaintext`.
    ///
    /// # Errors
    ///
    /// Returns an error if the nonce cannot be generated or sealing fails.
    pub fn encrypt(&self, plaintext: &[u8]) -> CryptoResult<SealedPayload> {
        let mut nonce = [0u8; NONCE_LEN];
        SystemRandom::new()
            .fill(&mut nonce)
            .map_err(|_| CryptoError::Encryption)?;

        let mut in_out = plaintext.to_vec();
        self.aead_key()?
            .seal_in_place_append_tag(Nonce::assume_unique_for_key(nonce), Aad::empty(), &mut in_out)
            .map_err(|_| CryptoError::Encryption)?;

        Ok(SealedPayload {
            nonce: nonce.to_vec(),
            ciphertext: in_out,
        })
    }

    /// Decrypts and authenticates a payload.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Decryption`] if this key did not seal the payload
    /// or the payload was modified.
    pub fn decrypt(&self, sealed: &SealedPayload) -> CryptoResult<Vec<u8>> {
        let nonce: [u8; NONCE_LEN] = sealed
            .nonce
            .as_slice()
            .try_into()
            .map_err(|_| CryptoError::Decryption)?;

        let mut in_out = sealed.ciphertext.clone();
        let plaintext = self
            .aead_key()?
            .open_in_place(Nonce::assume_unique_for_key(nonce), Aad::empty(), &mut in_out)
            .map_err(|_| CryptoError::Decryption)?;
        Ok(plaintext.to_vec())
    }
}

impl fmt::Debug for EncryptionKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EncryptionKey")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decrypts_with_the_sealing_key_only() {
        let key = EncryptionKey::generate().unwrap();
        let other = EncryptionKey::generate().unwrap();

        let sealed = key.encrypt(b"<Assertion/>").unwrap();

        assert_eq!(key.decrypt(&sealed).unwrap(), b"<Assertion/>");
        assert!(matches!(other.decrypt(&sealed), Err(CryptoError::Decryption)));
    }

    #[test]
    fn tampered_ciphertext_is_rejected() {
        let key = EncryptionKey::generate().unwrap();
        let mut sealed = key.encrypt(b"payload").unwrap();
        sealed.ciphertext[0] ^= 0xff;
        assert!(key.decrypt(&sealed).is_err());
    }

    #[test]
    fn short_keys_are_rejected() {
        assert!(matches!(
            EncryptionKey::from_bytes(&[0u8; 16]),
            Err(CryptoError::InvalidKey(_))
        ));
        assert!(EncryptionKey::from_bytes(&[7u8; 32]).is_ok());
    }

    #[test]
    fn debug_output_hides_key_bytes() {
        let key = EncryptionKey::from_bytes(&[7u8; 32]).unwrap();
        let debug = format!("{key:?}");
        assert!(debug.contains("key_id"));
        assert!(!debug.contains("bytes"));
    }
}
