//! Digital signatures.
//!
//! ECDSA over P-384 with SHA-384, ASN.1 (DER) encoded signatures.

use std::fmt;

use aws_lc_rs::rand::SystemRandom;
use aws_lc_rs::signature::{
    EcdsaKeyPair, KeyPair, UnparsedPublicKey, ECDSA_P384_SHA384_ASN1,
    ECDSA_P384_SHA384_ASN1_SIGNING,
};
use serde::{Deserialize, Serialize};

use crate::error::{CryptoError, CryptoResult};
use crate::hash::key_id;

/// Private signing key.
pub struct SigningKey {
    key_pair: EcdsaKeyPair,
    key_id: String,
}

impl SigningKey {
    /// Generates a fresh P-384 key pair.
    ///
    /// # Errors
    ///
    /// Returns an error if the system random source fails.
    pub fn generate() -> CryptoResult<Self> {
        let rng = SystemRandom::new();
        let pkcs8 = EcdsaKeyPair::generate_pkcs8(&ECDSA_P384_SHA384_ASN1_SIGNING, &rng)
            .map_err(|e| CryptoError::KeyGeneration(format!("ECDSA key generation failed: {e}")))?;
        Self::from_pkcs8(pkcs8.as_ref())
    }

    /// Loads a key from PKCS#8 DER.
    ///
    /// # Errors
    ///
    /// Returns an error if the key is not a P-384 ECDSA key.
    pub fn from_pkcs8(pkcs8_der: &[u8]) -> CryptoResult<Self> {
        let key_pair = EcdsaKeyPair::from_pkcs8(&ECDSA_P384_SHA384_ASN1_SIGNING, pkcs8_der)
            .map_err(|e| CryptoError::InvalidKey(format!("Invalid ECDSA PKCS#8 key: {e}")))?;
        let key_id = key_id(key_pair.public_key().as_ref());
        Ok(Self { key_pair, key_id })
    }

    /// Returns the key id.
    #[must_use]
    pub fn key_id(&self) -> &str {
        &self.key_id
    }

    /// Signs the given data.
    ///
    /// # Errors
    ///
    /// Returns an error if signing fails.
    pub fn sign(&self, data: &[u8]) -> CryptoResult<Vec<u8>> {
        let rng = SystemRandom::new();
        let signature = self
            .key_pair
            .sign(&rng, data)
            .map_err(|e| CryptoError::Signing(format!("ECDSA signing failed: {e}")))?;
        Ok(signature.as_ref().to_vec())
    }

    /// Returns the public half, as published in metadata.
    #[must_use]
    pub fn verification_key(&self) -> VerificationKey {
        VerificationKey {
            key_id: self.key_id.clone(),
            public_key: self.key_pair.public_key().as_ref().to_vec(),
        }
    }
}

impl fmt::Debug for SigningKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SigningKey")
            .field("key_id", &self.key_id)
            .finish_non_exhaustive()
    }
}

/// Public verification key.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct VerificationKey {
    /// Key id derived from the public key bytes.
    pub key_id: String,
    /// Uncompressed P-384 public point.
    pub public_key: Vec<u8>,
}

impl VerificationKey {
    /// Creates a verification key from public point bytes.
    #[must_use]
    pub fn from_public_key(public_key: Vec<u8>) -> Self {
        Self {
            key_id: key_id(&public_key),
            public_key,
        }
    }

    /// Verifies `signature` over `data`.
    ///
    /// # Errors
    ///
    /// Returns [`CryptoError::Verification`] if the signature does not verify.
    pub fn verify(&self, data: &[u8], signature: &[u8]) -> CryptoResult<()> {
        UnparsedPublicKey::new(&ECDSA_P384_SHA384_ASN1, &self.public_key)
            .verify(data, signature)
            .map_err(|_| CryptoError::Verification)
    }
}

/// Returns true if any of `keys` verifies `signature` over `data`.
#[must_use]
pub fn verify_with_any(data: &[u8], signature: &[u8], keys: &[VerificationKey]) -> bool {
    keys.iter().any(|key| key.verify(data, signature).is_ok())
}
