//! Outbound signing.

use hub_crypto::{SigningKey, VerificationKey};

use super::{SignedMessage, XmlSignature};
use crate::error::SamlResult;

/// Signs outbound messages and assertions with one key.
#[derive(Debug)]
pub struct MessageSigner {
    key: SigningKey,
}

impl MessageSigner {
    /// Creates a signer for the given key.
    #[must_use]
    pub fn new(key: SigningKey) -> Self {
        Self { key }
    }

    /// The public half of the signing key, as published in metadata.
    #[must_use]
    pub fn verification_key(&self) -> VerificationKey {
        self.key.verification_key()
    }

    /// Replaces any existing signatures on `message` with a fresh one.
    ///
    /// # Errors
    ///
    /// Returns an error if serialization or signing fails.
    pub fn sign<M: SignedMessage>(&self, message: &mut M) -> SamlResult<()> {
        message.signatures_mut().clear();
        let content = message.signed_content()?;
        let value = self.key.sign(&content)?;
        message.signatures_mut().push(XmlSignature {
            key_id: Some(self.key.key_id().to_string()),
            value,
        });
        Ok(())
    }
}
