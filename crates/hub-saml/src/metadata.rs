//! Metadata key service.
//!
//! Maps entity ids to the keys published in federation metadata. Signing
//! keys come as an ordered list so that old and new keys are both accepted
//! during rollover; encryption uses a single current key.

use dashmap::DashMap;
use hub_crypto::{EncryptionKey, VerificationKey};

use crate::error::{SamlError, SamlResult};

/// Key lookup collaborator.
pub trait MetadataKeyService: Send + Sync {
    /// Signing keys currently valid for `entity_id`, newest first.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::UnknownEntity`] if metadata has no such entity.
    fn signing_keys(&self, entity_id: &str) -> SamlResult<Vec<VerificationKey>>;

    /// The encryption key for messages addressed to `entity_id`.
    ///
    /// # Errors
    ///
    /// Returns [`SamlError::UnknownEntity`] if metadata has no such entity.
    fn encryption_key(&self, entity_id: &str) -> SamlResult<EncryptionKey>;
}

/// Metadata held in process memory, loaded at startup.
#[derive(Debug, Default)]
pub struct InMemoryMetadata {
    signing: DashMap<String, Vec<VerificationKey>>,
    encryption: DashMap<String, EncryptionKey>,
}

impl InMemoryMetadata {
    /// Creates an empty metadata store.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Publishes a signing key for `entity_id`, ahead of existing ones.
    pub fn add_signing_key(&self, entity_id: impl Into<String>, key: VerificationKey) {
        let mut keys = self.signing.entry(entity_id.into()).or_default();
        keys.retain(|k| k.key_id != key.key_id);
        keys.insert(0, key);
    }

    /// Withdraws a signing key, ending its rollover period.
    pub fn remove_signing_key(&self, entity_id: &str, key_id: &str) {
        if let Some(mut keys) = self.signing.get_mut(entity_id) {
            keys.retain(|k| k.key_id != key_id);
        }
    }

    /// Sets the encryption key for `entity_id`.
    pub fn set_encryption_key(&self, entity_id: impl Into<String>, key: EncryptionKey) {
        self.encryption.insert(entity_id.into(), key);
    }
}

impl MetadataKeyService for InMemoryMetadata {
    fn signing_keys(&self, entity_id: &str) -> SamlResult<Vec<VerificationKey>> {
        self.signing
            .get(entity_id)
            .map(|keys| keys.clone())
            .filter(|keys| !keys.is_empty())
            .ok_or_else(|| SamlError::UnknownEntity(entity_id.to_string()))
    }

    fn encryption_key(&self, entity_id: &str) -> SamlResult<EncryptionKey> {
        self.encryption
            .get(entity_id)
            .map(|key| key.clone())
            .ok_or_else(|| SamlError::UnknownEntity(entity_id.to_string()))
    }
}
