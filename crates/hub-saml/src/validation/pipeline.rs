//! The validation pipeline and its collaborators.

use std::sync::Arc;

use hub_cache::ReplayCache;
use hub_core::{HubConfig, SharedClock, SystemClock};
use hub_crypto::EncryptionKey;
use tracing::warn;

use super::failure::{FailureReason, ValidationFailure, ValidationResult};
use super::status::IdpStatusMapping;
use crate::encryption::{AesGcmAssertionDecrypter, AssertionDecrypter};
use crate::metadata::MetadataKeyService;
use crate::signature::{check_signature, EcdsaSignatureVerifier, SignatureCheck, SignatureVerifier, SignedMessage};

/// Ordered validators over inbound messages.
///
/// Validation is CPU-bound and runs to completion; the only shared state it
/// consults is the pair of replay caches.
pub struct ValidationPipeline {
    pub(crate) config: HubConfig,
    pub(crate) metadata: Arc<dyn MetadataKeyService>,
    pub(crate) verifier: Arc<dyn SignatureVerifier>,
    pub(crate) decrypter: Arc<dyn AssertionDecrypter>,
    pub(crate) decryption_keys: Vec<EncryptionKey>,
    pub(crate) request_replay: Arc<dyn ReplayCache>,
    pub(crate) assertion_replay: Arc<dyn ReplayCache>,
    pub(crate) clock: SharedClock,
    pub(crate) idp_status_mapping: IdpStatusMapping,
}

impl ValidationPipeline {
    /// Creates a pipeline with the default ECDSA verifier, AES-GCM decrypter,
    /// system clock and standard identity provider status table.
    #[must_use]
    pub fn new(
        config: HubConfig,
        metadata: Arc<dyn MetadataKeyService>,
        decryption_keys: Vec<EncryptionKey>,
        request_replay: Arc<dyn ReplayCache>,
        assertion_replay: Arc<dyn ReplayCache>,
    ) -> Self {
        Self {
            config,
            metadata,
            verifier: Arc::new(EcdsaSignatureVerifier),
            decrypter: Arc::new(AesGcmAssertionDecrypter),
            decryption_keys,
            request_replay,
            assertion_replay,
            clock: SystemClock::shared(),
            idp_status_mapping: IdpStatusMapping::standard(),
        }
    }

    /// Replaces the clock.
    #[must_use]
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Replaces the signature verifier.
    #[must_use]
    pub fn with_verifier(mut self, verifier: Arc<dyn SignatureVerifier>) -> Self {
        self.verifier = verifier;
        self
    }

    /// Replaces the assertion decrypter.
    #[must_use]
    pub fn with_decrypter(mut self, decrypter: Arc<dyn AssertionDecrypter>) -> Self {
        self.decrypter = decrypter;
        self
    }

    /// Replaces the identity provider status table.
    #[must_use]
    pub fn with_idp_status_mapping(mut self, mapping: IdpStatusMapping) -> Self {
        self.idp_status_mapping = mapping;
        self
    }

    /// The hub configuration in use.
    #[must_use]
    pub fn config(&self) -> &HubConfig {
        &self.config
    }

    /// Verifies that `message` carries exactly one valid signature by `entity_id`.
    pub(crate) fn verify_signature<M: SignedMessage>(
        &self,
        message: &M,
        entity_id: &str,
        invalid: FailureReason,
    ) -> ValidationResult<()> {
        let keys = self.metadata.signing_keys(entity_id).map_err(|e| {
            ValidationFailure::new(FailureReason::UnknownIssuer, e.to_string())
        })?;
        let check = check_signature(&*self.verifier, message, &keys)
            .map_err(|e| ValidationFailure::new(FailureReason::MalformedMessage, e.to_string()))?;

        let (reason, message) = match check {
            SignatureCheck::Valid => return Ok(()),
            SignatureCheck::Missing if invalid == FailureReason::InvalidSignature => {
                (FailureReason::MissingSignature, "message is not signed")
            }
            SignatureCheck::Multiple if invalid == FailureReason::InvalidSignature => {
                (FailureReason::MultipleSignatures, "message carries more than one signature")
            }
            SignatureCheck::Missing => (invalid, "assertion is not signed"),
            SignatureCheck::Multiple => (invalid, "assertion carries more than one signature"),
            SignatureCheck::Invalid => (invalid, "signature does not verify against published keys"),
        };
        Err(ValidationFailure::new(reason, format!("{message} ({entity_id})")))
    }

    /// Records `id` in `cache`, failing closed if the cache is unreachable.
    pub(crate) async fn accept_once(
        cache: &dyn ReplayCache,
        id: &str,
        duplicate: FailureReason,
    ) -> ValidationResult<()> {
        match cache.accept(id).await {
            Ok(true) => Ok(()),
            Ok(false) => {
                warn!(id, reason = %duplicate, "replayed id rejected");
                Err(ValidationFailure::new(duplicate, format!("{id} was already seen")))
            }
            Err(err) => Err(ValidationFailure::new(
                FailureReason::ReplayCacheUnavailable,
                format!("replay cache unavailable: {err}"),
            )),
        }
    }
}

impl std::fmt::Debug for ValidationPipeline {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("ValidationPipeline")
            .field("hub_entity_id", &self.config.hub_entity_id)
            .field("decryption_keys", &self.decryption_keys.len())
            .finish_non_exhaustive()
    }
}
