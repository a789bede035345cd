//! Message and assertion signatures.
//!
//! A signature covers the canonical serialized form of the message with its
//! own signature list emptied, so every other field is bound by it. The
//! codec is responsible for producing that form from the wire; here the
//! canonical form is the message's JSON serialization.
//!
//! # Verification
//!
//! [`SignatureVerifier`] is the crypto collaborator seam: given a message and
//! the candidate keys published in metadata, it answers whether exactly one
//! signature is present and verifies against any candidate.

mod signer;

pub use signer::*;

use serde::{Deserialize, Serialize};

use crate::error::SamlResult;
use hub_crypto::VerificationKey;

/// An enveloped signature.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct XmlSignature {
    /// Id of the key that produced the signature, if advertised.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_id: Option<String>,

    /// ASN.1 DER ECDSA signature bytes.
    pub value: Vec<u8>,
}

/// A message that carries enveloped signatures.
pub trait SignedMessage: Serialize + Clone {
    /// The signatures present on the message.
    fn signatures(&self) -> &[XmlSignature];

    /// Mutable access to the signature list.
    fn signatures_mut(&mut self) -> &mut Vec<XmlSignature>;

    /// The bytes covered by a signature.
    ///
    /// # Errors
    ///
    /// Returns an error if the message cannot be serialized.
    fn signed_content(&self) -> SamlResult<Vec<u8>> {
        let mut unsigned = self.clone();
        unsigned.signatures_mut().clear();
        Ok(serde_json::to_vec(&unsigned)?)
    }
}

/// Outcome of a signature check.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SignatureCheck {
    /// Exactly one signature, and it verifies.
    Valid,
    /// No signature present.
    Missing,
    /// More than one signature present.
    Multiple,
    /// One signature that no candidate key verifies.
    Invalid,
}

/// Signature verification collaborator.
pub trait SignatureVerifier: Send + Sync {
    /// Verifies `signature` over `content` against any of `keys`.
    fn verify(&self, content: &[u8], signature: &XmlSignature, keys: &[VerificationKey]) -> bool;
}

/// Checks that `message` carries exactly one signature valid under `keys`.
///
/// # Errors
///
/// Returns an error if the signed content cannot be produced.
pub fn check_signature<M: SignedMessage>(
    verifier: &(impl SignatureVerifier + ?Sized),
    message: &M,
    keys: &[VerificationKey],
) -> SamlResult<SignatureCheck> {
    let signature = match message.signatures() {
        [] => return Ok(SignatureCheck::Missing),
        [single] => single,
        _ => return Ok(SignatureCheck::Multiple),
    };
    let content = message.signed_content()?;
    if verifier.verify(&content, signature, keys) {
        Ok(SignatureCheck::Valid)
    } else {
        Ok(SignatureCheck::Invalid)
    }
}

/// ECDSA P-384 verifier backed by aws-lc-rs.
#[derive(Debug, Clone, Copy, Default)]
pub struct EcdsaSignatureVerifier;

impl SignatureVerifier for EcdsaSignatureVerifier {
    fn verify(&self, content: &[u8], signature: &XmlSignature, keys: &[VerificationKey]) -> bool {
        hub_crypto::verify_with_any(content, &signature.value, keys)
    }
}
