//! SAML Response types.

use chrono::{DateTime, Utc};
use hub_crypto::SealedPayload;
use serde::{Deserialize, Serialize};

use super::{Assertion, Issuer, Status};
use crate::signature::{SignedMessage, XmlSignature};

/// SAML protocol response from an identity provider, matching service or
/// country node.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Response {
    /// Unique identifier for this response.
    pub id: String,

    /// Version of the SAML protocol.
    pub version: String,

    /// Timestamp when this response was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity issuing the response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<Issuer>,

    /// Id of the request this response answers.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub in_response_to: Option<String>,

    /// The endpoint the response was addressed to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    /// Response status.
    pub status: Status,

    /// Plaintext assertions. The hub profile never allows any.
    #[serde(default)]
    pub assertions: Vec<Assertion>,

    /// Encrypted assertions.
    #[serde(default)]
    pub encrypted_assertions: Vec<EncryptedAssertion>,

    /// Enveloped signatures.
    #[serde(default)]
    pub signatures: Vec<XmlSignature>,
}

impl Response {
    /// Creates an unsigned response with no assertions.
    #[must_use]
    pub fn new(
        id: impl Into<String>,
        issuer: impl Into<String>,
        issue_instant: DateTime<Utc>,
        status: Status,
    ) -> Self {
        Self {
            id: id.into(),
            version: super::SAML_VERSION.to_string(),
            issue_instant,
            issuer: Some(Issuer::entity(issuer)),
            in_response_to: None,
            destination: None,
            status,
            assertions: Vec::new(),
            encrypted_assertions: Vec::new(),
            signatures: Vec::new(),
        }
    }

    /// Sets InResponseTo.
    #[must_use]
    pub fn in_response_to(mut self, request_id: impl Into<String>) -> Self {
        self.in_response_to = Some(request_id.into());
        self
    }

    /// Sets the destination.
    #[must_use]
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Returns the issuer entity id if present.
    #[must_use]
    pub fn issuer_value(&self) -> Option<&str> {
        self.issuer.as_ref().map(|i| i.value.as_str())
    }

    /// Total number of assertions of either kind.
    #[must_use]
    pub fn assertion_count(&self) -> usize {
        self.assertions.len() + self.encrypted_assertions.len()
    }
}

impl SignedMessage for Response {
    fn signatures(&self) -> &[XmlSignature] {
        &self.signatures
    }

    fn signatures_mut(&mut self) -> &mut Vec<XmlSignature> {
        &mut self.signatures
    }
}

/// An assertion encrypted for the hub.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EncryptedAssertion {
    /// Key id hint. Never trusted; every hub key is tried.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub key_name: Option<String>,

    /// Sealed serialized assertion.
    pub payload: SealedPayload,
}
