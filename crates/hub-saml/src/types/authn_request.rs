//! SAML AuthnRequest types.
//!
//! Authentication request message sent by a relying party to the hub, and
//! by the hub onwards to an identity provider or country node.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::{Issuer, NameIdPolicy};
use crate::signature::{SignedMessage, XmlSignature};

/// SAML Authentication Request.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AuthnRequest {
    /// Unique identifier for this request.
    pub id: String,

    /// Version of the SAML protocol.
    pub version: String,

    /// Timestamp when this request was issued.
    pub issue_instant: DateTime<Utc>,

    /// The entity issuing the request.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub issuer: Option<Issuer>,

    /// The endpoint the request was addressed to.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub destination: Option<String>,

    /// The URL where the response should be sent.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assertion_consumer_service_url: Option<String>,

    /// Index into the requester's assertion consumer service list.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub assertion_consumer_service_index: Option<u32>,

    /// Binding to use for the response.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub protocol_binding: Option<String>,

    /// Name ID policy constraints.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub name_id_policy: Option<NameIdPolicy>,

    /// Whether the identity provider must re-authenticate the user.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub force_authn: Option<bool>,

    /// IsPassive attribute. Its mere presence is rejected by the hub.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub is_passive: Option<bool>,

    /// Scoping element. Its presence is rejected by the hub.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub scoping: Option<Scoping>,

    /// Enveloped signatures.
    #[serde(default)]
    pub signatures: Vec<XmlSignature>,
}

impl AuthnRequest {
    /// Creates an unsigned 2.0 request with the given id.
    #[must_use]
    pub fn new(id: impl Into<String>, issuer: impl Into<String>, issue_instant: DateTime<Utc>) -> Self {
        Self {
            id: id.into(),
            version: super::SAML_VERSION.to_string(),
            issue_instant,
            issuer: Some(Issuer::entity(issuer)),
            destination: None,
            assertion_consumer_service_url: None,
            assertion_consumer_service_index: None,
            protocol_binding: None,
            name_id_policy: None,
            force_authn: None,
            is_passive: None,
            scoping: None,
            signatures: Vec::new(),
        }
    }

    /// Sets the destination.
    #[must_use]
    pub fn with_destination(mut self, destination: impl Into<String>) -> Self {
        self.destination = Some(destination.into());
        self
    }

    /// Sets the assertion consumer service URL.
    #[must_use]
    pub fn with_acs_url(mut self, url: impl Into<String>) -> Self {
        self.assertion_consumer_service_url = Some(url.into());
        self
    }

    /// Returns the issuer entity id if present.
    #[must_use]
    pub fn issuer_value(&self) -> Option<&str> {
        self.issuer.as_ref().map(|i| i.value.as_str())
    }
}

impl SignedMessage for AuthnRequest {
    fn signatures(&self) -> &[XmlSignature] {
        &self.signatures
    }

    fn signatures_mut(&mut self) -> &mut Vec<XmlSignature> {
        &mut self.signatures
    }
}

/// Scoping element of an AuthnRequest.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Scoping {
    /// Identity providers the requester is willing to use.
    #[serde(default)]
    pub idp_list: Vec<String>,

    /// Maximum number of proxying indirections.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub proxy_count: Option<u32>,
}
