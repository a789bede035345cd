//! Validated wrapper types.
//!
//! These can only be constructed by the pipeline in this crate. Code
//! downstream of validation accepts nothing else, so an unvalidated message
//! cannot reach the state machine by construction.

use std::collections::BTreeMap;

use serde::Serialize;

use super::failure::ValidationFailure;
use super::status::{CountryStatus, IdpStatus, MatchingServiceStatus};
use crate::types::{Assertion, AuthnRequest, Response};
use hub_core::LevelOfAssurance;

/// The party role a response is validated for.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
pub enum ResponseRole {
    /// Identity provider authn response.
    IdentityProvider,
    /// Matching service attribute query response.
    MatchingService,
    /// Matching service health check response.
    MatchingServiceHealthCheck,
    /// eIDAS country node authn response.
    Country,
}

impl ResponseRole {
    /// Encrypted assertions required on a success response.
    #[must_use]
    pub const fn success_assertion_count(&self) -> usize {
        match self {
            Self::IdentityProvider => 2,
            Self::MatchingService | Self::Country => 1,
            Self::MatchingServiceHealthCheck => 0,
        }
    }

    /// True for front-channel responses relayed by the browser.
    #[must_use]
    pub const fn is_front_channel(&self) -> bool {
        matches!(self, Self::IdentityProvider | Self::Country)
    }
}

/// Role-specific mapped status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum MappedStatus {
    /// Identity provider status.
    Idp(IdpStatus),
    /// Matching service status.
    MatchingService(MatchingServiceStatus),
    /// Country status.
    Country(CountryStatus),
}

/// An AuthnRequest from a relying party that passed validation.
#[derive(Debug, Clone)]
pub struct ValidatedRequest {
    request: AuthnRequest,
    issuer: String,
    warnings: Vec<ValidationFailure>,
}

impl ValidatedRequest {
    pub(crate) fn new(request: AuthnRequest, issuer: String, warnings: Vec<ValidationFailure>) -> Self {
        Self {
            request,
            issuer,
            warnings,
        }
    }

    /// The request id.
    #[must_use]
    pub fn request_id(&self) -> &str {
        &self.request.id
    }

    /// The issuing relying party.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// The requested assertion consumer service URL, if given.
    #[must_use]
    pub fn assertion_consumer_service_url(&self) -> Option<&str> {
        self.request.assertion_consumer_service_url.as_deref()
    }

    /// Whether the relying party demands fresh authentication.
    #[must_use]
    pub fn force_authn(&self) -> bool {
        self.request.force_authn.unwrap_or(false)
    }

    /// Advisory failures raised while validating.
    #[must_use]
    pub fn warnings(&self) -> &[ValidationFailure] {
        &self.warnings
    }

    /// The underlying request.
    #[must_use]
    pub fn request(&self) -> &AuthnRequest {
        &self.request
    }
}

/// A response whose envelope passed validation for a role.
#[derive(Debug, Clone)]
pub struct ValidatedResponse {
    response: Response,
    role: ResponseRole,
    issuer: String,
    in_response_to: String,
    status: MappedStatus,
}

impl ValidatedResponse {
    pub(crate) fn new(
        response: Response,
        role: ResponseRole,
        issuer: String,
        in_response_to: String,
        status: MappedStatus,
    ) -> Self {
        Self {
            response,
            role,
            issuer,
            in_response_to,
            status,
        }
    }

    /// Role the envelope was validated for.
    #[must_use]
    pub const fn role(&self) -> ResponseRole {
        self.role
    }

    /// Response issuer.
    #[must_use]
    pub fn issuer(&self) -> &str {
        &self.issuer
    }

    /// The request id this response answers.
    #[must_use]
    pub fn in_response_to(&self) -> &str {
        &self.in_response_to
    }

    /// Mapped status.
    #[must_use]
    pub const fn status(&self) -> MappedStatus {
        self.status
    }

    /// Status message, if any.
    #[must_use]
    pub fn status_message(&self) -> Option<&str> {
        self.response.status.status_message.as_deref()
    }

    /// The underlying response.
    #[must_use]
    pub fn response(&self) -> &Response {
        &self.response
    }
}

/// Decrypted assertions whose own signatures verified.
#[derive(Debug, Clone)]
pub struct ValidatedAssertions {
    assertions: Vec<Assertion>,
}

impl ValidatedAssertions {
    pub(crate) fn new(assertions: Vec<Assertion>) -> Self {
        Self { assertions }
    }

    /// The assertions.
    #[must_use]
    pub fn assertions(&self) -> &[Assertion] {
        &self.assertions
    }

    /// The single matching dataset assertion, if exactly one exists.
    #[must_use]
    pub fn matching_dataset(&self) -> Option<&Assertion> {
        single(self.assertions.iter().filter(|a| a.is_matching_dataset()))
    }

    /// The single authn statement assertion, if exactly one exists.
    #[must_use]
    pub fn authn_assertion(&self) -> Option<&Assertion> {
        single(self.assertions.iter().filter(|a| a.is_authn_assertion()))
    }

    /// Number of assertions.
    #[must_use]
    pub fn len(&self) -> usize {
        self.assertions.len()
    }

    /// True if there are no assertions.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.assertions.is_empty()
    }
}

fn single<'a>(mut iter: impl Iterator<Item = &'a Assertion>) -> Option<&'a Assertion> {
    let first = iter.next()?;
    iter.next().is_none().then_some(first)
}

/// A fully validated identity provider response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InboundIdpResponse {
    /// Response id.
    pub response_id: String,
    /// Issuing identity provider.
    pub issuer: String,
    /// Request id answered.
    pub in_response_to: String,
    /// Mapped status.
    pub status: IdpStatus,
    /// Status message, if any.
    pub status_message: Option<String>,
    /// Asserted level of assurance on success.
    pub level_of_assurance: Option<LevelOfAssurance>,
    /// Persistent subject identifier on success.
    pub persistent_id: Option<String>,
    /// Identity provider fraud event id, carried with LEVEL_X.
    pub fraud_event_id: Option<String>,
    /// Matching dataset attributes on success.
    pub matching_dataset: BTreeMap<String, Vec<String>>,
    #[serde(skip)]
    pub(crate) _sealed: (),
}

/// A fully validated eIDAS country response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InboundCountryResponse {
    /// Response id.
    pub response_id: String,
    /// Issuing country node.
    pub issuer: String,
    /// Request id answered.
    pub in_response_to: String,
    /// Mapped status.
    pub status: CountryStatus,
    /// Status message, if any.
    pub status_message: Option<String>,
    /// Asserted eIDAS level of assurance on success.
    pub level_of_assurance: Option<LevelOfAssurance>,
    /// eIDAS person identifier on success.
    pub person_identifier: Option<String>,
    /// eIDAS attributes on success.
    pub attributes: BTreeMap<String, Vec<String>>,
    #[serde(skip)]
    pub(crate) _sealed: (),
}

/// A fully validated matching service response.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct InboundMatchingServiceResponse {
    /// Response id.
    pub response_id: String,
    /// Issuing matching service.
    pub issuer: String,
    /// Request id answered.
    pub in_response_to: String,
    /// Mapped status.
    pub status: MatchingServiceStatus,
    /// Status message, if any.
    pub status_message: Option<String>,
    /// Relying-party scoped persistent id asserted on success.
    pub persistent_id: Option<String>,
    #[serde(skip)]
    pub(crate) _sealed: (),
}

/// Collects all attributes of an assertion by name.
pub(crate) fn attribute_map(assertion: &Assertion) -> BTreeMap<String, Vec<String>> {
    let mut map: BTreeMap<String, Vec<String>> = BTreeMap::new();
    for attribute in assertion.attribute_statements.iter().flat_map(|s| &s.attributes) {
        map.entry(attribute.name.clone())
            .or_default()
            .extend(attribute.values.iter().cloned());
    }
    map
}
