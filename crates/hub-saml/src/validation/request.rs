//! Relying party AuthnRequest validation.

use chrono::{DateTime, Utc};
use tracing::{debug, warn};

use super::failure::{Checks, FailureReason, ValidationFailure, ValidationResult};
use super::pipeline::ValidationPipeline;
use super::validated::ValidatedRequest;
use crate::types::{name_id_formats, AuthnRequest, HTTP_POST_BINDING, SAML_VERSION};

/// Request ids must be valid NCNames: start with `_` or a letter.
pub(crate) fn is_valid_request_id(id: &str) -> bool {
    id.chars()
        .next()
        .is_some_and(|c| c == '_' || c.is_ascii_alphabetic())
}

impl ValidationPipeline {
    /// Validates an AuthnRequest from a relying party.
    ///
    /// All stateless checks run first, then the signature, and the replay
    /// cache is consulted last so that a forged or malformed request can
    /// never burn a legitimate request id.
    ///
    /// # Errors
    ///
    /// Returns the first error-severity [`ValidationFailure`].
    pub async fn validate_authn_request_from_rp(
        &self,
        request: AuthnRequest,
    ) -> ValidationResult<ValidatedRequest> {
        let request_id = request.id.clone();
        let result = self.check_authn_request(request).await;
        match &result {
            Ok(validated) => debug!(
                request_id = %validated.request_id(),
                issuer = %validated.issuer(),
                warnings = validated.warnings().len(),
                "authn request validated"
            ),
            Err(failure) => warn!(
                request_id = %request_id,
                reason = %failure.reason,
                message = %failure.message,
                "authn request rejected"
            ),
        }
        result
    }

    async fn check_authn_request(&self, request: AuthnRequest) -> ValidationResult<ValidatedRequest> {
        let mut checks = Checks::new();

        checks.ensure(!request.id.is_empty(), FailureReason::MissingId, || {
            "request id is missing".to_string()
        })?;
        checks.ensure(is_valid_request_id(&request.id), FailureReason::InvalidRequestId, || {
            format!("request id {} must start with '_' or a letter", request.id)
        })?;
        checks.ensure(request.version == SAML_VERSION, FailureReason::InvalidSamlVersion, || {
            format!("unsupported SAML version {}", request.version)
        })?;

        let issuer = match &request.issuer {
            Some(issuer) if !issuer.value.is_empty() => issuer,
            _ => {
                return Err(ValidationFailure::new(
                    FailureReason::MissingIssuer,
                    "request has no issuer",
                ))
            }
        };
        checks.ensure(issuer.has_entity_format(), FailureReason::InvalidIssuerFormat, || {
            format!("issuer format {:?} is not entity", issuer.format)
        })?;

        self.check_issue_instant(request.issue_instant)?;

        match request.destination.as_deref() {
            None => {
                return Err(ValidationFailure::new(
                    FailureReason::MissingDestination,
                    "request has no destination",
                ))
            }
            Some(destination) => checks.ensure(
                destination == self.config.sso_endpoint,
                FailureReason::WrongDestination,
                || format!("destination {destination} is not the hub SSO endpoint"),
            )?,
        }

        checks.ensure(request.is_passive.is_none(), FailureReason::IsPassiveNotAllowed, || {
            "IsPassive must not be present".to_string()
        })?;
        checks.ensure(request.scoping.is_none(), FailureReason::ScopingNotAllowed, || {
            "Scoping must not be present".to_string()
        })?;

        if let Some(binding) = request.protocol_binding.as_deref() {
            checks.ensure(
                binding == HTTP_POST_BINDING,
                FailureReason::UnsupportedProtocolBinding,
                || format!("protocol binding {binding} is not HTTP-POST"),
            )?;
        }

        if let Some(policy) = &request.name_id_policy {
            checks.ensure(
                policy.format.as_deref() == Some(name_id_formats::PERSISTENT),
                FailureReason::NameIdPolicyNotPersistent,
                || format!("NameIDPolicy format {:?} is not persistent", policy.format),
            )?;
        }

        let issuer = issuer.value.clone();
        self.verify_signature(&request, &issuer, FailureReason::InvalidSignature)?;

        Self::accept_once(
            self.request_replay.as_ref(),
            &request.id,
            FailureReason::DuplicateRequestId,
        )
        .await?;

        Ok(ValidatedRequest::new(request, issuer, checks.into_warnings()))
    }

    pub(crate) fn check_issue_instant(&self, issue_instant: DateTime<Utc>) -> ValidationResult<()> {
        let now = self.clock.now();
        if issue_instant > now + self.config.clock_skew() {
            return Err(ValidationFailure::new(
                FailureReason::IssueInstantInFuture,
                format!("issue instant {issue_instant} is in the future"),
            ));
        }
        if now - issue_instant > self.config.authn_request_validity() {
            return Err(ValidationFailure::new(
                FailureReason::RequestTooOld,
                format!("issue instant {issue_instant} is outside the validity window"),
            ));
        }
        Ok(())
    }
}
