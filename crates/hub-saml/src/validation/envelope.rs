//! Response envelope validation.

use tracing::{debug, warn};

use super::failure::{Checks, FailureReason, ValidationFailure, ValidationResult};
use super::pipeline::ValidationPipeline;
use super::status::{map_country_status, map_health_check_status, map_matching_service_status};
use super::validated::{MappedStatus, ResponseRole, ValidatedResponse};
use crate::types::{Response, SAML_VERSION};

impl ValidationPipeline {
    /// Validates a response envelope for `role`.
    ///
    /// Checks issuer, addressing, the single signature, the status grammar
    /// and the assertion-presence grammar. Assertions are not decrypted
    /// here, so a response with the wrong assertion shape is rejected before
    /// any decryption is attempted.
    ///
    /// # Errors
    ///
    /// Returns the first error-severity [`ValidationFailure`].
    pub fn validate_response_envelope(
        &self,
        response: Response,
        role: ResponseRole,
    ) -> ValidationResult<ValidatedResponse> {
        let response_id = response.id.clone();
        let result = self.check_envelope(response, role);
        match &result {
            Ok(validated) => debug!(
                response_id = %response_id,
                issuer = %validated.issuer(),
                ?role,
                status = ?validated.status(),
                "response envelope validated"
            ),
            Err(failure) => warn!(
                response_id = %response_id,
                ?role,
                reason = %failure.reason,
                message = %failure.message,
                "response envelope rejected"
            ),
        }
        result
    }

    fn check_envelope(&self, response: Response, role: ResponseRole) -> ValidationResult<ValidatedResponse> {
        let mut checks = Checks::new();

        checks.ensure(!response.id.is_empty(), FailureReason::MissingId, || {
            "response id is missing".to_string()
        })?;
        checks.ensure(response.version == SAML_VERSION, FailureReason::InvalidSamlVersion, || {
            format!("unsupported SAML version {}", response.version)
        })?;

        let issuer = match &response.issuer {
            Some(issuer) if !issuer.value.is_empty() => issuer,
            _ => {
                return Err(ValidationFailure::new(
                    FailureReason::MissingIssuer,
                    "response has no issuer",
                ))
            }
        };
        checks.ensure(issuer.has_entity_format(), FailureReason::InvalidIssuerFormat, || {
            format!("issuer format {:?} is not entity", issuer.format)
        })?;
        if role == ResponseRole::Country {
            checks.ensure(is_http_entity_id(&issuer.value), FailureReason::InvalidCountryIssuer, || {
                format!("country issuer {} is not an http(s) entity id", issuer.value)
            })?;
        }
        let issuer = issuer.value.clone();

        let in_response_to = match response.in_response_to.as_deref() {
            Some(id) if !id.is_empty() => id.to_string(),
            _ => {
                return Err(ValidationFailure::new(
                    FailureReason::MissingInResponseTo,
                    "response has no InResponseTo",
                ))
            }
        };

        if role.is_front_channel() {
            match response.destination.as_deref() {
                None => {
                    return Err(ValidationFailure::new(
                        FailureReason::MissingDestination,
                        "response has no destination",
                    ))
                }
                Some(destination) => checks.ensure(
                    destination == self.config.assertion_consumer_endpoint,
                    FailureReason::WrongDestination,
                    || format!("destination {destination} is not the hub assertion consumer endpoint"),
                )?,
            }
        }

        self.verify_signature(&response, &issuer, FailureReason::InvalidSignature)?;

        let status = self.map_status(&response, role)?;
        check_assertion_presence(&response, role, status)?;

        Ok(ValidatedResponse::new(response, role, issuer, in_response_to, status))
    }

    fn map_status(&self, response: &Response, role: ResponseRole) -> ValidationResult<MappedStatus> {
        let status = &response.status;
        Ok(match role {
            ResponseRole::IdentityProvider => MappedStatus::Idp(self.idp_status_mapping.map(status)?),
            ResponseRole::MatchingService => {
                MappedStatus::MatchingService(map_matching_service_status(status)?)
            }
            ResponseRole::MatchingServiceHealthCheck => {
                MappedStatus::MatchingService(map_health_check_status(status)?)
            }
            ResponseRole::Country => MappedStatus::Country(map_country_status(status)?),
        })
    }
}

/// Assertion-presence grammar.
///
/// A top-level success needs exactly the role's number of encrypted
/// assertions and no plaintext ones. Any other top-level status, and every
/// health check answer, needs none at all.
fn check_assertion_presence(
    response: &Response,
    role: ResponseRole,
    status: MappedStatus,
) -> ValidationResult<()> {
    let encrypted = response.encrypted_assertions.len();

    if !response.status.is_success() || role == ResponseRole::MatchingServiceHealthCheck {
        if response.assertion_count() > 0 {
            return Err(ValidationFailure::new(
                FailureReason::NonSuccessHasAssertions,
                format!("{status:?} response carries {} assertions", response.assertion_count()),
            ));
        }
        return Ok(());
    }

    if !response.assertions.is_empty() {
        return Err(ValidationFailure::new(
            FailureReason::UnencryptedAssertion,
            format!("{} plaintext assertions present", response.assertions.len()),
        ));
    }
    if encrypted == 0 {
        return Err(ValidationFailure::new(
            FailureReason::MissingSuccessAssertions,
            "success response carries no encrypted assertions",
        ));
    }
    let expected = role.success_assertion_count();
    if encrypted != expected {
        return Err(ValidationFailure::new(
            FailureReason::UnexpectedNumberOfAssertions,
            format!("expected {expected} encrypted assertions for {role:?}, found {encrypted}"),
        ));
    }
    Ok(())
}

fn is_http_entity_id(value: &str) -> bool {
    ["https://", "http://"]
        .iter()
        .any(|scheme| value.strip_prefix(scheme).is_some_and(|rest| !rest.is_empty()))
}
