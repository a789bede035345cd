//! End-to-end validation per party.
//!
//! Each entry point runs envelope, decryption and consistency in order and
//! produces the only response types the state machine accepts.

use super::assertions::{check_idp_success, single_subject};
use super::eidas::check_country_assertion;
use super::failure::{FailureReason, ValidationFailure, ValidationResult};
use super::pipeline::ValidationPipeline;
use super::status::{CountryStatus, IdpStatus};
use super::validated::{
    attribute_map, InboundCountryResponse, InboundIdpResponse, InboundMatchingServiceResponse,
    MappedStatus, ResponseRole, ValidatedResponse,
};
use crate::types::{attribute_names, Response};

fn role_mismatch(response: &ValidatedResponse) -> ValidationFailure {
    ValidationFailure::new(
        FailureReason::UnmappedStatus,
        format!("status {:?} does not belong to role {:?}", response.status(), response.role()),
    )
}

impl ValidationPipeline {
    /// Validates an identity provider response end to end.
    ///
    /// # Errors
    ///
    /// Returns the first error-severity [`ValidationFailure`] of any stage.
    pub async fn validate_idp_response(&self, response: Response) -> ValidationResult<InboundIdpResponse> {
        let validated = self.validate_response_envelope(response, ResponseRole::IdentityProvider)?;
        let MappedStatus::Idp(status) = validated.status() else {
            return Err(role_mismatch(&validated));
        };

        let mut inbound = InboundIdpResponse {
            response_id: validated.response().id.clone(),
            issuer: validated.issuer().to_string(),
            in_response_to: validated.in_response_to().to_string(),
            status,
            status_message: validated.status_message().map(str::to_string),
            level_of_assurance: None,
            persistent_id: None,
            fraud_event_id: None,
            matching_dataset: Default::default(),
            _sealed: (),
        };
        if status != IdpStatus::Success {
            return Ok(inbound);
        }

        let assertions = self.decrypt_and_validate_assertion_signatures(&validated)?;
        self.validate_assertion_consistency(&validated, &assertions).await?;
        let success = check_idp_success(&assertions)?;

        inbound.level_of_assurance = Some(success.level_of_assurance);
        inbound.persistent_id = success.authn.subject_name_id().map(str::to_string);
        inbound.fraud_event_id = success.fraud_event_id.map(str::to_string);
        inbound.matching_dataset = attribute_map(success.matching_dataset);
        Ok(inbound)
    }

    /// Validates a matching service response end to end.
    ///
    /// # Errors
    ///
    /// Returns the first error-severity [`ValidationFailure`] of any stage.
    pub async fn validate_matching_service_response(
        &self,
        response: Response,
    ) -> ValidationResult<InboundMatchingServiceResponse> {
        let validated = self.validate_response_envelope(response, ResponseRole::MatchingService)?;
        let MappedStatus::MatchingService(status) = validated.status() else {
            return Err(role_mismatch(&validated));
        };

        let mut inbound = InboundMatchingServiceResponse {
            response_id: validated.response().id.clone(),
            issuer: validated.issuer().to_string(),
            in_response_to: validated.in_response_to().to_string(),
            status,
            status_message: validated.status_message().map(str::to_string),
            persistent_id: None,
            _sealed: (),
        };
        if !validated.response().status.is_success() {
            return Ok(inbound);
        }

        let assertions = self.decrypt_and_validate_assertion_signatures(&validated)?;
        self.validate_assertion_consistency(&validated, &assertions).await?;
        inbound.persistent_id = single_subject(&assertions)?.subject_name_id().map(str::to_string);
        Ok(inbound)
    }

    /// Validates an eIDAS country response end to end.
    ///
    /// # Errors
    ///
    /// Returns the first error-severity [`ValidationFailure`] of any stage.
    pub async fn validate_country_response(
        &self,
        response: Response,
    ) -> ValidationResult<InboundCountryResponse> {
        let validated = self.validate_response_envelope(response, ResponseRole::Country)?;
        let MappedStatus::Country(status) = validated.status() else {
            return Err(role_mismatch(&validated));
        };

        let mut inbound = InboundCountryResponse {
            response_id: validated.response().id.clone(),
            issuer: validated.issuer().to_string(),
            in_response_to: validated.in_response_to().to_string(),
            status,
            status_message: validated.status_message().map(str::to_string),
            level_of_assurance: None,
            person_identifier: None,
            attributes: Default::default(),
            _sealed: (),
        };
        if status != CountryStatus::Success {
            return Ok(inbound);
        }

        let assertions = self.decrypt_and_validate_assertion_signatures(&validated)?;
        self.validate_assertion_consistency(&validated, &assertions).await?;
        let (assertion, level) = check_country_assertion(&assertions)?;

        inbound.level_of_assurance = Some(level);
        inbound.person_identifier = assertion
            .first_attribute(attribute_names::EIDAS_PERSON_IDENTIFIER)
            .map(str::to_string);
        inbound.attributes = attribute_map(assertion);
        Ok(inbound)
    }
}
