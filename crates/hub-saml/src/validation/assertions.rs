//! Assertion decryption, signature and consistency checks.

use chrono::{DateTime, Utc};
use tracing::{debug, error, warn};

use super::failure::{FailureReason, ValidationFailure, ValidationResult};
use super::pipeline::ValidationPipeline;
use super::status::{CountryStatus, IdpStatus};
use super::validated::{MappedStatus, ResponseRole, ValidatedAssertions, ValidatedResponse};
use crate::types::{attribute_names, Assertion, EncryptedAssertion, SAML_VERSION};
use hub_core::LevelOfAssurance;

/// Generic message for every decryption failure.
const UNABLE_TO_DECRYPT: &str = "unable to decrypt assertion";

impl ValidationPipeline {
    /// Decrypts every assertion of `response` and verifies each assertion's
    /// own signature against its asserting entity's published keys.
    ///
    /// Every hub decryption key is tried in turn. A key that fails is logged
    /// and skipped; if none succeeds the failure is generic and does not say
    /// which keys were tried.
    ///
    /// # Errors
    ///
    /// Fails with `unableToDecrypt` or an assertion signature failure.
    pub fn decrypt_and_validate_assertion_signatures(
        &self,
        response: &ValidatedResponse,
    ) -> ValidationResult<ValidatedAssertions> {
        let encrypted = &response.response().encrypted_assertions;
        let mut assertions = Vec::with_capacity(encrypted.len());
        for item in encrypted {
            let assertion = self.decrypt_with_any_key(item)?;
            let issuer = assertion.issuer.value.clone();
            self.verify_signature(&assertion, &issuer, FailureReason::InvalidAssertionSignature)
                .inspect_err(|failure| {
                    warn!(
                        assertion_id = %assertion.id,
                        issuer = %issuer,
                        reason = %failure.reason,
                        "assertion signature rejected"
                    );
                })?;
            assertions.push(assertion);
        }
        debug!(count = assertions.len(), issuer = %response.issuer(), "assertions decrypted");
        Ok(ValidatedAssertions::new(assertions))
    }

    fn decrypt_with_any_key(&self, encrypted: &EncryptedAssertion) -> ValidationResult<Assertion> {
        for key in &self.decryption_keys {
            match self.decrypter.decrypt(encrypted, key) {
                Ok(assertion) => return Ok(assertion),
                Err(err) => warn!(key_id = %key.key_id(), error = %err, "hub key did not decrypt assertion"),
            }
        }
        error!(keys = self.decryption_keys.len(), "no hub decryption key could decrypt assertion");
        Err(ValidationFailure::new(FailureReason::UnableToDecrypt, UNABLE_TO_DECRYPT))
    }

    /// Checks that decrypted assertions are consistent with each other, with
    /// the response that carried them and with the hub.
    ///
    /// Assertion ids are recorded in the assertion replay cache only after
    /// every other check has passed.
    ///
    /// # Errors
    ///
    /// Returns the first error-severity [`ValidationFailure`].
    pub async fn validate_assertion_consistency(
        &self,
        response: &ValidatedResponse,
        assertions: &ValidatedAssertions,
    ) -> ValidationResult<()> {
        let result = self.check_consistency(response, assertions);
        let result = match result {
            Ok(()) => self.accept_assertion_ids(assertions).await,
            Err(failure) => Err(failure),
        };
        if let Err(failure) = &result {
            warn!(
                issuer = %response.issuer(),
                in_response_to = %response.in_response_to(),
                reason = %failure.reason,
                message = %failure.message,
                "assertions rejected"
            );
        }
        result
    }

    fn check_consistency(
        &self,
        response: &ValidatedResponse,
        assertions: &ValidatedAssertions,
    ) -> ValidationResult<()> {
        let now = self.clock.now();
        let recipient = match response.role() {
            ResponseRole::MatchingService | ResponseRole::MatchingServiceHealthCheck => {
                self.config.hub_entity_id.as_str()
            }
            ResponseRole::IdentityProvider | ResponseRole::Country => {
                self.config.assertion_consumer_endpoint.as_str()
            }
        };

        for assertion in assertions.assertions() {
            check_assertion(assertion, response, recipient, now)?;
        }

        match (response.role(), response.status()) {
            (ResponseRole::IdentityProvider, MappedStatus::Idp(IdpStatus::Success)) => {
                check_idp_success(assertions).map(|_| ())
            }
            (ResponseRole::Country, MappedStatus::Country(CountryStatus::Success)) => {
                super::eidas::check_country_assertion(assertions).map(|_| ())
            }
            (ResponseRole::MatchingService, _) if !assertions.is_empty() => {
                single_subject(assertions).map(|_| ())
            }
            _ => Ok(()),
        }
    }

    /// Records every assertion id, or none: if one id is a replay the ids
    /// already recorded for this response are released again.
    async fn accept_assertion_ids(&self, assertions: &ValidatedAssertions) -> ValidationResult<()> {
        let cache = self.assertion_replay.as_ref();
        let mut accepted: Vec<String> = Vec::new();
        for assertion in assertions.assertions() {
            let key = format!("{}:{}", assertion.issuer.value, assertion.id);
            if let Err(failure) = Self::accept_once(cache, &key, FailureReason::DuplicateAssertionId).await {
                for key in &accepted {
                    if let Err(err) = cache.release(key).await {
                        warn!(id = %key, error = %err, "could not release assertion id");
                    }
                }
                return Err(failure);
            }
            accepted.push(key);
        }
        Ok(())
    }
}

/// Per-assertion checks shared by every role.
fn check_assertion(
    assertion: &Assertion,
    response: &ValidatedResponse,
    recipient: &str,
    now: DateTime<Utc>,
) -> ValidationResult<()> {
    let fail = |reason, message: String| Err(ValidationFailure::new(reason, message));

    if assertion.id.is_empty() {
        return fail(FailureReason::MissingId, "assertion id is missing".to_string());
    }
    if assertion.version != SAML_VERSION {
        return fail(
            FailureReason::InvalidSamlVersion,
            format!("assertion {} has version {}", assertion.id, assertion.version),
        );
    }
    if !assertion.issuer.has_entity_format() {
        return fail(
            FailureReason::InvalidIssuerFormat,
            format!("assertion {} issuer format is not entity", assertion.id),
        );
    }
    if assertion.issuer.value != response.issuer() {
        return fail(
            FailureReason::MismatchedIssuers,
            format!(
                "assertion {} issued by {} inside a response from {}",
                assertion.id,
                assertion.issuer.value,
                response.issuer()
            ),
        );
    }

    let subject = match &assertion.subject {
        Some(subject) if subject.name_id.as_ref().is_some_and(|n| !n.value.is_empty()) => subject,
        _ => {
            return fail(
                FailureReason::MissingSubjectConfirmation,
                format!("assertion {} has no subject name id", assertion.id),
            )
        }
    };
    if subject.subject_confirmations.is_empty() {
        return fail(
            FailureReason::MissingSubjectConfirmation,
            format!("assertion {} has no subject confirmation", assertion.id),
        );
    }

    for confirmation in &subject.subject_confirmations {
        let Some(data) = &confirmation.data else {
            return fail(
                FailureReason::MissingSubjectConfirmation,
                format!("assertion {} subject confirmation has no data", assertion.id),
            );
        };
        if data.recipient.as_deref() != Some(recipient) {
            return fail(
                FailureReason::WrongRecipient,
                format!("assertion {} recipient {:?} is not {recipient}", assertion.id, data.recipient),
            );
        }
        if data.in_response_to.as_deref() != Some(response.in_response_to()) {
            return fail(
                FailureReason::MismatchedInResponseTo,
                format!(
                    "assertion {} answers {:?}, response answers {}",
                    assertion.id,
                    data.in_response_to,
                    response.in_response_to()
                ),
            );
        }
        if data.not_before.is_some() {
            return fail(
                FailureReason::NotBeforeNotAllowed,
                format!("assertion {} subject confirmation carries NotBefore", assertion.id),
            );
        }
        match data.not_on_or_after {
            None => {
                return fail(
                    FailureReason::MissingNotOnOrAfter,
                    format!("assertion {} subject confirmation has no NotOnOrAfter", assertion.id),
                )
            }
            Some(expiry) if expiry <= now => {
                return fail(
                    FailureReason::AssertionExpired,
                    format!("assertion {} expired at {expiry}", assertion.id),
                )
            }
            Some(_) => {}
        }
    }
    Ok(())
}

/// The two assertions of a successful identity provider response.
pub(crate) struct IdpSuccessAssertions<'a> {
    pub(crate) matching_dataset: &'a Assertion,
    pub(crate) authn: &'a Assertion,
    pub(crate) level_of_assurance: LevelOfAssurance,
    pub(crate) fraud_event_id: Option<&'a str>,
}

/// Exactly one matching dataset and one authn assertion, from the same
/// issuer, about the same subject, with a recognised context.
pub(crate) fn check_idp_success(assertions: &ValidatedAssertions) -> ValidationResult<IdpSuccessAssertions<'_>> {
    let matching_dataset = assertions.matching_dataset().ok_or_else(|| {
        ValidationFailure::new(
            FailureReason::MissingMatchingDataset,
            "exactly one matching dataset assertion is required",
        )
    })?;
    let authn = assertions.authn_assertion().ok_or_else(|| {
        ValidationFailure::new(
            FailureReason::MissingAuthnStatement,
            "exactly one authn statement assertion is required",
        )
    })?;
    let context = authn.authn_context().ok_or_else(|| {
        ValidationFailure::new(
            FailureReason::MissingAuthnContext,
            format!("assertion {} has no authn context", authn.id),
        )
    })?;
    let level_of_assurance = authn.level_of_assurance().ok_or_else(|| {
        ValidationFailure::new(
            FailureReason::UnknownLevelOfAssurance,
            format!("authn context {context} is not a known level of assurance"),
        )
    })?;

    if matching_dataset.issuer.value != authn.issuer.value {
        return Err(ValidationFailure::new(
            FailureReason::MismatchedIssuers,
            "matching dataset and authn assertions have different issuers",
        ));
    }
    if matching_dataset.subject_name_id() != authn.subject_name_id() {
        return Err(ValidationFailure::new(
            FailureReason::MismatchedSubjects,
            "matching dataset and authn assertions have different subjects",
        ));
    }

    let fraud_event_id = authn.first_attribute(attribute_names::IDP_FRAUD_EVENT_ID);
    if level_of_assurance.is_fraud_sentinel() && fraud_event_id.is_none() {
        return Err(ValidationFailure::new(
            FailureReason::MissingFraudEventId,
            "LEVEL_X asserted without a fraud event id",
        ));
    }

    Ok(IdpSuccessAssertions {
        matching_dataset,
        authn,
        level_of_assurance,
        fraud_event_id,
    })
}

/// The single matching service assertion.
pub(crate) fn single_subject(assertions: &ValidatedAssertions) -> ValidationResult<&Assertion> {
    match assertions.assertions() {
        [assertion] => Ok(assertion),
        other => Err(ValidationFailure::new(
            FailureReason::UnexpectedNumberOfAssertions,
            format!("expected one matching service assertion, found {}", other.len()),
        )),
    }
}
