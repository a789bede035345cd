//! eIDAS country assertion profile.
//!
//! Kept separate from the identity provider profile: a country node asserts
//! one combined assertion, only eIDAS levels are acceptable and a different
//! attribute set is mandatory.

use super::failure::{FailureReason, ValidationFailure, ValidationResult};
use super::validated::ValidatedAssertions;
use crate::types::{attribute_names, Assertion};
use hub_core::LevelOfAssurance;

/// Attributes every country assertion must carry.
pub const MANDATORY_EIDAS_ATTRIBUTES: [&str; 4] = [
    attribute_names::EIDAS_FIRST_NAME,
    attribute_names::EIDAS_FAMILY_NAME,
    attribute_names::EIDAS_DATE_OF_BIRTH,
    attribute_names::EIDAS_PERSON_IDENTIFIER,
];

pub(crate) fn check_country_assertion(
    assertions: &ValidatedAssertions,
) -> ValidationResult<(&Assertion, LevelOfAssurance)> {
    let assertion = assertions.authn_assertion().ok_or_else(|| {
        ValidationFailure::new(
            FailureReason::MissingAuthnStatement,
            "country response needs exactly one authn statement assertion",
        )
    })?;
    let context = assertion.authn_context().ok_or_else(|| {
        ValidationFailure::new(
            FailureReason::MissingAuthnContext,
            format!("assertion {} has no authn context", assertion.id),
        )
    })?;
    let level = assertion.level_of_assurance().ok_or_else(|| {
        ValidationFailure::new(
            FailureReason::UnknownLevelOfAssurance,
            format!("authn context {context} is not a known level of assurance"),
        )
    })?;
    if !level.is_eidas_level() {
        return Err(ValidationFailure::new(
            FailureReason::EidasLevelOfAssuranceRequired,
            format!("country asserted {level}, eIDAS substantial or high required"),
        ));
    }

    if let Some(missing) = MANDATORY_EIDAS_ATTRIBUTES
        .iter()
        .find(|name| assertion.first_attribute(name).is_none())
    {
        return Err(ValidationFailure::new(
            FailureReason::MissingEidasAttribute,
            format!("country assertion lacks {missing}"),
        ));
    }

    Ok((assertion, level))
}
