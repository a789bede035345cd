//! Inbound message validation.
//!
//! Validators run in a fixed order and short-circuit on the first
//! error-severity failure, collecting advisory warnings on the way. The
//! outputs are wrapper types that only this module can construct.
//!
//! | Stage | Entry point |
//! |-------|-------------|
//! | RP AuthnRequest | [`ValidationPipeline::validate_authn_request_from_rp`] |
//! | Response envelope | [`ValidationPipeline::validate_response_envelope`] |
//! | Decryption and assertion signatures | [`ValidationPipeline::decrypt_and_validate_assertion_signatures`] |
//! | Assertion consistency | [`ValidationPipeline::validate_assertion_consistency`] |
//!
//! The `validate_*_response` methods compose the response stages per party.

mod assertions;
mod eidas;
mod envelope;
mod failure;
mod inbound;
mod pipeline;
mod request;
mod status;
mod validated;

pub use eidas::MANDATORY_EIDAS_ATTRIBUTES;
pub use failure::{FailureReason, Severity, ValidationFailure, ValidationResult};
pub use pipeline::ValidationPipeline;
pub use status::{
    map_country_status, map_health_check_status, map_matching_service_status, CountryStatus,
    IdpStatus, IdpStatusMapping, MatchingServiceStatus, MAX_SUB_STATUS_DEPTH,
};
pub use validated::{
    InboundCountryResponse, InboundIdpResponse, InboundMatchingServiceResponse, MappedStatus,
    ResponseRole, ValidatedAssertions, ValidatedRequest, ValidatedResponse,
};

#[cfg(test)]
mod tests;
