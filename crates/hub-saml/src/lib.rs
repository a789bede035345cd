//! SAML 2.0 message handling for the identity federation hub.
//!
//! The hub never trusts an inbound message directly. Parsed messages from the
//! codec enter the [`validation`] pipeline and come out as validated wrapper
//! types; only those reach the policy state machine.
//!
//! # Architecture
//!
//! - [`types`] - parsed SAML object model (requests, responses, assertions, status)
//! - [`signature`] - signature collaborator and outbound signing
//! - [`encryption`] - assertion decryption collaborator
//! - [`metadata`] - signing and encryption keys per entity
//! - [`validation`] - the validation pipeline and its typed failures
//! - [`error`] - errors raised by the codec and key collaborators

#![forbid(unsafe_code)]
#![warn(missing_docs)]

pub mod encryption;
pub mod error;
pub mod metadata;
pub mod signature;
pub mod types;
pub mod validation;

#[cfg(any(test, feature = "test-support"))]
pub mod testing;

pub use error::{SamlError, SamlResult};
pub use types::*;
pub use validation::{
    CountryStatus, FailureReason, IdpStatus, IdpStatusMapping, InboundCountryResponse,
    InboundIdpResponse, InboundMatchingServiceResponse, MappedStatus, MatchingServiceStatus,
    ResponseRole, Severity, ValidatedAssertions, ValidatedRequest, ValidatedResponse,
    ValidationFailure, ValidationPipeline, ValidationResult,
};
