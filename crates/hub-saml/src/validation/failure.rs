//! Validation failures.

use std::fmt;

use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::warn;

/// Result type for validators.
pub type ValidationResult<T> = Result<T, ValidationFailure>;

/// Whether a failure rejects the message or is only advisory.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum Severity {
    /// Logged and collected; validation continues.
    Warn,
    /// The message is rejected.
    Error,
}

/// Named reason codes for validation failures.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[non_exhaustive]
pub enum FailureReason {
    // Message identity and freshness
    /// Message id missing or empty.
    MissingId,
    /// Request id does not start with `_` or a letter.
    InvalidRequestId,
    /// Request id already seen within the replay window.
    DuplicateRequestId,
    /// Issue instant older than the validity window.
    RequestTooOld,
    /// Issue instant in the future beyond the allowed clock skew.
    IssueInstantInFuture,
    /// Version other than 2.0.
    InvalidSamlVersion,

    // Issuer
    /// Issuer missing.
    MissingIssuer,
    /// Issuer format set to something other than entity.
    InvalidIssuerFormat,
    /// Issuer not present in metadata.
    UnknownIssuer,
    /// Country issuer is not an http(s) entity id.
    InvalidCountryIssuer,

    // Addressing
    /// Destination missing.
    MissingDestination,
    /// Destination differs from the hub endpoint.
    WrongDestination,
    /// InResponseTo missing from a response.
    MissingInResponseTo,

    // Request profile
    /// IsPassive present.
    IsPassiveNotAllowed,
    /// Scoping present.
    ScopingNotAllowed,
    /// Protocol binding other than HTTP-POST.
    UnsupportedProtocolBinding,
    /// NameIDPolicy present but not persistent. Advisory.
    NameIdPolicyNotPersistent,

    // Signatures
    /// No signature.
    MissingSignature,
    /// More than one signature.
    MultipleSignatures,
    /// Signature does not verify against any published key.
    InvalidSignature,
    /// Message could not be brought into its signed form.
    MalformedMessage,

    // Status grammar
    /// Status combination not defined for the role.
    UnmappedStatus,
    /// A sub-status is required but absent.
    MissingSubStatus,
    /// A sub-status is present where none is allowed.
    UnexpectedSubStatus,
    /// More than one level of sub-status nesting.
    NestedSubStatusCodesBreached,

    // Assertion presence
    /// Wrong number of encrypted assertions for the role.
    UnexpectedNumberOfAssertions,
    /// Success response without encrypted assertions.
    MissingSuccessAssertions,
    /// Non-success response carrying assertions.
    NonSuccessHasAssertions,
    /// Plaintext assertion present.
    UnencryptedAssertion,

    // Decryption and assertion signatures
    /// No hub key decrypts an assertion.
    UnableToDecrypt,
    /// Assertion signature missing, duplicated or invalid.
    InvalidAssertionSignature,

    // Assertion consistency
    /// Assertion without subject, name id or bearer confirmation data.
    MissingSubjectConfirmation,
    /// Recipient differs from the hub endpoint.
    WrongRecipient,
    /// Assertion InResponseTo differs from the response's.
    MismatchedInResponseTo,
    /// NotOnOrAfter missing.
    MissingNotOnOrAfter,
    /// NotOnOrAfter not in the future.
    AssertionExpired,
    /// NotBefore present.
    NotBeforeNotAllowed,
    /// No matching dataset assertion, or more than one.
    MissingMatchingDataset,
    /// No authn statement assertion, or more than one.
    MissingAuthnStatement,
    /// Authn statement without a populated context.
    MissingAuthnContext,
    /// Authn context maps to no known level of assurance.
    UnknownLevelOfAssurance,
    /// Assertion issuers differ from each other or the response.
    MismatchedIssuers,
    /// Assertion subjects differ.
    MismatchedSubjects,
    /// LEVEL_X asserted without a fraud event id.
    MissingFraudEventId,
    /// Assertion id already seen for this issuer.
    DuplicateAssertionId,
    /// Country assertion below eIDAS substantial.
    EidasLevelOfAssuranceRequired,
    /// Mandatory eIDAS attribute absent.
    MissingEidasAttribute,

    // Infrastructure
    /// The replay cache could not be consulted.
    ReplayCacheUnavailable,
}

impl FailureReason {
    /// The reason code.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::MissingId => "missingId",
            Self::InvalidRequestId => "invalidRequestId",
            Self::DuplicateRequestId => "duplicateRequestId",
            Self::RequestTooOld => "requestTooOld",
            Self::IssueInstantInFuture => "issueInstantInFuture",
            Self::InvalidSamlVersion => "invalidSamlVersion",
            Self::MissingIssuer => "missingIssuer",
            Self::InvalidIssuerFormat => "invalidIssuerFormat",
            Self::UnknownIssuer => "unknownIssuer",
            Self::InvalidCountryIssuer => "invalidCountryIssuer",
            Self::MissingDestination => "missingDestination",
            Self::WrongDestination => "wrongDestination",
            Self::MissingInResponseTo => "missingInResponseTo",
            Self::IsPassiveNotAllowed => "isPassiveNotAllowed",
            Self::ScopingNotAllowed => "scopingNotAllowed",
            Self::UnsupportedProtocolBinding => "unsupportedProtocolBinding",
            Self::NameIdPolicyNotPersistent => "nameIdPolicyNotPersistent",
            Self::MissingSignature => "missingSignature",
            Self::MultipleSignatures => "multipleSignatures",
            Self::InvalidSignature => "invalidSignature",
            Self::MalformedMessage => "malformedMessage",
            Self::UnmappedStatus => "unmappedStatus",
            Self::MissingSubStatus => "missingSubStatus",
            Self::UnexpectedSubStatus => "unexpectedSubStatus",
            Self::NestedSubStatusCodesBreached => "nestedSubStatusCodesBreached",
            Self::UnexpectedNumberOfAssertions => "unexpectedNumberOfAssertions",
            Self::MissingSuccessAssertions => "missingSuccessAssertions",
            Self::NonSuccessHasAssertions => "nonSuccessHasAssertions",
            Self::UnencryptedAssertion => "unencryptedAssertion",
            Self::UnableToDecrypt => "unableToDecrypt",
            Self::InvalidAssertionSignature => "invalidAssertionSignature",
            Self::MissingSubjectConfirmation => "missingSubjectConfirmation",
            Self::WrongRecipient => "wrongRecipient",
            Self::MismatchedInResponseTo => "mismatchedInResponseTo",
            Self::MissingNotOnOrAfter => "missingNotOnOrAfter",
            Self::AssertionExpired => "assertionExpired",
            Self::NotBeforeNotAllowed => "notBeforeNotAllowed",
            Self::MissingMatchingDataset => "missingMatchingDataset",
            Self::MissingAuthnStatement => "missingAuthnStatement",
            Self::MissingAuthnContext => "missingAuthnContext",
            Self::UnknownLevelOfAssurance => "unknownLevelOfAssurance",
            Self::MismatchedIssuers => "mismatchedIssuers",
            Self::MismatchedSubjects => "mismatchedSubjects",
            Self::MissingFraudEventId => "missingFraudEventId",
            Self::DuplicateAssertionId => "duplicateAssertionId",
            Self::EidasLevelOfAssuranceRequired => "eidasLevelOfAssuranceRequired",
            Self::MissingEidasAttribute => "missingEidasAttribute",
            Self::ReplayCacheUnavailable => "replayCacheUnavailable",
        }
    }

    /// Default severity. Only the advisory set is [`Severity::Warn`].
    #[must_use]
    pub const fn severity(&self) -> Severity {
        match self {
            Self::NameIdPolicyNotPersistent => Severity::Warn,
            _ => Severity::Error,
        }
    }
}

impl fmt::Display for FailureReason {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A failed validation check.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{reason}: {message}")]
pub struct ValidationFailure {
    /// Reason code.
    pub reason: FailureReason,
    /// Human readable message. Never contains key material.
    pub message: String,
    /// Severity.
    pub severity: Severity,
}

impl ValidationFailure {
    /// Creates a failure with the reason's default severity.
    #[must_use]
    pub fn new(reason: FailureReason, message: impl Into<String>) -> Self {
        Self {
            reason,
            message: message.into(),
            severity: reason.severity(),
        }
    }

    /// Returns true if this failure rejects the message.
    #[must_use]
    pub fn is_error(&self) -> bool {
        self.severity == Severity::Error
    }
}

/// Runs checks in sequence, collecting advisories and stopping at the first error.
#[derive(Debug, Default)]
pub(crate) struct Checks {
    warnings: Vec<ValidationFailure>,
}

impl Checks {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Fails with `reason` unless `condition` holds.
    pub(crate) fn ensure(
        &mut self,
        condition: bool,
        reason: FailureReason,
        message: impl FnOnce() -> String,
    ) -> ValidationResult<()> {
        if condition {
            return Ok(());
        }
        self.record(ValidationFailure::new(reason, message()))
    }

    /// Records a failure: advisories are kept, errors are returned.
    pub(crate) fn record(&mut self, failure: ValidationFailure) -> ValidationResult<()> {
        if failure.is_error() {
            return Err(failure);
        }
        warn!(reason = %failure.reason, message = %failure.message, "advisory validation failure");
        self.warnings.push(failure);
        Ok(())
    }

    pub(crate) fn into_warnings(self) -> Vec<ValidationFailure> {
        self.warnings
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn reason_codes_serialize_camel_case() {
        let json = serde_json::to_string(&FailureReason::NestedSubStatusCodesBreached).unwrap();
        assert_eq!(json, "\"nestedSubStatusCodesBreached\"");
        assert_eq!(FailureReason::DuplicateRequestId.as_str(), "duplicateRequestId");
    }

    #[test]
    fn checks_collect_warnings_and_stop_on_error() {
        let mut checks = Checks::new();
        checks
            .ensure(false, FailureReason::NameIdPolicyNotPersistent, || "transient".into())
            .unwrap();
        checks.ensure(true, FailureReason::MissingId, || unreachable!()).unwrap();

        let err = checks
            .ensure(false, FailureReason::ScopingNotAllowed, || "scoping".into())
            .unwrap_err();
        assert_eq!(err.reason, FailureReason::ScopingNotAllowed);
        assert!(err.is_error());
        assert_eq!(err.to_string(), "scopingNotAllowed: scoping");

        let warnings = checks.into_warnings();
        assert_eq!(warnings.len(), 1);
        assert_eq!(warnings[0].severity, Severity::Warn);
    }
}
