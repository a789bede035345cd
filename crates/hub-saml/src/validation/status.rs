//! Status-code grammar.
//!
//! Every (top status, sub-status) pair a party may send is either mapped to
//! an internal status for its role or rejected. There is no fallthrough: an
//! unrecognised combination is a hard failure.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};

use super::failure::{FailureReason, ValidationFailure, ValidationResult};
use crate::types::{status_codes, status_details, Status};

/// Maximum sub-status nesting accepted from any party.
pub const MAX_SUB_STATUS_DEPTH: usize = 1;

/// Internal status of an identity provider response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum IdpStatus {
    /// The user authenticated.
    Success,
    /// The identity provider could not satisfy the requested context.
    NoAuthenticationContext,
    /// The user cancelled at the identity provider.
    AuthenticationCancelled,
    /// Identity proofing is still pending.
    AuthenticationPending,
    /// Uplift to the requested level failed.
    UpliftFailed,
    /// The user failed to authenticate.
    AuthenticationFailed,
    /// The identity provider denied the request on fraud grounds.
    FraudDetected,
    /// Generic requester error.
    RequesterError,
    /// Identity provider side failure.
    ResponderError,
}

/// Internal status of a matching service response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum MatchingServiceStatus {
    /// Exactly one local record matched.
    Match,
    /// No local record matched.
    NoMatch,
    /// Several local records matched.
    MultiMatch,
    /// A user account was created.
    Created,
    /// User account creation failed.
    CreateFailure,
    /// Answer to a health check.
    Healthy,
    /// Generic requester error, passed through.
    RequesterError,
    /// Responder error without detail, passed through.
    ResponderError,
}

/// Internal status of an eIDAS country response.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum CountryStatus {
    /// The user authenticated at the country node.
    Success,
    /// Authentication at the country node failed.
    Failure,
}

/// Injected mapping table for identity provider statuses.
///
/// Keys are `(top, sub-status, status detail)`. A lookup first tries the
/// exact detail and then falls back to the entry without detail.
#[derive(Debug, Clone)]
pub struct IdpStatusMapping {
    entries: HashMap<(String, Option<String>, Option<String>), IdpStatus>,
}

impl Default for IdpStatusMapping {
    fn default() -> Self {
        Self::standard()
    }
}

impl IdpStatusMapping {
    /// An empty table that rejects every status.
    #[must_use]
    pub fn empty() -> Self {
        Self {
            entries: HashMap::new(),
        }
    }

    /// The hub profile's table.
    #[must_use]
    pub fn standard() -> Self {
        use status_codes::{AUTHN_FAILED, NO_AUTHN_CONTEXT, REQUESTER, REQUEST_DENIED, RESPONDER, SUCCESS};

        Self::empty()
            .with(SUCCESS, None, None, IdpStatus::Success)
            .with(REQUESTER, None, None, IdpStatus::RequesterError)
            .with(REQUESTER, Some(NO_AUTHN_CONTEXT), None, IdpStatus::NoAuthenticationContext)
            .with(
                REQUESTER,
                Some(NO_AUTHN_CONTEXT),
                Some(status_details::AUTHN_CANCEL),
                IdpStatus::AuthenticationCancelled,
            )
            .with(
                REQUESTER,
                Some(NO_AUTHN_CONTEXT),
                Some(status_details::LOA_PENDING),
                IdpStatus::AuthenticationPending,
            )
            .with(
                REQUESTER,
                Some(NO_AUTHN_CONTEXT),
                Some(status_details::UPLIFT_FAILED),
                IdpStatus::UpliftFailed,
            )
            .with(REQUESTER, Some(AUTHN_FAILED), None, IdpStatus::AuthenticationFailed)
            .with(REQUESTER, Some(REQUEST_DENIED), None, IdpStatus::FraudDetected)
            .with(RESPONDER, None, None, IdpStatus::ResponderError)
    }

    /// Adds or replaces a mapping.
    #[must_use]
    pub fn with(
        mut self,
        top: &str,
        sub: Option<&str>,
        detail: Option<&str>,
        status: IdpStatus,
    ) -> Self {
        self.entries.insert(
            (top.to_string(), sub.map(str::to_string), detail.map(str::to_string)),
            status,
        );
        self
    }

    fn lookup(&self, top: &str, sub: Option<&str>, detail: Option<&str>) -> Option<IdpStatus> {
        let key = |detail: Option<&str>| {
            (top.to_string(), sub.map(str::to_string), detail.map(str::to_string))
        };
        detail
            .and_then(|d| self.entries.get(&key(Some(d))))
            .or_else(|| self.entries.get(&key(None)))
            .copied()
    }

    /// Maps an identity provider status.
    ///
    /// # Errors
    ///
    /// Fails with `nestedSubStatusCodesBreached` beyond one level of nesting
    /// and `unmappedStatus` for any combination absent from the table.
    pub fn map(&self, status: &Status) -> ValidationResult<IdpStatus> {
        check_nesting(status)?;
        let code = &status.status_code;
        self.lookup(&code.value, code.sub_status_value(), status.status_detail.as_deref())
            .ok_or_else(|| unmapped("identity provider", status))
    }
}

/// Maps a matching service status.
///
/// # Errors
///
/// Fails for any combination outside the matching service grammar.
pub fn map_matching_service_status(status: &Status) -> ValidationResult<MatchingServiceStatus> {
    use status_codes::{CREATED, CREATE_FAILURE, MATCH, MULTI_MATCH, NO_MATCH, REQUESTER, RESPONDER, SUCCESS};

    check_nesting(status)?;
    let code = &status.status_code;
    match (code.value.as_str(), code.sub_status_value()) {
        (SUCCESS, Some(MATCH)) => Ok(MatchingServiceStatus::Match),
        (SUCCESS, Some(NO_MATCH)) => Ok(MatchingServiceStatus::NoMatch),
        (SUCCESS, Some(CREATED)) => Ok(MatchingServiceStatus::Created),
        (SUCCESS, None) => Err(ValidationFailure::new(
            FailureReason::MissingSubStatus,
            "matching service success status requires a sub-status",
        )),
        (RESPONDER, Some(NO_MATCH)) => Ok(MatchingServiceStatus::NoMatch),
        (RESPONDER, Some(MULTI_MATCH)) => Ok(MatchingServiceStatus::MultiMatch),
        (RESPONDER, Some(CREATE_FAILURE)) => Ok(MatchingServiceStatus::CreateFailure),
        (RESPONDER, None) => Ok(MatchingServiceStatus::ResponderError),
        (REQUESTER, None) => Ok(MatchingServiceStatus::RequesterError),
        (REQUESTER, Some(sub)) => Err(ValidationFailure::new(
            FailureReason::UnexpectedSubStatus,
            format!("matching service requester status must not carry sub-status {sub}"),
        )),
        _ => Err(unmapped("matching service", status)),
    }
}

/// Maps a matching service health check status.
///
/// # Errors
///
/// Fails for any combination other than success/healthy or a bare error.
pub fn map_health_check_status(status: &Status) -> ValidationResult<MatchingServiceStatus> {
    use status_codes::{HEALTHY, REQUESTER, RESPONDER, SUCCESS};

    check_nesting(status)?;
    let code = &status.status_code;
    match (code.value.as_str(), code.sub_status_value()) {
        (SUCCESS, Some(HEALTHY)) => Ok(MatchingServiceStatus::Healthy),
        (SUCCESS, None) => Err(ValidationFailure::new(
            FailureReason::MissingSubStatus,
            "health check success status requires the healthy sub-status",
        )),
        (REQUESTER, None) => Ok(MatchingServiceStatus::RequesterError),
        (RESPONDER, None) => Ok(MatchingServiceStatus::ResponderError),
        _ => Err(unmapped("matching service health check", status)),
    }
}

/// Maps an eIDAS country status.
///
/// # Errors
///
/// Fails for any combination outside the country grammar.
pub fn map_country_status(status: &Status) -> ValidationResult<CountryStatus> {
    use status_codes::{AUTHN_FAILED, REQUESTER, RESPONDER, SUCCESS};

    check_nesting(status)?;
    let code = &status.status_code;
    match (code.value.as_str(), code.sub_status_value()) {
        (SUCCESS, None) => Ok(CountryStatus::Success),
        (REQUESTER | RESPONDER, None | Some(AUTHN_FAILED)) => Ok(CountryStatus::Failure),
        _ => Err(unmapped("country", status)),
    }
}

fn check_nesting(status: &Status) -> ValidationResult<()> {
    let depth = status.status_code.nesting_depth();
    if depth > MAX_SUB_STATUS_DEPTH {
        return Err(ValidationFailure::new(
            FailureReason::NestedSubStatusCodesBreached,
            format!("status nests {depth} sub-status levels, at most {MAX_SUB_STATUS_DEPTH} allowed"),
        ));
    }
    Ok(())
}

fn unmapped(party: &str, status: &Status) -> ValidationFailure {
    ValidationFailure::new(
        FailureReason::UnmappedStatus,
        format!(
            "{party} status {} with sub-status {} is not part of the profile",
            status.status_code.value,
            status.status_code.sub_status_value().unwrap_or("<none>")
        ),
    )
}
