//! Policy error types.

use hub_cache::CacheError;
use hub_core::LevelOfAssurance;
use hub_saml::{FailureReason, ValidationFailure};
use hub_session::{SessionError, SessionId};
use thiserror::Error;

/// Why an identity provider or country could not be selected.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SelectionFailure {
    /// The IdP is unknown, disabled, or not offered to this RP at this level.
    #[error("identity provider {0} is not available")]
    UnavailableIdp(String),

    /// The IdP supports none of the levels the transaction accepts.
    #[error("identity provider {0} supports none of the transaction's levels of assurance")]
    TransactionLevelsOfAssuranceUnsupportedByIdp(String),

    /// The transaction does not accept the requested level.
    #[error("requested level of assurance {0} is not accepted by the transaction")]
    RequestedLevelOfAssuranceUnsupportedByTransactionEntity(LevelOfAssurance),

    /// The country is unknown or disabled.
    #[error("country {0} is not available")]
    UnavailableCountry(String),

    /// The transaction does not accept eIDAS identities.
    #[error("transaction does not support eIDAS")]
    EidasNotSupported,
}

/// A validated response that does not fit the session it arrived for.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum StateProcessingFailure {
    /// InResponseTo does not name the session's request.
    #[error("response answers {actual}, expected {expected}")]
    WrongInResponseTo {
        /// Session request id.
        expected: String,
        /// Received InResponseTo.
        actual: String,
    },

    /// The response came from a party the hub did not send a request to.
    #[error("response issued by {actual}, expected {expected}")]
    WrongResponseIssuer {
        /// Party the request went to.
        expected: String,
        /// Received issuer.
        actual: String,
    },

    /// The IdP asserted a level its configuration says it cannot.
    #[error("identity provider {idp} returned unsupported level of assurance {level}")]
    IdpReturnedUnsupportedLevelOfAssurance {
        /// Issuing IdP.
        idp: String,
        /// Asserted level.
        level: LevelOfAssurance,
    },

    /// The IdP was disabled while the user was authenticating.
    #[error("identity provider {0} is disabled")]
    IdpDisabled(String),

    /// A success response carried no level of assurance.
    #[error("success response without level of assurance")]
    MissingLevelOfAssurance,

    /// The matching service answered with a status this step cannot take.
    #[error("unexpected matching service status {0}")]
    UnexpectedMatchingServiceStatus(String),

    /// Cycle 3 data lacks the configured attribute.
    #[error("cycle 3 attribute {0} was not supplied")]
    MissingCycle3Attribute(String),
}

/// Errors raised by the policy state machine.
#[derive(Debug, Error)]
pub enum PolicyError {
    /// An inbound message failed validation.
    #[error("protocol validation failed: {0}")]
    ProtocolValidation(ValidationFailure),

    /// The RP request id was already used.
    #[error("duplicate request id {0}")]
    DuplicateRequest(String),

    /// No handler exists for the event in the current state.
    #[error("event {event} is not legal in state {state} of session {session_id}")]
    IllegalStateTransition {
        /// Session id.
        session_id: SessionId,
        /// Current state.
        state: &'static str,
        /// Rejected event.
        event: &'static str,
    },

    /// No session with this id exists.
    #[error("session not found: {0}")]
    SessionNotFound(SessionId),

    /// Session creation collided with an existing session.
    #[error("session already exists: {0}")]
    SessionAlreadyExisting(SessionId),

    /// The session is not in the state the caller asked for.
    #[error("session {session_id} is in state {actual}, expected {expected}")]
    WrongSessionState {
        /// Session id.
        session_id: SessionId,
        /// Expected state.
        expected: String,
        /// Actual state.
        actual: String,
    },

    /// Another request advanced the session first.
    #[error("session {0} was modified concurrently")]
    StaleSession(SessionId),

    /// The user's choice of IdP or country was refused.
    #[error("selection refused: {0}")]
    IdpSelection(SelectionFailure),

    /// A validated response does not fit the session.
    #[error("state processing failed: {0}")]
    StateProcessing(StateProcessingFailure),

    /// The RP has no transaction configuration.
    #[error("unknown transaction: {0}")]
    UnknownTransaction(String),

    /// The session store failed.
    #[error("session store error: {0}")]
    Store(String),
}

impl PolicyError {
    /// True for errors caused by what the caller sent rather than the hub.
    #[must_use]
    pub const fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::ProtocolValidation(_)
                | Self::DuplicateRequest(_)
                | Self::SessionNotFound(_)
                | Self::SessionAlreadyExisting(_)
                | Self::WrongSessionState { .. }
                | Self::StaleSession(_)
                | Self::IdpSelection(_)
                | Self::StateProcessing(_)
                | Self::UnknownTransaction(_)
        )
    }

    /// True for errors that must reach the audit trail.
    #[must_use]
    pub const fn is_audited(&self) -> bool {
        matches!(
            self,
            Self::IllegalStateTransition { .. }
                | Self::SessionAlreadyExisting(_)
                | Self::DuplicateRequest(_)
        )
    }
}

impl From<ValidationFailure> for PolicyError {
    fn from(failure: ValidationFailure) -> Self {
        Self::ProtocolValidation(failure)
    }
}

impl From<SelectionFailure> for PolicyError {
    fn from(failure: SelectionFailure) -> Self {
        Self::IdpSelection(failure)
    }
}

impl From<StateProcessingFailure> for PolicyError {
    fn from(failure: StateProcessingFailure) -> Self {
        Self::StateProcessing(failure)
    }
}

impl From<SessionError> for PolicyError {
    fn from(err: SessionError) -> Self {
        match err {
            SessionError::NotFound(id) => Self::SessionNotFound(id),
            SessionError::AlreadyExisting(id) => Self::SessionAlreadyExisting(id),
            SessionError::WrongState {
                id,
                expected,
                actual,
            } => Self::WrongSessionState {
                session_id: id,
                expected,
                actual,
            },
            other => Self::Store(other.to_string()),
        }
    }
}

impl From<CacheError> for PolicyError {
    fn from(err: CacheError) -> Self {
        Self::Store(err.to_string())
    }
}

/// Maps a request validation failure, singling out replays.
pub(crate) fn from_request_failure(failure: ValidationFailure, request_id: &str) -> PolicyError {
    if failure.reason == FailureReason::DuplicateRequestId {
        PolicyError::DuplicateRequest(request_id.to_string())
    } else {
        PolicyError::ProtocolValidation(failure)
    }
}

/// Result type for policy operations.
pub type PolicyResult<T> = Result<T, PolicyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn duplicate_request_failures_are_singled_out() {
        let dup = ValidationFailure::new(FailureReason::DuplicateRequestId, "seen");
        assert!(matches!(
            from_request_failure(dup, "_r1"),
            PolicyError::DuplicateRequest(ref id) if id == "_r1"
        ));

        let other = ValidationFailure::new(FailureReason::MissingSignature, "unsigned");
        assert!(matches!(
            from_request_failure(other, "_r1"),
            PolicyError::ProtocolValidation(_)
        ));
    }

    #[test]
    fn illegal_transitions_are_audited_not_client_errors() {
        let err = PolicyError::IllegalStateTransition {
            session_id: SessionId::new("s"),
            state: "SessionStarted",
            event: "MatchResponse",
        };
        assert!(err.is_audited());
        assert!(!err.is_client_error());
    }

    #[test]
    fn session_errors_map_onto_policy_errors() {
        let err: PolicyError = SessionError::NotFound(SessionId::new("s")).into();
        assert!(matches!(err, PolicyError::SessionNotFound(_)));
    }
}
