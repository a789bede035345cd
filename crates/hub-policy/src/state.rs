//! Session states.
//!
//! One tagged union covers every step of a federation journey. Each variant
//! carries the [`RequestContext`] plus whatever the next steps need; nothing
//! in a state is trusted input, only facts the hub itself established from
//! validated messages.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use hub_core::LevelOfAssurance;
use hub_session::SessionState;
use serde::{Deserialize, Serialize};

use crate::context::RequestContext;
use crate::effect::RpResponseStatus;

/// Attributes keyed by name, each with its values.
pub type AttributeMap = BTreeMap<String, Vec<String>>;

/// Self-asserted cycle 3 attributes keyed by name.
pub type Cycle3Dataset = BTreeMap<String, String>;

/// A state that only knows its request context.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct JourneyState {
    /// Request context.
    pub context: RequestContext,
}

/// The user picked an identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdpSelectionState {
    /// Request context.
    pub context: RequestContext,
    /// Selected identity provider.
    pub idp_entity_id: String,
    /// The user is registering rather than signing in.
    pub is_registration: bool,
    /// Level the user asked for.
    pub requested_level_of_assurance: LevelOfAssurance,
    /// Levels the transaction accepts that the IdP supports, in transaction order.
    pub levels_of_assurance: Vec<LevelOfAssurance>,
}

/// What a successful authentication established about the user.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdpAuthentication {
    /// Identity provider or country that authenticated the user.
    pub authenticating_entity_id: String,
    /// The user registered during this journey.
    pub is_registration: bool,
    /// Asserted level of assurance.
    pub level_of_assurance: LevelOfAssurance,
    /// Persistent subject identifier asserted by the authenticating entity.
    pub persistent_id: Option<String>,
    /// Matching dataset.
    pub matching_dataset: AttributeMap,
    /// Matching service of the transaction.
    pub matching_service_entity_id: String,
}

/// A request is outstanding at the matching service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchRequestSentState {
    /// Request context.
    pub context: RequestContext,
    /// Authentication being matched.
    pub authentication: IdpAuthentication,
    /// When the request was sent.
    pub request_sent_at: DateTime<Utc>,
    /// Cycle 3 attributes sent with the request.
    pub cycle3_data: Option<Cycle3Dataset>,
}

/// Cycle 0/1 found no match; waiting for the user to self-assert.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AwaitingCycle3DataState {
    /// Request context.
    pub context: RequestContext,
    /// Authentication being matched.
    pub authentication: IdpAuthentication,
    /// Attribute the transaction asks for.
    pub cycle3_attribute: String,
}

/// A journey ended at a point tied to one identity provider.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IdpOutcomeState {
    /// Request context.
    pub context: RequestContext,
    /// Identity provider or country involved.
    pub idp_entity_id: String,
}

/// The matching service matched or created a local account.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedState {
    /// Request context.
    pub context: RequestContext,
    /// Identity provider that authenticated the user.
    pub idp_entity_id: String,
    /// Level of assurance reached.
    pub level_of_assurance: LevelOfAssurance,
    /// Relying-party scoped persistent id.
    pub persistent_id: Option<String>,
    /// The user registered during this journey.
    pub is_registration: bool,
}

/// The identity provider reported fraud.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FraudEventDetectedState {
    /// Request context.
    pub context: RequestContext,
    /// Identity provider that raised the event.
    pub idp_entity_id: String,
    /// Identity provider's fraud event id.
    pub fraud_event_id: Option<String>,
    /// Subject the event concerns.
    pub persistent_id: Option<String>,
}

/// The user picked an eIDAS country.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CountrySelectedState {
    /// Request context.
    pub context: RequestContext,
    /// Selected country node.
    pub country_entity_id: String,
    /// Levels the transaction accepts from a country.
    pub levels_of_assurance: Vec<LevelOfAssurance>,
}

/// Authentication succeeded and the RP does not use a matching service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct NonMatchingJourneySuccessState {
    /// Request context.
    pub context: RequestContext,
    /// Identity provider or country that authenticated the user.
    pub entity_id: String,
    /// Asserted level of assurance.
    pub level_of_assurance: LevelOfAssurance,
    /// Persistent or eIDAS person identifier.
    pub persistent_id: Option<String>,
    /// Asserted attributes.
    pub attributes: AttributeMap,
}

/// The answer to the RP is ready.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PreparedResponseState {
    /// Request context.
    pub context: RequestContext,
    /// Status reported to the RP.
    pub status: RpResponseStatus,
}

/// Federation session state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "state")]
pub enum State {
    /// A validated RP request opened the session.
    SessionStarted(JourneyState),
    /// An identity provider was chosen; the hub has not yet sent it a request.
    IdpSelecting(IdpSelectionState),
    /// The hub sent an AuthnRequest to the chosen identity provider.
    IdpSelected(IdpSelectionState),
    /// Cycle 0/1 match request outstanding.
    Cycle0And1MatchRequestSent(MatchRequestSentState),
    /// Waiting for cycle 3 attributes from the user.
    AwaitingCycle3Data(AwaitingCycle3DataState),
    /// Cycle 3 match request outstanding.
    Cycle3MatchRequestSent(MatchRequestSentState),
    /// The user declined to provide cycle 3 attributes.
    Cycle3DataInputCancelled(IdpOutcomeState),
    /// The matching service found the user.
    SuccessfulMatch(MatchedState),
    /// The matching service did not find the user.
    NoMatch(IdpOutcomeState),
    /// User account creation request outstanding.
    UserAccountCreationRequestSent(MatchRequestSentState),
    /// The matching service created a local account.
    UserAccountCreated(MatchedState),
    /// The matching service could not create an account.
    UserAccountCreationFailed(IdpOutcomeState),
    /// Authentication at the identity provider failed.
    AuthnFailedError(IdpOutcomeState),
    /// A party reported a requester error, or the level reached is not acceptable.
    RequesterError(JourneyState),
    /// The identity provider signalled fraud.
    FraudEventDetected(FraudEventDetectedState),
    /// The matching service could not be reached or answered with an error.
    MatchingServiceRequestError(IdpOutcomeState),
    /// The session expired.
    Timeout(JourneyState),
    /// An eIDAS country was chosen and sent an AuthnRequest.
    EidasCountrySelected(CountrySelectedState),
    /// Authentication succeeded for an RP without matching.
    NonMatchingJourneySuccess(NonMatchingJourneySuccessState),
    /// The user went back to choose again.
    RestartJourney(JourneyState),
    /// A response for the RP is ready.
    ResponsePrepared(PreparedResponseState),
    /// An error response for the RP is ready.
    ErrorResponsePrepared(PreparedResponseState),
}

impl State {
    /// Name of the variant.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SessionStarted(_) => "SessionStarted",
            Self::IdpSelecting(_) => "IdpSelecting",
            Self::IdpSelected(_) => "IdpSelected",
            Self::Cycle0And1MatchRequestSent(_) => "Cycle0And1MatchRequestSent",
            Self::AwaitingCycle3Data(_) => "AwaitingCycle3Data",
            Self::Cycle3MatchRequestSent(_) => "Cycle3MatchRequestSent",
            Self::Cycle3DataInputCancelled(_) => "Cycle3DataInputCancelled",
            Self::SuccessfulMatch(_) => "SuccessfulMatch",
            Self::NoMatch(_) => "NoMatch",
            Self::UserAccountCreationRequestSent(_) => "UserAccountCreationRequestSent",
            Self::UserAccountCreated(_) => "UserAccountCreated",
            Self::UserAccountCreationFailed(_) => "UserAccountCreationFailed",
            Self::AuthnFailedError(_) => "AuthnFailedError",
            Self::RequesterError(_) => "RequesterError",
            Self::FraudEventDetected(_) => "FraudEventDetected",
            Self::MatchingServiceRequestError(_) => "MatchingServiceRequestError",
            Self::Timeout(_) => "Timeout",
            Self::EidasCountrySelected(_) => "EidasCountrySelected",
            Self::NonMatchingJourneySuccess(_) => "NonMatchingJourneySuccess",
            Self::RestartJourney(_) => "RestartJourney",
            Self::ResponsePrepared(_) => "ResponsePrepared",
            Self::ErrorResponsePrepared(_) => "ErrorResponsePrepared",
        }
    }

    /// The request context.
    #[must_use]
    pub const fn context(&self) -> &RequestContext {
        match self {
            Self::SessionStarted(s)
            | Self::RequesterError(s)
            | Self::Timeout(s)
            | Self::RestartJourney(s) => &s.context,
            Self::IdpSelecting(s) | Self::IdpSelected(s) => &s.context,
            Self::Cycle0And1MatchRequestSent(s)
            | Self::Cycle3MatchRequestSent(s)
            | Self::UserAccountCreationRequestSent(s) => &s.context,
            Self::AwaitingCycle3Data(s) => &s.context,
            Self::Cycle3DataInputCancelled(s)
            | Self::NoMatch(s)
            | Self::UserAccountCreationFailed(s)
            | Self::AuthnFailedError(s)
            | Self::MatchingServiceRequestError(s) => &s.context,
            Self::SuccessfulMatch(s) | Self::UserAccountCreated(s) => &s.context,
            Self::FraudEventDetected(s) => &s.context,
            Self::EidasCountrySelected(s) => &s.context,
            Self::NonMatchingJourneySuccess(s) => &s.context,
            Self::ResponsePrepared(s) | Self::ErrorResponsePrepared(s) => &s.context,
        }
    }

    /// True for states that end the journey and wait only for the RP answer.
    #[must_use]
    pub const fn is_terminal(&self) -> bool {
        matches!(
            self,
            Self::SuccessfulMatch(_)
                | Self::NoMatch(_)
                | Self::UserAccountCreated(_)
                | Self::UserAccountCreationFailed(_)
                | Self::RequesterError(_)
                | Self::FraudEventDetected(_)
                | Self::Timeout(_)
                | Self::NonMatchingJourneySuccess(_)
        )
    }

    /// True once an answer for the RP has been prepared.
    #[must_use]
    pub const fn is_answered(&self) -> bool {
        matches!(self, Self::ResponsePrepared(_) | Self::ErrorResponsePrepared(_))
    }

    /// True if reading the state after expiry moves it to [`State::Timeout`].
    #[must_use]
    pub const fn times_out(&self) -> bool {
        !matches!(self, Self::Timeout(_)) && !self.is_answered()
    }
}

impl SessionState for State {
    fn name(&self) -> &'static str {
        Self::name(self)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn context() -> RequestContext {
        RequestContext {
            request_id: "_request-1".to_string(),
            request_issuer_entity_id: "https://rp.example".to_string(),
            session_expiry_timestamp: Utc::now(),
            assertion_consumer_service_uri: "https://rp.example/acs".to_string(),
            relay_state: Some("relay".to_string()),
            force_authn: false,
            transaction_supports_eidas: false,
        }
    }

    #[test]
    fn serializes_with_state_tag() {
        let state = State::SessionStarted(JourneyState { context: context() });
        let json = serde_json::to_value(&state).unwrap();

        assert_eq!(json["state"], "SessionStarted");
        assert_eq!(json["context"]["request_id"], "_request-1");
        let back: State = serde_json::from_value(json).unwrap();
        assert_eq!(back, state);
    }

    #[test]
    fn answered_and_timed_out_states_do_not_time_out_again() {
        let ctx = context();
        let prepared = State::ResponsePrepared(PreparedResponseState {
            context: ctx.clone(),
            status: RpResponseStatus::Success,
        });
        let timeout = State::Timeout(JourneyState { context: ctx.clone() });
        let started = State::SessionStarted(JourneyState { context: ctx });

        assert!(!prepared.times_out());
        assert!(!timeout.times_out());
        assert!(started.times_out());
        assert!(timeout.is_terminal());
        assert!(!started.is_terminal());
    }
}
