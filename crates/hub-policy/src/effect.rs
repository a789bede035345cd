//! Outbound effects.
//!
//! The state machine performs no I/O. When a transition requires a message to
//! leave the hub it returns an [`OutboundEffect`] describing it; the caller
//! builds, signs and sends the message.

use hub_core::LevelOfAssurance;
use serde::{Deserialize, Serialize};

use crate::state::{AttributeMap, Cycle3Dataset};

/// Status of the response the hub sends back to the RP.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum RpResponseStatus {
    /// The user was identified.
    Success,
    /// The matching service could not identify the user.
    NoMatch,
    /// The request could not be served as made.
    RequesterError,
    /// Authentication failed.
    AuthnFailed,
    /// No authentication took place.
    NoAuthnContext,
}

/// Kind of request sent to a matching service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum MatchRequestKind {
    /// Match on the identity provider's matching dataset.
    Cycle0And1,
    /// Match with self-asserted cycle 3 attributes added.
    Cycle3,
    /// Ask the matching service to create a local account.
    UserAccountCreation,
}

/// A message the caller must send after a transition.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub enum OutboundEffect {
    /// AuthnRequest to the selected identity provider.
    AuthnRequestToIdp {
        /// Id of the request; equals the RP request id.
        request_id: String,
        /// Destination identity provider.
        idp_entity_id: String,
        /// Levels of assurance to request.
        levels_of_assurance: Vec<LevelOfAssurance>,
        /// Demand fresh authentication.
        force_authn: bool,
        /// The user is registering.
        is_registration: bool,
    },
    /// AuthnRequest to the selected eIDAS country.
    AuthnRequestToCountry {
        /// Id of the request; equals the RP request id.
        request_id: String,
        /// Destination country node.
        country_entity_id: String,
        /// Levels of assurance to request.
        levels_of_assurance: Vec<LevelOfAssurance>,
    },
    /// Attribute query to the transaction's matching service.
    MatchRequest {
        /// Id of the query; equals the RP request id.
        request_id: String,
        /// Kind of query.
        kind: MatchRequestKind,
        /// Destination matching service.
        matching_service_entity_id: String,
        /// Level of assurance reached.
        level_of_assurance: LevelOfAssurance,
        /// Persistent id asserted by the authenticating entity.
        persistent_id: Option<String>,
        /// Matching dataset.
        matching_dataset: AttributeMap,
        /// Cycle 3 attributes, for cycle 3 queries.
        cycle3_data: Option<Cycle3Dataset>,
        /// Attributes to return, for account creation queries.
        user_account_creation_attributes: Vec<String>,
    },
    /// Response to the relying party.
    ResponseToRp {
        /// RP request the response answers.
        in_response_to: String,
        /// Relying party.
        rp_entity_id: String,
        /// Where to post the response.
        assertion_consumer_service_uri: String,
        /// Relay state to echo.
        relay_state: Option<String>,
        /// Outcome.
        status: RpResponseStatus,
        /// Relying-party scoped persistent id, on success.
        persistent_id: Option<String>,
        /// Level of assurance reached, on success.
        level_of_assurance: Option<LevelOfAssurance>,
    },
}
