//! Events that drive a session.

use hub_core::LevelOfAssurance;
use hub_saml::{InboundCountryResponse, InboundIdpResponse, InboundMatchingServiceResponse};

use crate::state::Cycle3Dataset;

/// Something that happened to a session.
///
/// Responses from other parties arrive only as validated inbound types, so
/// the state machine never sees an unchecked message.
#[derive(Debug, Clone)]
pub enum PolicyEvent {
    /// The user picked an identity provider.
    SelectIdp {
        /// Chosen identity provider.
        idp_entity_id: String,
        /// The user wants to register.
        is_registration: bool,
        /// Level the user asked for.
        requested_loa: LevelOfAssurance,
    },
    /// The hub is about to send the AuthnRequest to the selected IdP.
    IssueIdpAuthnRequest,
    /// The selected IdP answered.
    IdpAuthnResponse(InboundIdpResponse),
    /// The user picked an eIDAS country.
    SelectCountry {
        /// Chosen country node.
        country_entity_id: String,
    },
    /// The selected country answered.
    CountryAuthnResponse(InboundCountryResponse),
    /// The matching service answered.
    MatchResponse(InboundMatchingServiceResponse),
    /// The user supplied cycle 3 attributes.
    Cycle3DataSubmitted(Cycle3Dataset),
    /// The user declined to supply cycle 3 attributes.
    Cycle3Cancelled,
    /// Sending the request to the matching service failed.
    MatchingServiceRequestFailed,
    /// The matching service did not answer in time.
    MatchResponseWaitExceeded,
    /// The user wants to try a different identity provider after a failure.
    TryAnotherIdp,
    /// The user went back to the start.
    Restart,
    /// Build the final response for the RP.
    PrepareResponse,
    /// Build an error response for the RP.
    PrepareErrorResponse,
}

impl PolicyEvent {
    /// Name of the event.
    #[must_use]
    pub const fn name(&self) -> &'static str {
        match self {
            Self::SelectIdp { .. } => "SelectIdp",
            Self::IssueIdpAuthnRequest => "IssueIdpAuthnRequest",
            Self::IdpAuthnResponse(_) => "IdpAuthnResponse",
            Self::SelectCountry { .. } => "SelectCountry",
            Self::CountryAuthnResponse(_) => "CountryAuthnResponse",
            Self::MatchResponse(_) => "MatchResponse",
            Self::Cycle3DataSubmitted(_) => "Cycle3DataSubmitted",
            Self::Cycle3Cancelled => "Cycle3Cancelled",
            Self::MatchingServiceRequestFailed => "MatchingServiceRequestFailed",
            Self::MatchResponseWaitExceeded => "MatchResponseWaitExceeded",
            Self::TryAnotherIdp => "TryAnotherIdp",
            Self::Restart => "Restart",
            Self::PrepareResponse => "PrepareResponse",
            Self::PrepareErrorResponse => "PrepareErrorResponse",
        }
    }

    /// True for the events that build the answer to the RP.
    #[must_use]
    pub const fn prepares_response(&self) -> bool {
        matches!(self, Self::PrepareResponse | Self::PrepareErrorResponse)
    }
}
