//! Request context.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Facts about the originating RP request, carried unchanged by every state.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RequestContext {
    /// Id of the RP AuthnRequest; also the id of every request the hub sends
    /// on the user's behalf.
    pub request_id: String,
    /// Entity id of the relying party.
    pub request_issuer_entity_id: String,
    /// After this instant the session only times out.
    pub session_expiry_timestamp: DateTime<Utc>,
    /// Where the final response is posted.
    pub assertion_consumer_service_uri: String,
    /// Opaque RP relay state, echoed back.
    pub relay_state: Option<String>,
    /// The RP asked for fresh authentication.
    pub force_authn: bool,
    /// The transaction may use eIDAS countries.
    pub transaction_supports_eidas: bool,
}

impl RequestContext {
    /// Checks if the session has expired at `now`.
    #[must_use]
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        now > self.session_expiry_timestamp
    }
}
