//! Audit events.
//!
//! The hub emits a structured [`HubEvent`] for every security-relevant step of
//! a federation session. Delivery to an audit store is outside the hub; it only
//! hands events to an [`EventSink`].
//!
//! All events include:
//! - Timestamp
//! - Event type
//! - Session id (when one exists)
//! - Outcome and, for failures, a reason code
//! - Additional key-value details (entity ids, levels of assurance)

use chrono::{DateTime, Utc};
use parking_lot::Mutex;
use serde::{Deserialize, Serialize};
use uuid::Uuid;

/// Event type categories.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum EventType {
    // Session lifecycle
    /// A session was created from a validated RP AuthnRequest.
    SessionStarted,
    /// A session was accessed after its expiry and moved to Timeout.
    SessionTimeout,
    /// Session creation collided with an existing session.
    SessionAlreadyExisting,
    /// A request id was seen twice within the replay window.
    DuplicateRequest,
    /// An event arrived for a state that has no handler for it.
    IllegalStateTransition,

    // Identity provider
    /// The user picked an identity provider.
    IdpSelected,
    /// The user picked an eIDAS country.
    CountrySelected,
    /// The identity provider authenticated the user.
    IdpAuthnSucceeded,
    /// The identity provider reported a failure.
    IdpAuthnFailed,
    /// The identity provider reported a requester error.
    IdpRequesterError,
    /// The identity provider signalled fraud.
    FraudDetected,

    // Matching service
    /// A match request was sent to the matching service.
    MatchRequestSent,
    /// The matching service answered.
    MatchResponseReceived,
    /// The matching service could not be reached or failed.
    MatchingServiceRequestError,
    /// Cycle 3 attributes were submitted.
    Cycle3DataSubmitted,
    /// The user cancelled cycle 3 attribute input.
    Cycle3Cancelled,
    /// A user account creation request was sent.
    UserAccountCreationRequested,

    // Responses to the relying party
    /// A response to the relying party was prepared.
    ResponsePrepared,
}

/// Outcome of an event.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EventOutcome {
    /// Operation succeeded.
    Success,
    /// Operation failed.
    Failure,
}

/// A security event for audit logging.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct HubEvent {
    /// Unique event identifier.
    pub id: Uuid,

    /// Timestamp of the event.
    pub timestamp: DateTime<Utc>,

    /// Type of event.
    pub event_type: EventType,

    /// Outcome of the event.
    pub outcome: EventOutcome,

    /// Session id, when the event belongs to a session.
    pub session_id: Option<String>,

    /// Id of the RP AuthnRequest that started the session.
    pub request_id: Option<String>,

    /// Principal IP address as seen by the hub.
    pub ip_address: Option<String>,

    /// Reason code (for failure events).
    pub error: Option<String>,

    /// Additional details as key-value pairs.
    pub details: Vec<(String, String)>,
}

impl HubEvent {
    /// Creates a new event builder.
    #[must_use]
    pub const fn builder(event_type: EventType) -> HubEventBuilder {
        HubEventBuilder::new(event_type)
    }

    /// Looks up a detail by key.
    #[must_use]
    pub fn detail(&self, key: &str) -> Option<&str> {
        self.details
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, v)| v.as_str())
    }
}

/// Builder for [`HubEvent`].
#[derive(Debug)]
pub struct HubEventBuilder {
    event_type: EventType,
    outcome: EventOutcome,
    session_id: Option<String>,
    request_id: Option<String>,
    ip_address: Option<String>,
    error: Option<String>,
    details: Vec<(String, String)>,
}

impl HubEventBuilder {
    /// Creates a new event builder.
    #[must_use]
    pub const fn new(event_type: EventType) -> Self {
        Self {
            event_type,
            outcome: EventOutcome::Success,
            session_id: None,
            request_id: None,
            ip_address: None,
            error: None,
            details: Vec::new(),
        }
    }

    /// Sets the outcome to failure with a reason code.
    #[must_use]
    pub fn failure(mut self, error: impl Into<String>) -> Self {
        self.outcome = EventOutcome::Failure;
        self.error = Some(error.into());
        self
    }

    /// Sets the session id.
    #[must_use]
    pub fn session(mut self, session_id: impl Into<String>) -> Self {
        self.session_id = Some(session_id.into());
        self
    }

    /// Sets the originating request id.
    #[must_use]
    pub fn request(mut self, request_id: impl Into<String>) -> Self {
        self.request_id = Some(request_id.into());
        self
    }

    /// Sets the principal IP address.
    #[must_use]
    pub fn ip_address(mut self, ip: impl Into<String>) -> Self {
        self.ip_address = Some(ip.into());
        self
    }

    /// Adds a detail key-value pair.
    #[must_use]
    pub fn detail(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.details.push((key.into(), value.into()));
        self
    }

    /// Builds the event stamped with `timestamp`.
    #[must_use]
    pub fn build_at(self, timestamp: DateTime<Utc>) -> HubEvent {
        HubEvent {
            id: Uuid::now_v7(),
            timestamp,
            event_type: self.event_type,
            outcome: self.outcome,
            session_id: self.session_id,
            request_id: self.request_id,
            ip_address: self.ip_address,
            error: self.error,
            details: self.details,
        }
    }

    /// Builds the event stamped with the current time.
    #[must_use]
    pub fn build(self) -> HubEvent {
        self.build_at(Utc::now())
    }
}

/// Destination for audit events.
pub trait EventSink: Send + Sync {
    /// Hands an event over for recording. Must not block on I/O.
    fn emit(&self, event: HubEvent);
}

/// Sink that writes events to the `hub::audit` tracing target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingEventSink;

impl EventSink for TracingEventSink {
    fn emit(&self, event: HubEvent) {
        let details = serde_json::to_string(&event.details).unwrap_or_default();
        match event.outcome {
            EventOutcome::Success => tracing::info!(
                target: "hub::audit",
                event_id = %event.id,
                event_type = ?event.event_type,
                session_id = event.session_id.as_deref().unwrap_or("-"),
                request_id = event.request_id.as_deref().unwrap_or("-"),
                %details,
                "audit event"
            ),
            EventOutcome::Failure => tracing::warn!(
                target: "hub::audit",
                event_id = %event.id,
                event_type = ?event.event_type,
                session_id = event.session_id.as_deref().unwrap_or("-"),
                request_id = event.request_id.as_deref().unwrap_or("-"),
                error = event.error.as_deref().unwrap_or("-"),
                %details,
                "audit event"
            ),
        }
    }
}

/// Sink that keeps events in memory.
#[derive(Debug, Default)]
pub struct MemoryEventSink {
    events: Mutex<Vec<HubEvent>>,
}

impl MemoryEventSink {
    /// Creates an empty sink.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns a copy of everything recorded so far.
    #[must_use]
    pub fn events(&self) -> Vec<HubEvent> {
        self.events.lock().clone()
    }

    /// Returns the recorded events of one type.
    #[must_use]
    pub fn events_of(&self, event_type: EventType) -> Vec<HubEvent> {
        self.events
            .lock()
            .iter()
            .filter(|e| e.event_type == event_type)
            .cloned()
            .collect()
    }
}

impl EventSink for MemoryEventSink {
    fn emit(&self, event: HubEvent) {
        self.events.lock().push(event);
    }
}
