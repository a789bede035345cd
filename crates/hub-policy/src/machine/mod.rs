//! Policy state machine.
//!
//! Every operation loads the session, applies the lazy timeout, computes the
//! successor in [`handlers`] and writes it back with compare-and-set. A
//! rejected event leaves the stored record untouched.

mod handlers;


use std::sync::Arc;
use std::time::Duration;

use hub_cache::{ReplayCache, SharedStoreRef, StoreReplayCache};
use hub_core::event::HubEventBuilder;
use hub_core::{EventSink, EventType, HubConfig, HubEvent, SharedClock, SystemClock, TracingEventSink};
use hub_saml::{AuthnRequest, ValidatedRequest, ValidationPipeline};
use hub_session::{Session, SessionError, SessionId, SessionStore};
use tracing::{debug, error, info, warn};

use crate::config::ConfigService;
use crate::context::RequestContext;
use crate::effect::OutboundEffect;
use crate::error::{from_request_failure, PolicyError, PolicyResult};
use crate::event::PolicyEvent;
use crate::state::{JourneyState, State};

use self::handlers::Transitions;

/// Namespace of the replay cache guarding session creation.
const SESSION_REQUEST_NAMESPACE: &str = "session-request";

/// Caller-supplied facts about the RP request that the SAML message does not carry.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SessionParams {
    /// Resolved assertion consumer service of the RP.
    pub assertion_consumer_service_uri: String,
    /// RP relay state.
    pub relay_state: Option<String>,
    /// Address of the user's browser, for the audit trail.
    pub principal_ip: Option<String>,
    /// The RP offered eIDAS countries on this journey.
    pub transaction_supports_eidas: bool,
}

impl SessionParams {
    /// Parameters for a request answered at `assertion_consumer_service_uri`.
    #[must_use]
    pub fn new(assertion_consumer_service_uri: impl Into<String>) -> Self {
        Self {
            assertion_consumer_service_uri: assertion_consumer_service_uri.into(),
            relay_state: None,
            principal_ip: None,
            transaction_supports_eidas: false,
        }
    }

    /// Sets the relay state.
    #[must_use]
    pub fn with_relay_state(mut self, relay_state: impl Into<String>) -> Self {
        self.relay_state = Some(relay_state.into());
        self
    }

    /// Sets the principal's address.
    #[must_use]
    pub fn with_principal_ip(mut self, ip: impl Into<String>) -> Self {
        self.principal_ip = Some(ip.into());
        self
    }

    /// Allows eIDAS countries.
    #[must_use]
    pub const fn with_eidas(mut self, supported: bool) -> Self {
        self.transaction_supports_eidas = supported;
        self
    }
}

/// Outcome of a successful [`PolicyStateMachine::transition`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Transition {
    /// State now stored.
    pub state: State,
    /// Message the caller must send, if any.
    pub effect: Option<OutboundEffect>,
    /// The session expired on this access; the event was not applied.
    pub timed_out: bool,
}

/// The federation session state machine.
pub struct PolicyStateMachine {
    store: SharedStoreRef,
    sessions: SessionStore<State>,
    session_requests: StoreReplayCache,
    config: Arc<dyn ConfigService>,
    events: Arc<dyn EventSink>,
    clock: SharedClock,
    session_lifetime: chrono::Duration,
}

impl std::fmt::Debug for PolicyStateMachine {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PolicyStateMachine")
            .field("sessions", &self.sessions)
            .field("session_lifetime", &self.session_lifetime)
            .finish_non_exhaustive()
    }
}

impl PolicyStateMachine {
    /// Creates a state machine over `store`.
    #[must_use]
    pub fn new(store: SharedStoreRef, config: Arc<dyn ConfigService>, hub_config: &HubConfig) -> Self {
        let clock = SystemClock::shared();
        Self {
            sessions: SessionStore::new(store.clone(), clock.clone()),
            session_requests: StoreReplayCache::new(
                store.clone(),
                SESSION_REQUEST_NAMESPACE,
                Duration::from_secs(hub_config.request_replay_window_secs),
            ),
            store,
            config,
            events: Arc::new(TracingEventSink),
            clock,
            session_lifetime: hub_config.session_lifetime(),
        }
    }

    /// Uses `clock` for expiry decisions.
    #[must_use]
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.sessions = SessionStore::new(self.store.clone(), clock.clone());
        self.clock = clock;
        self
    }

    /// Sends audit events to `sink`.
    #[must_use]
    pub fn with_event_sink(mut self, sink: Arc<dyn EventSink>) -> Self {
        self.events = sink;
        self
    }

    /// Validates an RP AuthnRequest and opens a session for it.
    ///
    /// ## Errors
    ///
    /// Returns [`PolicyError::DuplicateRequest`] for a replayed request id,
    /// [`PolicyError::ProtocolValidation`] for any other validation failure,
    /// or any error of [`Self::create`].
    pub async fn start(
        &self,
        pipeline: &ValidationPipeline,
        request: AuthnRequest,
        params: SessionParams,
    ) -> PolicyResult<SessionId> {
        let request_id = request.id.clone();
        let validated = match pipeline.validate_authn_request_from_rp(request).await {
            Ok(validated) => validated,
            Err(failure) => {
                let err = from_request_failure(failure, &request_id);
                if matches!(err, PolicyError::DuplicateRequest(_)) {
                    self.duplicate_request(&request_id, &params);
                }
                return Err(err);
            }
        };
        self.create(&validated, params).await
    }

    /// Opens a session in `SessionStarted` for a validated request.
    ///
    /// ## Errors
    ///
    /// - [`PolicyError::UnknownTransaction`] if the RP has no configuration
    /// - [`PolicyError::DuplicateRequest`] if the request id already opened a session
    /// - [`PolicyError::SessionAlreadyExisting`] on a session id collision
    pub async fn create(
        &self,
        request: &ValidatedRequest,
        params: SessionParams,
    ) -> PolicyResult<SessionId> {
        let issuer = request.issuer();
        let transaction = self
            .config
            .transaction(issuer)
            .await
            .ok_or_else(|| PolicyError::UnknownTransaction(issuer.to_string()))?;

        if !self.session_requests.accept(request.request_id()).await? {
            self.duplicate_request(request.request_id(), &params);
            return Err(PolicyError::DuplicateRequest(request.request_id().to_string()));
        }

        let now = self.clock.now();
        let expires_at = now + self.session_lifetime;
        let context = RequestContext {
            request_id: request.request_id().to_string(),
            request_issuer_entity_id: issuer.to_string(),
            session_expiry_timestamp: expires_at,
            assertion_consumer_service_uri: params.assertion_consumer_service_uri,
            relay_state: params.relay_state,
            force_authn: request.force_authn(),
            transaction_supports_eidas: params.transaction_supports_eidas && transaction.eidas_enabled,
        };

        let session = match self
            .sessions
            .create_session(State::SessionStarted(JourneyState { context }), expires_at)
            .await
        {
            Ok(session) => session,
            Err(SessionError::AlreadyExisting(id)) => {
                self.emit(
                    HubEvent::builder(EventType::SessionAlreadyExisting)
                        .failure("session already exists")
                        .session(id.as_str())
                        .request(request.request_id()),
                );
                return Err(PolicyError::SessionAlreadyExisting(id));
            }
            Err(err) => return Err(err.into()),
        };

        info!(
            session_id = %session.id,
            request_id = %request.request_id(),
            issuer = %issuer,
            "session started"
        );
        let mut event = HubEvent::builder(EventType::SessionStarted)
            .session(session.id.as_str())
            .request(request.request_id())
            .detail("issuer", issuer);
        if let Some(ip) = &params.principal_ip {
            event = event.ip_address(ip.as_str());
        }
        self.emit(event);

        Ok(session.id)
    }

    /// Applies `event` to the session.
    ///
    /// A session read after its expiry moves to `Timeout` first; unless the
    /// event prepares the RP answer it is then not applied and the result
    /// has `timed_out` set.
    ///
    /// ## Errors
    ///
    /// - [`PolicyError::SessionNotFound`] for an unknown id
    /// - [`PolicyError::IllegalStateTransition`] if the state has no handler for the event
    /// - [`PolicyError::StaleSession`] if another request advanced the session first
    /// - selection and state-processing errors from the handler
    pub async fn transition(&self, id: &SessionId, event: PolicyEvent) -> PolicyResult<Transition> {
        let (session, timed_out) = self.load(id).await?;
        if timed_out && !event.prepares_response() {
            return Ok(Transition {
                state: session.state,
                effect: None,
                timed_out: true,
            });
        }

        let event_name = event.name();
        let transitions = Transitions {
            config: self.config.as_ref(),
            session_id: id,
            now: self.clock.now(),
        };
        let step = match transitions.next(&session.state, event).await {
            Ok(step) => step,
            Err(err) => {
                self.rejected(&session, event_name, &err);
                return Err(err);
            }
        };

        let updated = self
            .sessions
            .compare_and_set_state(&session, step.state)
            .await?
            .ok_or_else(|| {
                warn!(session_id = %id, event = event_name, "session advanced concurrently");
                PolicyError::StaleSession(id.clone())
            })?;

        if updated.state.is_terminal() || updated.state.is_answered() {
            info!(
                session_id = %id,
                from = session.state_name(),
                to = updated.state_name(),
                event = event_name,
                "session transition"
            );
        } else {
            debug!(
                session_id = %id,
                from = session.state_name(),
                to = updated.state_name(),
                event = event_name,
                "session transition"
            );
        }
        self.audit(&session, &updated.state, step.effect.as_ref());

        Ok(Transition {
            state: updated.state,
            effect: step.effect,
            timed_out,
        })
    }

    /// Returns the current state, applying the lazy timeout.
    ///
    /// ## Errors
    ///
    /// Returns [`PolicyError::SessionNotFound`] for an unknown id.
    pub async fn get_state(&self, id: &SessionId) -> PolicyResult<State> {
        Ok(self.load(id).await?.0.state)
    }

    /// Returns the current state if it is the named variant.
    ///
    /// ## Errors
    ///
    /// Returns [`PolicyError::WrongSessionState`] for any other variant.
    pub async fn expect_state(&self, id: &SessionId, expected: &str) -> PolicyResult<State> {
        let state = self.get_state(id).await?;
        if state.name() != expected {
            return Err(PolicyError::WrongSessionState {
                session_id: id.clone(),
                expected: expected.to_string(),
                actual: state.name().to_string(),
            });
        }
        Ok(state)
    }

    /// Loads a session and moves it to `Timeout` if it has expired.
    ///
    /// The flag is true when this call did the move.
    async fn load(&self, id: &SessionId) -> PolicyResult<(Session<State>, bool)> {
        let session = self.sessions.get_session(id).await?;
        if !session.state.times_out() || !session.state.context().is_expired(self.clock.now()) {
            return Ok((session, false));
        }

        let timeout = State::Timeout(JourneyState {
            context: session.state.context().clone(),
        });
        match self.sessions.compare_and_set_state(&session, timeout).await? {
            Some(updated) => {
                info!(session_id = %id, from = session.state_name(), "session timed out");
                self.emit(
                    HubEvent::builder(EventType::SessionTimeout)
                        .session(id.as_str())
                        .request(session.state.context().request_id.as_str())
                        .detail("from", session.state_name()),
                );
                Ok((updated, true))
            }
            // Another request changed the record first; report what it stored.
            None => Ok((self.sessions.get_session(id).await?, false)),
        }
    }

    fn duplicate_request(&self, request_id: &str, params: &SessionParams) {
        warn!(request_id = %request_id, "duplicate request id");
        let mut event = HubEvent::builder(EventType::DuplicateRequest)
            .failure("duplicate request id")
            .request(request_id);
        if let Some(ip) = &params.principal_ip {
            event = event.ip_address(ip.as_str());
        }
        self.emit(event);
    }

    fn rejected(&self, session: &Session<State>, event: &'static str, err: &PolicyError) {
        if let PolicyError::IllegalStateTransition { .. } = err {
            error!(
                session_id = %session.id,
                state = session.state_name(),
                event,
                "illegal state transition"
            );
            self.emit(
                HubEvent::builder(EventType::IllegalStateTransition)
                    .failure(err.to_string())
                    .session(session.id.as_str())
                    .request(session.state.context().request_id.as_str())
                    .detail("state", session.state_name())
                    .detail("event", event),
            );
        } else {
            warn!(
                session_id = %session.id,
                state = session.state_name(),
                event,
                error = %err,
                "event rejected"
            );
        }
    }

    fn audit(&self, from: &Session<State>, to: &State, effect: Option<&OutboundEffect>) {
        let context = to.context();
        let base = |event_type| {
            HubEvent::builder(event_type)
                .session(from.id.as_str())
                .request(context.request_id.as_str())
                .detail("from", from.state_name())
                .detail("to", to.name())
        };

        if let Some(event_type) = audit_event_type(&from.state, to) {
            self.emit(base(event_type));
        }
        if let Some(OutboundEffect::MatchRequest {
            kind,
            matching_service_entity_id,
            ..
        }) = effect
        {
            self.emit(
                base(EventType::MatchRequestSent)
                    .detail("kind", format!("{kind:?}"))
                    .detail("matching_service", matching_service_entity_id.as_str()),
            );
        }
    }

    fn emit(&self, event: HubEventBuilder) {
        self.events.emit(event.build_at(self.clock.now()));
    }
}

/// Audit event recorded when a session moves from `from` to `to`.
fn audit_event_type(from: &State, to: &State) -> Option<EventType> {
    let event_type = match to {
        State::IdpSelecting(_) => EventType::IdpSelected,
        State::EidasCountrySelected(_) => EventType::CountrySelected,
        State::Cycle0And1MatchRequestSent(_) | State::NonMatchingJourneySuccess(_) => {
            EventType::IdpAuthnSucceeded
        }
        State::AuthnFailedError(_) => EventType::IdpAuthnFailed,
        State::SessionStarted(_) if matches!(from, State::IdpSelecting(_) | State::IdpSelected(_)) => {
            EventType::IdpAuthnFailed
        }
        State::RequesterError(_) => EventType::IdpRequesterError,
        State::FraudEventDetected(_) => EventType::FraudDetected,
        State::Cycle3MatchRequestSent(_) => EventType::Cycle3DataSubmitted,
        State::Cycle3DataInputCancelled(_) => EventType::Cycle3Cancelled,
        State::UserAccountCreationRequestSent(_) => EventType::UserAccountCreationRequested,
        State::SuccessfulMatch(_)
        | State::NoMatch(_)
        | State::UserAccountCreated(_)
        | State::UserAccountCreationFailed(_)
        | State::AwaitingCycle3Data(_) => EventType::MatchResponseReceived,
        State::MatchingServiceRequestError(_) => EventType::MatchingServiceRequestError,
        State::Timeout(_) => EventType::SessionTimeout,
        State::ResponsePrepared(_) | State::ErrorResponsePrepared(_) => EventType::ResponsePrepared,
        State::SessionStarted(_) | State::IdpSelected(_) | State::RestartJourney(_) => return None,
    };
    Some(event_type)
}
