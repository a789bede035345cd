//! Common test utilities and fixtures.

use std::sync::Arc;

use hub_cache::SharedStoreRef;
use hub_core::{LevelOfAssurance, MemoryEventSink};
use hub_policy::{
    CountryConfig, IdpConfig, InMemoryConfigService, PolicyEvent, PolicyStateMachine, SessionParams,
    TransactionConfig, Transition,
};
use hub_saml::testing::{
    TestFederation, COUNTRY_ENTITY_ID, IDP_ENTITY_ID, MSA_ENTITY_ID, OTHER_IDP_ENTITY_ID, RP_ACS_URL,
    RP_ENTITY_ID,
};
use hub_saml::{InboundIdpResponse, InboundMatchingServiceResponse, ValidationPipeline};
use hub_session::SessionId;

/// A hub wired to in-memory stores and a test federation.
pub struct Hub {
    pub fed: TestFederation,
    pub config: Arc<InMemoryConfigService>,
    pub events: Arc<MemoryEventSink>,
    pub pipeline: Arc<ValidationPipeline>,
    pub machine: Arc<PolicyStateMachine>,
}

impl Hub {
    /// Creates a hub over the federation's in-memory store.
    pub fn new() -> Self {
        let fed = TestFederation::new();
        let store = fed.shared_store();
        Self::with_store(fed, store)
    }

    /// Creates a hub over `store`.
    pub fn with_store(fed: TestFederation, store: SharedStoreRef) -> Self {
        let _ = tracing_subscriber::fmt()
            .with_env_filter("hub_policy=debug,hub_saml=debug")
            .with_test_writer()
            .try_init();

        let config = Arc::new(federation_config());
        let events = Arc::new(MemoryEventSink::new());
        let machine = PolicyStateMachine::new(store, config.clone(), &fed.config)
            .with_clock(fed.clock.clone())
            .with_event_sink(events.clone());
        Self {
            pipeline: Arc::new(fed.pipeline()),
            machine: Arc::new(machine),
            fed,
            config,
            events,
        }
    }

    /// Starts a session for a signed RP request.
    pub async fn start(&self, request_id: &str) -> SessionId {
        self.machine
            .start(
                &self.pipeline,
                self.fed.signed_authn_request(request_id),
                SessionParams::new(RP_ACS_URL).with_relay_state("relay-state"),
            )
            .await
            .expect("session starts")
    }

    pub async fn send(&self, id: &SessionId, event: PolicyEvent) -> Transition {
        self.machine.transition(id, event).await.expect("transition")
    }

    /// Starts a session and sends the user to the IdP.
    pub async fn at_idp(&self, request_id: &str) -> SessionId {
        let id = self.start(request_id).await;
        self.send(
            &id,
            PolicyEvent::SelectIdp {
                idp_entity_id: IDP_ENTITY_ID.to_string(),
                is_registration: false,
                requested_loa: LevelOfAssurance::Level2,
            },
        )
        .await;
        self.send(&id, PolicyEvent::IssueIdpAuthnRequest).await;
        id
    }

    pub async fn idp_success(&self, request_id: &str, level: LevelOfAssurance) -> InboundIdpResponse {
        self.pipeline
            .validate_idp_response(self.fed.idp_success(request_id, level))
            .await
            .expect("valid idp response")
    }

    pub async fn msa(&self, request_id: &str, top: &str, sub: Option<&str>) -> InboundMatchingServiceResponse {
        self.pipeline
            .validate_matching_service_response(self.fed.msa_response(request_id, top, sub))
            .await
            .expect("valid matching service response")
    }

    /// Drives a session to an outstanding cycle 0/1 match request.
    pub async fn awaiting_match(&self, request_id: &str) -> SessionId {
        let id = self.at_idp(request_id).await;
        let response = self.idp_success(request_id, LevelOfAssurance::Level2).await;
        let transition = self.send(&id, PolicyEvent::IdpAuthnResponse(response)).await;
        assert_eq!(transition.state.name(), "Cycle0And1MatchRequestSent");
        id
    }

    pub async fn state_name(&self, id: &SessionId) -> &'static str {
        self.machine.get_state(id).await.expect("stored state").name()
    }
}

/// One RP requiring LEVEL_2 with a matching service, two IdPs and a country.
pub fn federation_config() -> InMemoryConfigService {
    let config = InMemoryConfigService::new();
    config.put_transaction(TransactionConfig::new(
        RP_ENTITY_ID,
        vec![LevelOfAssurance::Level2],
        MSA_ENTITY_ID,
    ));
    let levels = vec![LevelOfAssurance::Level1, LevelOfAssurance::Level2];
    config.put_identity_provider(IdpConfig::new(IDP_ENTITY_ID, levels.clone()));
    config.put_identity_provider(IdpConfig::new(OTHER_IDP_ENTITY_ID, levels));
    config.put_country(CountryConfig {
        entity_id: COUNTRY_ENTITY_ID.to_string(),
        country_code: "ES".to_string(),
        enabled: true,
    });
    config
}
