//! Federation fixtures for tests.
//!
//! Builds a small federation with real keys: one relying party, two
//! identity providers, a matching service and an eIDAS country node, all
//! published in in-memory metadata, plus helpers that produce correctly
//! signed and encrypted messages from each party. Tests then tamper with
//! the output to exercise individual checks.

#![allow(missing_docs, clippy::missing_panics_doc)]

use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use hub_cache::{MemoryStore, ReplayCache, SharedStoreRef, StoreReplayCache};
use hub_core::{FixedClock, HubConfig, LevelOfAssurance};
use hub_crypto::{EncryptionKey, SigningKey};

use crate::encryption::encrypt_assertion;
use crate::metadata::InMemoryMetadata;
use crate::signature::{MessageSigner, SignedMessage};
use crate::types::{
    attribute_names, authn_context_for, name_id_formats, status_codes, Assertion, AuthnRequest,
    EncryptedAssertion,
    NameId, NameIdPolicy, Response, Status, StatusCode, Subject, SubjectConfirmationData,
    HTTP_POST_BINDING,
};
use crate::validation::ValidationPipeline;

pub const RP_ENTITY_ID: &str = "https://rp.example.gov.uk/SAML2/metadata";
pub const RP_ACS_URL: &str = "https://rp.example.gov.uk/SAML2/ACS";
pub const IDP_ENTITY_ID: &str = "https://idp.example.com/SAML2/metadata";
pub const OTHER_IDP_ENTITY_ID: &str = "https://other-idp.example.com/SAML2/metadata";
pub const MSA_ENTITY_ID: &str = "https://msa.rp.example.gov.uk/SAML2/metadata";
pub const COUNTRY_ENTITY_ID: &str = "https://eidas.country.example/ConnectorMetadata";
pub const PERSISTENT_ID: &str = "pid-7c1f0e";

/// A federation participant that signs what it sends.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Party {
    RelyingParty,
    Idp,
    OtherIdp,
    MatchingService,
    Country,
}

impl Party {
    pub const fn entity_id(self) -> &'static str {
        match self {
            Self::RelyingParty => RP_ENTITY_ID,
            Self::Idp => IDP_ENTITY_ID,
            Self::OtherIdp => OTHER_IDP_ENTITY_ID,
            Self::MatchingService => MSA_ENTITY_ID,
            Self::Country => COUNTRY_ENTITY_ID,
        }
    }
}

pub struct TestFederation {
    pub config: HubConfig,
    pub clock: Arc<FixedClock>,
    pub metadata: Arc<InMemoryMetadata>,
    pub store: Arc<MemoryStore>,
    pub hub_encryption_key: EncryptionKey,
    signers: Vec<(Party, MessageSigner)>,
}

impl Default for TestFederation {
    fn default() -> Self {
        Self::new()
    }
}

impl TestFederation {
    pub fn new() -> Self {
        let config = HubConfig::default();
        let clock = FixedClock::at_now();
        let metadata = Arc::new(InMemoryMetadata::new());
        let hub_encryption_key = EncryptionKey::generate().expect("hub encryption key");
        metadata.set_encryption_key(config.hub_entity_id.clone(), hub_encryption_key.clone());

        let signers = [
            Party::RelyingParty,
            Party::Idp,
            Party::OtherIdp,
            Party::MatchingService,
            Party::Country,
        ]
        .into_iter()
        .map(|party| {
            let signer = MessageSigner::new(SigningKey::generate().expect("signing key"));
            metadata.add_signing_key(party.entity_id(), signer.verification_key());
            (party, signer)
        })
        .collect();

        Self {
            config,
            store: Arc::new(MemoryStore::with_clock(clock.clone())),
            clock,
            metadata,
            hub_encryption_key,
            signers,
        }
    }

    pub fn now(&self) -> DateTime<Utc> {
        use hub_core::Clock;
        self.clock.now()
    }

    pub fn shared_store(&self) -> SharedStoreRef {
        self.store.clone()
    }

    pub fn request_replay_cache(&self) -> Arc<dyn ReplayCache> {
        Arc::new(StoreReplayCache::new(
            self.shared_store(),
            "request",
            Duration::from_secs(self.config.request_replay_window_secs),
        ))
    }

    pub fn assertion_replay_cache(&self) -> Arc<dyn ReplayCache> {
        Arc::new(StoreReplayCache::new(
            self.shared_store(),
            "assertion",
            Duration::from_secs(self.config.assertion_replay_window_secs),
        ))
    }

    pub fn pipeline(&self) -> ValidationPipeline {
        ValidationPipeline::new(
            self.config.clone(),
            self.metadata.clone(),
            vec![self.hub_encryption_key.clone()],
            self.request_replay_cache(),
            self.assertion_replay_cache(),
        )
        .with_clock(self.clock.clone())
    }

    pub fn signer(&self, party: Party) -> &MessageSigner {
        self.signers
            .iter()
            .find(|(p, _)| *p == party)
            .map(|(_, signer)| signer)
            .expect("every party has a signer")
    }

    pub fn sign<M: SignedMessage>(&self, party: Party, message: &mut M) {
        self.signer(party).sign(message).expect("signing");
    }

    /// A well-formed, unsigned AuthnRequest from the relying party.
    pub fn authn_request(&self, id: &str) -> AuthnRequest {
        let mut request = AuthnRequest::new(id, RP_ENTITY_ID, self.now())
            .with_destination(self.config.sso_endpoint.clone())
            .with_acs_url(RP_ACS_URL);
        request.protocol_binding = Some(HTTP_POST_BINDING.to_string());
        request.name_id_policy = Some(NameIdPolicy {
            format: Some(name_id_formats::PERSISTENT.to_string()),
            allow_create: true,
        });
        request
    }

    pub fn signed_authn_request(&self, id: &str) -> AuthnRequest {
        let mut request = self.authn_request(id);
        self.sign(Party::RelyingParty, &mut request);
        request
    }

    fn subject(&self, recipient: &str, in_response_to: &str) -> Subject {
        Subject::bearer(
            NameId::persistent(PERSISTENT_ID),
            SubjectConfirmationData {
                recipient: Some(recipient.to_string()),
                in_response_to: Some(in_response_to.to_string()),
                not_on_or_after: Some(self.now() + chrono::Duration::minutes(5)),
                not_before: None,
                address: None,
            },
        )
    }

    /// Unsigned matching dataset and authn assertions from `party`.
    pub fn idp_assertions(
        &self,
        party: Party,
        in_response_to: &str,
        level: LevelOfAssurance,
    ) -> Vec<Assertion> {
        let now = self.now();
        let subject = self.subject(&self.config.assertion_consumer_endpoint, in_response_to);
        let mds = Assertion::new(format!("_mds-{}", uuid::Uuid::now_v7()), party.entity_id(), now)
            .with_subject(subject.clone())
            .with_attribute(attribute_names::MDS_FIRST_NAME, "Jane")
            .with_attribute(attribute_names::MDS_SURNAME, "Doe")
            .with_attribute(attribute_names::MDS_DATE_OF_BIRTH, "1980-01-01");
        let mut authn = Assertion::new(format!("_authn-{}", uuid::Uuid::now_v7()), party.entity_id(), now)
            .with_subject(subject)
            .with_authn_context(authn_context_for(level), now);
        if level.is_fraud_sentinel() {
            authn = authn
                .with_attribute(attribute_names::IDP_FRAUD_EVENT_ID, "fraud-event-42")
                .with_attribute(attribute_names::GPG45_STATUS, "IT01");
        }
        vec![mds, authn]
    }

    /// Signs `assertion` as its issuer and encrypts it for the hub.
    pub fn seal(&self, mut assertion: Assertion) -> EncryptedAssertion {
        let signer = self
            .signers
            .iter()
            .find(|(p, _)| p.entity_id() == assertion.issuer.value)
            .map(|(p, _)| *p)
            .expect("assertion issuer is a known party");
        self.sign(signer, &mut assertion);
        encrypt_assertion(&assertion, &self.hub_encryption_key).expect("encryption")
    }

    /// A signed response from `party` carrying already sealed assertions.
    pub fn response_with_encrypted(
        &self,
        party: Party,
        in_response_to: &str,
        status: Status,
        encrypted: Vec<EncryptedAssertion>,
    ) -> Response {
        let mut response = Response::new(
            format!("_resp-{}", uuid::Uuid::now_v7()),
            party.entity_id(),
            self.now(),
            status,
        )
        .in_response_to(in_response_to);
        if matches!(party, Party::Idp | Party::OtherIdp | Party::Country) {
            response = response.with_destination(self.config.assertion_consumer_endpoint.clone());
        }
        response.encrypted_assertions = encrypted;
        self.sign(party, &mut response);
        response
    }

    /// A signed response from `party` carrying `assertions`, each signed by
    /// its own issuer and encrypted for the hub.
    pub fn response(
        &self,
        party: Party,
        in_response_to: &str,
        status: Status,
        assertions: Vec<Assertion>,
    ) -> Response {
        let encrypted = assertions.into_iter().map(|a| self.seal(a)).collect();
        self.response_with_encrypted(party, in_response_to, status, encrypted)
    }

    pub fn idp_success(&self, in_response_to: &str, level: LevelOfAssurance) -> Response {
        self.response(
            Party::Idp,
            in_response_to,
            Status::success(),
            self.idp_assertions(Party::Idp, in_response_to, level),
        )
    }

    pub fn idp_failure(&self, in_response_to: &str, status: Status) -> Response {
        self.response(Party::Idp, in_response_to, status, Vec::new())
    }

    /// Unsigned matching service assertion.
    pub fn msa_assertion(&self, in_response_to: &str) -> Assertion {
        Assertion::new(format!("_msa-{}", uuid::Uuid::now_v7()), MSA_ENTITY_ID, self.now())
            .with_subject(self.subject(&self.config.hub_entity_id, in_response_to))
            .with_authn_context(authn_context_for(LevelOfAssurance::Level2), self.now())
    }

    /// A matching service response; success statuses carry one assertion.
    pub fn msa_response(&self, in_response_to: &str, top: &str, sub: Option<&str>) -> Response {
        let code = match sub {
            Some(sub) => StatusCode::new(top).with_sub_value(sub),
            None => StatusCode::new(top),
        };
        let assertions = if top == status_codes::SUCCESS {
            vec![self.msa_assertion(in_response_to)]
        } else {
            Vec::new()
        };
        self.response(Party::MatchingService, in_response_to, Status::from_code(code), assertions)
    }

    pub fn health_check_response(&self, in_response_to: &str) -> Response {
        self.response(
            Party::MatchingService,
            in_response_to,
            Status::from_code(StatusCode::success().with_sub_value(status_codes::HEALTHY)),
            Vec::new(),
        )
    }

    /// Unsigned combined eIDAS assertion.
    pub fn country_assertion(&self, in_response_to: &str, level: LevelOfAssurance) -> Assertion {
        let now = self.now();
        Assertion::new(format!("_eidas-{}", uuid::Uuid::now_v7()), COUNTRY_ENTITY_ID, now)
            .with_subject(self.subject(&self.config.assertion_consumer_endpoint, in_response_to))
            .with_authn_context(authn_context_for(level), now)
            .with_attribute(attribute_names::EIDAS_FIRST_NAME, "Javier")
            .with_attribute(attribute_names::EIDAS_FAMILY_NAME, "Garcia")
            .with_attribute(attribute_names::EIDAS_DATE_OF_BIRTH, "1965-01-01")
            .with_attribute(attribute_names::EIDAS_PERSON_IDENTIFIER, "ES/UK/12345678")
    }

    pub fn country_success(&self, in_response_to: &str, level: LevelOfAssurance) -> Response {
        self.response(
            Party::Country,
            in_response_to,
            Status::success(),
            vec![self.country_assertion(in_response_to, level)],
        )
    }
}
