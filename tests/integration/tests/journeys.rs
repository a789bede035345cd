//! User journeys through validation and the session state machine.

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use hub_core::{EventType, LevelOfAssurance};
use hub_crypto::EncryptionKey;
use hub_policy::{OutboundEffect, PolicyError, PolicyEvent, RpResponseStatus, SessionParams, State};
use hub_saml::encryption::{AesGcmAssertionDecrypter, AssertionDecrypter};
use hub_saml::testing::{Party, PERSISTENT_ID, RP_ACS_URL, RP_ENTITY_ID};
use hub_saml::{status_codes, Assertion, EncryptedAssertion, FailureReason, SamlResult, Status};

use crate::common::Hub;

#[tokio::test]
async fn fresh_request_opens_a_session() {
    let hub = Hub::new();

    let id = hub.start("_journey-a").await;

    let State::SessionStarted(started) = hub.machine.get_state(&id).await.unwrap() else {
        panic!("expected SessionStarted");
    };
    assert_eq!(started.context.request_id, "_journey-a");
    assert_eq!(started.context.request_issuer_entity_id, RP_ENTITY_ID);
    assert_eq!(started.context.assertion_consumer_service_uri, RP_ACS_URL);
    assert_eq!(hub.events.events_of(EventType::SessionStarted).len(), 1);
}

#[tokio::test]
async fn replayed_request_opens_no_second_session() {
    let hub = Hub::new();
    hub.start("_journey-b").await;

    let err = hub
        .machine
        .start(&hub.pipeline, hub.fed.signed_authn_request("_journey-b"), SessionParams::new(RP_ACS_URL))
        .await
        .unwrap_err();

    assert!(matches!(err, PolicyError::DuplicateRequest(ref id) if id == "_journey-b"));
    assert_eq!(hub.events.events_of(EventType::SessionStarted).len(), 1);
    assert_eq!(hub.events.events_of(EventType::DuplicateRequest).len(), 1);
}

#[tokio::test]
async fn idp_level_decides_between_matching_and_requester_error() {
    let hub = Hub::new();

    let id = hub.at_idp("_journey-c1").await;
    let response = hub.idp_success("_journey-c1", LevelOfAssurance::Level2).await;
    let transition = hub.send(&id, PolicyEvent::IdpAuthnResponse(response)).await;
    assert_eq!(transition.state.name(), "Cycle0And1MatchRequestSent");
    assert!(matches!(transition.effect, Some(OutboundEffect::MatchRequest { .. })));

    let id = hub.at_idp("_journey-c2").await;
    let response = hub.idp_success("_journey-c2", LevelOfAssurance::Level1).await;
    let transition = hub.send(&id, PolicyEvent::IdpAuthnResponse(response)).await;
    assert_eq!(transition.state.name(), "RequesterError");
}

#[tokio::test]
async fn no_match_ends_or_asks_for_cycle3() {
    let hub = Hub::new();

    let id = hub.awaiting_match("_journey-d1").await;
    let response = hub
        .msa("_journey-d1", status_codes::RESPONDER, Some(status_codes::NO_MATCH))
        .await;
    let transition = hub.send(&id, PolicyEvent::MatchResponse(response)).await;
    assert_eq!(transition.state.name(), "NoMatch");

    hub.config.update_transaction(RP_ENTITY_ID, |t| {
        t.cycle3_attribute = Some("drivingLicenceNumber".to_string());
    });
    let id = hub.awaiting_match("_journey-d2").await;
    let response = hub
        .msa("_journey-d2", status_codes::RESPONDER, Some(status_codes::NO_MATCH))
        .await;
    let transition = hub.send(&id, PolicyEvent::MatchResponse(response)).await;
    assert_eq!(transition.state.name(), "AwaitingCycle3Data");
}

#[tokio::test]
async fn matching_success_without_sub_status_never_reaches_the_session() {
    let hub = Hub::new();
    let id = hub.awaiting_match("_journey-d3").await;

    let failure = hub
        .pipeline
        .validate_matching_service_response(hub.fed.msa_response("_journey-d3", status_codes::SUCCESS, None))
        .await
        .unwrap_err();

    assert_eq!(failure.reason, FailureReason::MissingSubStatus);
    assert_eq!(hub.state_name(&id).await, "Cycle0And1MatchRequestSent");
}

struct CountingDecrypter {
    calls: AtomicUsize,
}

impl AssertionDecrypter for CountingDecrypter {
    fn decrypt(&self, encrypted: &EncryptedAssertion, key: &EncryptionKey) -> SamlResult<Assertion> {
        self.calls.fetch_add(1, Ordering::SeqCst);
        AesGcmAssertionDecrypter.decrypt(encrypted, key)
    }
}

#[tokio::test]
async fn failed_idp_response_with_assertions_is_rejected_before_decryption() {
    let hub = Hub::new();
    let decrypter = Arc::new(CountingDecrypter {
        calls: AtomicUsize::new(0),
    });
    let pipeline = hub.fed.pipeline().with_decrypter(decrypter.clone());
    let assertions = hub
        .fed
        .idp_assertions(Party::Idp, "_journey-e", LevelOfAssurance::Level2);
    let response = hub
        .fed
        .response(Party::Idp, "_journey-e", Status::responder_error("idp down"), assertions);

    let failure = pipeline.validate_idp_response(response).await.unwrap_err();

    assert!(matches!(
        failure.reason,
        FailureReason::NonSuccessHasAssertions | FailureReason::UnexpectedNumberOfAssertions
    ));
    assert_eq!(decrypter.calls.load(Ordering::SeqCst), 0);
}

#[tokio::test]
async fn matched_user_gets_a_response_for_the_relying_party() {
    let hub = Hub::new();
    let id = hub.awaiting_match("_journey-full").await;

    let response = hub
        .msa("_journey-full", status_codes::SUCCESS, Some(status_codes::MATCH))
        .await;
    let transition = hub.send(&id, PolicyEvent::MatchResponse(response)).await;
    assert_eq!(transition.state.name(), "SuccessfulMatch");

    let prepared = hub.send(&id, PolicyEvent::PrepareResponse).await;
    assert_eq!(prepared.state.name(), "ResponsePrepared");
    let Some(OutboundEffect::ResponseToRp {
        in_response_to,
        relay_state,
        status,
        persistent_id,
        ..
    }) = prepared.effect
    else {
        panic!("expected a response for the relying party");
    };
    assert_eq!(in_response_to, "_journey-full");
    assert_eq!(relay_state.as_deref(), Some("relay-state"));
    assert_eq!(status, RpResponseStatus::Success);
    assert_eq!(persistent_id.as_deref(), Some(PERSISTENT_ID));

    assert_eq!(hub.events.events_of(EventType::IdpAuthnSucceeded).len(), 1);
    assert_eq!(hub.events.events_of(EventType::MatchRequestSent).len(), 1);
}

#[tokio::test]
async fn replayed_idp_response_is_rejected() {
    let hub = Hub::new();
    hub.at_idp("_journey-replay").await;
    let response = hub.fed.idp_success("_journey-replay", LevelOfAssurance::Level2);

    hub.pipeline.validate_idp_response(response.clone()).await.unwrap();
    let failure = hub.pipeline.validate_idp_response(response).await.unwrap_err();

    assert_eq!(failure.reason, FailureReason::DuplicateAssertionId);
}

#[tokio::test]
async fn session_expires_after_its_lifetime() {
    let hub = Hub::new();
    let id = hub.at_idp("_journey-timeout").await;

    hub.fed.clock.advance(chrono::Duration::minutes(91));

    let transition = hub.send(&id, PolicyEvent::Restart).await;
    assert!(transition.timed_out);
    assert_eq!(transition.state.name(), "Timeout");
    assert_eq!(hub.state_name(&id).await, "Timeout");
    assert_eq!(hub.events.events_of(EventType::SessionTimeout).len(), 1);

    let prepared = hub.send(&id, PolicyEvent::PrepareResponse).await;
    assert_eq!(prepared.state.name(), "ResponsePrepared");
    assert!(matches!(
        prepared.effect,
        Some(OutboundEffect::ResponseToRp { status: RpResponseStatus::NoAuthnContext, .. })
    ));
}
