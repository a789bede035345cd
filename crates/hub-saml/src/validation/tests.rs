use std::sync::Arc;

use chrono::Duration;
use hub_core::LevelOfAssurance;
use hub_crypto::{EncryptionKey, SigningKey};

use super::*;
use crate::encryption::encrypt_assertion;
use crate::signature::MessageSigner;
use crate::testing::{Party, TestFederation, IDP_ENTITY_ID, PERSISTENT_ID, RP_ACS_URL, RP_ENTITY_ID};
use crate::types::{
    attribute_names, name_id_formats, status_codes, Assertion, AuthnRequest, Issuer, NameId,
    NameIdPolicy, Scoping, Status, StatusCode, SubjectConfirmationData,
};

type RequestCase = (Box<dyn Fn(&mut AuthnRequest)>, FailureReason);
type AssertionCase = (Box<dyn Fn(&mut Assertion)>, FailureReason);

fn request_case(mutate: impl Fn(&mut AuthnRequest) + 'static) -> Box<dyn Fn(&mut AuthnRequest)> {
    Box::new(mutate)
}

fn assertion_case(mutate: impl Fn(&mut Assertion) + 'static) -> Box<dyn Fn(&mut Assertion)> {
    Box::new(mutate)
}

fn reason<T: std::fmt::Debug>(result: ValidationResult<T>) -> FailureReason {
    result.unwrap_err().reason
}

// ---------------------------------------------------------------------------
// AuthnRequest from the relying party
// ---------------------------------------------------------------------------

#[tokio::test]
async fn valid_request_is_accepted_verbatim() {
    let fed = TestFederation::new();
    let validated = fed
        .pipeline()
        .validate_authn_request_from_rp(fed.signed_authn_request("_req-1"))
        .await
        .unwrap();

    assert_eq!(validated.request_id(), "_req-1");
    assert_eq!(validated.issuer(), RP_ENTITY_ID);
    assert_eq!(validated.assertion_consumer_service_url(), Some(RP_ACS_URL));
    assert!(validated.warnings().is_empty());
}

#[tokio::test]
async fn duplicate_request_id_is_rejected() {
    let fed = TestFederation::new();
    let pipeline = fed.pipeline();
    let request = fed.signed_authn_request("_dup");

    pipeline.validate_authn_request_from_rp(request.clone()).await.unwrap();
    let second = pipeline.validate_authn_request_from_rp(request.clone()).await;
    assert_eq!(reason(second), FailureReason::DuplicateRequestId);

    fed.clock.advance(Duration::seconds(fed.config.request_replay_window_secs as i64 + 1));
    let mut fresh = request;
    fresh.issue_instant = fed.now();
    fed.sign(Party::RelyingParty, &mut fresh);
    pipeline.validate_authn_request_from_rp(fresh).await.unwrap();
}

#[tokio::test]
async fn forged_request_does_not_burn_the_request_id() {
    let fed = TestFederation::new();
    let pipeline = fed.pipeline();

    let mut forged = fed.authn_request("_target");
    fed.sign(Party::Idp, &mut forged);
    assert_eq!(
        reason(pipeline.validate_authn_request_from_rp(forged).await),
        FailureReason::InvalidSignature
    );

    pipeline
        .validate_authn_request_from_rp(fed.signed_authn_request("_target"))
        .await
        .unwrap();
}

#[tokio::test]
async fn signature_must_be_present_and_single() {
    let fed = TestFederation::new();
    let pipeline = fed.pipeline();

    let unsigned = fed.authn_request("_unsigned");
    assert_eq!(
        reason(pipeline.validate_authn_request_from_rp(unsigned).await),
        FailureReason::MissingSignature
    );

    let mut twice = fed.signed_authn_request("_twice");
    let copy = twice.signatures[0].clone();
    twice.signatures.push(copy);
    assert_eq!(
        reason(pipeline.validate_authn_request_from_rp(twice).await),
        FailureReason::MultipleSignatures
    );

    let mut tampered = fed.signed_authn_request("_tampered");
    tampered.assertion_consumer_service_url = Some("https://attacker.example/ACS".to_string());
    assert_eq!(
        reason(pipeline.validate_authn_request_from_rp(tampered).await),
        FailureReason::InvalidSignature
    );
}

#[tokio::test]
async fn profile_violations_are_hard_failures() {
    let fed = TestFederation::new();
    let pipeline = fed.pipeline();

    let cases: Vec<RequestCase> = vec![
        (request_case(|r: &mut AuthnRequest| r.id = "1-starts-with-digit".into()), FailureReason::InvalidRequestId),
        (request_case(|r: &mut AuthnRequest| r.id = String::new()), FailureReason::MissingId),
        (request_case(|r: &mut AuthnRequest| r.version = "1.1".into()), FailureReason::InvalidSamlVersion),
        (request_case(|r: &mut AuthnRequest| r.issuer = None), FailureReason::MissingIssuer),
        (
            request_case(|r: &mut AuthnRequest| {
                r.issuer = Some(Issuer {
                    value: RP_ENTITY_ID.into(),
                    format: Some(name_id_formats::TRANSIENT.into()),
                })
            }),
            FailureReason::InvalidIssuerFormat,
        ),
        (request_case(|r: &mut AuthnRequest| r.destination = None), FailureReason::MissingDestination),
        (
            request_case(|r: &mut AuthnRequest| r.destination = Some("https://elsewhere.example/SSO".into())),
            FailureReason::WrongDestination,
        ),
        (request_case(|r: &mut AuthnRequest| r.is_passive = Some(false)), FailureReason::IsPassiveNotAllowed),
        (request_case(|r: &mut AuthnRequest| r.scoping = Some(Scoping::default())), FailureReason::ScopingNotAllowed),
        (
            request_case(|r: &mut AuthnRequest| {
                r.protocol_binding = Some("urn:oasis:names:tc:SAML:2.0:bindings:HTTP-Redirect".into())
            }),
            FailureReason::UnsupportedProtocolBinding,
        ),
    ];

    for (index, (mutate, expected)) in cases.into_iter().enumerate() {
        let mut request = fed.authn_request(&format!("_case-{index}"));
        mutate(&mut request);
        fed.sign(Party::RelyingParty, &mut request);
        assert_eq!(
            reason(pipeline.validate_authn_request_from_rp(request).await),
            expected,
            "case {index}"
        );
    }
}

#[tokio::test]
async fn issue_instant_window() {
    let fed = TestFederation::new();
    let pipeline = fed.pipeline();

    let mut old = fed.authn_request("_old");
    old.issue_instant = fed.now() - Duration::seconds(fed.config.authn_request_validity_secs as i64 + 1);
    fed.sign(Party::RelyingParty, &mut old);
    assert_eq!(
        reason(pipeline.validate_authn_request_from_rp(old).await),
        FailureReason::RequestTooOld
    );

    let mut future = fed.authn_request("_future");
    future.issue_instant = fed.now() + Duration::seconds(fed.config.clock_skew_secs as i64 + 1);
    fed.sign(Party::RelyingParty, &mut future);
    assert_eq!(
        reason(pipeline.validate_authn_request_from_rp(future).await),
        FailureReason::IssueInstantInFuture
    );

    let mut skewed = fed.authn_request("_skewed");
    skewed.issue_instant = fed.now() + Duration::seconds(5);
    fed.sign(Party::RelyingParty, &mut skewed);
    pipeline.validate_authn_request_from_rp(skewed).await.unwrap();
}

#[tokio::test]
async fn non_persistent_name_id_policy_only_warns() {
    let fed = TestFederation::new();
    let mut request = fed.authn_request("_transient");
    request.name_id_policy = Some(NameIdPolicy {
        format: Some(name_id_formats::TRANSIENT.to_string()),
        allow_create: false,
    });
    fed.sign(Party::RelyingParty, &mut request);

    let validated = fed.pipeline().validate_authn_request_from_rp(request).await.unwrap();
    assert_eq!(validated.warnings().len(), 1);
    assert_eq!(validated.warnings()[0].reason, FailureReason::NameIdPolicyNotPersistent);
    assert_eq!(validated.warnings()[0].severity, Severity::Warn);
}

// ---------------------------------------------------------------------------
// Identity provider responses
// ---------------------------------------------------------------------------

#[tokio::test]
async fn idp_success_end_to_end() {
    let fed = TestFederation::new();
    let inbound = fed
        .pipeline()
        .validate_idp_response(fed.idp_success("_req-1", LevelOfAssurance::Level2))
        .await
        .unwrap();

    assert_eq!(inbound.status, IdpStatus::Success);
    assert_eq!(inbound.issuer, IDP_ENTITY_ID);
    assert_eq!(inbound.in_response_to, "_req-1");
    assert_eq!(inbound.level_of_assurance, Some(LevelOfAssurance::Level2));
    assert_eq!(inbound.persistent_id.as_deref(), Some(PERSISTENT_ID));
    assert_eq!(inbound.fraud_event_id, None);
    assert_eq!(
        inbound.matching_dataset.get(attribute_names::MDS_SURNAME),
        Some(&vec!["Doe".to_string()])
    );
}

#[tokio::test]
async fn non_success_with_assertions_is_rejected_before_decryption() {
    let fed = TestFederation::new();
    let assertions = fed.idp_assertions(Party::Idp, "_req-1", LevelOfAssurance::Level2);
    let response = fed.response(Party::Idp, "_req-1", Status::responder_error("down"), assertions);

    // No decryption key at all: reaching decryption would fail differently.
    let pipeline = crate::validation::ValidationPipeline::new(
        fed.config.clone(),
        fed.metadata.clone(),
        Vec::new(),
        fed.request_replay_cache(),
        fed.assertion_replay_cache(),
    )
    .with_clock(fed.clock.clone());

    assert_eq!(
        reason(pipeline.validate_idp_response(response).await),
        FailureReason::NonSuccessHasAssertions
    );
}

#[tokio::test]
async fn success_assertion_counts() {
    let fed = TestFederation::new();
    let pipeline = fed.pipeline();

    let mut one = fed.idp_assertions(Party::Idp, "_r", LevelOfAssurance::Level2);
    one.truncate(1);
    let response = fed.response(Party::Idp, "_r", Status::success(), one);
    assert_eq!(
        reason(pipeline.validate_idp_response(response).await),
        FailureReason::UnexpectedNumberOfAssertions
    );

    let none = fed.response(Party::Idp, "_r", Status::success(), Vec::new());
    assert_eq!(
        reason(pipeline.validate_idp_response(none).await),
        FailureReason::MissingSuccessAssertions
    );

    let mut plaintext = fed.idp_success("_r", LevelOfAssurance::Level2);
    plaintext
        .assertions
        .push(fed.idp_assertions(Party::Idp, "_r", LevelOfAssurance::Level2).remove(0));
    fed.sign(Party::Idp, &mut plaintext);
    assert_eq!(
        reason(pipeline.validate_idp_response(plaintext).await),
        FailureReason::UnencryptedAssertion
    );
}

#[tokio::test]
async fn replayed_authn_assertion_leaves_the_mds_id_unrecorded() {
    let fed = TestFederation::new();
    let pipeline = fed.pipeline();
    let replay = fed.assertion_replay_cache();
    let assertions = fed.idp_assertions(Party::Idp, "_r", LevelOfAssurance::Level2);
    let mds_key = format!("{}:{}", assertions[0].issuer.value, assertions[0].id);
    let authn_key = format!("{}:{}", assertions[1].issuer.value, assertions[1].id);
    assert!(replay.accept(&authn_key).await.unwrap());

    let response = fed.response(Party::Idp, "_r", Status::success(), assertions);
    assert_eq!(
        reason(pipeline.validate_idp_response(response).await),
        FailureReason::DuplicateAssertionId
    );

    assert!(replay.accept(&mds_key).await.unwrap());
    assert!(!replay.accept(&authn_key).await.unwrap());
}

#[tokio::test]
async fn idp_failure_statuses_are_mapped() {
    let fed = TestFederation::new();
    let pipeline = fed.pipeline();

    let cancelled = Status::from_code(StatusCode::requester().with_sub_value(status_codes::NO_AUTHN_CONTEXT))
        .with_detail(crate::types::status_details::AUTHN_CANCEL);
    let inbound = pipeline
        .validate_idp_response(fed.idp_failure("_r", cancelled))
        .await
        .unwrap();
    assert_eq!(inbound.status, IdpStatus::AuthenticationCancelled);
    assert_eq!(inbound.level_of_assurance, None);

    let failed = Status::from_code(StatusCode::requester().with_sub_value(status_codes::AUTHN_FAILED));
    let inbound = pipeline.validate_idp_response(fed.idp_failure("_r", failed)).await.unwrap();
    assert_eq!(inbound.status, IdpStatus::AuthenticationFailed);

    let unmapped = Status::from_code(StatusCode::requester().with_sub_value(status_codes::MATCH));
    assert_eq!(
        reason(pipeline.validate_idp_response(fed.idp_failure("_r", unmapped)).await),
        FailureReason::UnmappedStatus
    );
}

#[tokio::test]
async fn envelope_addressing_and_issuer() {
    let fed = TestFederation::new();
    let pipeline = fed.pipeline();

    let mut wrong_destination = fed.idp_failure("_r", Status::responder_error("x"));
    wrong_destination.destination = Some("https://elsewhere.example".to_string());
    fed.sign(Party::Idp, &mut wrong_destination);
    assert_eq!(
        reason(pipeline.validate_idp_response(wrong_destination).await),
        FailureReason::WrongDestination
    );

    let mut no_in_response_to = fed.idp_failure("_r", Status::responder_error("x"));
    no_in_response_to.in_response_to = None;
    fed.sign(Party::Idp, &mut no_in_response_to);
    assert_eq!(
        reason(pipeline.validate_idp_response(no_in_response_to).await),
        FailureReason::MissingInResponseTo
    );

    let mut impersonated = fed.idp_failure("_r", Status::responder_error("x"));
    fed.sign(Party::OtherIdp, &mut impersonated);
    assert_eq!(
        reason(pipeline.validate_idp_response(impersonated).await),
        FailureReason::InvalidSignature
    );

    let mut unknown = fed.idp_failure("_r", Status::responder_error("x"));
    unknown.issuer = Some(Issuer::entity("https://unknown.example"));
    fed.sign(Party::Idp, &mut unknown);
    assert_eq!(
        reason(pipeline.validate_idp_response(unknown).await),
        FailureReason::UnknownIssuer
    );
}

#[tokio::test]
async fn signing_key_rollover_accepts_old_and_new_keys() {
    let fed = TestFederation::new();
    let pipeline = fed.pipeline();
    let new_signer = MessageSigner::new(SigningKey::generate().unwrap());
    fed.metadata.add_signing_key(IDP_ENTITY_ID, new_signer.verification_key());

    let old_signed = fed.idp_failure("_r", Status::responder_error("x"));
    pipeline.validate_idp_response(old_signed).await.unwrap();

    let mut new_signed = fed.idp_failure("_r", Status::responder_error("x"));
    new_signer.sign(&mut new_signed).unwrap();
    pipeline.validate_idp_response(new_signed).await.unwrap();
}

#[tokio::test]
async fn decryption_tries_every_hub_key() {
    let fed = TestFederation::new();
    let stale = EncryptionKey::generate().unwrap();

    let rolled = crate::validation::ValidationPipeline::new(
        fed.config.clone(),
        fed.metadata.clone(),
        vec![stale.clone(), fed.hub_encryption_key.clone()],
        fed.request_replay_cache(),
        fed.assertion_replay_cache(),
    )
    .with_clock(fed.clock.clone());
    rolled
        .validate_idp_response(fed.idp_success("_r", LevelOfAssurance::Level2))
        .await
        .unwrap();

    let wrong_only = crate::validation::ValidationPipeline::new(
        fed.config.clone(),
        fed.metadata.clone(),
        vec![stale],
        fed.request_replay_cache(),
        fed.assertion_replay_cache(),
    )
    .with_clock(fed.clock.clone());
    let failure = wrong_only
        .validate_idp_response(fed.idp_success("_r", LevelOfAssurance::Level2))
        .await
        .unwrap_err();
    assert_eq!(failure.reason, FailureReason::UnableToDecrypt);
    assert_eq!(failure.message, "unable to decrypt assertion");
}

#[tokio::test]
async fn assertion_signed_by_another_party_is_rejected() {
    let fed = TestFederation::new();
    let mut assertions = fed.idp_assertions(Party::Idp, "_r", LevelOfAssurance::Level2);
    let mut authn = assertions.remove(1);
    fed.sign(Party::OtherIdp, &mut authn);
    let encrypted = vec![
        fed.seal(assertions.remove(0)),
        encrypt_assertion(&authn, &fed.hub_encryption_key).unwrap(),
    ];
    let response = fed.response_with_encrypted(Party::Idp, "_r", Status::success(), encrypted);

    assert_eq!(
        reason(fed.pipeline().validate_idp_response(response).await),
        FailureReason::InvalidAssertionSignature
    );
}

#[tokio::test]
async fn assertion_consistency_checks() {
    let fed = TestFederation::new();
    let pipeline = fed.pipeline();

    let build = |mutate: &dyn Fn(&mut Assertion)| {
        let mut assertions = fed.idp_assertions(Party::Idp, "_r", LevelOfAssurance::Level2);
        for assertion in &mut assertions {
            mutate(assertion);
        }
        fed.response(Party::Idp, "_r", Status::success(), assertions)
    };
    let cases: Vec<AssertionCase> = vec![
        (
            assertion_case(|a: &mut Assertion| data(a).recipient = Some("https://elsewhere.example".into())),
            FailureReason::WrongRecipient,
        ),
        (
            assertion_case(|a: &mut Assertion| data(a).in_response_to = Some("_other".into())),
            FailureReason::MismatchedInResponseTo,
        ),
        (
            assertion_case(|a: &mut Assertion| data(a).not_before = Some(chrono::Utc::now())),
            FailureReason::NotBeforeNotAllowed,
        ),
        (assertion_case(|a: &mut Assertion| data(a).not_on_or_after = None), FailureReason::MissingNotOnOrAfter),
        (assertion_case(|a: &mut Assertion| a.subject = None), FailureReason::MissingSubjectConfirmation),
    ];

    for (mutate, expected) in cases {
        let response = build(&*mutate);
        assert_eq!(reason(pipeline.validate_idp_response(response).await), expected);
    }
}

fn data(assertion: &mut Assertion) -> &mut SubjectConfirmationData {
    assertion
        .subject
        .as_mut()
        .and_then(|s| s.subject_confirmations.first_mut())
        .and_then(|c| c.data.as_mut())
        .unwrap()
}

#[tokio::test]
async fn expired_assertions_are_rejected() {
    let fed = TestFederation::new();
    let response = fed.idp_success("_r", LevelOfAssurance::Level2);
    fed.clock.advance(Duration::minutes(6));
    assert_eq!(
        reason(fed.pipeline().validate_idp_response(response).await),
        FailureReason::AssertionExpired
    );
}

#[tokio::test]
async fn subjects_must_cross_match() {
    let fed = TestFederation::new();
    let mut assertions = fed.idp_assertions(Party::Idp, "_r", LevelOfAssurance::Level2);
    assertions[0].subject.as_mut().unwrap().name_id = Some(NameId::persistent("someone-else"));
    let response = fed.response(Party::Idp, "_r", Status::success(), assertions);
    assert_eq!(
        reason(fed.pipeline().validate_idp_response(response).await),
        FailureReason::MismatchedSubjects
    );
}

#[tokio::test]
async fn replayed_assertions_are_rejected() {
    let fed = TestFederation::new();
    let pipeline = fed.pipeline();
    let response = fed.idp_success("_r", LevelOfAssurance::Level2);

    pipeline.validate_idp_response(response.clone()).await.unwrap();
    assert_eq!(
        reason(pipeline.validate_idp_response(response).await),
        FailureReason::DuplicateAssertionId
    );
}

#[tokio::test]
async fn level_x_requires_a_fraud_event_id() {
    let fed = TestFederation::new();
    let pipeline = fed.pipeline();

    let inbound = pipeline
        .validate_idp_response(fed.idp_success("_r", LevelOfAssurance::LevelX))
        .await
        .unwrap();
    assert_eq!(inbound.level_of_assurance, Some(LevelOfAssurance::LevelX));
    assert_eq!(inbound.fraud_event_id.as_deref(), Some("fraud-event-42"));

    let mut assertions = fed.idp_assertions(Party::Idp, "_r2", LevelOfAssurance::LevelX);
    assertions[1].attribute_statements.clear();
    let response = fed.response(Party::Idp, "_r2", Status::success(), assertions);
    assert_eq!(
        reason(pipeline.validate_idp_response(response).await),
        FailureReason::MissingFraudEventId
    );
}

// ---------------------------------------------------------------------------
// Matching service responses
// ---------------------------------------------------------------------------

#[tokio::test]
async fn matching_service_statuses() {
    let fed = TestFederation::new();
    let pipeline = fed.pipeline();

    let matched = pipeline
        .validate_matching_service_response(fed.msa_response("_m", status_codes::SUCCESS, Some(status_codes::MATCH)))
        .await
        .unwrap();
    assert_eq!(matched.status, MatchingServiceStatus::Match);
    assert_eq!(matched.persistent_id.as_deref(), Some(PERSISTENT_ID));

    let no_match = pipeline
        .validate_matching_service_response(fed.msa_response(
            "_m",
            status_codes::RESPONDER,
            Some(status_codes::NO_MATCH),
        ))
        .await
        .unwrap();
    assert_eq!(no_match.status, MatchingServiceStatus::NoMatch);
    assert_eq!(no_match.persistent_id, None);

    let missing_sub = fed.msa_response("_m", status_codes::SUCCESS, None);
    assert_eq!(
        reason(pipeline.validate_matching_service_response(missing_sub).await),
        FailureReason::MissingSubStatus
    );

    let escape = pipeline
        .validate_matching_service_response(fed.msa_response("_m", status_codes::RESPONDER, None))
        .await
        .unwrap();
    assert_eq!(escape.status, MatchingServiceStatus::ResponderError);
}

#[tokio::test]
async fn health_check_envelope() {
    let fed = TestFederation::new();
    let validated = fed
        .pipeline()
        .validate_response_envelope(fed.health_check_response("_hc"), ResponseRole::MatchingServiceHealthCheck)
        .unwrap();
    assert_eq!(validated.status(), MappedStatus::MatchingService(MatchingServiceStatus::Healthy));
    assert_eq!(validated.in_response_to(), "_hc");
}

// ---------------------------------------------------------------------------
// eIDAS country responses
// ---------------------------------------------------------------------------

#[tokio::test]
async fn country_success_end_to_end() {
    let fed = TestFederation::new();
    let inbound = fed
        .pipeline()
        .validate_country_response(fed.country_success("_c", LevelOfAssurance::Substantial))
        .await
        .unwrap();
    assert_eq!(inbound.status, CountryStatus::Success);
    assert_eq!(inbound.level_of_assurance, Some(LevelOfAssurance::Substantial));
    assert_eq!(inbound.person_identifier.as_deref(), Some("ES/UK/12345678"));
}

#[tokio::test]
async fn country_profile_is_enforced() {
    let fed = TestFederation::new();
    let pipeline = fed.pipeline();

    let domestic_level = fed.country_success("_c", LevelOfAssurance::Level2);
    assert_eq!(
        reason(pipeline.validate_country_response(domestic_level).await),
        FailureReason::EidasLevelOfAssuranceRequired
    );

    let mut assertion = fed.country_assertion("_c2", LevelOfAssurance::High);
    for statement in &mut assertion.attribute_statements {
        statement
            .attributes
            .retain(|a| a.name != attribute_names::EIDAS_DATE_OF_BIRTH);
    }
    let response = fed.response(Party::Country, "_c2", Status::success(), vec![assertion]);
    assert_eq!(
        reason(pipeline.validate_country_response(response).await),
        FailureReason::MissingEidasAttribute
    );

    let failure = pipeline
        .validate_country_response(fed.response(
            Party::Country,
            "_c3",
            Status::from_code(StatusCode::requester().with_sub_value(status_codes::AUTHN_FAILED)),
            Vec::new(),
        ))
        .await
        .unwrap();
    assert_eq!(failure.status, CountryStatus::Failure);
}

#[test]
fn pipeline_is_shareable_across_tasks() {
    fn assert_send_sync<T: Send + Sync>() {}
    assert_send_sync::<ValidationPipeline>();
    let _: Arc<ValidationPipeline> = Arc::new(TestFederation::new().pipeline());
}
