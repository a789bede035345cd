//! Concurrent access to shared session and replay state.

use std::sync::Arc;

use futures::future::join_all;
use hub_cache::{ReplayCache, StoreReplayCache};
use hub_policy::{PolicyError, PolicyEvent, SessionParams};
use hub_saml::status_codes;
use hub_saml::testing::RP_ACS_URL;

use crate::common::Hub;

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn only_one_of_two_racing_match_responses_wins() {
    let hub = Arc::new(Hub::new());
    let id = hub.awaiting_match("_race-cas").await;
    let first = hub
        .msa("_race-cas", status_codes::SUCCESS, Some(status_codes::MATCH))
        .await;
    let second = hub
        .msa("_race-cas", status_codes::RESPONDER, Some(status_codes::NO_MATCH))
        .await;

    let tasks = [first, second].map(|response| {
        let hub = Arc::clone(&hub);
        let id = id.clone();
        tokio::spawn(async move { hub.machine.transition(&id, PolicyEvent::MatchResponse(response)).await })
    });
    let results: Vec<_> = join_all(tasks).await.into_iter().map(|r| r.unwrap()).collect();

    let winners: Vec<_> = results.iter().filter_map(|r| r.as_ref().ok()).collect();
    assert_eq!(winners.len(), 1);
    for loser in results.iter().filter_map(|r| r.as_ref().err()) {
        assert!(
            matches!(loser, PolicyError::StaleSession(_) | PolicyError::IllegalStateTransition { .. }),
            "unexpected error {loser}"
        );
    }
    assert_eq!(hub.state_name(&id).await, winners[0].state.name());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn replay_cache_accepts_an_id_exactly_once() {
    let hub = Hub::new();
    let cache = Arc::new(StoreReplayCache::new(
        hub.fed.shared_store(),
        "race",
        std::time::Duration::from_secs(60),
    ));

    let tasks = (0..16).map(|_| {
        let cache = Arc::clone(&cache);
        tokio::spawn(async move { cache.accept("_assertion-1").await.unwrap() })
    });
    let accepted = join_all(tasks).await.into_iter().filter(|r| *r.as_ref().unwrap()).count();

    assert_eq!(accepted, 1);
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn same_request_submitted_concurrently_opens_one_session() {
    let hub = Arc::new(Hub::new());
    let request = hub.fed.signed_authn_request("_race-start");

    let tasks = (0..8).map(|_| {
        let hub = Arc::clone(&hub);
        let request = request.clone();
        tokio::spawn(async move {
            hub.machine
                .start(&hub.pipeline, request, SessionParams::new(RP_ACS_URL))
                .await
        })
    });
    let results: Vec<_> = join_all(tasks).await.into_iter().map(|r| r.unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, PolicyError::DuplicateRequest(_))));
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
async fn independent_sessions_progress_in_parallel() {
    let hub = Arc::new(Hub::new());

    let tasks = (0..10).map(|i| {
        let hub = Arc::clone(&hub);
        tokio::spawn(async move {
            let request_id = format!("_parallel-{i}");
            let id = hub.awaiting_match(&request_id).await;
            let response = hub
                .msa(&request_id, status_codes::SUCCESS, Some(status_codes::MATCH))
                .await;
            hub.machine
                .transition(&id, PolicyEvent::MatchResponse(response))
                .await
                .map(|t| t.state.name())
        })
    });

    for result in join_all(tasks).await {
        assert_eq!(result.unwrap().unwrap(), "SuccessfulMatch");
    }
}
