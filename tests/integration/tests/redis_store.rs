//! Journeys over a real Redis, started with testcontainers.
//!
//! Needs a Docker daemon; run with `cargo test -- --ignored`.

use std::sync::Arc;

use futures::future::join_all;
use hub_cache::{ReplayCache, SharedStore, SharedStoreRef, StoreReplayCache};
use hub_cache_redis::{RedisConfig, RedisStore};
use hub_core::LevelOfAssurance;
use hub_policy::{PolicyError, PolicyEvent};
use hub_saml::status_codes;
use hub_saml::testing::TestFederation;
use testcontainers::{runners::AsyncRunner, ContainerAsync};
use testcontainers_modules::redis::{Redis, REDIS_PORT};

use crate::common::Hub;

async fn redis() -> anyhow::Result<(ContainerAsync<Redis>, RedisStore)> {
    let container = Redis::default().start().await?;
    let port = container.get_host_port_ipv4(REDIS_PORT).await?;
    let store = RedisStore::new(
        RedisConfig::from_url(format!("redis://127.0.0.1:{port}/0")).key_prefix("hub-it"),
    )
    .await?;
    Ok((container, store))
}

#[tokio::test]
#[ignore = "requires docker"]
async fn redis_compare_and_swap_replaces_only_the_expected_value() -> anyhow::Result<()> {
    let (_container, store) = redis().await?;
    let ttl = std::time::Duration::from_secs(60);

    assert!(store.set_if_absent("cas", "v1", ttl).await?);
    assert!(!store.compare_and_swap("cas", "v0", "v2", ttl).await?);
    assert_eq!(store.get("cas").await?.as_deref(), Some("v1"));

    assert!(store.compare_and_swap("cas", "v1", "v2", ttl).await?);
    assert_eq!(store.get("cas").await?.as_deref(), Some("v2"));
    assert!(!store.compare_and_swap("missing", "v1", "v2", ttl).await?);
    Ok(())
}

#[tokio::test]
#[ignore = "requires docker"]
async fn journey_over_redis() -> anyhow::Result<()> {
    let (_container, store) = redis().await?;
    let store: SharedStoreRef = Arc::new(store);
    let hub = Hub::with_store(TestFederation::new(), store);

    let id = hub.awaiting_match("_redis-journey").await;
    let response = hub
        .msa("_redis-journey", status_codes::SUCCESS, Some(status_codes::MATCH))
        .await;
    let transition = hub.send(&id, PolicyEvent::MatchResponse(response)).await;

    assert_eq!(transition.state.name(), "SuccessfulMatch");
    assert_eq!(hub.state_name(&id).await, "SuccessfulMatch");
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires docker"]
async fn redis_compare_and_set_admits_one_writer() -> anyhow::Result<()> {
    let (_container, store) = redis().await?;
    let store: SharedStoreRef = Arc::new(store);
    let hub = Arc::new(Hub::with_store(TestFederation::new(), store));

    let id = hub.at_idp("_redis-race").await;
    let first = hub.idp_success("_redis-race", LevelOfAssurance::Level2).await;
    let second = hub.idp_success("_redis-race", LevelOfAssurance::Level2).await;

    let tasks = [first, second].map(|response| {
        let hub = Arc::clone(&hub);
        let id = id.clone();
        tokio::spawn(async move { hub.machine.transition(&id, PolicyEvent::IdpAuthnResponse(response)).await })
    });
    let results: Vec<_> = join_all(tasks).await.into_iter().map(|r| r.unwrap()).collect();

    assert_eq!(results.iter().filter(|r| r.is_ok()).count(), 1);
    assert!(results
        .iter()
        .filter_map(|r| r.as_ref().err())
        .all(|e| matches!(e, PolicyError::StaleSession(_) | PolicyError::IllegalStateTransition { .. })));
    Ok(())
}

#[tokio::test(flavor = "multi_thread", worker_threads = 4)]
#[ignore = "requires docker"]
async fn redis_replay_cache_is_shared_between_instances() -> anyhow::Result<()> {
    let (_container, store) = redis().await?;
    let store: SharedStoreRef = Arc::new(store);
    let window = std::time::Duration::from_secs(60);
    let instances: Vec<_> = (0..4)
        .map(|_| Arc::new(StoreReplayCache::new(store.clone(), "assertion", window)))
        .collect();

    let tasks = instances.iter().cycle().take(12).map(|cache| {
        let cache = Arc::clone(cache);
        tokio::spawn(async move { cache.accept("_shared-assertion").await })
    });
    let accepted = join_all(tasks)
        .await
        .into_iter()
        .filter(|r| matches!(r, Ok(Ok(true))))
        .count();

    assert_eq!(accepted, 1);
    Ok(())
}
