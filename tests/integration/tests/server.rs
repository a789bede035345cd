//! The hub process: configuration, operations endpoints and the health loop.

use std::net::TcpListener as StdListener;
use std::sync::Arc;
use std::time::Duration;

use axum::{extract::State, routing::post, Json, Router};
use base64::engine::general_purpose::STANDARD;
use base64::Engine as _;
use hub_health::HealthCheckRequest;
use hub_saml::testing::{Party, TestFederation, MSA_ENTITY_ID};
use hub_saml::Response;
use hub_server::{Server, ServerConfig};
use reqwest::{Client, StatusCode};
use serde_json::{json, Value};
use tokio::net::TcpListener;

fn free_port() -> anyhow::Result<u16> {
    let listener = StdListener::bind("127.0.0.1:0")?;
    Ok(listener.local_addr()?.port())
}

async fn answer_health_check(
    State(fed): State<Arc<TestFederation>>,
    Json(request): Json<HealthCheckRequest>,
) -> Json<Response> {
    Json(fed.health_check_response(&request.id))
}

/// Starts a matching service that answers health checks as `MSA_ENTITY_ID`.
async fn fake_matching_service(fed: Arc<TestFederation>) -> anyhow::Result<String> {
    let listener = TcpListener::bind("127.0.0.1:0").await?;
    let uri = format!("http://{}/matching-service/health", listener.local_addr()?);
    let app = Router::new()
        .route("/matching-service/health", post(answer_health_check))
        .with_state(fed);
    tokio::spawn(async move {
        let _ = axum::serve(listener, app).await;
    });
    Ok(uri)
}

/// Starts a hub whose federation file names one matching service at `msa_uri`.
async fn start_hub(fed: &TestFederation, msa_uri: &str) -> anyhow::Result<String> {
    let msa_key = fed.signer(Party::MatchingService).verification_key();
    let federation = json!({
        "entities": [{
            "entity_id": MSA_ENTITY_ID,
            "signing_keys": [STANDARD.encode(&msa_key.public_key)],
        }],
        "matching_services": [{ "entity_id": MSA_ENTITY_ID, "uri": msa_uri }],
    });
    let path = std::env::temp_dir().join(format!("hub-federation-{}.json", free_port()?));
    std::fs::write(&path, serde_json::to_vec(&federation)?)?;

    let mut config = ServerConfig::for_testing();
    config.port = free_port()?;
    config.federation_file = Some(path);
    config.hub = fed.config.clone();
    let base_url = format!("http://127.0.0.1:{}", config.port);

    let server = Server::new(config).await?;
    tokio::spawn(async move {
        if let Err(e) = server.run().await {
            tracing::error!("Server error: {}", e);
        }
    });
    Ok(base_url)
}

async fn wait_for(client: &Client, url: &str, expected: StatusCode) -> anyhow::Result<Value> {
    for _ in 0..100 {
        if let Ok(response) = client.get(url).send().await {
            if response.status() == expected {
                return Ok(response.json().await.unwrap_or(Value::Null));
            }
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }
    anyhow::bail!("{url} never answered {expected}")
}

#[tokio::test]
async fn hub_reports_healthy_matching_service() -> anyhow::Result<()> {
    let fed = Arc::new(TestFederation::new());
    let msa_uri = fake_matching_service(fed.clone()).await?;
    let base_url = start_hub(&fed, &msa_uri).await?;
    let client = Client::new();

    wait_for(&client, &format!("{base_url}/service-status"), StatusCode::OK).await?;
    let body = wait_for(&client, &format!("{base_url}/msa-health"), StatusCode::OK).await?;

    assert_eq!(body["healthy"], true);
    assert_eq!(body["report"]["results"][0]["entity_id"], MSA_ENTITY_ID);
    assert_eq!(body["report"]["results"][0]["status"], "healthy");
    Ok(())
}

#[tokio::test]
async fn hub_reports_unreachable_matching_service() -> anyhow::Result<()> {
    let fed = TestFederation::new();
    let unreachable = format!("http://127.0.0.1:{}/matching-service/health", free_port()?);
    let base_url = start_hub(&fed, &unreachable).await?;
    let client = Client::new();

    wait_for(&client, &format!("{base_url}/service-status"), StatusCode::OK).await?;
    let mut body = Value::Null;
    for _ in 0..50 {
        body = wait_for(&client, &format!("{base_url}/msa-health"), StatusCode::SERVICE_UNAVAILABLE).await?;
        if !body["report"].is_null() {
            break;
        }
        tokio::time::sleep(Duration::from_millis(100)).await;
    }

    assert_eq!(body["healthy"], false);
    assert_eq!(body["report"]["results"][0]["status"], "unhealthy");

    let response = client
        .get(format!("{base_url}/sessions/unknown-session/state"))
        .send()
        .await?;
    assert_eq!(response.status(), StatusCode::NOT_FOUND);
    Ok(())
}
