//! HTTP delivery of matching service health checks.
//!
//! The request is posted as JSON and the answer read back as a parsed
//! response document; SAML encoding happens in the adapter's codec layer.

use std::time::Duration;

use async_trait::async_trait;
use hub_health::{HealthCheckError, HealthCheckRequest, HealthResult, MatchingServiceEndpoint, MatchingServiceHealthClient};
use hub_saml::Response;
use tracing::debug;

/// Health check client over HTTPS.
#[derive(Debug, Clone)]
pub struct HttpHealthClient {
    client: reqwest::Client,
}

impl HttpHealthClient {
    /// Creates a client whose requests give up after `timeout`.
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl MatchingServiceHealthClient for HttpHealthClient {
    async fn send(
        &self,
        endpoint: &MatchingServiceEndpoint,
        request: &HealthCheckRequest,
    ) -> HealthResult<Response> {
        debug!(msa = %endpoint.entity_id, request_id = %request.id, "sending health check");

        let answer = self
            .client
            .post(&endpoint.uri)
            .json(request)
            .send()
            .await
            .and_then(reqwest::Response::error_for_status)
            .map_err(|e| HealthCheckError::Transport(e.to_string()))?;

        answer
            .json::<Response>()
            .await
            .map_err(|e| HealthCheckError::Transport(format!("unreadable answer: {e}")))
    }
}
