//! Health check transport seam.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use hub_saml::Response;
use serde::{Deserialize, Serialize};

use crate::error::HealthResult;

/// A matching service and where to reach it.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchingServiceEndpoint {
    /// Entity id; the expected issuer of its answers.
    pub entity_id: String,
    /// Attribute query endpoint.
    pub uri: String,
}

impl MatchingServiceEndpoint {
    /// Creates an endpoint.
    #[must_use]
    pub fn new(entity_id: impl Into<String>, uri: impl Into<String>) -> Self {
        Self {
            entity_id: entity_id.into(),
            uri: uri.into(),
        }
    }
}

/// Health check query sent to a matching service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HealthCheckRequest {
    /// Request id; the answer must echo it as InResponseTo.
    pub id: String,
    /// The hub's entity id.
    pub issuer: String,
    /// Matching service entity id.
    pub destination: String,
    /// When the request was made.
    pub issue_instant: DateTime<Utc>,
}

impl HealthCheckRequest {
    /// Creates a request with a fresh id.
    #[must_use]
    pub fn new(issuer: impl Into<String>, destination: impl Into<String>, now: DateTime<Utc>) -> Self {
        Self {
            id: format!("_hc-{}", uuid::Uuid::now_v7()),
            issuer: issuer.into(),
            destination: destination.into(),
            issue_instant: now,
        }
    }
}

/// Delivers health check requests.
#[async_trait]
pub trait MatchingServiceHealthClient: Send + Sync {
    /// Sends `request` to `endpoint` and returns the parsed answer.
    async fn send(
        &self,
        endpoint: &MatchingServiceEndpoint,
        request: &HealthCheckRequest,
    ) -> HealthResult<Response>;
}
