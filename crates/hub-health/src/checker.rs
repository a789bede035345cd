//! Health check fan-out.

use std::collections::BTreeSet;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use chrono::{DateTime, Utc};
use hub_core::{HealthCheckSettings, SharedClock, SystemClock};
use hub_saml::{MappedStatus, MatchingServiceStatus, ResponseRole, ValidationPipeline};
use parking_lot::RwLock;
use serde::Serialize;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tokio::time::{Instant, MissedTickBehavior};
use tracing::{debug, info, warn};

use crate::client::{HealthCheckRequest, MatchingServiceEndpoint, MatchingServiceHealthClient};
use crate::error::{HealthCheckError, HealthResult};

/// Health of one matching service.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    /// Answered Success/Healthy to this round's request.
    Healthy,
    /// Answered wrongly or could not be reached.
    Unhealthy,
    /// Still running when the round's deadline passed.
    TimedOut,
}

/// Result for one matching service.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct MsaHealth {
    /// Matching service entity id.
    pub entity_id: String,
    /// Outcome.
    pub status: HealthStatus,
    /// Why the service is not healthy.
    pub detail: Option<String>,
}

impl MsaHealth {
    fn healthy(entity_id: String) -> Self {
        Self {
            entity_id,
            status: HealthStatus::Healthy,
            detail: None,
        }
    }

    fn failed(entity_id: String, status: HealthStatus, detail: impl Into<String>) -> Self {
        Self {
            entity_id,
            status,
            detail: Some(detail.into()),
        }
    }
}

/// Outcome of one round.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct HealthReport {
    /// When the round started.
    pub checked_at: DateTime<Utc>,
    /// One entry per matching service, ordered by entity id.
    pub results: Vec<MsaHealth>,
}

impl HealthReport {
    /// True when every matching service is healthy.
    #[must_use]
    pub fn is_healthy(&self) -> bool {
        self.results.iter().all(|r| r.status == HealthStatus::Healthy)
    }

    /// Result for one matching service.
    #[must_use]
    pub fn get(&self, entity_id: &str) -> Option<&MsaHealth> {
        self.results.iter().find(|r| r.entity_id == entity_id)
    }
}

/// Runs health check rounds against a set of matching services.
pub struct HealthChecker {
    client: Arc<dyn MatchingServiceHealthClient>,
    pipeline: Arc<ValidationPipeline>,
    hub_entity_id: String,
    settings: HealthCheckSettings,
    clock: SharedClock,
    latest: RwLock<Option<HealthReport>>,
}

impl std::fmt::Debug for HealthChecker {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("HealthChecker")
            .field("hub_entity_id", &self.hub_entity_id)
            .field("settings", &self.settings)
            .finish_non_exhaustive()
    }
}

impl HealthChecker {
    /// Creates a checker using the pipeline's hub configuration.
    #[must_use]
    pub fn new(client: Arc<dyn MatchingServiceHealthClient>, pipeline: Arc<ValidationPipeline>) -> Self {
        let config = pipeline.config();
        Self {
            hub_entity_id: config.hub_entity_id.clone(),
            settings: config.health_check.clone(),
            client,
            pipeline,
            clock: SystemClock::shared(),
            latest: RwLock::new(None),
        }
    }

    /// Overrides the fan-out settings.
    #[must_use]
    pub fn with_settings(mut self, settings: HealthCheckSettings) -> Self {
        self.settings = settings;
        self
    }

    /// Uses `clock` to stamp requests and reports.
    #[must_use]
    pub fn with_clock(mut self, clock: SharedClock) -> Self {
        self.clock = clock;
        self
    }

    /// Report of the most recent round.
    #[must_use]
    pub fn latest(&self) -> Option<HealthReport> {
        self.latest.read().clone()
    }

    /// Checks every endpoint once.
    ///
    /// Never fails: problems with an individual service are recorded in its
    /// entry, and services still running at the deadline are `TimedOut`.
    pub async fn check_all(&self, endpoints: &[MatchingServiceEndpoint]) -> HealthReport {
        let checked_at = self.clock.now();
        let deadline = Instant::now() + self.settings.overall_timeout();
        let semaphore = Arc::new(Semaphore::new(self.settings.max_concurrency.max(1)));

        let mut pending = BTreeSet::new();
        let mut tasks = JoinSet::new();
        for endpoint in endpoints {
            if !pending.insert(endpoint.entity_id.clone()) {
                continue;
            }
            let endpoint = endpoint.clone();
            let client = Arc::clone(&self.client);
            let pipeline = Arc::clone(&self.pipeline);
            let semaphore = Arc::clone(&semaphore);
            let request = HealthCheckRequest::new(&self.hub_entity_id, &endpoint.entity_id, checked_at);

            tasks.spawn(async move {
                let Ok(_permit) = semaphore.acquire_owned().await else {
                    return MsaHealth::failed(endpoint.entity_id, HealthStatus::Unhealthy, "worker pool closed");
                };
                match probe(client.as_ref(), &pipeline, &endpoint, &request).await {
                    Ok(()) => {
                        debug!(msa = %endpoint.entity_id, "matching service healthy");
                        MsaHealth::healthy(endpoint.entity_id)
                    }
                    Err(err) => {
                        warn!(msa = %endpoint.entity_id, error = %err, "matching service unhealthy");
                        MsaHealth::failed(endpoint.entity_id, HealthStatus::Unhealthy, err.to_string())
                    }
                }
            });
        }

        let mut results = Vec::with_capacity(pending.len());
        let mut deadline_passed = false;
        loop {
            match tokio::time::timeout_at(deadline, tasks.join_next()).await {
                Ok(Some(Ok(health))) => {
                    pending.remove(&health.entity_id);
                    results.push(health);
                }
                Ok(Some(Err(err))) => warn!(error = %err, "health check task failed"),
                Ok(None) => break,
                Err(_) => {
                    deadline_passed = true;
                    tasks.abort_all();
                    break;
                }
            }
        }

        for entity_id in pending {
            if deadline_passed {
                warn!(msa = %entity_id, "matching service health check timed out");
                results.push(MsaHealth::failed(entity_id, HealthStatus::TimedOut, "no answer before deadline"));
            } else {
                results.push(MsaHealth::failed(entity_id, HealthStatus::Unhealthy, "health check did not complete"));
            }
        }
        results.sort_by(|a, b| a.entity_id.cmp(&b.entity_id));

        let report = HealthReport { checked_at, results };
        if report.is_healthy() {
            info!(checked = report.results.len(), "matching services healthy");
        } else {
            warn!(
                checked = report.results.len(),
                unhealthy = report.results.iter().filter(|r| r.status != HealthStatus::Healthy).count(),
                "matching services unhealthy"
            );
        }
        *self.latest.write() = Some(report.clone());
        report
    }

    /// Runs a round every interval until `shutdown` completes.
    pub async fn run(&self, endpoints: &[MatchingServiceEndpoint], shutdown: impl Future<Output = ()>) {
        let mut ticker = tokio::time::interval(self.settings.interval().max(Duration::from_secs(1)));
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        tokio::pin!(shutdown);

        loop {
            tokio::select! {
                () = &mut shutdown => {
                    info!("matching service health checks stopped");
                    return;
                }
                _ = ticker.tick() => {
                    self.check_all(endpoints).await;
                }
            }
        }
    }
}

async fn probe(
    client: &dyn MatchingServiceHealthClient,
    pipeline: &ValidationPipeline,
    endpoint: &MatchingServiceEndpoint,
    request: &HealthCheckRequest,
) -> HealthResult<()> {
    let response = client.send(endpoint, request).await?;
    let validated = pipeline.validate_response_envelope(response, ResponseRole::MatchingServiceHealthCheck)?;

    if validated.issuer() != endpoint.entity_id {
        return Err(HealthCheckError::WrongIssuer {
            expected: endpoint.entity_id.clone(),
            actual: validated.issuer().to_string(),
        });
    }
    if validated.in_response_to() != request.id {
        return Err(HealthCheckError::WrongInResponseTo {
            expected: request.id.clone(),
            actual: validated.in_response_to().to_string(),
        });
    }
    match validated.status() {
        MappedStatus::MatchingService(MatchingServiceStatus::Healthy) => Ok(()),
        other => Err(HealthCheckError::NotHealthy(format!("{other:?}"))),
    }
}
