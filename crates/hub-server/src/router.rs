//! Router configuration.
//!
//! Operations endpoints only: liveness, matching service health and a
//! read-only view of a session's current state for support staff.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Json, Response},
    routing::get,
    Router,
};
use hub_health::HealthReport;
use hub_policy::PolicyError;
use hub_session::SessionId;
use serde::Serialize;
use tower_http::trace::TraceLayer;
use tracing::error;

use crate::state::AppState;

/// Creates the operations router.
pub fn create_router(state: AppState) -> Router {
    Router::new()
        .route("/", get(root))
        .route("/service-status", get(service_status))
        .route("/msa-health", get(msa_health))
        .route("/sessions/{session_id}/state", get(session_state))
        .with_state(state)
        .layer(TraceLayer::new_for_http())
}

/// Server information response.
#[derive(Serialize)]
pub struct ServerInfo {
    name: &'static str,
    version: &'static str,
}

async fn root() -> Json<ServerInfo> {
    Json(ServerInfo {
        name: "hub",
        version: env!("CARGO_PKG_VERSION"),
    })
}

/// Liveness probe.
async fn service_status() -> StatusCode {
    StatusCode::OK
}

/// Health of all matching services.
#[derive(Serialize)]
pub struct MsaHealthResponse {
    healthy: bool,
    report: Option<HealthReport>,
}

/// Latest health round; 503 until a round has passed cleanly.
async fn msa_health(State(state): State<AppState>) -> (StatusCode, Json<MsaHealthResponse>) {
    let report = state.health.latest();
    let healthy = report.as_ref().is_some_and(HealthReport::is_healthy);
    let code = if healthy {
        StatusCode::OK
    } else {
        StatusCode::SERVICE_UNAVAILABLE
    };
    (code, Json(MsaHealthResponse { healthy, report }))
}

/// Current state of one session.
#[derive(Serialize)]
pub struct SessionStateResponse {
    session_id: String,
    state: &'static str,
}

async fn session_state(State(state): State<AppState>, Path(session_id): Path<String>) -> Response {
    let id = SessionId::new(session_id);
    match state.machine.get_state(&id).await {
        Ok(current) => Json(SessionStateResponse {
            session_id: id.to_string(),
            state: current.name(),
        })
        .into_response(),
        Err(err @ PolicyError::SessionNotFound(_)) => (StatusCode::NOT_FOUND, err.to_string()).into_response(),
        Err(err) => {
            error!(session_id = %id, error = %err, "session lookup failed");
            StatusCode::INTERNAL_SERVER_ERROR.into_response()
        }
    }
}
