use axum::extract::State;
use axum::{routing::get, Json, Router};
use serde::Serialize;

use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum HealthStatus {
    Ok,
    /// The process is up but the assessment store is not answering; state
    /// reads fall back to memory and sends return 503.
    Degraded,
}

/// Body of `GET /health`.
#[derive(Serialize)]
pub struct HealthResponse {
    pub status: HealthStatus,
    pub version: &'static str,
    /// `memory` or `postgres`.
    pub store: &'static str,
    pub db_healthy: bool,
    /// Subjects with an open assessment session in this process.
    pub active_sessions: usize,
}

async fn health_check(State(state): State<AppState>) -> Json<HealthResponse> {
    let db_healthy = match state.gateway.health_check().await {
        Ok(()) => true,
        Err(e) => {
            tracing::warn!(error = %e, "Assessment store health check failed");
            false
        }
    };

    Json(HealthResponse {
        status: if db_healthy {
            HealthStatus::Ok
        } else {
            HealthStatus::Degraded
        },
        version: env!("CARGO_PKG_VERSION"),
        store: if state.config.memory_store {
            "memory"
        } else {
            "postgres"
        },
        db_healthy,
        active_sessions: state.sessions.session_count().await,
    })
}

/// `/health`, mounted at the root rather than under the API prefix.
pub fn router() -> Router<AppState> {
    Router::new().route("/health", get(health_check))
}
