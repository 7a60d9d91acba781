//! Liveness and readiness probes

use axum::{extract::State, Json};
use chrono::Utc;
use serde::Serialize;

use crate::error::ApiError;
use crate::state::AppState;

#[derive(Debug, Serialize)]
pub struct HealthResponse {
    pub status: &'static str,
    pub version: &'static str,
    pub timestamp: String,
}

#[derive(Debug, Serialize)]
pub struct ReadyResponse {
    pub status: &'static str,
    pub store: &'static str,
}

/// GET /health - The process is up
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "healthy",
        version: env!("CARGO_PKG_VERSION"),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// GET /ready - The storage backend is reachable
pub async fn ready(State(state): State<AppState>) -> Result<Json<ReadyResponse>, ApiError> {
    state.repository.health_check().await.map_err(|e| {
        tracing::error!(error = %e, "Readiness check failed");
        ApiError::ServiceUnavailable("nonce store unreachable".to_string())
    })?;

    Ok(Json(ReadyResponse {
        status: "ready",
        store: "connected",
    }))
}
