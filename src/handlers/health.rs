use axum::{extract::State, http::StatusCode, Json};
use std::sync::Arc;
use tracing::{debug, error};

use crate::models::{HealthResponse, ReadyResponse};
use crate::state::AppState;

/// Health check endpoint
pub async fn health_check() -> Json<HealthResponse> {
    debug!("Health check requested");
    Json(HealthResponse {
        status: "ok".to_string(),
        message: "Collaboration server is running".to_string(),
        version: env!("CARGO_PKG_VERSION").to_string(),
    })
}

/// Readiness check endpoint, verifies the change log store answers
pub async fn ready_check(State(state): State<Arc<AppState>>) -> (StatusCode, Json<ReadyResponse>) {
    debug!("Readiness check requested");
    let store = state.store.backend().to_string();
    match state.store.ping().await {
        Ok(()) => (
            StatusCode::OK,
            Json(ReadyResponse {
                status: "ok".to_string(),
                message: "Service is ready".to_string(),
                store,
            }),
        ),
        Err(e) => {
            error!("Readiness check failed: {}", e);
            (
                StatusCode::SERVICE_UNAVAILABLE,
                Json(ReadyResponse {
                    status: "unavailable".to_string(),
                    message: "Change log store is not reachable".to_string(),
                    store,
                }),
            )
        }
    }
}
