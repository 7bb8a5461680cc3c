//! Health Routes
//!
//! - GET /api/health - Liveness check used by the frontend and load balancers
//! - GET /api/v1/status - Uptime and record counts

use axum::{extract::State, Json};
use chrono::Utc;
use std::sync::Arc;

use crate::api::dto::{HealthResponse, StatusResponse};
use crate::api::state::AppState;

/// GET /api/health
pub async fn health() -> Json<HealthResponse> {
    Json(HealthResponse {
        status: "OK".to_string(),
        message: "crmdesk server is running".to_string(),
        timestamp: Utc::now().to_rfc3339(),
    })
}

/// GET /api/v1/status
pub async fn status(State(state): State<Arc<AppState>>) -> Json<StatusResponse> {
    let stats = state.store.stats().await;

    Json(StatusResponse {
        version: env!("CARGO_PKG_VERSION").to_string(),
        uptime_seconds: state.uptime_seconds(),
        websocket_connections: state.ws_hub.connection_count().await,
        customers: stats.customers,
        instances: stats.instances,
        log_entries: stats.log_entries,
        documents: stats.documents,
    })
}
