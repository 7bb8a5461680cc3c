//! Workflow Routes
//!
//! - GET /api/v1/workflows - List platform workflows and locally logged names
//! - POST /api/v1/workflows/trigger - Trigger a workflow and log the outcome
//! - GET /api/v1/workflows/logs - Query the log (level, workflow, search, limit)
//! - POST /api/v1/workflows/logs - Record an entry reported by a workflow
//! - DELETE /api/v1/workflows/logs - Clear the log
//! - GET /api/v1/workflows/logs/summary - Counts per level and mean duration

use axum::{
    extract::{Query, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;
use std::time::Instant;

use crate::api::dto::{
    AppendLogRequest, ClearLogsResponse, LogListResponse, TriggerRequest, TriggerResponse,
    WorkflowListResponse,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::integrations::IntegrationError;
use crate::storage::{LogFilter, LogLevel, LogSummary, WorkflowLogEntry, MAX_LOG_DURATION_MS};
use crate::websocket::WsEvent;

/// GET /api/v1/workflows
///
/// An unconfigured platform yields an empty remote list.
pub async fn list_workflows(
    State(state): State<Arc<AppState>>,
) -> ApiResult<Json<WorkflowListResponse>> {
    let workflows = match state.n8n().list_workflows().await {
        Ok(workflows) => workflows,
        Err(IntegrationError::NotConfigured(_)) => Vec::new(),
        Err(e) => return Err(e.into()),
    };

    Ok(Json(WorkflowListResponse {
        workflows,
        logged: state.store.log_workflows().await,
    }))
}

/// POST /api/v1/workflows/trigger
///
/// The outcome is logged either way; a failed trigger still answers 502.
pub async fn trigger_workflow(
    State(state): State<Arc<AppState>>,
    Json(req): Json<TriggerRequest>,
) -> ApiResult<Json<TriggerResponse>> {
    let workflow = req.workflow.trim();
    if workflow.is_empty() {
        return Err(ApiError::Validation("workflow is required".to_string()));
    }

    let started = Instant::now();
    let result = state.n8n().trigger(workflow, &req.payload).await;
    let duration_ms = started.elapsed().as_millis() as u64;

    let (entry, outcome) = match result {
        Ok(outcome) => {
            let execution_id = outcome
                .execution_id
                .clone()
                .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());
            let entry = WorkflowLogEntry::new(
                LogLevel::Success,
                workflow,
                execution_id,
                "Workflow triggered",
            );
            (entry, Ok(outcome.response))
        }
        Err(e) => {
            let entry = WorkflowLogEntry::new(
                LogLevel::Error,
                workflow,
                uuid::Uuid::new_v4().to_string(),
                format!("Trigger failed: {}", e),
            );
            (entry, Err(e))
        }
    };
    let entry = entry.duration_ms(duration_ms);

    state.store.append_log(entry.clone()).await?;
    state.ws_hub.publish(WsEvent::workflow_log(&entry));

    let response = outcome?;
    tracing::info!(workflow = %workflow, duration_ms, "Workflow triggered");

    Ok(Json(TriggerResponse { entry, response }))
}

/// GET /api/v1/workflows/logs
pub async fn list_logs(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<LogFilter>,
) -> Json<LogListResponse> {
    let entries = state.store.query_logs(&filter).await;

    Json(LogListResponse {
        total: entries.len(),
        entries,
    })
}

/// POST /api/v1/workflows/logs
pub async fn append_log(
    State(state): State<Arc<AppState>>,
    Json(req): Json<AppendLogRequest>,
) -> ApiResult<(StatusCode, Json<WorkflowLogEntry>)> {
    let workflow = req.workflow.trim();
    if workflow.is_empty() {
        return Err(ApiError::Validation("workflow is required".to_string()));
    }
    if req.message.trim().is_empty() {
        return Err(ApiError::Validation("message is required".to_string()));
    }
    if req.duration_ms.is_some_and(|d| d > MAX_LOG_DURATION_MS) {
        return Err(ApiError::Validation(format!(
            "duration_ms must be at most {}",
            MAX_LOG_DURATION_MS
        )));
    }

    let execution_id = req
        .execution_id
        .filter(|id| !id.trim().is_empty())
        .unwrap_or_else(|| uuid::Uuid::new_v4().to_string());

    let mut entry = WorkflowLogEntry::new(req.level, workflow, execution_id, req.message);
    if let Some(duration) = req.duration_ms {
        entry = entry.duration_ms(duration);
    }
    if let Some(timestamp) = req.timestamp {
        entry = entry.timestamp(timestamp);
    }

    state.store.append_log(entry.clone()).await?;
    state.ws_hub.publish(WsEvent::workflow_log(&entry));

    Ok((StatusCode::CREATED, Json(entry)))
}

/// DELETE /api/v1/workflows/logs
pub async fn clear_logs(State(state): State<Arc<AppState>>) -> ApiResult<Json<ClearLogsResponse>> {
    let removed = state.store.clear_logs().await?;

    tracing::info!(removed, "Cleared workflow logs");
    state.ws_hub.publish(WsEvent::system("workflow logs cleared"));

    Ok(Json(ClearLogsResponse { removed }))
}

/// GET /api/v1/workflows/logs/summary
pub async fn log_summary(State(state): State<Arc<AppState>>) -> Json<LogSummary> {
    Json(state.store.log_summary().await)
}
