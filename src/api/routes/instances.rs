//! Messaging Instance Routes
//!
//! Instances live on the messaging gateway; the CRM keeps a local record of
//! each one with its last known status and pairing QR code.
//!
//! - GET /api/v1/instances - List instances
//! - POST /api/v1/instances - Create an instance on the gateway and register it
//! - GET /api/v1/instances/:id - Get an instance
//! - DELETE /api/v1/instances/:id - Delete on the gateway, then locally
//! - POST /api/v1/instances/:id/connect - Start pairing and fetch the QR code
//! - GET /api/v1/instances/:id/status - Refresh status from the gateway
//! - POST /api/v1/instances/:id/logout - Log the paired phone out
//! - POST /api/v1/instances/:id/messages - Send a text message
//! - POST /api/v1/webhooks/evolution - Gateway event callback

use axum::{
    extract::{Path, State},
    http::StatusCode,
    Json,
};
use std::sync::Arc;

use crate::api::dto::{
    ConnectInstanceResponse, CreateInstanceRequest, InstanceListResponse, SendMessageRequest,
    SendMessageResponse, WebhookAck,
};
use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::integrations::{GatewayEvent, IntegrationError, WebhookPayload};
use crate::storage::{Instance, InstanceStatus};
use crate::websocket::WsEvent;

/// GET /api/v1/instances
pub async fn list_instances(State(state): State<Arc<AppState>>) -> Json<InstanceListResponse> {
    let instances = state.store.list_instances().await;

    Json(InstanceListResponse {
        total: instances.len(),
        instances,
    })
}

/// POST /api/v1/instances
///
/// Nothing is stored locally unless the gateway accepts the instance.
pub async fn create_instance(
    State(state): State<Arc<AppState>>,
    Json(req): Json<CreateInstanceRequest>,
) -> ApiResult<(StatusCode, Json<Instance>)> {
    let mut instance = Instance::new(&req.name, req.display_name.as_deref())?;
    if state.store.has_instance(&instance.id).await {
        return Err(ApiError::Conflict(format!(
            "Instance '{}' already exists",
            instance.id
        )));
    }

    let gateway = state.evolution().await;
    if let Some(qr) = gateway.create_instance(&instance.id).await? {
        if let Some(payload) = qr.qr_payload() {
            instance.set_qr(payload);
        }
    }

    let webhook_url = gateway.config().webhook_url.trim();
    if !webhook_url.is_empty() {
        if let Err(e) = gateway.set_webhook(&instance.id, webhook_url).await {
            tracing::warn!(instance = %instance.id, error = %e, "Failed to set gateway webhook");
        }
    }

    let instance = state.store.register_instance(instance).await?;

    tracing::info!(instance = %instance.id, "Registered instance");
    state.ws_hub.publish(WsEvent::instance(&instance));

    Ok((StatusCode::CREATED, Json(instance)))
}

/// GET /api/v1/instances/:id
pub async fn get_instance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Instance>> {
    Ok(Json(state.store.get_instance(&id).await?))
}

/// DELETE /api/v1/instances/:id
///
/// A gateway 404 means the instance is already gone there; the local
/// record is removed anyway.
pub async fn delete_instance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<StatusCode> {
    state.store.get_instance(&id).await?;

    match state.evolution().await.delete_instance(&id).await {
        Ok(()) | Err(IntegrationError::ApiError { status: 404, .. }) => {}
        Err(e) => return Err(e.into()),
    }

    let mut removed = state.store.remove_instance(&id).await?;
    removed.set_status(InstanceStatus::Disconnected);

    tracing::info!(instance = %id, "Deleted instance");
    state.ws_hub.publish(WsEvent::instance(&removed));

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/instances/:id/connect
pub async fn connect_instance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<ConnectInstanceResponse>> {
    state.store.get_instance(&id).await?;

    let response = state.evolution().await.connect(&id).await?;
    let instance = state
        .store
        .update_instance(&id, |instance| match response.qr_payload() {
            Some(qr) => instance.set_qr(qr),
            None => {
                instance.set_status(InstanceStatus::Connecting);
            }
        })
        .await?;

    state.ws_hub.publish(WsEvent::instance(&instance));

    Ok(Json(ConnectInstanceResponse {
        instance: instance.id,
        status: instance.status,
        qr_code: instance.qr_code,
        pairing_code: response.pairing_code,
    }))
}

/// GET /api/v1/instances/:id/status
pub async fn refresh_status(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Instance>> {
    let current = state.store.get_instance(&id).await?;
    let status = state.evolution().await.connection_state(&id).await?;

    // The gateway reports "connecting" while a QR is on screen; keep it
    let keep_qr = status == InstanceStatus::Connecting && current.status == InstanceStatus::QrReady;
    if keep_qr || current.status == status {
        return Ok(Json(current));
    }

    let instance = state
        .store
        .update_instance(&id, |instance| {
            instance.set_status(status);
        })
        .await?;

    tracing::debug!(instance = %id, status = %status, "Instance status refreshed");
    state.ws_hub.publish(WsEvent::instance(&instance));

    Ok(Json(instance))
}

/// POST /api/v1/instances/:id/logout
pub async fn logout_instance(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
) -> ApiResult<Json<Instance>> {
    state.store.get_instance(&id).await?;
    state.evolution().await.logout(&id).await?;

    let instance = state
        .store
        .update_instance(&id, |instance| {
            instance.set_status(InstanceStatus::Disconnected);
        })
        .await?;

    tracing::info!(instance = %id, "Instance logged out");
    state.ws_hub.publish(WsEvent::instance(&instance));

    Ok(Json(instance))
}

/// POST /api/v1/instances/:id/messages
pub async fn send_message(
    State(state): State<Arc<AppState>>,
    Path(id): Path<String>,
    Json(req): Json<SendMessageRequest>,
) -> ApiResult<Json<SendMessageResponse>> {
    let number: String = req.number.chars().filter(|c| !c.is_whitespace()).collect();
    if number.is_empty() {
        return Err(ApiError::Validation("number is required".to_string()));
    }
    if req.text.trim().is_empty() {
        return Err(ApiError::Validation("text is required".to_string()));
    }

    state.store.get_instance(&id).await?;
    let receipt = state
        .evolution()
        .await
        .send_text(&id, &number, &req.text)
        .await?;

    tracing::info!(instance = %id, message_id = ?receipt.message_id, "Message sent");

    Ok(Json(SendMessageResponse {
        instance: id,
        message_id: receipt.message_id,
        status: receipt.status,
    }))
}

/// POST /api/v1/webhooks/evolution
///
/// Always acknowledged so the gateway does not retry; events for unknown
/// instances are ignored.
pub async fn evolution_webhook(
    State(state): State<Arc<AppState>>,
    Json(payload): Json<WebhookPayload>,
) -> ApiResult<Json<WebhookAck>> {
    let event = payload.into_event();

    if matches!(event, GatewayEvent::Ignored { .. }) || !state.store.has_instance(event.instance()).await {
        tracing::debug!(instance = %event.instance(), "Gateway event ignored");
        return Ok(Json(WebhookAck {
            received: true,
            applied: false,
        }));
    }

    let instance = state
        .store
        .update_instance(event.instance(), |instance| event.apply(instance))
        .await?;

    tracing::info!(instance = %instance.id, status = %instance.status, "Gateway event applied");
    state.ws_hub.publish(WsEvent::instance(&instance));

    Ok(Json(WebhookAck {
        received: true,
        applied: true,
    }))
}
