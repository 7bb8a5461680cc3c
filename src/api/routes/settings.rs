//! Settings Routes
//!
//! - GET /api/v1/settings/notifications - Notification switches
//! - PUT /api/v1/settings/notifications - Replace all switches
//! - POST /api/v1/settings/notifications/:key/toggle - Flip one switch
//! - GET /api/v1/settings/evolution - Gateway settings document
//! - PUT /api/v1/settings/evolution - Replace the gateway settings
//! - DELETE /api/v1/settings/evolution - Reset the gateway settings to defaults

use axum::{
    extract::{Path, State},
    Json,
};
use std::sync::Arc;

use crate::api::error::{ApiError, ApiResult};
use crate::api::state::AppState;
use crate::storage::{GatewayConfig, NotificationKey, NotificationSettings};

/// GET /api/v1/settings/notifications
pub async fn get_notifications(State(state): State<Arc<AppState>>) -> Json<NotificationSettings> {
    Json(state.store.notification_settings().await)
}

/// PUT /api/v1/settings/notifications
pub async fn put_notifications(
    State(state): State<Arc<AppState>>,
    Json(settings): Json<NotificationSettings>,
) -> ApiResult<Json<NotificationSettings>> {
    state.store.save_notification_settings(&settings).await?;
    Ok(Json(settings))
}

/// POST /api/v1/settings/notifications/:key/toggle
pub async fn toggle_notification(
    State(state): State<Arc<AppState>>,
    Path(key): Path<String>,
) -> ApiResult<Json<NotificationSettings>> {
    let key: NotificationKey = key.parse()?;
    let settings = state.store.toggle_notification(key).await?;

    tracing::info!(setting = key.as_str(), enabled = settings.get(key), "Notification toggled");
    Ok(Json(settings))
}

/// GET /api/v1/settings/evolution
pub async fn get_gateway(State(state): State<Arc<AppState>>) -> Json<GatewayConfig> {
    Json(state.store.gateway_config().await)
}

/// PUT /api/v1/settings/evolution
pub async fn put_gateway(
    State(state): State<Arc<AppState>>,
    Json(config): Json<GatewayConfig>,
) -> ApiResult<Json<GatewayConfig>> {
    validate_url("baseUrl", &config.base_url, true)?;
    validate_url("webhookUrl", &config.webhook_url, false)?;
    if config.instance_name.trim().is_empty() {
        return Err(ApiError::Validation("instanceName is required".to_string()));
    }

    state.store.save_gateway_config(&config).await?;
    tracing::info!(base_url = %config.base_url, "Gateway settings saved");
    Ok(Json(config))
}

/// DELETE /api/v1/settings/evolution
pub async fn reset_gateway(State(state): State<Arc<AppState>>) -> ApiResult<Json<GatewayConfig>> {
    Ok(Json(state.store.reset_gateway_config().await?))
}

fn validate_url(field: &str, value: &str, required: bool) -> Result<(), ApiError> {
    let value = value.trim();
    if value.is_empty() {
        return if required {
            Err(ApiError::Validation(format!("{} is required", field)))
        } else {
            Ok(())
        };
    }

    match reqwest::Url::parse(value) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(()),
        _ => Err(ApiError::Validation(format!(
            "{} must be an http(s) URL",
            field
        ))),
    }
}
