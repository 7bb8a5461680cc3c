//! Dashboard, Report and Integration Routes
//!
//! - GET /api/v1/dashboard - Headline counts and the newest customers
//! - GET /api/v1/reports/customers - Customers grouped by status, source and agent
//! - GET /api/v1/integrations - Gateway and workflow platform status
//! - GET /api/v1/client-config - Public values for the browser bundle

use axum::{extract::State, Json};
use std::sync::Arc;

use crate::api::dto::{
    ClientConfigResponse, CustomerReportResponse, DashboardResponse, IntegrationsResponse,
};
use crate::api::state::AppState;
use crate::integrations::probe;
use crate::storage::CustomerFilter;

const RECENT_CUSTOMERS: usize = 5;

/// GET /api/v1/dashboard
pub async fn dashboard(State(state): State<Arc<AppState>>) -> Json<DashboardResponse> {
    let customers_by_status = state.store.customer_counts().await;
    let mut recent_customers = state.store.list_customers(&CustomerFilter::default()).await;
    let total_customers = recent_customers.len();
    recent_customers.truncate(RECENT_CUSTOMERS);

    Json(DashboardResponse {
        total_customers,
        customers_by_status,
        instances_by_status: state.store.instance_counts().await,
        logs_by_level: state.store.log_summary().await.by_level,
        recent_customers,
    })
}

/// GET /api/v1/reports/customers
pub async fn customer_report(State(state): State<Arc<AppState>>) -> Json<CustomerReportResponse> {
    let by_status = state.store.customer_counts().await;
    let (by_source, by_agent) = state.store.customer_breakdown().await;

    Json(CustomerReportResponse {
        total: by_status.values().sum(),
        by_status,
        by_source,
        by_agent,
    })
}

/// GET /api/v1/integrations
pub async fn integrations(State(state): State<Arc<AppState>>) -> Json<IntegrationsResponse> {
    let gateway = state.evolution().await;
    let workflows = state.n8n();

    let (gateway_status, workflow_status) = tokio::join!(probe(&gateway), probe(&workflows));

    Json(IntegrationsResponse {
        integrations: vec![gateway_status, workflow_status],
    })
}

/// GET /api/v1/client-config
pub async fn client_config(State(state): State<Arc<AppState>>) -> Json<ClientConfigResponse> {
    let gateway = state.store.gateway_config().await;
    let config = &state.config;

    Json(ClientConfigResponse {
        api_url: config.server.public_url.clone(),
        supabase_url: config.supabase.url.clone(),
        supabase_anon_key: config.supabase.anon_key.clone(),
        instance_name: gateway.instance_name,
        n8n_webhook_url: config.n8n.webhook_url.clone(),
    })
}
