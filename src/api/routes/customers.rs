//! Customer Routes
//!
//! - GET /api/v1/customers - List customers (filters: status, search, tag, assigned_to)
//! - POST /api/v1/customers - Create a customer from a form draft
//! - GET /api/v1/customers/:id - Get a customer
//! - PUT /api/v1/customers/:id - Replace a customer's editable fields
//! - DELETE /api/v1/customers/:id - Delete a customer
//! - POST /api/v1/customers/:id/tags - Add a tag
//! - DELETE /api/v1/customers/:id/tags/:tag - Remove a tag
//! - GET /api/v1/customers/export - Download all customers as CSV
//! - POST /api/v1/customers/import - Create customers from a CSV body

use axum::{
    extract::{Path, Query, State},
    http::{header, StatusCode},
    response::IntoResponse,
    Json,
};
use std::sync::Arc;
use uuid::Uuid;

use crate::api::dto::{CustomerListResponse, ImportResponse, TagRequest};
use crate::api::error::ApiResult;
use crate::api::state::AppState;
use crate::integrations::{export_customers, CsvImporter};
use crate::storage::{Customer, CustomerDraft, CustomerFilter};
use crate::websocket::{ChangeAction, WsEvent};

/// GET /api/v1/customers
pub async fn list_customers(
    State(state): State<Arc<AppState>>,
    Query(filter): Query<CustomerFilter>,
) -> Json<CustomerListResponse> {
    let customers = state.store.list_customers(&filter).await;

    Json(CustomerListResponse {
        total: customers.len(),
        customers,
    })
}

/// POST /api/v1/customers
pub async fn create_customer(
    State(state): State<Arc<AppState>>,
    Json(draft): Json<CustomerDraft>,
) -> ApiResult<(StatusCode, Json<Customer>)> {
    let customer = state.store.create_customer(draft).await?;

    tracing::info!(customer_id = %customer.id, "Created customer");
    state
        .ws_hub
        .publish(WsEvent::customer(ChangeAction::Created, customer.id));

    Ok((StatusCode::CREATED, Json(customer)))
}

/// GET /api/v1/customers/:id
pub async fn get_customer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<Json<Customer>> {
    Ok(Json(state.store.get_customer(id).await?))
}

/// PUT /api/v1/customers/:id
pub async fn update_customer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(draft): Json<CustomerDraft>,
) -> ApiResult<Json<Customer>> {
    let customer = state.store.update_customer(id, draft).await?;
    state
        .ws_hub
        .publish(WsEvent::customer(ChangeAction::Updated, id));
    Ok(Json(customer))
}

/// DELETE /api/v1/customers/:id
pub async fn delete_customer(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
) -> ApiResult<StatusCode> {
    state.store.delete_customer(id).await?;

    tracing::info!(customer_id = %id, "Deleted customer");
    state
        .ws_hub
        .publish(WsEvent::customer(ChangeAction::Deleted, id));

    Ok(StatusCode::NO_CONTENT)
}

/// POST /api/v1/customers/:id/tags
pub async fn add_tag(
    State(state): State<Arc<AppState>>,
    Path(id): Path<Uuid>,
    Json(req): Json<TagRequest>,
) -> ApiResult<Json<Customer>> {
    let customer = state.store.add_customer_tag(id, &req.tag).await?;
    state
        .ws_hub
        .publish(WsEvent::customer(ChangeAction::Updated, id));
    Ok(Json(customer))
}

/// DELETE /api/v1/customers/:id/tags/:tag
pub async fn remove_tag(
    State(state): State<Arc<AppState>>,
    Path((id, tag)): Path<(Uuid, String)>,
) -> ApiResult<Json<Customer>> {
    let customer = state.store.remove_customer_tag(id, &tag).await?;
    state
        .ws_hub
        .publish(WsEvent::customer(ChangeAction::Updated, id));
    Ok(Json(customer))
}

/// GET /api/v1/customers/export
pub async fn export_csv(State(state): State<Arc<AppState>>) -> ApiResult<impl IntoResponse> {
    let customers = state.store.list_customers(&CustomerFilter::default()).await;
    let csv = export_customers(&customers)?;

    tracing::info!(rows = customers.len(), "Exported customers");

    Ok((
        [
            (header::CONTENT_TYPE, "text/csv; charset=utf-8"),
            (
                header::CONTENT_DISPOSITION,
                "attachment; filename=\"customers.csv\"",
            ),
        ],
        csv,
    ))
}

/// POST /api/v1/customers/import
///
/// Body is raw CSV with a header row. Rows that fail to parse or validate
/// are reported; the rest are created.
pub async fn import_csv(
    State(state): State<Arc<AppState>>,
    body: String,
) -> ApiResult<Json<ImportResponse>> {
    let parsed = CsvImporter::new().import(body.as_bytes())?;
    let mut errors = parsed.errors;

    let outcome = state.store.import_customers(parsed.drafts).await?;
    errors.extend(
        outcome
            .rejected
            .iter()
            .map(|(idx, reason)| format!("draft {}: {}", idx + 1, reason)),
    );

    for customer in &outcome.created {
        state
            .ws_hub
            .publish(WsEvent::customer(ChangeAction::Created, customer.id));
    }

    let rejected = parsed.rows_failed + outcome.rejected.len();
    tracing::info!(
        imported = outcome.created.len(),
        rejected,
        "Imported customers from CSV"
    );

    Ok(Json(ImportResponse {
        status: if rejected == 0 { "ok" } else { "partial" }.to_string(),
        imported: outcome.created.len(),
        rejected,
        errors,
    }))
}
