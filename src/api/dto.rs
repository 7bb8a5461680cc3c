//! Data Transfer Objects
//!
//! Request and response types for the API endpoints.
//! These types are serialized/deserialized to/from JSON.
//!
//! Customer create/update bodies are `CustomerDraft` itself, and stored
//! records are returned as-is.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeMap;

use crate::integrations::{IntegrationStatus, WorkflowSummary};
use crate::storage::{Customer, Instance, InstanceStatus, LogLevel, WorkflowLogEntry};

// ============================================
// HEALTH DTOs
// ============================================

/// `GET /api/health` body
#[derive(Debug, Serialize, Deserialize)]
pub struct HealthResponse {
    /// Always "OK" while the process serves requests
    pub status: String,
    pub message: String,
    /// RFC 3339 timestamp
    pub timestamp: String,
}

/// `GET /api/v1/status` body
#[derive(Debug, Serialize)]
pub struct StatusResponse {
    pub version: String,
    pub uptime_seconds: u64,
    pub websocket_connections: usize,
    pub customers: usize,
    pub instances: usize,
    pub log_entries: usize,
    pub documents: usize,
}

// ============================================
// CUSTOMER DTOs
// ============================================

#[derive(Debug, Serialize)]
pub struct CustomerListResponse {
    pub total: usize,
    pub customers: Vec<Customer>,
}

/// Add-tag request
#[derive(Debug, Deserialize)]
pub struct TagRequest {
    pub tag: String,
}

/// CSV import result
#[derive(Debug, Serialize)]
pub struct ImportResponse {
    /// "ok" or "partial"
    pub status: String,
    pub imported: usize,
    pub rejected: usize,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub errors: Vec<String>,
}

// ============================================
// INSTANCE DTOs
// ============================================

#[derive(Debug, Deserialize)]
pub struct CreateInstanceRequest {
    /// Gateway instance name
    pub name: String,
    #[serde(default)]
    pub display_name: Option<String>,
}

#[derive(Debug, Serialize)]
pub struct InstanceListResponse {
    pub total: usize,
    pub instances: Vec<Instance>,
}

/// Result of a connect request
#[derive(Debug, Serialize)]
pub struct ConnectInstanceResponse {
    pub instance: String,
    pub status: InstanceStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub qr_code: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub pairing_code: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct SendMessageRequest {
    /// Destination phone number
    pub number: String,
    pub text: String,
}

#[derive(Debug, Serialize)]
pub struct SendMessageResponse {
    pub instance: String,
    pub message_id: Option<String>,
    pub status: Option<String>,
}

/// Acknowledgement returned to the gateway
#[derive(Debug, Serialize)]
pub struct WebhookAck {
    pub received: bool,
    /// Whether the event changed a known instance
    pub applied: bool,
}

// ============================================
// WORKFLOW DTOs
// ============================================

#[derive(Debug, Serialize)]
pub struct WorkflowListResponse {
    /// Workflows known to the platform
    pub workflows: Vec<WorkflowSummary>,
    /// Workflow names seen in the local log
    pub logged: Vec<String>,
}

#[derive(Debug, Deserialize)]
pub struct TriggerRequest {
    pub workflow: String,
    #[serde(default)]
    pub payload: Value,
}

#[derive(Debug, Serialize)]
pub struct TriggerResponse {
    pub entry: WorkflowLogEntry,
    pub response: Value,
}

/// Log entry reported by a workflow
#[derive(Debug, Deserialize)]
pub struct AppendLogRequest {
    pub level: LogLevel,
    pub workflow: String,
    #[serde(default)]
    pub execution_id: Option<String>,
    pub message: String,
    #[serde(default)]
    pub duration_ms: Option<u64>,
    #[serde(default)]
    pub timestamp: Option<DateTime<Utc>>,
}

#[derive(Debug, Serialize)]
pub struct LogListResponse {
    pub total: usize,
    pub entries: Vec<WorkflowLogEntry>,
}

#[derive(Debug, Serialize)]
pub struct ClearLogsResponse {
    pub removed: usize,
}

// ============================================
// DASHBOARD / REPORT DTOs
// ============================================

#[derive(Debug, Serialize)]
pub struct DashboardResponse {
    pub total_customers: usize,
    pub customers_by_status: BTreeMap<String, usize>,
    pub instances_by_status: BTreeMap<String, usize>,
    pub logs_by_level: BTreeMap<String, usize>,
    pub recent_customers: Vec<Customer>,
}

#[derive(Debug, Serialize)]
pub struct CustomerReportResponse {
    pub total: usize,
    pub by_status: BTreeMap<String, usize>,
    pub by_source: BTreeMap<String, usize>,
    pub by_agent: BTreeMap<String, usize>,
}

#[derive(Debug, Serialize)]
pub struct IntegrationsResponse {
    pub integrations: Vec<IntegrationStatus>,
}

/// Public values handed to the browser bundle
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientConfigResponse {
    pub api_url: Option<String>,
    pub supabase_url: String,
    pub supabase_anon_key: String,
    pub instance_name: String,
    pub n8n_webhook_url: String,
}
