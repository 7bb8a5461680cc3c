//! WebSocket Message Types
//!
//! Defines all message types for WebSocket communication between
//! browser pages and the crmdesk server.

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::storage::{Instance, InstanceStatus, WorkflowLogEntry};

/// Messages sent from client to server
#[derive(Debug, Clone, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ClientMessage {
    /// Subscribe to topics for real-time updates
    Subscribe {
        /// List of topics to subscribe to (e.g., "customers", "instances.*")
        topics: Vec<String>,
    },
    /// Unsubscribe from topics
    Unsubscribe {
        /// List of topics to unsubscribe from
        topics: Vec<String>,
    },
    /// Ping for keepalive
    Ping,
}

/// What happened to a customer record
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ChangeAction {
    Created,
    Updated,
    Deleted,
}

/// Messages sent from server to client
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum ServerMessage {
    /// A customer was created, edited or deleted
    CustomerChanged {
        action: ChangeAction,
        customer_id: Uuid,
    },
    /// A messaging instance changed status or received a new QR code
    InstanceStatus {
        instance: String,
        status: InstanceStatus,
        #[serde(skip_serializing_if = "Option::is_none")]
        qr_code: Option<String>,
        #[serde(skip_serializing_if = "Option::is_none")]
        phone_number: Option<String>,
    },
    /// A workflow log entry was recorded
    WorkflowLog { entry: WorkflowLogEntry },
    /// Server-side notice
    System { message: String },
    /// Subscription confirmed
    Subscribed {
        /// Topics successfully subscribed to
        topics: Vec<String>,
    },
    /// Unsubscription confirmed
    Unsubscribed {
        /// Topics successfully unsubscribed from
        topics: Vec<String>,
    },
    /// Pong response to ping
    Pong,
    /// Error message
    Error {
        /// Error description
        message: String,
    },
    /// Connection established
    Connected {
        /// Unique connection identifier
        connection_id: String,
    },
}

/// Internal event for broadcasting through the hub
#[derive(Debug, Clone)]
pub struct WsEvent {
    /// Topic this event belongs to (e.g., "instances.sales")
    pub topic: String,
    /// The message to send to subscribers
    pub message: ServerMessage,
}

impl WsEvent {
    pub fn customer(action: ChangeAction, customer_id: Uuid) -> Self {
        Self {
            topic: "customers".to_string(),
            message: ServerMessage::CustomerChanged {
                action,
                customer_id,
            },
        }
    }

    /// Snapshot of an instance's connection state
    pub fn instance(instance: &Instance) -> Self {
        Self {
            topic: format!("instances.{}", instance.id),
            message: ServerMessage::InstanceStatus {
                instance: instance.id.clone(),
                status: instance.status,
                qr_code: instance.qr_code.clone(),
                phone_number: instance.phone_number.clone(),
            },
        }
    }

    pub fn workflow_log(entry: &WorkflowLogEntry) -> Self {
        Self {
            topic: format!("workflows.{}", entry.workflow),
            message: ServerMessage::WorkflowLog {
                entry: entry.clone(),
            },
        }
    }

    /// Create a system event
    pub fn system(message: &str) -> Self {
        Self {
            topic: "system".to_string(),
            message: ServerMessage::System {
                message: message.to_string(),
            },
        }
    }
}
