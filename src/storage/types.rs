//! Core record types for the CRM data layer
//!
//! This module defines the entities the frontend pages work with:
//! - `Customer`: a contact tracked through the sales funnel
//! - `Instance`: a messaging-gateway session and its pairing state
//! - `WorkflowLogEntry`: one line of workflow-automation output
//! - `CustomerStatus`, `InstanceStatus` and `LogLevel`: classification enums

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::str::FromStr;
use uuid::Uuid;

use super::error::{StorageError, StorageResult};

/// Funnel position of a customer
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum CustomerStatus {
    /// Lead that has not converted yet
    #[default]
    Prospect,
    /// Engaged lead in an open conversation
    Active,
    /// Paying customer
    Customer,
    /// No longer engaged
    Inactive,
}

impl CustomerStatus {
    /// Get all statuses for iteration
    pub fn all() -> &'static [CustomerStatus] {
        &[
            CustomerStatus::Prospect,
            CustomerStatus::Active,
            CustomerStatus::Customer,
            CustomerStatus::Inactive,
        ]
    }
}

impl std::fmt::Display for CustomerStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            CustomerStatus::Prospect => write!(f, "prospect"),
            CustomerStatus::Active => write!(f, "active"),
            CustomerStatus::Customer => write!(f, "customer"),
            CustomerStatus::Inactive => write!(f, "inactive"),
        }
    }
}

impl FromStr for CustomerStatus {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "prospect" => Ok(CustomerStatus::Prospect),
            "active" => Ok(CustomerStatus::Active),
            "customer" => Ok(CustomerStatus::Customer),
            "inactive" => Ok(CustomerStatus::Inactive),
            other => Err(StorageError::invalid(
                "status",
                format!("'{}' (use prospect, active, customer, or inactive)", other),
            )),
        }
    }
}

/// A CRM contact
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Customer {
    pub id: Uuid,
    pub name: String,
    #[serde(default)]
    pub email: Option<String>,
    pub phone: String,
    #[serde(default)]
    pub status: CustomerStatus,
    /// Where the lead came from (e.g. "whatsapp", "website")
    #[serde(default)]
    pub source: Option<String>,
    #[serde(default)]
    pub notes: Option<String>,
    /// Free-form labels, unique and kept in insertion order
    #[serde(default)]
    pub tags: Vec<String>,
    /// Label of the agent responsible for this customer
    #[serde(default)]
    pub assigned_to: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Customer {
    /// Check for a tag, ignoring case
    pub fn has_tag(&self, tag: &str) -> bool {
        let tag = tag.trim();
        self.tags.iter().any(|t| same_tag(t, tag))
    }

    /// Case-insensitive match against name, email, phone and notes
    pub fn matches_search(&self, needle: &str) -> bool {
        let needle = needle.trim().to_lowercase();
        if needle.is_empty() {
            return true;
        }

        let haystacks = [
            Some(self.name.as_str()),
            self.email.as_deref(),
            Some(self.phone.as_str()),
            self.notes.as_deref(),
        ];

        haystacks
            .iter()
            .flatten()
            .any(|h| h.to_lowercase().contains(&needle))
    }
}

/// Tags compare equal under Unicode lowercasing ("Ação" == "AÇÃO")
pub fn same_tag(a: &str, b: &str) -> bool {
    a == b || a.to_lowercase() == b.to_lowercase()
}

/// Connection state of a messaging instance
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "snake_case")]
pub enum InstanceStatus {
    #[default]
    Disconnected,
    Connecting,
    /// A pairing QR code is waiting to be scanned
    QrReady,
    Connected,
}

impl InstanceStatus {
    pub fn all() -> &'static [InstanceStatus] {
        &[
            InstanceStatus::Disconnected,
            InstanceStatus::Connecting,
            InstanceStatus::QrReady,
            InstanceStatus::Connected,
        ]
    }

    /// Map a gateway connection state (`open`, `connecting`, `close`)
    pub fn from_gateway_state(state: &str) -> Option<Self> {
        match state.trim().to_lowercase().as_str() {
            "open" | "connected" => Some(InstanceStatus::Connected),
            "connecting" => Some(InstanceStatus::Connecting),
            "close" | "closed" | "disconnected" => Some(InstanceStatus::Disconnected),
            _ => None,
        }
    }
}

impl std::fmt::Display for InstanceStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            InstanceStatus::Disconnected => write!(f, "disconnected"),
            InstanceStatus::Connecting => write!(f, "connecting"),
            InstanceStatus::QrReady => write!(f, "qr_ready"),
            InstanceStatus::Connected => write!(f, "connected"),
        }
    }
}

/// A messaging-gateway session
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Instance {
    /// Gateway instance name, used as the key on both sides
    pub id: String,
    pub display_name: String,
    #[serde(default)]
    pub status: InstanceStatus,
    #[serde(default)]
    pub phone_number: Option<String>,
    /// Pairing QR payload, only present while `status == QrReady`
    #[serde(default)]
    pub qr_code: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl Instance {
    /// Create a disconnected instance, validating the identifier
    pub fn new(id: &str, display_name: Option<&str>) -> StorageResult<Self> {
        let id = id.trim();
        validate_instance_id(id)?;

        let display_name = display_name
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .unwrap_or(id)
            .to_string();

        let now = Utc::now();
        Ok(Self {
            id: id.to_string(),
            display_name,
            status: InstanceStatus::Disconnected,
            phone_number: None,
            qr_code: None,
            created_at: now,
            updated_at: now,
        })
    }

    /// Move to a new status. Leaving `QrReady` drops the QR payload.
    ///
    /// Returns true if anything changed.
    pub fn set_status(&mut self, status: InstanceStatus) -> bool {
        let changed = self.status != status || (status != InstanceStatus::QrReady && self.qr_code.is_some());
        self.status = status;
        if status != InstanceStatus::QrReady {
            self.qr_code = None;
        }
        if changed {
            self.updated_at = Utc::now();
        }
        changed
    }

    /// Store a fresh pairing QR code
    pub fn set_qr(&mut self, qr_code: impl Into<String>) {
        self.status = InstanceStatus::QrReady;
        self.qr_code = Some(qr_code.into());
        self.updated_at = Utc::now();
    }

    /// Record the paired phone number
    pub fn set_phone_number(&mut self, phone: impl Into<String>) {
        self.phone_number = Some(phone.into());
        self.updated_at = Utc::now();
    }
}

fn validate_instance_id(id: &str) -> StorageResult<()> {
    if id.is_empty() {
        return Err(StorageError::invalid("instance id", "cannot be empty"));
    }
    if id.len() > 64 {
        return Err(StorageError::invalid(
            "instance id",
            "exceeds maximum length of 64 characters",
        ));
    }
    if !id
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    {
        return Err(StorageError::invalid(
            "instance id",
            "must contain only ASCII letters, digits, '-' and '_'",
        ));
    }
    Ok(())
}

/// Severity of a workflow log entry
#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq, Hash, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    #[default]
    Info,
    Success,
    Warning,
    Error,
}

impl LogLevel {
    pub fn all() -> &'static [LogLevel] {
        &[
            LogLevel::Info,
            LogLevel::Success,
            LogLevel::Warning,
            LogLevel::Error,
        ]
    }
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            LogLevel::Info => write!(f, "info"),
            LogLevel::Success => write!(f, "success"),
            LogLevel::Warning => write!(f, "warning"),
            LogLevel::Error => write!(f, "error"),
        }
    }
}

impl FromStr for LogLevel {
    type Err = StorageError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "info" => Ok(LogLevel::Info),
            "success" => Ok(LogLevel::Success),
            "warning" | "warn" => Ok(LogLevel::Warning),
            "error" => Ok(LogLevel::Error),
            other => Err(StorageError::invalid(
                "level",
                format!("'{}' (use info, success, warning, or error)", other),
            )),
        }
    }
}

/// One line of workflow execution output
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct WorkflowLogEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Utc>,
    pub level: LogLevel,
    pub message: String,
    pub workflow: String,
    pub execution_id: String,
    /// Execution time in milliseconds
    #[serde(default)]
    pub duration_ms: Option<u64>,
}

impl WorkflowLogEntry {
    /// Create an entry stamped with the current time
    pub fn new(
        level: LogLevel,
        workflow: impl Into<String>,
        execution_id: impl Into<String>,
        message: impl Into<String>,
    ) -> Self {
        Self {
            id: Uuid::new_v4(),
            timestamp: Utc::now(),
            level,
            message: message.into(),
            workflow: workflow.into(),
            execution_id: execution_id.into(),
            duration_ms: None,
        }
    }

    /// Builder method: set the duration
    pub fn duration_ms(mut self, duration_ms: u64) -> Self {
        self.duration_ms = Some(duration_ms);
        self
    }

    /// Builder method: set the timestamp
    pub fn timestamp(mut self, timestamp: DateTime<Utc>) -> Self {
        self.timestamp = timestamp;
        self
    }
}
