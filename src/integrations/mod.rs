//! External Integrations
//!
//! This module provides clients for the third-party services the CRM talks
//! to, plus file-based import/export:
//! - Evolution API (WhatsApp messaging gateway)
//! - n8n (workflow automation)
//! - Customer CSV import/export

mod customer_csv;
mod evolution;
mod n8n;

pub use customer_csv::{export_customers, CsvImportResult, CsvImporter};
pub use evolution::{
    ConnectResponse, EvolutionClient, GatewayEvent, SendReceipt, WebhookPayload,
};
pub use n8n::{N8nClient, N8nConfig, TriggerOutcome, WorkflowSummary};

use async_trait::async_trait;
use serde::Serialize;

/// Common trait for all remote integrations
#[async_trait]
pub trait Integration: Send + Sync {
    /// Unique name for this integration
    fn name(&self) -> &str;

    /// Human-readable description
    fn description(&self) -> &str;

    /// Whether enough settings are present to make calls
    fn is_configured(&self) -> bool;

    /// Check that the remote service answers
    async fn health_check(&self) -> Result<(), IntegrationError>;
}

/// Current status of an integration
#[derive(Debug, Clone, Serialize)]
pub struct IntegrationStatus {
    pub name: String,
    pub description: String,
    pub configured: bool,
    pub reachable: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

/// Probe an integration without failing
pub async fn probe(integration: &dyn Integration) -> IntegrationStatus {
    let configured = integration.is_configured();
    let (reachable, error) = if configured {
        match integration.health_check().await {
            Ok(()) => (true, None),
            Err(e) => (false, Some(e.to_string())),
        }
    } else {
        (false, None)
    };

    IntegrationStatus {
        name: integration.name().to_string(),
        description: integration.description().to_string(),
        configured,
        reachable,
        error,
    }
}

/// Errors that can occur during integration operations
#[derive(Debug, thiserror::Error)]
pub enum IntegrationError {
    #[error("{0} is not configured")]
    NotConfigured(&'static str),

    #[error("Request timed out")]
    Timeout,

    #[error("Service unavailable: {0}")]
    Unavailable(String),

    #[error("API error ({status}): {message}")]
    ApiError { status: u16, message: String },

    /// The service answered with a body that could not be decoded
    #[error("Invalid response: {0}")]
    InvalidResponse(String),

    /// Caller-supplied data (an uploaded file) was rejected
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Request failed: {0}")]
    Request(#[from] reqwest::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),
}

/// Classify a transport error
pub(crate) fn classify(err: reqwest::Error, service: &str) -> IntegrationError {
    if err.is_timeout() {
        IntegrationError::Timeout
    } else if err.is_connect() {
        IntegrationError::Unavailable(format!("cannot reach {}", service))
    } else {
        IntegrationError::Request(err)
    }
}

/// Turn a non-success response into an `ApiError`
pub(crate) async fn error_from_response(response: reqwest::Response) -> IntegrationError {
    let status = response.status();
    let text = response.text().await.unwrap_or_default();
    IntegrationError::ApiError {
        status: status.as_u16(),
        message: text,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct Offline;

    #[async_trait]
    impl Integration for Offline {
        fn name(&self) -> &str {
            "offline"
        }

        fn description(&self) -> &str {
            "Never configured"
        }

        fn is_configured(&self) -> bool {
            false
        }

        async fn health_check(&self) -> Result<(), IntegrationError> {
            Err(IntegrationError::Timeout)
        }
    }

    #[tokio::test]
    async fn test_probe_skips_unconfigured() {
        let status = probe(&Offline).await;
        assert_eq!(status.name, "offline");
        assert!(!status.configured);
        assert!(!status.reachable);
        assert!(status.error.is_none());
    }
}
