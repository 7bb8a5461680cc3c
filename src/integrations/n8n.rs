//! n8n Workflow Client
//!
//! Lists workflows through the public REST API and triggers them through
//! their webhook endpoints.

use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::{classify, error_from_response, Integration, IntegrationError};

const SERVICE: &str = "workflow platform";

/// Configuration for the n8n client
#[derive(Debug, Clone, PartialEq)]
pub struct N8nConfig {
    /// Base URL of the n8n instance (e.g., "http://localhost:5678")
    pub base_url: String,
    /// Public API key (`X-N8N-API-KEY`)
    pub api_key: String,
    /// Base URL webhooks are mounted under (e.g., "http://localhost:5678/webhook")
    pub webhook_url: String,
}

impl Default for N8nConfig {
    fn default() -> Self {
        Self {
            base_url: "http://localhost:5678".to_string(),
            api_key: String::new(),
            webhook_url: "http://localhost:5678/webhook".to_string(),
        }
    }
}

/// A workflow as listed by the platform
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct WorkflowSummary {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub active: bool,
}

#[derive(Debug, Deserialize)]
struct WorkflowListResponse {
    data: Vec<WorkflowSummary>,
}

/// Result of a webhook trigger
#[derive(Debug, Clone, Serialize)]
pub struct TriggerOutcome {
    /// Execution identifier reported by the workflow, if any
    pub execution_id: Option<String>,
    /// Body returned by the webhook (null when empty or not JSON)
    pub response: Value,
}

/// n8n REST/webhook client
pub struct N8nClient {
    client: Client,
    config: N8nConfig,
}

impl N8nClient {
    pub fn new(client: Client, config: N8nConfig) -> Self {
        Self { client, config }
    }

    pub fn config(&self) -> &N8nConfig {
        &self.config
    }

    /// All workflows visible to the API key
    pub async fn list_workflows(&self) -> Result<Vec<WorkflowSummary>, IntegrationError> {
        if self.config.api_key.trim().is_empty() {
            return Err(IntegrationError::NotConfigured("n8n API key"));
        }

        let url = format!(
            "{}/api/v1/workflows",
            self.config.base_url.trim_end_matches('/')
        );

        let response = self
            .client
            .get(&url)
            .header("X-N8N-API-KEY", &self.config.api_key)
            .send()
            .await
            .map_err(|e| classify(e, SERVICE))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let list: WorkflowListResponse = response
            .json()
            .await
            .map_err(|e| IntegrationError::InvalidResponse(e.to_string()))?;
        Ok(list.data)
    }

    /// POST a payload to the workflow's webhook
    pub async fn trigger(&self, workflow: &str, payload: &Value) -> Result<TriggerOutcome, IntegrationError> {
        if self.config.webhook_url.trim().is_empty() {
            return Err(IntegrationError::NotConfigured("n8n webhook URL"));
        }

        let url = format!(
            "{}/{}",
            self.config.webhook_url.trim_end_matches('/'),
            urlencoding::encode(workflow)
        );

        let response = self
            .client
            .post(&url)
            .json(payload)
            .send()
            .await
            .map_err(|e| classify(e, SERVICE))?;

        if !response.status().is_success() {
            return Err(error_from_response(response).await);
        }

        let text = response.text().await.map_err(|e| classify(e, SERVICE))?;
        let response: Value = serde_json::from_str(&text).unwrap_or(Value::Null);
        let execution_id = execution_id_of(&response);

        tracing::debug!(workflow = %workflow, execution_id = ?execution_id, "Workflow triggered");

        Ok(TriggerOutcome {
            execution_id,
            response,
        })
    }
}

/// Pull an execution id out of a webhook response
fn execution_id_of(response: &Value) -> Option<String> {
    ["executionId", "execution_id", "id"]
        .iter()
        .find_map(|key| response.get(*key))
        .and_then(|v| match v {
            Value::String(s) => Some(s.clone()),
            Value::Number(n) => Some(n.to_string()),
            _ => None,
        })
}

#[async_trait]
impl Integration for N8nClient {
    fn name(&self) -> &str {
        "n8n"
    }

    fn description(&self) -> &str {
        "Workflow automation (n8n)"
    }

    fn is_configured(&self) -> bool {
        !self.config.base_url.trim().is_empty() && !self.config.api_key.trim().is_empty()
    }

    async fn health_check(&self) -> Result<(), IntegrationError> {
        let url = format!("{}/healthz", self.config.base_url.trim_end_matches('/'));
        let response = self
            .client
            .get(&url)
            .send()
            .await
            .map_err(|e| classify(e, SERVICE))?;

        if response.status().is_success() {
            Ok(())
        } else {
            Err(error_from_response(response).await)
        }
    }
}
