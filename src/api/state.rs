//! Application State
//!
//! Shared state accessible by all API handlers.
//! Wrapped in Arc for thread-safe sharing across async tasks.

use reqwest::Client;
use std::sync::Arc;
use std::time::{Duration, Instant};

use crate::config::Config;
use crate::integrations::{EvolutionClient, N8nClient};
use crate::storage::CrmStore;
use crate::websocket::{ConnectionHub, HubConfig};

/// Shared application state for all handlers
#[derive(Clone)]
pub struct AppState {
    /// CRM data stores
    pub store: Arc<CrmStore>,
    /// Outbound HTTP client shared by the integration clients
    pub http: Client,
    /// Server configuration
    pub config: Arc<Config>,
    /// Server start time for uptime tracking
    pub start_time: Instant,
    /// WebSocket connection hub for live events
    pub ws_hub: ConnectionHub,
}

impl AppState {
    pub fn new(store: Arc<CrmStore>, config: Config) -> Self {
        Self::with_ws_config(store, config, HubConfig::default())
    }

    /// Create AppState with custom WebSocket hub configuration
    pub fn with_ws_config(store: Arc<CrmStore>, config: Config, hub_config: HubConfig) -> Self {
        let timeout = Duration::from_millis(config.evolution.request_timeout_ms);
        let http = match Client::builder().timeout(timeout).build() {
            Ok(client) => client,
            Err(e) => {
                tracing::warn!(error = %e, "Falling back to default HTTP client");
                Client::new()
            }
        };

        Self {
            store,
            http,
            config: Arc::new(config),
            start_time: Instant::now(),
            ws_hub: ConnectionHub::new(hub_config),
        }
    }

    /// Gateway client built from the stored settings document
    pub async fn evolution(&self) -> EvolutionClient {
        EvolutionClient::new(self.http.clone(), self.store.gateway_config().await)
    }

    /// Workflow platform client
    pub fn n8n(&self) -> N8nClient {
        N8nClient::new(self.http.clone(), self.config.n8n.client_config())
    }

    /// Get server uptime in seconds
    pub fn uptime_seconds(&self) -> u64 {
        self.start_time.elapsed().as_secs()
    }
}
