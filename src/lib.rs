//! # crmdesk
//!
//! Server side of a small WhatsApp-centric CRM: a static host for the
//! single-page frontend, a JSON API backing its pages, and a build-time
//! configurator that injects deployment endpoints into the frontend sources.
//!
//! ## Modules
//!
//! - [`storage`]: Customers, messaging instances, workflow logs and documents
//! - [`integrations`]: Messaging gateway and workflow platform clients, CSV
//! - [`api`]: HTTP server with Axum (static fallback + JSON API)
//! - [`websocket`]: Live events for open pages
//! - [`configurator`]: Build-time endpoint injection
//! - [`config`]: TOML configuration with environment overrides
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use crmdesk::storage::{CrmStore, CustomerDraft, CustomerFilter, StorageConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = CrmStore::open(StorageConfig::new("./crm_data")).await?;
//!
//!     store.create_customer(CustomerDraft::new("Ana Lima", "+55 11 98888-7777")).await?;
//!
//!     let customers = store.list_customers(&CustomerFilter::default()).await;
//!     println!("{} customers", customers.len());
//!
//!     Ok(())
//! }
//! ```

pub mod api;
pub mod config;
pub mod configurator;
pub mod integrations;
pub mod logging;
pub mod storage;
pub mod websocket;

// Re-export top-level types for convenience
pub use storage::{
    CrmStore, Customer, CustomerDraft, CustomerStatus, Instance, InstanceStatus, LogLevel,
    StorageError, StorageResult, WorkflowLogEntry,
};

pub use api::{build_router, serve, ApiError, AppState};

pub use websocket::{ClientMessage, ConnectionHub, HubConfig, HubError, ServerMessage, WsEvent};

pub use config::{Config, ConfigError, LoggingConfig};

pub use integrations::{
    EvolutionClient, Integration, IntegrationError, IntegrationStatus, N8nClient,
};

pub use configurator::{BuildEnv, Configurator, ConfiguratorError, Manifest};
