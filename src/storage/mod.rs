//! CRM Data Layer
//!
//! This module provides the records and stores behind the frontend pages:
//!
//! - **types**: Core records (Customer, Instance, WorkflowLogEntry)
//! - **customers**: Customer form drafts, filters and the customer store
//! - **instances**: Messaging instance registry
//! - **logs**: Bounded workflow log
//! - **documents**: Key/value document store (`localStorage` semantics)
//! - **settings**: Notification switches and gateway settings documents
//! - **engine**: `CrmStore`, orchestrating all of the above on disk
//! - **error**: Error types
//!
//! # Example
//!
//! ```rust,no_run
//! use crmdesk::storage::{CrmStore, CustomerDraft, StorageConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = CrmStore::open(StorageConfig::new("./data")).await?;
//!
//!     let mut draft = CustomerDraft::new("Ana Lima", "+55 11 98888-7777");
//!     draft.tag_input = "vip".to_string();
//!     draft.add_tag();
//!
//!     let customer = store.create_customer(draft).await?;
//!     println!("Created {}", customer.id);
//!
//!     Ok(())
//! }
//! ```

pub mod customers;
pub mod documents;
pub mod engine;
pub mod error;
pub mod instances;
pub mod logs;
pub mod settings;
pub mod types;

// Re-export commonly used types
pub use customers::{CustomerDraft, CustomerFilter, CustomerStore};
pub use documents::DocumentStore;
pub use engine::{CrmStore, ImportOutcome, StorageConfig, StoreStats};
pub use error::{StorageError, StorageResult};
pub use instances::InstanceRegistry;
pub use logs::{
    LogFilter, LogSummary, WorkflowLogStore, DEFAULT_MAX_LOG_ENTRIES, MAX_LOG_DURATION_MS,
};
pub use settings::{
    GatewayConfig, NotificationKey, NotificationSettings, GATEWAY_CONFIG_KEY,
    NOTIFICATION_SETTINGS_KEY,
};
pub use types::{
    Customer, CustomerStatus, Instance, InstanceStatus, LogLevel, WorkflowLogEntry,
};
