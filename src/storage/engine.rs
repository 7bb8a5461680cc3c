//! CRM store
//!
//! Orchestrates the individual stores under one data directory:
//!
//! ```text
//! data_dir/
//!   customers.json          CustomerStore
//!   instances.json          InstanceRegistry
//!   workflow_logs.ndjson    WorkflowLogStore
//!   documents.json          DocumentStore (settings, gateway config)
//! ```
//!
//! Each store sits behind a Tokio `RwLock`; every mutation is persisted
//! before the write lock is released.

use std::collections::BTreeMap;
use std::path::PathBuf;
use tokio::sync::RwLock;
use uuid::Uuid;

use super::customers::{CustomerDraft, CustomerFilter, CustomerStore};
use super::documents::DocumentStore;
use super::error::StorageResult;
use super::instances::InstanceRegistry;
use super::logs::{LogFilter, LogSummary, WorkflowLogStore, DEFAULT_MAX_LOG_ENTRIES};
use super::settings::{
    GatewayConfig, NotificationKey, NotificationSettings, GATEWAY_CONFIG_KEY,
    NOTIFICATION_SETTINGS_KEY,
};
use super::types::{Customer, Instance, WorkflowLogEntry};

/// Configuration for the CRM store
#[derive(Debug, Clone)]
pub struct StorageConfig {
    /// Root directory for all data
    pub data_dir: PathBuf,
    /// Maximum workflow log entries retained
    pub max_log_entries: usize,
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: PathBuf::from("crmdesk_data"),
            max_log_entries: DEFAULT_MAX_LOG_ENTRIES,
        }
    }
}

impl StorageConfig {
    pub fn new(data_dir: impl Into<PathBuf>) -> Self {
        Self {
            data_dir: data_dir.into(),
            ..Default::default()
        }
    }

    pub fn customers_path(&self) -> PathBuf {
        self.data_dir.join("customers.json")
    }

    pub fn instances_path(&self) -> PathBuf {
        self.data_dir.join("instances.json")
    }

    pub fn logs_path(&self) -> PathBuf {
        self.data_dir.join("workflow_logs.ndjson")
    }

    pub fn documents_path(&self) -> PathBuf {
        self.data_dir.join("documents.json")
    }
}

/// Record counts across the stores
#[derive(Debug, Clone, serde::Serialize)]
pub struct StoreStats {
    pub customers: usize,
    pub instances: usize,
    pub log_entries: usize,
    pub documents: usize,
}

impl std::fmt::Display for StoreStats {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "customers={}, instances={}, log_entries={}, documents={}",
            self.customers, self.instances, self.log_entries, self.documents
        )
    }
}

/// Outcome of a bulk customer import
#[derive(Debug, Default)]
pub struct ImportOutcome {
    pub created: Vec<Customer>,
    /// (row index, reason) for rejected drafts
    pub rejected: Vec<(usize, String)>,
}

/// Thread-safe access to all CRM data
pub struct CrmStore {
    config: StorageConfig,
    customers: RwLock<CustomerStore>,
    instances: RwLock<InstanceRegistry>,
    logs: RwLock<WorkflowLogStore>,
    documents: RwLock<DocumentStore>,
    gateway_default: GatewayConfig,
}

impl CrmStore {
    /// Open (or create) the stores under `config.data_dir`
    pub async fn open(config: StorageConfig) -> StorageResult<Self> {
        tokio::fs::create_dir_all(&config.data_dir).await?;

        let customers = CustomerStore::load(&config.customers_path())?;
        let instances = InstanceRegistry::load(&config.instances_path())?;
        let logs = WorkflowLogStore::open(&config.logs_path(), config.max_log_entries)?;
        let documents = DocumentStore::open(&config.documents_path())?;

        tracing::info!(
            data_dir = %config.data_dir.display(),
            customers = customers.len(),
            instances = instances.len(),
            log_entries = logs.len(),
            "CRM store opened"
        );

        Ok(Self {
            config,
            customers: RwLock::new(customers),
            instances: RwLock::new(instances),
            logs: RwLock::new(logs),
            documents: RwLock::new(documents),
            gateway_default: GatewayConfig::default(),
        })
    }

    /// Builder method: gateway settings used when no document is stored
    pub fn with_gateway_default(mut self, gateway: GatewayConfig) -> Self {
        self.gateway_default = gateway;
        self
    }

    pub fn config(&self) -> &StorageConfig {
        &self.config
    }

    pub async fn stats(&self) -> StoreStats {
        StoreStats {
            customers: self.customers.read().await.len(),
            instances: self.instances.read().await.len(),
            log_entries: self.logs.read().await.len(),
            documents: self.documents.read().await.keys().len(),
        }
    }

    // ============================================
    // CUSTOMERS
    // ============================================

    pub async fn list_customers(&self, filter: &CustomerFilter) -> Vec<Customer> {
        self.customers.read().await.list(filter)
    }

    pub async fn get_customer(&self, id: Uuid) -> StorageResult<Customer> {
        self.customers.read().await.get(id).cloned()
    }

    pub async fn create_customer(&self, draft: CustomerDraft) -> StorageResult<Customer> {
        let mut customers = self.customers.write().await;
        let path = self.config.customers_path();
        commit(&mut *customers, |c| c.create(draft), |c| c.save(&path))
    }

    pub async fn update_customer(&self, id: Uuid, draft: CustomerDraft) -> StorageResult<Customer> {
        let mut customers = self.customers.write().await;
        let path = self.config.customers_path();
        commit(&mut *customers, |c| c.update(id, draft), |c| c.save(&path))
    }

    pub async fn delete_customer(&self, id: Uuid) -> StorageResult<Customer> {
        let mut customers = self.customers.write().await;
        let path = self.config.customers_path();
        commit(&mut *customers, |c| c.delete(id), |c| c.save(&path))
    }

    pub async fn add_customer_tag(&self, id: Uuid, tag: &str) -> StorageResult<Customer> {
        let mut customers = self.customers.write().await;
        let path = self.config.customers_path();
        commit(&mut *customers, |c| c.add_tag(id, tag), |c| c.save(&path))
    }

    pub async fn remove_customer_tag(&self, id: Uuid, tag: &str) -> StorageResult<Customer> {
        let mut customers = self.customers.write().await;
        let path = self.config.customers_path();
        commit(&mut *customers, |c| c.remove_tag(id, tag), |c| c.save(&path))
    }

    /// Create customers from drafts; invalid drafts are reported, not fatal
    pub async fn import_customers(&self, drafts: Vec<CustomerDraft>) -> StorageResult<ImportOutcome> {
        let mut customers = self.customers.write().await;
        let path = self.config.customers_path();

        commit(
            &mut *customers,
            |c| {
                let mut outcome = ImportOutcome::default();
                for (idx, draft) in drafts.into_iter().enumerate() {
                    match c.create(draft) {
                        Ok(customer) => outcome.created.push(customer),
                        Err(e) => outcome.rejected.push((idx, e.to_string())),
                    }
                }
                Ok(outcome)
            },
            |c| c.save(&path),
        )
    }

    pub async fn customer_counts(&self) -> BTreeMap<String, usize> {
        self.customers.read().await.count_by_status()
    }

    /// Customers grouped by source and by assigned agent
    pub async fn customer_breakdown(&self) -> (BTreeMap<String, usize>, BTreeMap<String, usize>) {
        let customers = self.customers.read().await;
        (
            customers.count_by(|c| c.source.as_deref()),
            customers.count_by(|c| c.assigned_to.as_deref()),
        )
    }

    // ============================================
    // INSTANCES
    // ============================================

    pub async fn list_instances(&self) -> Vec<Instance> {
        self.instances.read().await.list()
    }

    pub async fn get_instance(&self, id: &str) -> StorageResult<Instance> {
        self.instances.read().await.get(id).cloned()
    }

    pub async fn has_instance(&self, id: &str) -> bool {
        self.instances.read().await.contains(id)
    }

    pub async fn register_instance(&self, instance: Instance) -> StorageResult<Instance> {
        let mut instances = self.instances.write().await;
        let path = self.config.instances_path();
        commit(&mut *instances, |r| r.register(instance), |r| r.save(&path))
    }

    pub async fn update_instance<F>(&self, id: &str, f: F) -> StorageResult<Instance>
    where
        F: FnOnce(&mut Instance),
    {
        let mut instances = self.instances.write().await;
        let path = self.config.instances_path();
        commit(&mut *instances, |r| r.update(id, f), |r| r.save(&path))
    }

    pub async fn remove_instance(&self, id: &str) -> StorageResult<Instance> {
        let mut instances = self.instances.write().await;
        let path = self.config.instances_path();
        commit(&mut *instances, |r| r.remove(id), |r| r.save(&path))
    }

    pub async fn instance_counts(&self) -> BTreeMap<String, usize> {
        self.instances.read().await.count_by_status()
    }

    // ============================================
    // WORKFLOW LOGS
    // ============================================

    pub async fn append_log(&self, entry: WorkflowLogEntry) -> StorageResult<()> {
        self.logs.write().await.append(entry)
    }

    pub async fn query_logs(&self, filter: &LogFilter) -> Vec<WorkflowLogEntry> {
        self.logs.read().await.query(filter)
    }

    pub async fn clear_logs(&self) -> StorageResult<usize> {
        self.logs.write().await.clear()
    }

    pub async fn log_summary(&self) -> LogSummary {
        self.logs.read().await.summary()
    }

    pub async fn log_workflows(&self) -> Vec<String> {
        self.logs.read().await.workflows()
    }

    // ============================================
    // DOCUMENTS & SETTINGS
    // ============================================

    pub async fn document_keys(&self) -> Vec<String> {
        self.documents.read().await.keys()
    }

    pub async fn get_document(&self, key: &str) -> Option<String> {
        self.documents.read().await.get(key).map(str::to_string)
    }

    pub async fn set_document(&self, key: &str, value: String) -> StorageResult<()> {
        self.documents.write().await.set(key, value)
    }

    pub async fn remove_document(&self, key: &str) -> StorageResult<Option<String>> {
        self.documents.write().await.remove(key)
    }

    pub async fn notification_settings(&self) -> NotificationSettings {
        self.documents
            .read()
            .await
            .load_or_default(NOTIFICATION_SETTINGS_KEY)
    }

    pub async fn save_notification_settings(&self, settings: &NotificationSettings) -> StorageResult<()> {
        self.documents
            .write()
            .await
            .save(NOTIFICATION_SETTINGS_KEY, settings)
    }

    /// Flip one notification switch, returning the updated settings
    pub async fn toggle_notification(&self, key: NotificationKey) -> StorageResult<NotificationSettings> {
        let mut documents = self.documents.write().await;
        let mut settings: NotificationSettings = documents.load_or_default(NOTIFICATION_SETTINGS_KEY);
        settings.toggle(key);
        documents.save(NOTIFICATION_SETTINGS_KEY, &settings)?;
        Ok(settings)
    }

    /// Stored gateway settings, or the default when missing or malformed
    /// Stored gateway settings over the configured default
    pub async fn gateway_config(&self) -> GatewayConfig {
        let documents = self.documents.read().await;
        let Some(text) = documents.get(GATEWAY_CONFIG_KEY) else {
            return self.gateway_default.clone();
        };
        GatewayConfig::overlay(&self.gateway_default, text).unwrap_or_else(|e| {
            tracing::debug!(error = %e, "Stored gateway config is malformed, using default");
            self.gateway_default.clone()
        })
    }

    pub async fn save_gateway_config(&self, config: &GatewayConfig) -> StorageResult<()> {
        self.documents.write().await.save(GATEWAY_CONFIG_KEY, config)
    }

    /// Forget the stored gateway settings and return the default
    pub async fn reset_gateway_config(&self) -> StorageResult<GatewayConfig> {
        self.documents.write().await.remove(GATEWAY_CONFIG_KEY)?;
        Ok(self.gateway_default.clone())
    }
}

/// Apply `change` to a copy of `current` and swap the copy in only after
/// `save` succeeds, so a failed write leaves memory matching disk.
fn commit<S, T>(
    current: &mut S,
    change: impl FnOnce(&mut S) -> StorageResult<T>,
    save: impl FnOnce(&S) -> StorageResult<()>,
) -> StorageResult<T>
where
    S: Clone,
{
    let mut staged = current.clone();
    let out = change(&mut staged)?;
    save(&staged)?;
    *current = staged;
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::types::LogLevel;
    use tempfile::tempdir;

    async fn open_store(dir: &std::path::Path) -> CrmStore {
        CrmStore::open(StorageConfig::new(dir)).await.unwrap()
    }

    #[tokio::test]
    async fn test_customers_survive_reopen() {
        let dir = tempdir().unwrap();
        let created = {
            let store = open_store(dir.path()).await;
            store
                .create_customer(CustomerDraft::new("Ana", "+5511"))
                .await
                .unwrap()
        };

        let store = open_store(dir.path()).await;
        let loaded = store.get_customer(created.id).await.unwrap();
        assert_eq!(loaded, created);
    }

    #[tokio::test]
    async fn test_gateway_config_round_trip() {
        let dir = tempdir().unwrap();
        let config = GatewayConfig {
            base_url: "https://gw.example.com".to_string(),
            api_key: "secret".to_string(),
            instance_name: "sales".to_string(),
            webhook_url: String::new(),
        };

        {
            let store = open_store(dir.path()).await;
            store.save_gateway_config(&config).await.unwrap();
        }

        let store = open_store(dir.path()).await;
        assert_eq!(store.gateway_config().await, config);
    }

    #[tokio::test]
    async fn test_malformed_gateway_config_uses_default() {
        let dir = tempdir().unwrap();
        let default = GatewayConfig {
            base_url: "http://gateway.internal:8080".to_string(),
            ..GatewayConfig::default()
        };
        let store = open_store(dir.path())
            .await
            .with_gateway_default(default.clone());

        store
            .set_document(GATEWAY_CONFIG_KEY, "not json".to_string())
            .await
            .unwrap();
        assert_eq!(store.gateway_config().await, default);

        assert_eq!(store.reset_gateway_config().await.unwrap(), default);
        assert!(store.get_document(GATEWAY_CONFIG_KEY).await.is_none());
    }

    #[tokio::test]
    async fn test_partial_gateway_config_keeps_configured_default() {
        let dir = tempdir().unwrap();
        let default = GatewayConfig {
            base_url: "http://gateway.internal:8080".to_string(),
            instance_name: "sales".to_string(),
            ..GatewayConfig::default()
        };
        let store = open_store(dir.path())
            .await
            .with_gateway_default(default);

        store
            .set_document(GATEWAY_CONFIG_KEY, r#"{"apiKey":"secret"}"#.to_string())
            .await
            .unwrap();

        let config = store.gateway_config().await;
        assert_eq!(config.base_url, "http://gateway.internal:8080");
        assert_eq!(config.instance_name, "sales");
        assert_eq!(config.api_key, "secret");
    }

    #[tokio::test]
    async fn test_toggle_notification_persists() {
        let dir = tempdir().unwrap();
        {
            let store = open_store(dir.path()).await;
            let settings = store
                .toggle_notification(NotificationKey::DailyReport)
                .await
                .unwrap();
            assert!(settings.daily_report);
        }

        let store = open_store(dir.path()).await;
        let settings = store.notification_settings().await;
        assert!(settings.daily_report);
        assert_eq!(
            NotificationSettings {
                daily_report: false,
                ..settings
            },
            NotificationSettings::default()
        );
    }

    #[tokio::test]
    async fn test_import_reports_rejected_rows() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path()).await;

        let outcome = store
            .import_customers(vec![
                CustomerDraft::new("Ana", "111"),
                CustomerDraft::new("", "222"),
                CustomerDraft::new("Caio", "333"),
            ])
            .await
            .unwrap();

        assert_eq!(outcome.created.len(), 2);
        assert_eq!(outcome.rejected.len(), 1);
        assert_eq!(outcome.rejected[0].0, 1);
        assert_eq!(store.stats().await.customers, 2);
    }

    #[tokio::test]
    async fn test_logs_survive_reopen() {
        let dir = tempdir().unwrap();
        {
            let store = open_store(dir.path()).await;
            store
                .append_log(WorkflowLogEntry::new(LogLevel::Success, "welcome", "e1", "sent"))
                .await
                .unwrap();
        }

        let store = open_store(dir.path()).await;
        assert_eq!(store.log_summary().await.total, 1);
        assert_eq!(store.log_workflows().await, vec!["welcome"]);
    }

    #[tokio::test]
    async fn test_failed_save_leaves_memory_unchanged() {
        let dir = tempdir().unwrap();
        let store = open_store(dir.path()).await;
        let ana = store
            .create_customer(CustomerDraft::new("Ana", "111"))
            .await
            .unwrap();
        store
            .register_instance(Instance::new("sales", None).unwrap())
            .await
            .unwrap();

        // A directory where the files should be makes every write fail
        let config = store.config().clone();
        std::fs::remove_file(config.customers_path()).unwrap();
        std::fs::create_dir(config.customers_path()).unwrap();
        std::fs::remove_file(config.instances_path()).unwrap();
        std::fs::create_dir(config.instances_path()).unwrap();

        assert!(store
            .create_customer(CustomerDraft::new("Bia", "222"))
            .await
            .is_err());
        assert!(store.delete_customer(ana.id).await.is_err());
        assert!(store.add_customer_tag(ana.id, "vip").await.is_err());
        assert!(store
            .import_customers(vec![CustomerDraft::new("Caio", "333")])
            .await
            .is_err());

        let customers = store.list_customers(&CustomerFilter::default()).await;
        assert_eq!(customers, vec![ana]);

        assert!(store.remove_instance("sales").await.is_err());
        assert!(store
            .register_instance(Instance::new("support", None).unwrap())
            .await
            .is_err());
        assert!(store.has_instance("sales").await);
        assert!(!store.has_instance("support").await);
    }
}
