//! Messaging instance registry
//!
//! Local mirror of the gateway's instances, keyed by instance name.

use std::collections::BTreeMap;
use std::path::Path;

use super::error::{StorageError, StorageResult};
use super::types::{Instance, InstanceStatus};

/// Registry of known messaging instances
#[derive(Debug, Clone, Default)]
pub struct InstanceRegistry {
    instances: BTreeMap<String, Instance>,
}

impl InstanceRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Load from JSON file
    pub fn load(path: &Path) -> StorageResult<Self> {
        if !path.exists() {
            return Ok(Self::new());
        }

        let content = std::fs::read_to_string(path)?;
        let instances: Vec<Instance> = serde_json::from_str(&content)?;

        Ok(Self {
            instances: instances
                .into_iter()
                .map(|i| (i.id.clone(), i))
                .collect(),
        })
    }

    /// Save to JSON file
    pub fn save(&self, path: &Path) -> StorageResult<()> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let list: Vec<&Instance> = self.instances.values().collect();
        let content = serde_json::to_string_pretty(&list)?;
        std::fs::write(path, content)?;
        Ok(())
    }

    pub fn len(&self) -> usize {
        self.instances.len()
    }

    pub fn is_empty(&self) -> bool {
        self.instances.is_empty()
    }

    pub fn contains(&self, id: &str) -> bool {
        self.instances.contains_key(id)
    }

    /// Register a new instance; identifiers are unique
    pub fn register(&mut self, instance: Instance) -> StorageResult<Instance> {
        if self.instances.contains_key(&instance.id) {
            return Err(StorageError::InstanceExists(instance.id));
        }
        self.instances.insert(instance.id.clone(), instance.clone());
        Ok(instance)
    }

    pub fn get(&self, id: &str) -> StorageResult<&Instance> {
        self.instances
            .get(id)
            .ok_or_else(|| StorageError::InstanceNotFound(id.to_string()))
    }

    /// Mutate an instance in place and return the result
    pub fn update<F>(&mut self, id: &str, f: F) -> StorageResult<Instance>
    where
        F: FnOnce(&mut Instance),
    {
        let instance = self
            .instances
            .get_mut(id)
            .ok_or_else(|| StorageError::InstanceNotFound(id.to_string()))?;
        f(instance);
        Ok(instance.clone())
    }

    pub fn remove(&mut self, id: &str) -> StorageResult<Instance> {
        self.instances
            .remove(id)
            .ok_or_else(|| StorageError::InstanceNotFound(id.to_string()))
    }

    /// All instances ordered by identifier
    pub fn list(&self) -> Vec<Instance> {
        self.instances.values().cloned().collect()
    }

    /// Instance count per status, every status present
    pub fn count_by_status(&self) -> BTreeMap<String, usize> {
        let mut counts: BTreeMap<String, usize> = InstanceStatus::all()
            .iter()
            .map(|s| (s.to_string(), 0))
            .collect();
        for instance in self.instances.values() {
            *counts.entry(instance.status.to_string()).or_default() += 1;
        }
        counts
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::tempdir;

    #[test]
    fn test_register_is_unique() {
        let mut registry = InstanceRegistry::new();
        registry
            .register(Instance::new("sales", None).unwrap())
            .unwrap();

        let dup = registry.register(Instance::new("sales", Some("Again")).unwrap());
        assert!(matches!(dup, Err(StorageError::InstanceExists(_))));
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_update_and_counts() {
        let mut registry = InstanceRegistry::new();
        registry
            .register(Instance::new("sales", None).unwrap())
            .unwrap();
        registry
            .register(Instance::new("support", None).unwrap())
            .unwrap();

        let updated = registry
            .update("sales", |i| {
                i.set_status(InstanceStatus::Connected);
            })
            .unwrap();
        assert_eq!(updated.status, InstanceStatus::Connected);

        let counts = registry.count_by_status();
        assert_eq!(counts["connected"], 1);
        assert_eq!(counts["disconnected"], 1);
        assert_eq!(counts["qr_ready"], 0);

        assert!(registry.update("missing", |_| {}).is_err());
    }

    #[test]
    fn test_save_and_load() {
        let dir = tempdir().unwrap();
        let path = dir.path().join("instances.json");

        let mut registry = InstanceRegistry::new();
        registry
            .register(Instance::new("sales", Some("Sales team")).unwrap())
            .unwrap();
        registry
            .update("sales", |i| i.set_qr("QR-PAYLOAD"))
            .unwrap();
        registry.save(&path).unwrap();

        let loaded = InstanceRegistry::load(&path).unwrap();
        let sales = loaded.get("sales").unwrap();
        assert_eq!(sales.display_name, "Sales team");
        assert_eq!(sales.status, InstanceStatus::QrReady);
        assert_eq!(sales.qr_code.as_deref(), Some("QR-PAYLOAD"));
    }
}
