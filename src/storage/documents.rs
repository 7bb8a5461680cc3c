//! Document store
//!
//! Key → serialized-text store with browser `localStorage` semantics:
//! values are opaque strings, a write replaces the previous value, and the
//! last write wins. Typed helpers decode JSON and fall back to the type's
//! default when a value is missing or malformed.

use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};

use super::error::{StorageError, StorageResult};

const MAX_KEY_LEN: usize = 128;

/// Persistent key/value document store
#[derive(Debug, Default)]
pub struct DocumentStore {
    documents: BTreeMap<String, String>,
    path: Option<PathBuf>,
}

impl DocumentStore {
    /// In-memory store
    pub fn new() -> Self {
        Self::default()
    }

    /// Open a file-backed store
    pub fn open(path: &Path) -> StorageResult<Self> {
        let documents = if path.exists() {
            let content = std::fs::read_to_string(path)?;
            serde_json::from_str(&content)?
        } else {
            BTreeMap::new()
        };

        Ok(Self {
            documents,
            path: Some(path.to_path_buf()),
        })
    }

    pub fn keys(&self) -> Vec<String> {
        self.documents.keys().cloned().collect()
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.documents.get(key).map(String::as_str)
    }

    /// Store `value` under `key`. On a failed write the previous value is
    /// restored.
    pub fn set(&mut self, key: &str, value: impl Into<String>) -> StorageResult<()> {
        validate_key(key)?;
        let previous = self.documents.insert(key.to_string(), value.into());
        if let Err(e) = self.persist() {
            self.restore(key, previous);
            return Err(e);
        }
        Ok(())
    }

    /// Remove a key; returns the previous value
    pub fn remove(&mut self, key: &str) -> StorageResult<Option<String>> {
        let previous = self.documents.remove(key);
        if previous.is_some() {
            if let Err(e) = self.persist() {
                self.restore(key, previous);
                return Err(e);
            }
        }
        Ok(previous)
    }

    fn restore(&mut self, key: &str, previous: Option<String>) {
        match previous {
            Some(value) => {
                self.documents.insert(key.to_string(), value);
            }
            None => {
                self.documents.remove(key);
            }
        }
    }

    /// Decode a JSON document, falling back to `T::default()` when the key is
    /// missing or its text does not parse.
    pub fn load_or_default<T>(&self, key: &str) -> T
    where
        T: DeserializeOwned + Default,
    {
        self.load_or(key, T::default)
    }

    /// Decode a JSON document with an explicit fallback
    pub fn load_or<T, F>(&self, key: &str, fallback: F) -> T
    where
        T: DeserializeOwned,
        F: FnOnce() -> T,
    {
        match self.get(key) {
            Some(text) => match serde_json::from_str(text) {
                Ok(value) => value,
                Err(e) => {
                    tracing::debug!(key = %key, error = %e, "Stored document is malformed, using default");
                    fallback()
                }
            },
            None => fallback(),
        }
    }

    /// Serialize a value as JSON and store it
    pub fn save<T: Serialize>(&mut self, key: &str, value: &T) -> StorageResult<()> {
        let text = serde_json::to_string(value)?;
        self.set(key, text)
    }

    fn persist(&self) -> StorageResult<()> {
        let Some(path) = &self.path else {
            return Ok(());
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let content = serde_json::to_string_pretty(&self.documents)?;
        std::fs::write(path, content)?;
        Ok(())
    }
}

fn validate_key(key: &str) -> StorageResult<()> {
    if key.is_empty() {
        return Err(StorageError::invalid("document key", "cannot be empty"));
    }
    if key.len() > MAX_KEY_LEN {
        return Err(StorageError::invalid(
            "document key",
            format!("exceeds maximum length of {} characters", MAX_KEY_LEN),
        ));
    }
    if key.chars().any(|c| c.is_control() || c == '/') {
        return Err(StorageError::invalid(
            "document key",
            "must not contain '/' or control characters",
        ));
    }
    Ok(())
}
