//! Storage error types
//!
//! Defines all errors that can occur in the CRM data layer.

use thiserror::Error;

/// Errors that can occur in the CRM stores
#[derive(Error, Debug)]
pub enum StorageError {
    /// I/O operation failed
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization/deserialization failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// A submitted record failed validation
    #[error("Invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },

    /// Requested customer does not exist
    #[error("Customer not found: {0}")]
    CustomerNotFound(String),

    /// Requested instance does not exist
    #[error("Instance not found: {0}")]
    InstanceNotFound(String),

    /// An instance with the same identifier is already registered
    #[error("Instance already exists: {0}")]
    InstanceExists(String),

    /// Unknown notification switch
    #[error("Unknown notification setting: {0}")]
    UnknownSetting(String),
}

impl StorageError {
    pub(crate) fn invalid(field: &'static str, reason: impl Into<String>) -> Self {
        StorageError::Invalid {
            field,
            reason: reason.into(),
        }
    }
}

impl From<serde_json::Error> for StorageError {
    fn from(err: serde_json::Error) -> Self {
        StorageError::Serialization(err.to_string())
    }
}

/// Result type alias for storage operations
pub type StorageResult<T> = Result<T, StorageError>;
