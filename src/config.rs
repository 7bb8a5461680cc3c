//! Configuration System
//!
//! Handles loading configuration from files and environment variables.
//! Supports TOML config files and environment variable overrides.

use serde::Deserialize;
use std::path::{Path, PathBuf};

use crate::integrations::N8nConfig;
use crate::storage::{GatewayConfig, StorageConfig as StoreConfig, DEFAULT_MAX_LOG_ENTRIES};

/// Main configuration structure
#[derive(Debug, Clone, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub server: ServerConfig,

    #[serde(default)]
    pub storage: StorageConfig,

    #[serde(default)]
    pub evolution: EvolutionConfig,

    #[serde(default)]
    pub n8n: WorkflowConfig,

    #[serde(default)]
    pub supabase: SupabaseConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

/// HTTP server configuration
#[derive(Debug, Clone, Deserialize)]
pub struct ServerConfig {
    #[serde(default = "default_host")]
    pub host: String,

    #[serde(default = "default_port")]
    pub port: u16,

    /// Directory holding the built frontend bundle
    #[serde(default = "default_static_dir")]
    pub static_dir: String,

    /// Entry document served for unknown paths
    #[serde(default = "default_index_file")]
    pub index_file: String,

    /// Public URL of the deployment, handed to the browser
    #[serde(default)]
    pub public_url: Option<String>,

    /// Allowed CORS origins; empty means permissive
    #[serde(default)]
    pub cors_origins: Vec<String>,

    #[serde(default = "default_request_timeout")]
    pub request_timeout_secs: u64,
}

fn default_host() -> String {
    "0.0.0.0".to_string()
}

fn default_port() -> u16 {
    3000
}

fn default_static_dir() -> String {
    "dist".to_string()
}

fn default_index_file() -> String {
    "index.html".to_string()
}

fn default_request_timeout() -> u64 {
    30
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: default_host(),
            port: default_port(),
            static_dir: default_static_dir(),
            index_file: default_index_file(),
            public_url: None,
            cors_origins: Vec::new(),
            request_timeout_secs: default_request_timeout(),
        }
    }
}

impl ServerConfig {
    /// Get the socket address string
    pub fn addr(&self) -> String {
        format!("{}:{}", self.host, self.port)
    }

    pub fn static_path(&self) -> PathBuf {
        PathBuf::from(&self.static_dir)
    }

    pub fn index_path(&self) -> PathBuf {
        self.static_path().join(&self.index_file)
    }
}

/// Data directory configuration
#[derive(Debug, Clone, Deserialize)]
pub struct StorageConfig {
    #[serde(default = "default_data_dir")]
    pub data_dir: String,

    #[serde(default = "default_max_log_entries")]
    pub max_log_entries: usize,
}

fn default_data_dir() -> String {
    dirs::data_local_dir()
        .map(|p| p.join("crmdesk").to_string_lossy().to_string())
        .unwrap_or_else(|| "./crmdesk_data".to_string())
}

fn default_max_log_entries() -> usize {
    DEFAULT_MAX_LOG_ENTRIES
}

impl Default for StorageConfig {
    fn default() -> Self {
        Self {
            data_dir: default_data_dir(),
            max_log_entries: default_max_log_entries(),
        }
    }
}

impl StorageConfig {
    /// Settings for the CRM store
    pub fn store_config(&self) -> StoreConfig {
        StoreConfig {
            data_dir: PathBuf::from(&self.data_dir),
            max_log_entries: self.max_log_entries,
        }
    }
}

/// Messaging gateway (Evolution API) defaults
#[derive(Debug, Clone, Deserialize)]
pub struct EvolutionConfig {
    #[serde(default = "default_evolution_url")]
    pub url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_instance_name")]
    pub instance_name: String,

    #[serde(default)]
    pub webhook_url: String,

    #[serde(default = "default_integration_timeout")]
    pub request_timeout_ms: u64,
}

fn default_evolution_url() -> String {
    "http://localhost:8080".to_string()
}

fn default_instance_name() -> String {
    "crm-whatsapp".to_string()
}

fn default_integration_timeout() -> u64 {
    10_000
}

impl Default for EvolutionConfig {
    fn default() -> Self {
        Self {
            url: default_evolution_url(),
            api_key: String::new(),
            instance_name: default_instance_name(),
            webhook_url: String::new(),
            request_timeout_ms: default_integration_timeout(),
        }
    }
}

impl EvolutionConfig {
    /// Gateway settings used when none are stored
    pub fn gateway_defaults(&self) -> GatewayConfig {
        GatewayConfig {
            base_url: self.url.clone(),
            api_key: self.api_key.clone(),
            instance_name: self.instance_name.clone(),
            webhook_url: self.webhook_url.clone(),
        }
    }
}

/// Workflow platform (n8n) configuration
#[derive(Debug, Clone, Deserialize)]
pub struct WorkflowConfig {
    #[serde(default = "default_n8n_url")]
    pub url: String,

    #[serde(default)]
    pub api_key: String,

    #[serde(default = "default_n8n_webhook_url")]
    pub webhook_url: String,
}

fn default_n8n_url() -> String {
    "http://localhost:5678".to_string()
}

fn default_n8n_webhook_url() -> String {
    "http://localhost:5678/webhook".to_string()
}

impl Default for WorkflowConfig {
    fn default() -> Self {
        Self {
            url: default_n8n_url(),
            api_key: String::new(),
            webhook_url: default_n8n_webhook_url(),
        }
    }
}

impl WorkflowConfig {
    pub fn client_config(&self) -> N8nConfig {
        N8nConfig {
            base_url: self.url.clone(),
            api_key: self.api_key.clone(),
            webhook_url: self.webhook_url.clone(),
        }
    }
}

/// Hosted database/auth backend; only handed to the browser
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SupabaseConfig {
    #[serde(default)]
    pub url: String,

    /// Anonymous (publishable) key
    #[serde(default)]
    pub anon_key: String,
}

/// Logging configuration
#[derive(Debug, Clone, Deserialize)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub format: String,
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            format: default_log_format(),
        }
    }
}

impl Config {
    /// Load configuration from a file
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.to_path_buf(),
            error: e.to_string(),
        })?;

        Self::parse(&content).map_err(|error| ConfigError::Parse {
            path: path.to_path_buf(),
            error,
        })
    }

    /// Parse configuration from TOML text
    pub fn parse(content: &str) -> Result<Self, String> {
        toml::from_str(content).map_err(|e| e.to_string())
    }

    /// Load configuration from environment variables only
    pub fn from_env() -> Self {
        let mut config = Config::default();
        config.apply_overrides(|key| std::env::var(key).ok());
        config
    }

    /// Load configuration with environment variable overrides
    pub fn load_with_env(path: &Path) -> Result<Self, ConfigError> {
        let mut config = Self::load(path)?;
        config.apply_overrides(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Load from an explicit path, else default locations, else environment
    pub fn load_default(explicit: Option<&Path>) -> Result<Self, ConfigError> {
        if let Some(path) = explicit {
            let config = Self::load_with_env(path)?;
            tracing::info!("Loaded config from {:?}", path);
            return Ok(config);
        }

        let config_paths = [
            dirs::config_dir().map(|p| p.join("crmdesk").join("config.toml")),
            Some(PathBuf::from("/etc/crmdesk/config.toml")),
            Some(PathBuf::from("./config.toml")),
        ];

        for path in config_paths.iter().flatten() {
            if path.exists() {
                match Self::load_with_env(path) {
                    Ok(config) => {
                        tracing::info!("Loaded config from {:?}", path);
                        return Ok(config);
                    }
                    Err(e) => {
                        tracing::warn!("Failed to load config from {:?}: {}", path, e);
                    }
                }
            }
        }

        tracing::info!("Using default config with environment overrides");
        Ok(Self::from_env())
    }

    /// Apply overrides from a variable lookup (the process environment in
    /// production, a map in tests)
    pub fn apply_overrides<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        // Server overrides
        if let Some(host) = lookup("CRMDESK_HOST") {
            self.server.host = host;
        }
        if let Some(port) = lookup("CRMDESK_PORT").or_else(|| lookup("PORT")) {
            match port.parse() {
                Ok(p) => self.server.port = p,
                Err(_) => tracing::warn!(value = %port, "Ignoring invalid port override"),
            }
        }
        if let Some(dir) = lookup("CRMDESK_STATIC_DIR") {
            self.server.static_dir = dir;
        }
        if let Some(url) = lookup("API_URL") {
            self.server.public_url = Some(url);
        }

        // Storage overrides
        if let Some(data_dir) = lookup("CRMDESK_DATA_DIR") {
            self.storage.data_dir = data_dir;
        }

        // Gateway overrides
        if let Some(url) = lookup("EVOLUTION_API_URL") {
            self.evolution.url = url;
        }
        if let Some(key) = lookup("EVOLUTION_API_KEY") {
            self.evolution.api_key = key;
        }
        if let Some(name) = lookup("EVOLUTION_INSTANCE_NAME") {
            self.evolution.instance_name = name;
        }
        if let Some(url) = lookup("EVOLUTION_WEBHOOK_URL") {
            self.evolution.webhook_url = url;
        }

        // Workflow platform overrides
        if let Some(url) = lookup("N8N_URL") {
            self.n8n.url = url;
        }
        if let Some(key) = lookup("N8N_API_KEY") {
            self.n8n.api_key = key;
        }
        if let Some(url) = lookup("N8N_WEBHOOK_URL") {
            self.n8n.webhook_url = url;
        }

        // Database backend overrides
        if let Some(url) = lookup("SUPABASE_URL") {
            self.supabase.url = url;
        }
        if let Some(key) = lookup("SUPABASE_ANON_KEY") {
            self.supabase.anon_key = key;
        }

        // Logging overrides
        if let Some(level) = lookup("CRMDESK_LOG_LEVEL") {
            self.logging.level = level;
        }
        if let Some(format) = lookup("CRMDESK_LOG_FORMAT") {
            self.logging.format = format;
        }
    }
}

/// Configuration errors
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file {path:?}: {error}")]
    Io { path: PathBuf, error: String },

    #[error("Failed to parse config file {path:?}: {error}")]
    Parse { path: PathBuf, error: String },
}

/// Generate a default config file content
pub fn generate_default_config() -> String {
    r#"# crmdesk Configuration
#
# Environment variables override these settings:
# - CRMDESK_HOST, CRMDESK_PORT (or PORT), CRMDESK_STATIC_DIR, API_URL
# - CRMDESK_DATA_DIR
# - EVOLUTION_API_URL, EVOLUTION_API_KEY, EVOLUTION_INSTANCE_NAME, EVOLUTION_WEBHOOK_URL
# - N8N_URL, N8N_API_KEY, N8N_WEBHOOK_URL
# - SUPABASE_URL, SUPABASE_ANON_KEY
# - CRMDESK_LOG_LEVEL, CRMDESK_LOG_FORMAT

[server]
# Bind address
host = "0.0.0.0"
port = 3000

# Built frontend bundle and its entry document
static_dir = "dist"
index_file = "index.html"

# Public URL of this deployment (handed to the browser)
# public_url = "https://crm.example.com"

# Allowed CORS origins (empty = permissive)
cors_origins = []

# Request timeout in seconds
request_timeout_secs = 30

[storage]
# Directory for customers, instances, workflow logs and documents
data_dir = "~/.local/share/crmdesk"

# Workflow log entries kept before the oldest are dropped
max_log_entries = 5000

[evolution]
# Messaging gateway (used when no settings document is stored)
url = "http://localhost:8080"
api_key = ""
instance_name = "crm-whatsapp"
webhook_url = ""
request_timeout_ms = 10000

[n8n]
# Workflow platform
url = "http://localhost:5678"
api_key = ""
webhook_url = "http://localhost:5678/webhook"

[supabase]
# Hosted database/auth backend (public values only)
url = ""
anon_key = ""

[logging]
# Log level: trace, debug, info, warn, error
level = "info"

# Log format: pretty (for development) or json (for production)
format = "pretty"
"#
    .to_string()
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;

    #[test]
    fn test_default_config_parses() {
        let config = Config::parse(&generate_default_config()).unwrap();
        assert_eq!(config.server.port, 3000);
        assert_eq!(config.server.static_dir, "dist");
        assert_eq!(config.storage.max_log_entries, 5000);
        assert_eq!(config.evolution.instance_name, "crm-whatsapp");
        assert_eq!(config.logging.format, "pretty");
    }

    #[test]
    fn test_partial_file_uses_defaults() {
        let config = Config::parse("[server]\nport = 8088\n").unwrap();
        assert_eq!(config.server.port, 8088);
        assert_eq!(config.server.host, "0.0.0.0");
        assert_eq!(config.n8n.webhook_url, "http://localhost:5678/webhook");
    }

    #[test]
    fn test_env_overrides() {
        let env: HashMap<&str, &str> = [
            ("PORT", "9000"),
            ("CRMDESK_DATA_DIR", "/tmp/crm"),
            ("EVOLUTION_API_KEY", "gw-key"),
            ("N8N_WEBHOOK_URL", "https://flows.example.com/webhook"),
            ("SUPABASE_URL", "https://abc.supabase.co"),
        ]
        .into_iter()
        .collect();

        let mut config = Config::default();
        config.apply_overrides(|k| env.get(k).map(|v| v.to_string()));

        assert_eq!(config.server.port, 9000);
        assert_eq!(config.storage.data_dir, "/tmp/crm");
        assert_eq!(config.evolution.api_key, "gw-key");
        assert_eq!(config.n8n.webhook_url, "https://flows.example.com/webhook");
        assert_eq!(config.supabase.url, "https://abc.supabase.co");
    }

    #[test]
    fn test_crmdesk_port_wins_over_port() {
        let mut config = Config::default();
        config.apply_overrides(|k| match k {
            "CRMDESK_PORT" => Some("7000".to_string()),
            "PORT" => Some("9000".to_string()),
            _ => None,
        });
        assert_eq!(config.server.port, 7000);
    }

    #[test]
    fn test_gateway_defaults_from_config() {
        let config = Config::parse("[evolution]\nurl = \"https://gw.example.com\"\napi_key = \"k\"\n").unwrap();
        let gateway = config.evolution.gateway_defaults();
        assert_eq!(gateway.base_url, "https://gw.example.com");
        assert!(gateway.is_configured());
    }
}
