//! Global configuration for the Scout service.
//!
//! `ScoutConfig` represents the top-level `config.toml` under the data
//! directory. All fields have sensible defaults so an empty file (or no
//! file at all) yields a working local setup.

use serde::{Deserialize, Serialize};

/// Top-level configuration for the Scout service.
///
/// Loaded from `<data_dir>/config.toml`. The data directory itself comes
/// from `SCOUT_DATA_DIR` or defaults to `~/.scout`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ScoutConfig {
    /// Address the REST API binds to.
    #[serde(default = "default_bind_addr")]
    pub bind_addr: String,

    /// Default primary model for research flows.
    #[serde(default = "default_model")]
    pub default_model: String,

    /// Default fallback model used when the primary is rate limited.
    #[serde(default = "default_fallback_model")]
    pub default_fallback_model: String,

    /// Default vector index for embed plan steps.
    #[serde(default = "default_vector_index")]
    pub default_vector_index: String,

    /// How long an extended-research job waits for a link selection.
    #[serde(default = "default_selection_timeout_secs")]
    pub selection_timeout_secs: u64,

    /// Server-side provider keys, used to resume interrupted jobs after a
    /// restart (request-scoped keys are never persisted).
    #[serde(default)]
    pub providers: ProviderKeys,
}

/// Optional server-side API keys for the external collaborators.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ProviderKeys {
    #[serde(default)]
    pub llm_api_key: Option<String>,
    #[serde(default)]
    pub search_api_key: Option<String>,
    #[serde(default)]
    pub embedding_api_key: Option<String>,
    #[serde(default)]
    pub vector_api_key: Option<String>,
    /// Data-plane host of the vector index (per-account in most providers).
    #[serde(default)]
    pub vector_host: Option<String>,
}

fn default_bind_addr() -> String {
    "127.0.0.1:7400".to_string()
}

fn default_model() -> String {
    "llama-3.3-70b-versatile".to_string()
}

fn default_fallback_model() -> String {
    "llama-3.1-8b-instant".to_string()
}

fn default_vector_index() -> String {
    "research-data".to_string()
}

fn default_selection_timeout_secs() -> u64 {
    3600
}

impl Default for ScoutConfig {
    fn default() -> Self {
        Self {
            bind_addr: default_bind_addr(),
            default_model: default_model(),
            default_fallback_model: default_fallback_model(),
            default_vector_index: default_vector_index(),
            selection_timeout_secs: default_selection_timeout_secs(),
            providers: ProviderKeys::default(),
        }
    }
}

impl ScoutConfig {
    /// Load configuration from a TOML file, falling back to defaults when
    /// the file does not exist.
    pub fn load(path: &std::path::Path) -> Result<Self, ConfigError> {
        match std::fs::read_to_string(path) {
            Ok(raw) => toml::from_str(&raw).map_err(|e| ConfigError::Parse(e.to_string())),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(Self::default()),
            Err(e) => Err(ConfigError::Io(e.to_string())),
        }
    }
}

/// The data directory: `SCOUT_DATA_DIR`, or `~/.scout`.
pub fn data_dir() -> std::path::PathBuf {
    if let Ok(dir) = std::env::var("SCOUT_DATA_DIR") {
        return std::path::PathBuf::from(dir);
    }
    let home = std::env::var("HOME").unwrap_or_else(|_| ".".to_string());
    std::path::PathBuf::from(home).join(".scout")
}

/// Errors loading configuration.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config: {0}")]
    Io(String),

    #[error("failed to parse config: {0}")]
    Parse(String),
}
