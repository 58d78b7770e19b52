//! Configuration loading.
//!
//! Configuration is loaded from TOML files with the following resolution order:
//! 1. Explicit path (CLI `--config` or [`Config::load`] argument)
//! 2. `~/.skald/config.toml` (user)
//! 3. `/etc/skald/config.toml` (system)
//!
//! Every field has a default, so an empty file (or no file, via
//! [`Config::load_or_default`]) yields a working local setup.
//!
//! ```toml
//! [backend]
//! base_url = "http://localhost:11434"
//! timeout_secs = 60
//!
//! [models]
//! default_model = "llama3.1"
//! dialogue = "mistral"
//!
//! [retry]
//! max_attempts = 3
//!
//! [cache]
//! ttl_secs = 600
//! sweep_interval_secs = 1800
//! ```

use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::cache::CacheConfig;
use crate::context::DEFAULT_HISTORY_WINDOW;
use crate::providers::ollama::{DEFAULT_BASE_URL, DEFAULT_TIMEOUT};
use crate::providers::{ConfidenceThresholds, ModelAssignments, RetryConfig};
use crate::templates::DEFAULT_LANGUAGE;
use crate::{Result, SkaldError};

/// Engine configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub backend: BackendConfig,
    #[serde(default)]
    pub models: ModelAssignments,
    #[serde(default)]
    pub retry: RetryConfig,
    #[serde(default)]
    pub cache: CacheConfig,
    #[serde(default)]
    pub context: ContextConfig,
    #[serde(default)]
    pub confidence: ConfidenceThresholds,
}

/// Inference backend connection.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BackendConfig {
    /// Ollama base URL (default: http://localhost:11434).
    #[serde(default = "default_base_url")]
    pub base_url: String,
    /// Per-attempt request timeout in seconds (default: 60).
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,
}

impl Default for BackendConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            timeout_secs: default_timeout_secs(),
        }
    }
}

impl BackendConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

fn default_base_url() -> String {
    DEFAULT_BASE_URL.to_string()
}

fn default_timeout_secs() -> u64 {
    DEFAULT_TIMEOUT.as_secs()
}

/// Context assembly settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ContextConfig {
    /// Prior narrator responses pulled into each prompt (default: 5).
    #[serde(default = "default_history_window")]
    pub history_window: usize,
    /// Template language when a request does not name one (default: "en").
    #[serde(default = "default_language")]
    pub default_language: String,
}

impl Default for ContextConfig {
    fn default() -> Self {
        Self {
            history_window: default_history_window(),
            default_language: default_language(),
        }
    }
}

fn default_history_window() -> usize {
    DEFAULT_HISTORY_WINDOW
}

fn default_language() -> String {
    DEFAULT_LANGUAGE.to_string()
}

impl Config {
    /// Load configuration from the standard locations.
    ///
    /// Resolution order:
    /// 1. Explicit path (if provided)
    /// 2. `~/.skald/config.toml`
    /// 3. `/etc/skald/config.toml`
    pub fn load(explicit_path: Option<&Path>) -> Result<Self> {
        let path = Self::resolve_config_path(explicit_path)?
            .ok_or_else(|| {
                SkaldError::Configuration(
                    "No config file found. Create ~/.skald/config.toml or /etc/skald/config.toml"
                        .to_string(),
                )
            })?;
        Self::load_from_file(&path)
    }

    /// Like [`Config::load`], but falls back to defaults when no file exists.
    ///
    /// An explicit path that does not exist is still an error.
    pub fn load_or_default(explicit_path: Option<&Path>) -> Result<Self> {
        match Self::resolve_config_path(explicit_path)? {
            Some(path) => Self::load_from_file(&path),
            None => Ok(Self::default()),
        }
    }

    /// Parse configuration from TOML text.
    pub fn from_toml_str(content: &str) -> Result<Self> {
        toml::from_str(content)
            .map_err(|e| SkaldError::Configuration(format!("Failed to parse config: {e}")))
    }

    /// Render the configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String> {
        toml::to_string_pretty(self)
            .map_err(|e| SkaldError::Configuration(format!("Failed to serialize config: {e}")))
    }

    fn load_from_file(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path).map_err(|e| {
            SkaldError::Configuration(format!("Failed to read config file {path:?}: {e}"))
        })?;
        toml::from_str(&content).map_err(|e| {
            SkaldError::Configuration(format!("Failed to parse config file {path:?}: {e}"))
        })
    }

    /// Resolve the config file path.
    fn resolve_config_path(explicit: Option<&Path>) -> Result<Option<PathBuf>> {
        if let Some(path) = explicit {
            if path.exists() {
                return Ok(Some(path.to_path_buf()));
            }
            return Err(SkaldError::Configuration(format!(
                "Config file not found: {path:?}"
            )));
        }

        // User config
        if let Some(home) = dirs::home_dir() {
            let user_config = home.join(".skald").join("config.toml");
            if user_config.exists() {
                return Ok(Some(user_config));
            }
        }

        // System config
        let system_config = PathBuf::from("/etc/skald/config.toml");
        if system_config.exists() {
            return Ok(Some(system_config));
        }

        Ok(None)
    }
}
