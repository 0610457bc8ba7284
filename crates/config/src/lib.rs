//! Configuration loading, validation, and management for Thoughtline.
//!
//! Loads configuration from `~/.thoughtline/config.toml` with environment
//! variable overrides. Validates all settings at startup.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use thoughtline_core::agent::AgentConfig;
use thoughtline_core::permission::StaticPermissions;

/// The root configuration structure.
///
/// Maps directly to `~/.thoughtline/config.toml`.
#[derive(Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// API key for the model endpoint
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub api_key: Option<String>,

    /// Base URL of an OpenAI-compatible endpoint
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Model name sent with every request
    #[serde(default = "default_model")]
    pub model: String,

    /// HTTP request timeout for a single model call
    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,

    /// Reasoning loop settings (`[agent]` section)
    #[serde(default)]
    pub agent: AgentConfig,

    /// Permission grants for permissioned tools
    #[serde(default)]
    pub permissions: PermissionsConfig,
}

fn default_base_url() -> String {
    "https://api.openai.com/v1".into()
}
fn default_model() -> String {
    "gpt-4o-mini".into()
}
fn default_request_timeout_secs() -> u64 {
    120
}

/// Redact a secret string for Debug output.
fn redact(s: &Option<String>) -> &'static str {
    match s {
        Some(_) => "[REDACTED]",
        None => "None",
    }
}

impl std::fmt::Debug for AppConfig {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AppConfig")
            .field("api_key", &redact(&self.api_key))
            .field("base_url", &self.base_url)
            .field("model", &self.model)
            .field("request_timeout_secs", &self.request_timeout_secs)
            .field("agent", &self.agent)
            .field("permissions", &self.permissions)
            .finish()
    }
}

/// `[permissions]` section.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct PermissionsConfig {
    /// Permissions treated as granted (e.g. "location", "calendar")
    #[serde(default)]
    pub granted: Vec<String>,

    /// Permissions that do not exist on this host
    #[serde(default)]
    pub unavailable: Vec<String>,

    /// Ask the gate once before refusing a denied permission
    #[serde(default)]
    pub request_on_denied: bool,
}

impl PermissionsConfig {
    /// Build the static grant table these settings describe.
    pub fn to_gate(&self) -> StaticPermissions {
        StaticPermissions::from_names(
            self.granted.iter().map(String::as_str),
            self.unavailable.iter().map(String::as_str),
        )
    }
}

impl AppConfig {
    /// Load configuration from the default path (~/.thoughtline/config.toml).
    ///
    /// Also checks environment variables:
    /// - `THOUGHTLINE_API_KEY` (highest priority), then `OPENAI_API_KEY`
    /// - `THOUGHTLINE_BASE_URL`
    /// - `THOUGHTLINE_MODEL`
    pub fn load() -> Result<Self, ConfigError> {
        let config_path = Self::config_dir().join("config.toml");
        let mut config = Self::load_from(&config_path)?;
        config.apply_env_overrides(|key| std::env::var(key).ok());
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a specific file path.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            tracing::info!("No config file found at {}, using defaults", path.display());
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        let config: Self = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            reason: e.to_string(),
        })?;

        config.validate()?;
        Ok(config)
    }

    /// Apply environment overrides using the given lookup.
    fn apply_env_overrides(&mut self, lookup: impl Fn(&str) -> Option<String>) {
        if let Some(key) = lookup("THOUGHTLINE_API_KEY").or_else(|| lookup("OPENAI_API_KEY")) {
            self.api_key = Some(key);
        }
        if let Some(url) = lookup("THOUGHTLINE_BASE_URL") {
            self.base_url = url;
        }
        if let Some(model) = lookup("THOUGHTLINE_MODEL") {
            self.model = model;
        }
    }

    /// Get the configuration directory path.
    pub fn config_dir() -> PathBuf {
        dirs_home().join(".thoughtline")
    }

    /// Validate the configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let agent = &self.agent;
        if agent.temperature < 0.0 || agent.temperature > 2.0 {
            return Err(ConfigError::ValidationError(
                "agent.temperature must be between 0.0 and 2.0".into(),
            ));
        }
        agent.validate().map_err(|e| ConfigError::ValidationError(e.to_string()))?;

        if self.base_url.trim().is_empty() {
            return Err(ConfigError::ValidationError("base_url must not be empty".into()));
        }
        Ok(())
    }

    /// Check if an API key is available (from config or environment).
    pub fn has_api_key(&self) -> bool {
        self.api_key.is_some()
    }

    /// Render this configuration as TOML with the API key removed.
    pub fn to_redacted_toml(&self) -> String {
        let mut shown = self.clone();
        shown.api_key = shown.api_key.map(|_| "[REDACTED]".into());
        toml::to_string_pretty(&shown).unwrap_or_default()
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: default_base_url(),
            model: default_model(),
            request_timeout_secs: default_request_timeout_secs(),
            agent: AgentConfig::default(),
            permissions: PermissionsConfig::default(),
        }
    }
}

/// Get the user's home directory.
fn dirs_home() -> PathBuf {
    #[cfg(target_os = "windows")]
    {
        std::env::var("USERPROFILE")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("C:\\Users\\Default"))
    }
    #[cfg(not(target_os = "windows"))]
    {
        std::env::var("HOME")
            .map(PathBuf::from)
            .unwrap_or_else(|_| PathBuf::from("/tmp"))
    }
}

/// Configuration errors.
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file at {path}: {reason}")]
    ReadError { path: PathBuf, reason: String },

    #[error("Failed to parse config file at {path}: {reason}")]
    ParseError { path: PathBuf, reason: String },

    #[error("Configuration validation failed: {0}")]
    ValidationError(String),
}
