//! Configuration management
//!
//! This module handles loading, validation, and management of the Clara configuration.
//! Configuration is stored in TOML format at ~/.clara/config.toml.
//!
//! # Configuration Sections
//!
//! - **core**: Log level
//! - **llm**: Chat-completion endpoint, models per agent role, call timeout
//! - **tools**: Tool enablement flags
//!
//! # Credentials
//!
//! The API key is never stored in the file. `[llm] api_key_env` names the
//! environment variable holding it, and [`Config::require_credentials`]
//! resolves it once at startup. A missing key is a hard error.
//!
//! # Examples
//!
//! ```no_run
//! use clara_engine::config::Config;
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let mut config = Config::load_or_create()?;
//! config.require_credentials()?;
//!
//! println!("Planner model: {}", config.llm.planner_model);
//! # Ok(())
//! # }
//! ```

mod secret;

pub use secret::SecretString;

use sdk::errors::EngineError;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Main configuration structure
///
/// Built once at startup and shared immutably with every component.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    /// Core engine settings
    pub core: CoreConfig,

    /// Generation collaborator configuration
    pub llm: LLMConfig,

    /// Tool enablement
    #[serde(default)]
    pub tools: ToolsConfig,
}

/// Core engine configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CoreConfig {
    /// Log level (error, warn, info, debug, trace)
    #[serde(default = "default_log_level")]
    pub log_level: String,
}

/// Generation collaborator configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LLMConfig {
    /// Base URL of the OpenAI-compatible chat-completion API
    #[serde(default = "default_base_url")]
    pub base_url: String,

    /// Name of the environment variable holding the API key
    #[serde(default = "default_api_key_env")]
    pub api_key_env: String,

    /// Per-call timeout in seconds (0 disables the timeout)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Model used by the planning agent
    #[serde(default = "default_model")]
    pub planner_model: String,

    /// Model used by task executors
    #[serde(default = "default_model")]
    pub executor_model: String,

    /// Model used for the final synthesis
    #[serde(default = "default_model")]
    pub reactive_model: String,

    /// API key, resolved from `api_key_env`
    #[serde(skip)]
    pub api_key: SecretString,
}

impl LLMConfig {
    /// The per-call timeout, if enabled
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_secs > 0).then(|| Duration::from_secs(self.timeout_secs))
    }
}

impl Default for LLMConfig {
    fn default() -> Self {
        Self {
            base_url: default_base_url(),
            api_key_env: default_api_key_env(),
            timeout_secs: default_timeout_secs(),
            planner_model: default_model(),
            executor_model: default_model(),
            reactive_model: default_model(),
            api_key: SecretString::default(),
        }
    }
}

/// Tool enablement configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolsConfig {
    /// Enable the arithmetic `add` tool
    #[serde(default = "default_true")]
    pub add: bool,

    /// Enable the clinical guideline lookup (`rag_tool`)
    #[serde(default = "default_true")]
    pub guidelines: bool,

    /// Enable the image classification collaborator (`vision_tool`)
    #[serde(default)]
    pub vision: bool,

    /// Enable the SQL collaborator (`duckdb_tool`)
    #[serde(default)]
    pub sql: bool,
}

impl Default for ToolsConfig {
    fn default() -> Self {
        Self {
            add: true,
            guidelines: true,
            vision: false,
            sql: false,
        }
    }
}

// Default value functions
fn default_log_level() -> String {
    "info".to_string()
}

fn default_true() -> bool {
    true
}

fn default_base_url() -> String {
    "https://openrouter.ai/api/v1".to_string()
}

fn default_api_key_env() -> String {
    "OPENROUTER_API_KEY".to_string()
}

fn default_timeout_secs() -> u64 {
    120
}

fn default_model() -> String {
    "google/gemma-3-27b-it:free".to_string()
}

impl Config {
    /// Load configuration from the default location (~/.clara/config.toml)
    ///
    /// If the configuration file doesn't exist, creates a default configuration.
    /// Credentials are not resolved here; call [`Config::require_credentials`].
    ///
    /// # Errors
    ///
    /// Returns an error if:
    /// - Configuration file cannot be read or written
    /// - TOML parsing fails
    /// - Validation fails
    pub fn load_or_create() -> Result<Self, EngineError> {
        let config_path = Self::default_config_path()?;

        if config_path.exists() {
            Self::load_from_path(&config_path)
        } else {
            Self::create_default(&config_path)
        }
    }

    /// Load configuration from a specific path
    pub fn load_from_path(path: &Path) -> Result<Self, EngineError> {
        let contents = fs::read_to_string(path)
            .map_err(|e| EngineError::Config(format!("Failed to read config file: {}", e)))?;

        Self::from_toml_str(&contents)
    }

    /// Parse and validate configuration from TOML text
    pub fn from_toml_str(contents: &str) -> Result<Self, EngineError> {
        let config: Config = toml::from_str(contents)
            .map_err(|e| EngineError::Config(format!("Failed to parse config: {}", e)))?;

        config.validate()?;

        Ok(config)
    }

    /// Create default configuration and save to path
    fn create_default(path: &Path) -> Result<Self, EngineError> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent).map_err(|e| {
                EngineError::Config(format!("Failed to create config directory: {}", e))
            })?;
        }

        let config = Self::default_config();
        config.validate()?;

        let toml_string = toml::to_string_pretty(&config)
            .map_err(|e| EngineError::Config(format!("Failed to serialize config: {}", e)))?;

        fs::write(path, toml_string)
            .map_err(|e| EngineError::Config(format!("Failed to write config file: {}", e)))?;

        tracing::info!("Wrote default configuration to {:?}", path);

        Ok(config)
    }

    /// Get the default configuration file path (~/.clara/config.toml)
    fn default_config_path() -> Result<PathBuf, EngineError> {
        let home = dirs::home_dir()
            .ok_or_else(|| EngineError::Config("Could not determine home directory".to_string()))?;

        Ok(home.join(".clara").join("config.toml"))
    }

    /// Create a default configuration
    pub fn default_config() -> Self {
        Self {
            core: CoreConfig {
                log_level: default_log_level(),
            },
            llm: LLMConfig::default(),
            tools: ToolsConfig::default(),
        }
    }

    /// Resolve the API key from the process environment
    ///
    /// # Errors
    ///
    /// Returns `EngineError::Config` when the variable named by
    /// `llm.api_key_env` is unset or blank.
    pub fn require_credentials(&mut self) -> Result<(), EngineError> {
        self.require_credentials_with(|name| std::env::var(name).ok())
    }

    /// Resolve the API key through an arbitrary variable lookup
    pub fn require_credentials_with<F>(&mut self, lookup: F) -> Result<(), EngineError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let key = lookup(&self.llm.api_key_env)
            .map(SecretString::new)
            .filter(|key| !key.is_empty())
            .ok_or_else(|| {
                EngineError::Config(format!(
                    "Missing API key: set the {} environment variable",
                    self.llm.api_key_env
                ))
            })?;

        self.llm.api_key = key;
        Ok(())
    }

    /// Validate required fields
    fn validate(&self) -> Result<(), EngineError> {
        let valid_log_levels = ["error", "warn", "info", "debug", "trace"];
        if !valid_log_levels.contains(&self.core.log_level.as_str()) {
            return Err(EngineError::Config(format!(
                "Invalid log level '{}'. Must be one of: {}",
                self.core.log_level,
                valid_log_levels.join(", ")
            )));
        }

        if !(self.llm.base_url.starts_with("http://") || self.llm.base_url.starts_with("https://"))
        {
            return Err(EngineError::Config(format!(
                "Invalid base_url '{}'. Must start with http:// or https://",
                self.llm.base_url
            )));
        }

        if self.llm.api_key_env.trim().is_empty() {
            return Err(EngineError::Config(
                "api_key_env must name an environment variable".to_string(),
            ));
        }

        for (role, model) in [
            ("planner_model", &self.llm.planner_model),
            ("executor_model", &self.llm.executor_model),
            ("reactive_model", &self.llm.reactive_model),
        ] {
            if model.trim().is_empty() {
                return Err(EngineError::Config(format!("{} must not be empty", role)));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config_creation() {
        let config = Config::default_config();

        assert_eq!(config.core.log_level, "info");
        assert_eq!(config.llm.api_key_env, "OPENROUTER_API_KEY");
        assert_eq!(config.llm.timeout(), Some(Duration::from_secs(120)));
        assert!(config.tools.add);
        assert!(!config.tools.vision);
        assert!(config.validate().is_ok());
    }

    #[test]
    fn test_minimal_toml_uses_defaults() {
        let config = Config::from_toml_str("[core]\n[llm]\n").unwrap();

        assert_eq!(config.llm.base_url, "https://openrouter.ai/api/v1");
        assert_eq!(config.llm.planner_model, "google/gemma-3-27b-it:free");
        assert!(config.tools.guidelines);
    }

    #[test]
    fn test_invalid_log_level_rejected() {
        let err = Config::from_toml_str("[core]\nlog_level = \"loud\"\n[llm]\n").unwrap_err();
        assert!(err.to_string().contains("Invalid log level"));
    }

    #[test]
    fn test_empty_model_rejected() {
        let err =
            Config::from_toml_str("[core]\n[llm]\nexecutor_model = \"  \"\n").unwrap_err();
        assert!(err.to_string().contains("executor_model"));
    }

    #[test]
    fn test_zero_timeout_disables() {
        let config = Config::from_toml_str("[core]\n[llm]\ntimeout_secs = 0\n").unwrap();
        assert_eq!(config.llm.timeout(), None);
    }

    #[test]
    fn test_credentials_resolved_from_lookup() {
        let mut config = Config::default_config();
        config
            .require_credentials_with(|name| {
                (name == "OPENROUTER_API_KEY").then(|| "sk-test".to_string())
            })
            .unwrap();

        assert_eq!(config.llm.api_key.unsecure(), "sk-test");
    }

    #[test]
    fn test_missing_credentials_fail_fast() {
        let mut config = Config::default_config();
        let err = config.require_credentials_with(|_| None).unwrap_err();

        assert!(matches!(err, EngineError::Config(_)));
        assert!(err.to_string().contains("OPENROUTER_API_KEY"));

        let err = config
            .require_credentials_with(|_| Some(String::new()))
            .unwrap_err();
        assert!(matches!(err, EngineError::Config(_)));
    }

    #[test]
    fn test_config_serialization_omits_key() {
        let mut config = Config::default_config();
        config.llm.api_key = SecretString::new("sk-hidden");

        let toml_string = toml::to_string(&config).unwrap();
        assert!(!toml_string.contains("sk-hidden"));

        let deserialized: Config = toml::from_str(&toml_string).unwrap();
        assert_eq!(config.llm.planner_model, deserialized.llm.planner_model);
        assert!(deserialized.llm.api_key.is_empty());
    }
}
