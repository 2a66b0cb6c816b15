//! Configuration loading and API key resolution
//!
//! Config file resolution priority:
//! 1. Command-line argument (highest priority)
//! 2. `LISTING_AUDIT_CONFIG` environment variable
//! 3. Platform config directory (`<config_dir>/listing-audit/config.toml`)
//! 4. Compiled defaults (fallback)
//!
//! A missing config file never terminates the process: a warning is logged
//! and compiled defaults are used.

use crate::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::{Path, PathBuf};
use std::str::FromStr;
use tracing::{info, warn};

/// Environment variable naming an explicit config file
pub const CONFIG_PATH_ENV: &str = "LISTING_AUDIT_CONFIG";

/// Environment variable carrying the classification service API key
pub const CLASSIFIER_KEY_ENV: &str = "OPENAI_API_KEY";

/// Environment variable carrying the address service API key
pub const ADDRESS_KEY_ENV: &str = "GOOGLE_MAPS_API_KEY";

/// Top-level TOML configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct TomlConfig {
    pub classifier: ClassifierConfig,
    pub address: AddressConfig,
    pub orchestrator: OrchestratorSettings,
    pub database: DatabaseConfig,
    pub logging: LoggingConfig,
}

/// Language-model classification service settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct ClassifierConfig {
    /// API key (overridden by `OPENAI_API_KEY`)
    pub api_key: Option<String>,
    /// Base URL of an OpenAI-compatible API
    pub base_url: String,
    pub model: String,
    /// Sampling temperature; kept low so verdicts are repeatable
    pub temperature: f32,
    pub timeout_ms: u64,
    /// Client-side request rate cap (None = unlimited)
    pub requests_per_second: Option<u32>,
}

impl Default for ClassifierConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            base_url: "https://api.openai.com/v1".to_string(),
            model: "gpt-4.1-nano".to_string(),
            temperature: 0.2,
            timeout_ms: 15_000,
            requests_per_second: None,
        }
    }
}

/// Which address authenticity strategy to run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AddressStrategy {
    /// Free-text query against an autocomplete service, substring matching
    #[default]
    Autocomplete,
    /// Structured validation with confidence signals
    Validation,
}

impl fmt::Display for AddressStrategy {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AddressStrategy::Autocomplete => write!(f, "autocomplete"),
            AddressStrategy::Validation => write!(f, "validation"),
        }
    }
}

impl FromStr for AddressStrategy {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "autocomplete" => Ok(AddressStrategy::Autocomplete),
            "validation" => Ok(AddressStrategy::Validation),
            other => Err(format!(
                "unknown address strategy '{}' (expected 'autocomplete' or 'validation')",
                other
            )),
        }
    }
}

/// Address validation / autocomplete service settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct AddressConfig {
    /// API key (overridden by `GOOGLE_MAPS_API_KEY`)
    pub api_key: Option<String>,
    pub strategy: AddressStrategy,
    pub timeout_ms: u64,
}

impl Default for AddressConfig {
    fn default() -> Self {
        Self {
            api_key: None,
            strategy: AddressStrategy::default(),
            timeout_ms: 10_000,
        }
    }
}

/// Check orchestration limits
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct OrchestratorSettings {
    /// Upper bound on a single check, external calls included
    pub check_timeout_ms: u64,
    /// Records evaluated at the same time within one batch
    pub max_concurrent_records: usize,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            check_timeout_ms: 30_000,
            max_concurrent_records: 8,
        }
    }
}

/// Persistence settings
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct DatabaseConfig {
    /// SQLite database file; `None` falls back to the platform data directory
    pub path: Option<PathBuf>,
}

impl DatabaseConfig {
    /// Resolve the database path, falling back to the platform default
    pub fn resolved_path(&self) -> PathBuf {
        self.path.clone().unwrap_or_else(default_database_path)
    }
}

/// Logging settings
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
#[serde(default)]
pub struct LoggingConfig {
    /// Default level used when `RUST_LOG` is not set
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
        }
    }
}

impl LoggingConfig {
    /// EnvFilter directive for the audit crates at the configured level
    pub fn filter_directive(&self) -> String {
        format!(
            "listing_audit={level},listing_common={level}",
            level = self.level
        )
    }
}

/// Resolves and loads the TOML config file
pub struct ConfigResolver {
    cli_path: Option<PathBuf>,
}

impl ConfigResolver {
    pub fn new(cli_path: Option<PathBuf>) -> Self {
        Self { cli_path }
    }

    /// Determine which config file to read, if any
    pub fn resolve_path(&self) -> Option<PathBuf> {
        // Priority 1: Command-line argument
        if let Some(path) = &self.cli_path {
            return Some(path.clone());
        }

        // Priority 2: Environment variable
        if let Ok(path) = std::env::var(CONFIG_PATH_ENV) {
            if !path.trim().is_empty() {
                return Some(PathBuf::from(path));
            }
        }

        // Priority 3: Platform config directory (only if the file exists)
        default_config_path().filter(|p| p.exists())
    }

    /// Load configuration, falling back to defaults when no file exists
    ///
    /// A file that exists but fails to parse is an error.
    pub fn load(&self) -> Result<TomlConfig> {
        let Some(path) = self.resolve_path() else {
            info!("No config file found, using compiled defaults");
            return Ok(TomlConfig::default());
        };

        if !path.exists() {
            warn!(
                "Config file {} not found, using compiled defaults",
                path.display()
            );
            return Ok(TomlConfig::default());
        }

        let config = load_toml_config(&path)?;
        info!("Configuration loaded from {}", path.display());
        Ok(config)
    }
}

/// Read and parse a TOML config file
pub fn load_toml_config(path: &Path) -> Result<TomlConfig> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Resolve an API key from the environment, then the TOML config
///
/// **Priority:** ENV → TOML
pub fn resolve_api_key(env_var: &str, toml_value: Option<&str>, service: &str) -> Result<String> {
    let env_key = std::env::var(env_var).ok().filter(|k| is_valid_key(k));
    let toml_key = toml_value.filter(|k| is_valid_key(k));

    if env_key.is_some() && toml_key.is_some() {
        warn!(
            "{} API key found in both environment and TOML. Using environment (highest priority).",
            service
        );
    }

    if let Some(key) = env_key {
        info!("{} API key loaded from environment variable", service);
        return Ok(key);
    }

    if let Some(key) = toml_key {
        info!("{} API key loaded from TOML config", service);
        return Ok(key.to_string());
    }

    Err(Error::Config(format!(
        "{} API key not configured. Set {} or add api_key to the config file",
        service, env_var
    )))
}

/// Validate API key (non-empty, non-whitespace)
pub fn is_valid_key(key: &str) -> bool {
    !key.trim().is_empty()
}

/// Platform config file location
pub fn default_config_path() -> Option<PathBuf> {
    dirs::config_dir().map(|d| d.join("listing-audit").join("config.toml"))
}

/// Platform database location
pub fn default_database_path() -> PathBuf {
    dirs::data_local_dir()
        .map(|d| d.join("listing-audit").join("listing_audit.db"))
        .unwrap_or_else(|| PathBuf::from("./listing_audit_data/listing_audit.db"))
}
