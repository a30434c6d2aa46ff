//! Configuration module for SQLBridge.
//!
//! Provides typed configuration structs that map to the YAML configuration file,
//! with loading, validation, defaults, and a builder pattern for programmatic use.
//!
//! Every optional hook parameter has its default here, so defaults are applied
//! once when options are resolved and nowhere else.

use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::domain::{CapabilityDescriptor, EncryptionMode, Platform};

// ---------------------------------------------------------------------------
// Config struct with sub-sections
// ---------------------------------------------------------------------------

/// Top-level configuration for SQLBridge.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Config {
    pub host: HostConfig,
    pub sqlite: ConnectionDefaults,
    pub storage: StorageDefaults,
    pub logging: LoggingConfig,
    pub capabilities: CapabilityDescriptor,
}

/// Host environment settings.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    /// Platform to report instead of the compile-time one (`web`, `ios`, ...).
    pub platform: Option<String>,
    /// Directory holding the database files.
    pub database_dir: PathBuf,
}

/// Defaults applied to unset `ConnectionOptions` fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnectionDefaults {
    /// Open databases encrypted.
    pub encrypted: bool,
    /// Encryption mode: `no-encryption`, `encryption`, `secret` or `newsecret`.
    pub mode: EncryptionMode,
    /// Schema version requested on open.
    pub version: u32,
    /// Open connections read-only.
    pub read_only: bool,
}

/// Defaults applied to unset `StoreOptions` fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StorageDefaults {
    /// Store database name.
    pub database: String,
    /// Table holding the key-value pairs.
    pub table: String,
    pub encrypted: bool,
    pub mode: EncryptionMode,
}

/// Logging / tracing settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level: `trace`, `debug`, `info`, `warn`, or `error`.
    pub level: String,
    /// Emit JSON lines instead of human-readable output.
    pub json: bool,
}

// ---------------------------------------------------------------------------
// Config::load()
// ---------------------------------------------------------------------------

impl Config {
    /// Load configuration from a YAML file at `path`.
    pub fn load(path: &Path) -> anyhow::Result<Self> {
        let content = std::fs::read_to_string(path)?;
        let config: Config = serde_yaml::from_str(&content)?;
        Ok(config)
    }

    /// Try to load from `path`; fall back to [`Config::default`] on any error.
    pub fn load_or_default(path: &Path) -> Self {
        match Self::load(path) {
            Ok(config) => config,
            Err(e) => {
                tracing::debug!(path = %path.display(), error = %e, "Using default configuration");
                Self::default()
            }
        }
    }

    /// Platform-appropriate default path for the configuration file.
    ///
    /// Typically `$XDG_CONFIG_HOME/sqlbridge/config.yaml` on Linux.
    pub fn default_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("~/.config"))
            .join("sqlbridge")
            .join("config.yaml")
    }

    /// The platform the host should report: the override if set, else the compile-time one.
    pub fn platform(&self) -> anyhow::Result<Platform> {
        match self.host.platform.as_deref() {
            Some(platform) => Ok(Platform::new(platform)?),
            None => Ok(Platform::current()),
        }
    }
}

// ---------------------------------------------------------------------------
// Defaults
// ---------------------------------------------------------------------------

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            platform: None,
            database_dir: dirs::data_local_dir()
                .unwrap_or_else(|| PathBuf::from("~/.local/share"))
                .join("sqlbridge")
                .join("databases"),
        }
    }
}

impl Default for ConnectionDefaults {
    fn default() -> Self {
        Self {
            encrypted: false,
            mode: EncryptionMode::NoEncryption,
            version: 1,
            read_only: false,
        }
    }
}

impl Default for StorageDefaults {
    fn default() -> Self {
        Self {
            database: "storage".to_string(),
            table: "storage_table".to_string(),
            encrypted: false,
            mode: EncryptionMode::NoEncryption,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

// ---------------------------------------------------------------------------
// Config::validate()
// ---------------------------------------------------------------------------

/// A single validation error found in the configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ValidationError {
    /// Dotted path to the offending field, e.g. `"sqlite.version"`.
    pub field: String,
    /// Human-readable explanation.
    pub message: String,
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}: {}", self.field, self.message)
    }
}

/// Valid values for `logging.level`.
const VALID_LOG_LEVELS: &[&str] = &["trace", "debug", "info", "warn", "error"];

impl Config {
    /// Validate the configuration and return all errors found.
    ///
    /// An empty vector means the configuration is valid.
    pub fn validate(&self) -> Vec<ValidationError> {
        let mut errors = Vec::new();

        // --- host ---
        if let Some(ref platform) = self.host.platform {
            if platform.trim().is_empty() {
                errors.push(ValidationError {
                    field: "host.platform".into(),
                    message: "must not be empty when set".into(),
                });
            }
        }
        if self.host.database_dir.as_os_str().is_empty() {
            errors.push(ValidationError {
                field: "host.database_dir".into(),
                message: "must not be empty".into(),
            });
        }

        // --- sqlite ---
        if self.sqlite.version == 0 {
            errors.push(ValidationError {
                field: "sqlite.version".into(),
                message: "must be greater than 0".into(),
            });
        }
        if self.sqlite.encrypted && self.sqlite.mode == EncryptionMode::NoEncryption {
            errors.push(ValidationError {
                field: "sqlite.mode".into(),
                message: "encrypted databases need an encryption mode".into(),
            });
        }

        // --- storage ---
        if self.storage.database.is_empty() {
            errors.push(ValidationError {
                field: "storage.database".into(),
                message: "must not be empty".into(),
            });
        }
        if self.storage.table.is_empty() {
            errors.push(ValidationError {
                field: "storage.table".into(),
                message: "must not be empty".into(),
            });
        }
        if self.storage.encrypted && self.storage.mode == EncryptionMode::NoEncryption {
            errors.push(ValidationError {
                field: "storage.mode".into(),
                message: "encrypted stores need an encryption mode".into(),
            });
        }

        // --- logging ---
        if !VALID_LOG_LEVELS.contains(&self.logging.level.as_str()) {
            errors.push(ValidationError {
                field: "logging.level".into(),
                message: format!(
                    "invalid level '{}'; valid options: {}",
                    self.logging.level,
                    VALID_LOG_LEVELS.join(", ")
                ),
            });
        }

        // --- capabilities ---
        if self.capabilities.is_empty() {
            errors.push(ValidationError {
                field: "capabilities".into(),
                message: "no plugin described; every hook would be unavailable".into(),
            });
        }

        errors
    }
}

// ---------------------------------------------------------------------------
// ConfigBuilder
// ---------------------------------------------------------------------------

/// Fluent builder for [`Config`], starting from defaults.
#[derive(Debug, Default)]
pub struct ConfigBuilder {
    config: Config,
}

impl ConfigBuilder {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn platform(mut self, platform: impl Into<String>) -> Self {
        self.config.host.platform = Some(platform.into());
        self
    }

    pub fn database_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.config.host.database_dir = dir.into();
        self
    }

    pub fn sqlite_defaults(mut self, defaults: ConnectionDefaults) -> Self {
        self.config.sqlite = defaults;
        self
    }

    pub fn storage_defaults(mut self, defaults: StorageDefaults) -> Self {
        self.config.storage = defaults;
        self
    }

    pub fn log_level(mut self, level: impl Into<String>) -> Self {
        self.config.logging.level = level.into();
        self
    }

    pub fn capabilities(mut self, descriptor: CapabilityDescriptor) -> Self {
        self.config.capabilities = descriptor;
        self
    }

    pub fn build(self) -> Config {
        self.config
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
