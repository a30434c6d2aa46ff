//! CLI command implementations
//!
//! Every command receives a [`Context`] holding the resolved configuration.
//! Hooks are built per invocation, so the capability gate is evaluated once
//! per command run.

pub mod capabilities;
pub mod completions;
pub mod config;
pub mod sql;
pub mod store;

use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context as _, Result};

use sqlbridge_core::config::Config;
use sqlbridge_core::domain::PluginId;
use sqlbridge_core::ports::StaticHost;
use sqlbridge_core::{SqliteHook, StorageHook};
use sqlbridge_sqlite::{SqlxSqliteBackend, SqlxStorageBackend};

use crate::output::{get_formatter, OutputFormat, OutputFormatter};

/// Configuration and output settings shared by all commands
pub struct Context {
    pub config: Config,
    pub config_path: PathBuf,
    pub format: OutputFormat,
}

impl Context {
    pub fn new(config: Config, config_path: PathBuf, format: OutputFormat) -> Self {
        Self {
            config,
            config_path,
            format,
        }
    }

    pub fn formatter(&self) -> Box<dyn OutputFormatter> {
        get_formatter(self.format)
    }

    /// The host seen by the hooks: both plugins are linked in
    pub fn host(&self) -> Result<StaticHost> {
        let platform = self
            .config
            .platform()
            .context("Invalid platform in configuration")?;
        Ok(StaticHost::new(platform)
            .with_plugin(PluginId::SQLITE)
            .with_plugin(PluginId::DATA_STORAGE))
    }

    pub fn sqlite_hook(&self) -> Result<SqliteHook<SqlxSqliteBackend>> {
        let backend = Arc::new(SqlxSqliteBackend::new(&self.config.host.database_dir));
        Ok(SqliteHook::from_config(backend, &self.host()?, &self.config))
    }

    pub fn storage_hook(&self) -> Result<StorageHook<SqlxStorageBackend>> {
        let backend = Arc::new(SqlxStorageBackend::new(&self.config.host.database_dir));
        Ok(StorageHook::from_config(backend, &self.host()?, &self.config))
    }
}

/// Parse `--values` given as a JSON array
pub(crate) fn parse_values(raw: Option<&str>) -> Result<Vec<serde_json::Value>> {
    match raw {
        None => Ok(Vec::new()),
        Some(raw) => {
            let value: serde_json::Value =
                serde_json::from_str(raw).context("Values must be valid JSON")?;
            match value {
                serde_json::Value::Array(values) => Ok(values),
                _ => anyhow::bail!("Values must be a JSON array"),
            }
        }
    }
}
