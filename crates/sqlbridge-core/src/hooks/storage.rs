//! Key-value storage hook
//!
//! Exposes the data-storage plugin. Each store is a SQLite database holding
//! one or more tables of string keys and string values; the plugin keeps a
//! "current" store and table, which `open_store` and `set_table` select.

use std::sync::Arc;

use tracing::debug;

use super::require;
use crate::config::{Config, StorageDefaults};
use crate::domain::{
    BackendError, BridgeResult, CapabilityDescriptor, CapabilityId, KeyValue, PluginId,
    SetTableResult, StoreOptions,
};
use crate::gate::{Gated, Unavailable};
use crate::ports::{IHostEnvironment, IStorageBackend};

struct StorageOps<B: IStorageBackend> {
    backend: Arc<B>,
    defaults: StorageDefaults,
}

/// Public surface of the key-value storage plugin
pub struct StorageHook<B: IStorageBackend> {
    gate: Gated<StorageOps<B>>,
}

impl<B: IStorageBackend> StorageHook<B> {
    /// Build the hook, evaluating availability once
    pub fn new(
        backend: Arc<B>,
        host: &dyn IHostEnvironment,
        descriptor: &CapabilityDescriptor,
        defaults: StorageDefaults,
    ) -> Self {
        let gate = Gated::evaluate(
            host,
            descriptor,
            PluginId::DATA_STORAGE,
            CapabilityId::USE_STORAGE,
            || StorageOps { backend, defaults },
        );
        Self { gate }
    }

    pub fn from_config(backend: Arc<B>, host: &dyn IHostEnvironment, config: &Config) -> Self {
        Self::new(backend, host, &config.capabilities, config.storage.clone())
    }

    pub fn is_available(&self) -> bool {
        self.gate.is_available()
    }

    pub fn unavailable(&self) -> Option<&Unavailable> {
        self.gate.unavailable()
    }

    fn ops(&self) -> BridgeResult<&StorageOps<B>> {
        self.gate.get()
    }

    /// Open a store and make it current
    ///
    /// Unset or empty options fall back to the configured defaults. Returns
    /// the plugin's `result`, or `false` when the reply carries none.
    pub async fn open_store(&self, options: &StoreOptions) -> BridgeResult<bool> {
        let ops = self.ops()?;
        let request = options.resolve(&ops.defaults);

        let reply = ops.backend.open_store(&request).await?;
        let opened = reply.result.unwrap_or(false);
        debug!(
            database = %request.database,
            table = %request.table,
            opened,
            "result openStore"
        );
        Ok(opened)
    }

    /// Switch the current table; an empty name selects the default table
    pub async fn set_table(&self, table: &str) -> BridgeResult<SetTableResult> {
        let ops = self.ops()?;
        let table = if table.is_empty() {
            ops.defaults.table.as_str()
        } else {
            table
        };

        let reply = ops.backend.set_table(table).await?;
        let result = match (reply.message, reply.result) {
            (Some(message), _) if !message.is_empty() => SetTableResult {
                result: false,
                message,
            },
            (_, Some(true)) => SetTableResult {
                result: true,
                message: String::new(),
            },
            _ => SetTableResult {
                result: false,
                message: "Error in setTable".to_string(),
            },
        };
        debug!(table, result = result.result, "result setTable");
        Ok(result)
    }

    /// Value stored under `key`; `None` when absent or empty
    pub async fn get_item(&self, key: &str) -> BridgeResult<Option<String>> {
        let ops = self.ops()?;
        require(key, "Must provide a key")?;

        let reply = ops.backend.get(key).await?;
        Ok(reply.value.filter(|value| !value.is_empty()))
    }

    /// Store `value` under `key`, replacing any previous value
    ///
    /// # Errors
    ///
    /// Returns `Backing` when the plugin reports `result: false`.
    pub async fn set_item(&self, key: &str, value: &str) -> BridgeResult<()> {
        let ops = self.ops()?;
        require(key, "Must provide a key")?;

        let reply = ops.backend.set(key, value).await?;
        if reply.result == Some(false) {
            let message = reply
                .message
                .filter(|m| !m.is_empty())
                .unwrap_or_else(|| "Error in setItem".to_string());
            return Err(BackendError::new(message).into());
        }
        debug!(key, "result setItem");
        Ok(())
    }

    pub async fn remove_item(&self, key: &str) -> BridgeResult<bool> {
        let ops = self.ops()?;
        require(key, "Must provide a key")?;
        Ok(ops.backend.remove(key).await?.result.unwrap_or(false))
    }

    /// Remove every key of the current table
    pub async fn clear(&self) -> BridgeResult<bool> {
        let ops = self.ops()?;
        Ok(ops.backend.clear().await?.result.unwrap_or(false))
    }

    pub async fn is_key(&self, key: &str) -> BridgeResult<bool> {
        let ops = self.ops()?;
        require(key, "Must provide a key")?;
        Ok(ops.backend.is_key(key).await?.result.unwrap_or(false))
    }

    pub async fn get_all_keys(&self) -> BridgeResult<Vec<String>> {
        let ops = self.ops()?;
        Ok(ops.backend.keys().await?.keys.unwrap_or_default())
    }

    pub async fn get_all_values(&self) -> BridgeResult<Vec<String>> {
        let ops = self.ops()?;
        Ok(ops.backend.values().await?.values.unwrap_or_default())
    }

    pub async fn get_all_keys_values(&self) -> BridgeResult<Vec<KeyValue>> {
        let ops = self.ops()?;
        Ok(ops.backend.keys_values().await?.keysvalues.unwrap_or_default())
    }

    /// Delete a store database; only `database` is read from `options`
    pub async fn delete_store(&self, options: &StoreOptions) -> BridgeResult<bool> {
        let ops = self.ops()?;
        let request = options.resolve(&ops.defaults);

        let deleted = ops
            .backend
            .delete_store(&request.database)
            .await?
            .result
            .unwrap_or(false);
        debug!(database = %request.database, deleted, "result deleteStore");
        Ok(deleted)
    }
}
