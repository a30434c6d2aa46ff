//! Key-value storage backend port (driven/secondary port)
//!
//! Interface of the SQLite-backed key-value plugin. The plugin is stateful:
//! `open_store` selects the current database and table, and every key
//! operation applies to that selection until `set_table` or another
//! `open_store` changes it.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use super::sqlite_backend::StatusReply;
use crate::domain::{BackendError, KeyValue, StoreRequest};

/// Reply to `get`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueReply {
    pub value: Option<String>,
}

/// Reply to `keys`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeysReply {
    pub keys: Option<Vec<String>>,
}

/// Reply to `values`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoredValuesReply {
    pub values: Option<Vec<String>>,
}

/// Reply to `keys_values`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeysValuesReply {
    pub keysvalues: Option<Vec<KeyValue>>,
}

/// Port trait for the key-value storage plugin
#[async_trait]
pub trait IStorageBackend: Send + Sync {
    /// Open (creating if needed) a store and make it current
    async fn open_store(&self, request: &StoreRequest) -> Result<StatusReply, BackendError>;

    /// Switch the current table, creating it if needed
    async fn set_table(&self, table: &str) -> Result<StatusReply, BackendError>;

    async fn get(&self, key: &str) -> Result<ValueReply, BackendError>;

    async fn set(&self, key: &str, value: &str) -> Result<StatusReply, BackendError>;

    async fn remove(&self, key: &str) -> Result<StatusReply, BackendError>;

    /// Remove every key of the current table
    async fn clear(&self) -> Result<StatusReply, BackendError>;

    async fn is_key(&self, key: &str) -> Result<StatusReply, BackendError>;

    /// Keys of the current table in insertion order
    async fn keys(&self) -> Result<KeysReply, BackendError>;

    /// Values of the current table in insertion order
    async fn values(&self) -> Result<StoredValuesReply, BackendError>;

    /// Pairs of the current table in insertion order
    async fn keys_values(&self) -> Result<KeysValuesReply, BackendError>;

    /// Delete a store database
    async fn delete_store(&self, database: &str) -> Result<StatusReply, BackendError>;
}
