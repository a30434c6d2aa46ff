//! SQLBridge SQLite - Plugin adapters over SQLx
//!
//! Local implementations of the two backing plugin ports:
//! - Named SQLite databases with statement execution and JSON import/export
//! - A key-value store kept in per-table SQLite tables
//!
//! ## Architecture
//!
//! This crate implements `ISqliteBackend` and `IStorageBackend` from
//! `sqlbridge-core`. It is a driven (secondary) adapter in the hexagonal
//! architecture: the hooks call into it, it never calls back.
//!
//! ## Key Components
//!
//! - [`DatabasePool`] - Per-database SQLx pool
//! - [`SqlxSqliteBackend`] - Full `ISqliteBackend` implementation
//! - [`SqlxStorageBackend`] - Full `IStorageBackend` implementation
//! - [`AdapterError`] - Error types for adapter operations
//!
//! ## Usage
//!
//! ```no_run
//! use std::sync::Arc;
//! use sqlbridge_core::config::Config;
//! use sqlbridge_core::ports::StaticHost;
//! use sqlbridge_core::SqliteHook;
//! use sqlbridge_sqlite::SqlxSqliteBackend;
//!
//! # async fn example() -> Result<(), sqlbridge_core::BridgeError> {
//! let config = Config::default();
//! let backend = Arc::new(SqlxSqliteBackend::new(&config.host.database_dir));
//! let hook = SqliteHook::from_config(backend, &StaticHost::detect(), &config);
//! let conn = hook.create_connection("testDB", &Default::default()).await?;
//! hook.execute(&conn, "CREATE TABLE IF NOT EXISTS users (id INTEGER PRIMARY KEY);").await?;
//! # Ok(())
//! # }
//! ```

pub mod backend;
pub mod json;
pub mod pool;
pub mod storage;
mod values;

pub use backend::{SqliteHandle, SqlxSqliteBackend};
pub use pool::{database_path, DatabasePool};
pub use storage::SqlxStorageBackend;

use sqlbridge_core::BackendError;

/// Errors that can occur inside the adapters
#[derive(Debug, thiserror::Error)]
pub enum AdapterError {
    /// Failed to open or create a database
    #[error("Connection failed: {0}")]
    ConnectionFailed(String),

    /// A statement failed
    #[error("Query failed: {0}")]
    QueryFailed(String),

    /// A write was attempted on a read-only connection
    #[error("Read-only connection: {0}")]
    ReadOnly(String),

    /// The JSON document is malformed or inconsistent
    #[error("Invalid JSON document: {0}")]
    InvalidJson(String),

    /// The requested feature is not provided by this adapter
    #[error("Not supported: {0}")]
    Unsupported(String),

    /// A database name that does not map to a file inside the database directory
    #[error("Invalid database name: {0:?}")]
    InvalidName(String),

    /// No store has been opened yet
    #[error("No store opened")]
    StoreNotOpen,

    /// A filesystem operation failed
    #[error("I/O error: {0}")]
    Io(String),
}

impl AdapterError {
    /// Stable machine-readable tag, carried in the `BackendError` payload
    pub fn kind(&self) -> &'static str {
        match self {
            Self::ConnectionFailed(_) => "connection_failed",
            Self::QueryFailed(_) => "query_failed",
            Self::ReadOnly(_) => "read_only",
            Self::InvalidJson(_) => "invalid_json",
            Self::Unsupported(_) => "unsupported",
            Self::InvalidName(_) => "invalid_name",
            Self::StoreNotOpen => "store_not_open",
            Self::Io(_) => "io",
        }
    }
}

impl From<sqlx::Error> for AdapterError {
    fn from(e: sqlx::Error) -> Self {
        AdapterError::QueryFailed(e.to_string())
    }
}

impl From<std::io::Error> for AdapterError {
    fn from(e: std::io::Error) -> Self {
        AdapterError::Io(e.to_string())
    }
}

impl From<AdapterError> for BackendError {
    fn from(e: AdapterError) -> Self {
        BackendError::new(e.to_string()).with_payload(serde_json::json!({ "kind": e.kind() }))
    }
}
