//! Port definitions (hexagonal architecture interfaces)
//!
//! Ports are the boundaries the hooks depend on. Implementations live in
//! adapter crates (`sqlbridge-sqlite`) or in tests.
//!
//! ## Ports Overview
//!
//! - [`ISqliteBackend`] - The SQLite connection plugin
//! - [`IStorageBackend`] - The SQLite-backed key-value storage plugin
//! - [`IHostEnvironment`] - Platform and plugin registration reported by the host

pub mod host;
pub mod sqlite_backend;
pub mod storage_backend;

pub use host::{IHostEnvironment, StaticHost};
pub use sqlite_backend::{
    ChangesReply, EchoReply, ExportReply, ISqliteBackend, SqlStatement, StatusReply, ValuesReply,
};
pub use storage_backend::{
    IStorageBackend, KeysReply, KeysValuesReply, StoredValuesReply, ValueReply,
};
