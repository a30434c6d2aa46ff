//! SQLBridge Core - Connection registry and capability-gated hooks
//!
//! This crate contains the hexagonal architecture core with:
//! - **Domain types** - `Connection`, `CapabilityDescriptor`, `Platform`, normalized results
//! - **Port definitions** - Traits for adapters: `ISqliteBackend`, `IStorageBackend`, `IHostEnvironment`
//! - **Connection registry** - At-most-one live connection per `(name, read_only)` key
//! - **Capability gate** - Platform availability decided once per hook construction
//! - **Hooks** - `SqliteHook` and `StorageHook`, the public capability surfaces
//!
//! # Architecture
//!
//! The backing SQLite plugin lives behind the port traits. Hooks validate
//! arguments, fill defaults, call the port and normalize its replies.
//! Nothing in this crate interprets the opaque connection handle.

pub mod config;
pub mod domain;
pub mod gate;
pub mod hooks;
pub mod ports;
pub mod registry;

pub use domain::{BackendError, BridgeError, BridgeResult};
pub use gate::{Gated, Unavailable, UnavailableReason};
pub use hooks::{SqliteHook, StorageHook};
pub use registry::{CloseAllReport, ConnectionMap, ConnectionRegistry};
