//! Domain types for SQLBridge
//!
//! This module contains the core domain types:
//! - Newtypes for platforms and connection identifiers
//! - The capability descriptor consulted by the gate
//! - Connection entities and their option resolution
//! - Normalized results returned by the hooks
//! - Error types

pub mod capability;
pub mod connection;
pub mod errors;
pub mod newtypes;
pub mod results;

// Re-export commonly used types
pub use capability::{
    CapabilityDescriptor, CapabilityDescriptorBuilder, Unavailable, UnavailableReason,
};
pub use connection::{
    Connection, ConnectionKey, ConnectionOptions, EncryptionMode, ExportMode, OpenRequest,
    StoreOptions, StoreRequest,
};
pub use errors::{BackendError, BridgeError, BridgeResult};
pub use newtypes::{CapabilityId, ConnectionId, Platform, PluginId};
pub use results::{
    Changes, ChangesResult, EchoResult, ExportResult, KeyValue, QueryResult, SetTableResult,
    StatusResult,
};
