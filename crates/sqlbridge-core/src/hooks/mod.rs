//! Hooks: the public capability surfaces
//!
//! Each hook is built once per consumer. Construction evaluates the
//! capability gate; afterwards every operation either dispatches to the
//! backend port or fails with `FeatureNotAvailable`.
//!
//! - [`SqliteHook`] - Connections, statements, JSON import/export, secrets
//! - [`StorageHook`] - Key-value storage

pub mod sqlite;
pub mod storage;

pub use sqlite::SqliteHook;
pub use storage::StorageHook;

use crate::domain::{BridgeError, BridgeResult};

/// Reject an empty required string argument
fn require(value: &str, message: &str) -> BridgeResult<()> {
    if value.is_empty() {
        Err(BridgeError::invalid_argument(message))
    } else {
        Ok(())
    }
}
