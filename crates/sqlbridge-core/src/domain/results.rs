//! Normalized results returned by the hooks
//!
//! Unlike the port replies, every field here is populated: when the backend
//! omits the expected field the hook substitutes a failure value and a
//! message of the form `Error in <operation>`.

use serde::{Deserialize, Serialize};

/// Row counters reported by write operations
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Changes {
    /// Number of rows changed
    pub changes: i64,
    /// Row id of the last inserted row
    #[serde(rename = "lastId", default)]
    pub last_id: i64,
}

impl Changes {
    pub fn new(changes: i64, last_id: i64) -> Self {
        Self { changes, last_id }
    }

    /// Nothing changed
    pub fn zero() -> Self {
        Self::new(0, 0)
    }

    /// The operation failed before reporting counters
    pub fn failed() -> Self {
        Self::new(-1, -1)
    }
}

/// Boolean outcome with an optional message
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusResult {
    pub result: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

impl StatusResult {
    pub fn ok() -> Self {
        Self {
            result: true,
            message: None,
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            result: false,
            message: Some(message.into()),
        }
    }
}

/// Outcome of `execute`, `execute_set`, `run`, `import_from_json`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangesResult {
    pub changes: Changes,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Outcome of `query`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct QueryResult {
    /// One JSON object per row, keyed by column name
    pub values: Vec<serde_json::Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Outcome of `export_to_json`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportResult {
    /// The exported document, `{}` on failure
    pub export: serde_json::Value,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

/// Outcome of `echo`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoResult {
    pub value: String,
}

/// Outcome of `StorageHook::set_table`
///
/// `message` is empty on success.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SetTableResult {
    pub result: bool,
    pub message: String,
}

/// A single key-value pair of the storage plugin
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct KeyValue {
    pub key: String,
    pub value: String,
}

impl KeyValue {
    pub fn new(key: impl Into<String>, value: impl Into<String>) -> Self {
        Self {
            key: key.into(),
            value: value.into(),
        }
    }
}
