//! SQLite backend port (driven/secondary port)
//!
//! This module defines the interface of the SQLite connection plugin.
//!
//! ## Design Notes
//!
//! - Replies are port-level DTOs whose fields are all optional, mirroring
//!   what a plugin bridge may or may not fill in. The hooks decide what a
//!   missing field means through the `normalize` methods below.
//! - `Err(BackendError)` is reserved for failures the plugin raised; a reply
//!   with a missing field is not an error at this level.
//! - `Handle` is opaque to the core. It is produced by `open` and passed back
//!   to every statement-level call.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::domain::{
    BackendError, Changes, ChangesResult, EchoResult, ExportMode, ExportResult, OpenRequest,
    QueryResult, StatusResult,
};

// ============================================================================
// Request DTOs
// ============================================================================

/// One statement of an `execute_set` batch
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SqlStatement {
    pub statement: String,
    #[serde(default)]
    pub values: Vec<serde_json::Value>,
}

impl SqlStatement {
    pub fn new(statement: impl Into<String>) -> Self {
        Self {
            statement: statement.into(),
            values: Vec::new(),
        }
    }

    pub fn with_values(mut self, values: Vec<serde_json::Value>) -> Self {
        self.values = values;
        self
    }
}

// ============================================================================
// Reply DTOs
// ============================================================================

fn error_in(operation: &str) -> String {
    format!("Error in {operation}")
}

/// Reply carrying a boolean `result`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StatusReply {
    pub result: Option<bool>,
    pub message: Option<String>,
}

impl StatusReply {
    pub fn success() -> Self {
        Self {
            result: Some(true),
            message: None,
        }
    }

    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            result: Some(false),
            message: Some(message.into()),
        }
    }

    /// Keep the reply if `result` is present, otherwise `false` with `Error in <operation>`
    pub fn normalize(self, operation: &str) -> StatusResult {
        match self.result {
            Some(result) => StatusResult {
                result,
                message: self.message,
            },
            None => StatusResult::failed(error_in(operation)),
        }
    }
}

/// Reply carrying row counters
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChangesReply {
    pub changes: Option<Changes>,
    pub message: Option<String>,
}

impl ChangesReply {
    pub fn with_changes(changes: Changes) -> Self {
        Self {
            changes: Some(changes),
            message: None,
        }
    }

    /// Keep the reply if `changes` is present, otherwise `fallback` with `Error in <operation>`
    pub fn normalize(self, operation: &str, fallback: Changes) -> ChangesResult {
        match self.changes {
            Some(changes) => ChangesResult {
                changes,
                message: self.message,
            },
            None => ChangesResult {
                changes: fallback,
                message: Some(error_in(operation)),
            },
        }
    }
}

/// Reply carrying query rows
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ValuesReply {
    pub values: Option<Vec<serde_json::Value>>,
    pub message: Option<String>,
}

impl ValuesReply {
    pub fn with_values(values: Vec<serde_json::Value>) -> Self {
        Self {
            values: Some(values),
            message: None,
        }
    }

    pub fn normalize(self, operation: &str) -> QueryResult {
        match self.values {
            Some(values) => QueryResult {
                values,
                message: self.message,
            },
            None => QueryResult {
                values: Vec::new(),
                message: Some(error_in(operation)),
            },
        }
    }
}

/// Reply carrying an exported JSON document
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ExportReply {
    pub export: Option<serde_json::Value>,
    pub message: Option<String>,
}

impl ExportReply {
    pub fn with_export(export: serde_json::Value) -> Self {
        Self {
            export: Some(export),
            message: None,
        }
    }

    pub fn normalize(self, operation: &str) -> ExportResult {
        match self.export {
            Some(export) => ExportResult {
                export,
                message: self.message,
            },
            None => ExportResult {
                export: serde_json::json!({}),
                message: Some(error_in(operation)),
            },
        }
    }
}

/// Reply to `echo`
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EchoReply {
    pub value: Option<String>,
}

impl EchoReply {
    /// A missing value echoes the input back
    pub fn normalize(self, input: &str) -> EchoResult {
        EchoResult {
            value: self.value.unwrap_or_else(|| input.to_string()),
        }
    }
}

// ============================================================================
// ISqliteBackend trait
// ============================================================================

/// Port trait for the SQLite connection plugin
///
/// Implementations must be safe to share across tasks; the registry
/// serializes its own open/close calls but statement-level calls on
/// different connections may run concurrently.
#[async_trait]
pub trait ISqliteBackend: Send + Sync {
    /// Opaque value identifying an open database inside the plugin
    type Handle: Send + Sync + 'static;

    /// Round-trip a value through the plugin
    async fn echo(&self, value: &str) -> Result<EchoReply, BackendError>;

    // --- Connection lifecycle ---

    /// Open a database and return its handle
    async fn open(&self, request: &OpenRequest) -> Result<Self::Handle, BackendError>;

    /// Release a handle previously returned by `open`
    async fn close(&self, handle: &Self::Handle) -> Result<(), BackendError>;

    // --- Statements ---

    /// Execute one or more raw statements separated by `;`
    async fn execute(
        &self,
        handle: &Self::Handle,
        statements: &str,
    ) -> Result<ChangesReply, BackendError>;

    /// Execute a batch of statements with bound values in one transaction
    async fn execute_set(
        &self,
        handle: &Self::Handle,
        set: &[SqlStatement],
    ) -> Result<ChangesReply, BackendError>;

    /// Execute one statement with bound values
    async fn run(
        &self,
        handle: &Self::Handle,
        statement: &str,
        values: &[serde_json::Value],
    ) -> Result<ChangesReply, BackendError>;

    /// Run a query with bound values
    async fn query(
        &self,
        handle: &Self::Handle,
        statement: &str,
        values: &[serde_json::Value],
    ) -> Result<ValuesReply, BackendError>;

    // --- Synchronization ---

    /// Create the table that stores the last synchronization date
    async fn create_sync_table(&self, handle: &Self::Handle) -> Result<ChangesReply, BackendError>;

    /// Store the last synchronization date
    async fn set_sync_date(
        &self,
        handle: &Self::Handle,
        sync_date: &str,
    ) -> Result<StatusReply, BackendError>;

    // --- JSON import/export ---

    /// Export the database behind `handle` as a JSON document
    async fn export_to_json(
        &self,
        handle: &Self::Handle,
        mode: ExportMode,
    ) -> Result<ExportReply, BackendError>;

    /// Check a JSON document against the import schema
    async fn is_json_valid(&self, json: &str) -> Result<StatusReply, BackendError>;

    /// Create or update a database from a JSON document
    async fn import_from_json(&self, json: &str) -> Result<ChangesReply, BackendError>;

    // --- Database files ---

    /// Whether the database file exists
    async fn is_db_exists(&self, database: &str) -> Result<StatusReply, BackendError>;

    /// Delete the database file
    async fn delete_database(&self, database: &str) -> Result<StatusReply, BackendError>;

    // --- Encryption secrets ---

    /// Whether an encryption secret is stored
    async fn is_secret_stored(&self) -> Result<StatusReply, BackendError>;

    /// Store the encryption secret
    async fn set_encryption_secret(&self, passphrase: &str) -> Result<StatusReply, BackendError>;

    /// Replace the stored encryption secret
    async fn change_encryption_secret(
        &self,
        passphrase: &str,
        old_passphrase: &str,
    ) -> Result<StatusReply, BackendError>;
}
