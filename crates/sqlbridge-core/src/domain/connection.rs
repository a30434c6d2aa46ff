//! Connection entities and option resolution
//!
//! Caller-facing option structs keep every field optional. They are resolved
//! exactly once, at the hook boundary, against the configured defaults into
//! the fully-populated request structs the backing ports receive.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::errors::BridgeError;
use super::newtypes::ConnectionId;
use crate::config::{ConnectionDefaults, StorageDefaults};

// ============================================================================
// Encryption and export modes
// ============================================================================

/// Encryption mode requested when opening a database
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum EncryptionMode {
    #[default]
    #[serde(rename = "no-encryption")]
    NoEncryption,
    #[serde(rename = "encryption")]
    Encryption,
    #[serde(rename = "secret")]
    Secret,
    #[serde(rename = "newsecret")]
    NewSecret,
}

impl EncryptionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NoEncryption => "no-encryption",
            Self::Encryption => "encryption",
            Self::Secret => "secret",
            Self::NewSecret => "newsecret",
        }
    }
}

impl Display for EncryptionMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for EncryptionMode {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "no-encryption" => Ok(Self::NoEncryption),
            "encryption" => Ok(Self::Encryption),
            "secret" => Ok(Self::Secret),
            "newsecret" => Ok(Self::NewSecret),
            other => Err(BridgeError::invalid_argument(format!(
                "Unknown encryption mode: {other}"
            ))),
        }
    }
}

/// Which rows `export_to_json` includes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportMode {
    /// Every row of every table
    Full,
    /// Only rows modified since the last sync date
    Partial,
}

impl ExportMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Full => "full",
            Self::Partial => "partial",
        }
    }
}

impl Display for ExportMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ExportMode {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "" => Err(BridgeError::invalid_argument("Must provide an export mode")),
            "full" => Ok(Self::Full),
            "partial" => Ok(Self::Partial),
            other => Err(BridgeError::invalid_argument(format!(
                "Unknown export mode: {other}"
            ))),
        }
    }
}

// ============================================================================
// Connection identity
// ============================================================================

/// Registry identity of a connection
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ConnectionKey {
    pub name: String,
    pub read_only: bool,
}

impl ConnectionKey {
    pub fn new(name: impl Into<String>, read_only: bool) -> Self {
        Self {
            name: name.into(),
            read_only,
        }
    }
}

/// Read-only connections are rendered `RO_<name>`, read-write ones as the bare name
impl Display for ConnectionKey {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        if self.read_only {
            write!(f, "RO_{}", self.name)
        } else {
            f.write_str(&self.name)
        }
    }
}

// ============================================================================
// SQLite connection options
// ============================================================================

/// Caller-supplied options for `create_connection`
///
/// Unset fields fall back to [`ConnectionDefaults`].
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ConnectionOptions {
    pub encrypted: Option<bool>,
    pub mode: Option<EncryptionMode>,
    pub version: Option<u32>,
    pub read_only: Option<bool>,
}

impl ConnectionOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_encrypted(mut self, encrypted: bool) -> Self {
        self.encrypted = Some(encrypted);
        self
    }

    pub fn with_mode(mut self, mode: EncryptionMode) -> Self {
        self.mode = Some(mode);
        self
    }

    pub fn with_version(mut self, version: u32) -> Self {
        self.version = Some(version);
        self
    }

    pub fn with_read_only(mut self, read_only: bool) -> Self {
        self.read_only = Some(read_only);
        self
    }

    /// Fill unset fields from `defaults`
    pub fn resolve(&self, database: &str, defaults: &ConnectionDefaults) -> OpenRequest {
        OpenRequest {
            database: database.to_string(),
            encrypted: self.encrypted.unwrap_or(defaults.encrypted),
            mode: self.mode.unwrap_or(defaults.mode),
            version: self.version.unwrap_or(defaults.version),
            read_only: self.read_only.unwrap_or(defaults.read_only),
        }
    }
}

/// Fully-resolved request passed to `ISqliteBackend::open`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct OpenRequest {
    pub database: String,
    pub encrypted: bool,
    pub mode: EncryptionMode,
    pub version: u32,
    pub read_only: bool,
}

impl OpenRequest {
    pub fn key(&self) -> ConnectionKey {
        ConnectionKey::new(self.database.clone(), self.read_only)
    }
}

// ============================================================================
// Key-value store options
// ============================================================================

/// Caller-supplied options for `open_store` and `delete_store`
///
/// Empty strings count as unset.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreOptions {
    pub database: Option<String>,
    pub table: Option<String>,
    pub encrypted: Option<bool>,
    pub mode: Option<EncryptionMode>,
}

impl StoreOptions {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_database(mut self, database: impl Into<String>) -> Self {
        self.database = Some(database.into());
        self
    }

    pub fn with_table(mut self, table: impl Into<String>) -> Self {
        self.table = Some(table.into());
        self
    }

    pub fn with_encrypted(mut self, encrypted: bool) -> Self {
        self.encrypted = Some(encrypted);
        self
    }

    pub fn with_mode(mut self, mode: EncryptionMode) -> Self {
        self.mode = Some(mode);
        self
    }

    /// Fill unset fields from `defaults`
    pub fn resolve(&self, defaults: &StorageDefaults) -> StoreRequest {
        StoreRequest {
            database: non_empty_or(self.database.as_deref(), &defaults.database),
            table: non_empty_or(self.table.as_deref(), &defaults.table),
            encrypted: self.encrypted.unwrap_or(defaults.encrypted),
            mode: self.mode.unwrap_or(defaults.mode),
        }
    }
}

fn non_empty_or(value: Option<&str>, fallback: &str) -> String {
    match value {
        Some(v) if !v.is_empty() => v.to_string(),
        _ => fallback.to_string(),
    }
}

/// Fully-resolved request passed to `IStorageBackend::open_store`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StoreRequest {
    pub database: String,
    pub table: String,
    pub encrypted: bool,
    pub mode: EncryptionMode,
}

// ============================================================================
// Connection
// ============================================================================

/// A live logical connection held by the registry
///
/// `H` is whatever the backing plugin returned from `open`; the registry
/// stores it and hands it back to the backend but never looks inside.
#[derive(Debug)]
pub struct Connection<H> {
    id: ConnectionId,
    request: OpenRequest,
    handle: H,
    opened_at: DateTime<Utc>,
}

impl<H> Connection<H> {
    pub fn new(request: OpenRequest, handle: H) -> Self {
        Self {
            id: ConnectionId::new(),
            request,
            handle,
            opened_at: Utc::now(),
        }
    }

    pub fn id(&self) -> ConnectionId {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.request.database
    }

    pub fn read_only(&self) -> bool {
        self.request.read_only
    }

    pub fn key(&self) -> ConnectionKey {
        self.request.key()
    }

    /// The resolved options the connection was opened with
    pub fn options(&self) -> &OpenRequest {
        &self.request
    }

    pub fn handle(&self) -> &H {
        &self.handle
    }

    pub fn opened_at(&self) -> DateTime<Utc> {
        self.opened_at
    }

    pub(crate) fn matches(&self, key: &ConnectionKey) -> bool {
        self.request.database == key.name && self.request.read_only == key.read_only
    }
}
