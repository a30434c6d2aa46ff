//! Domain newtypes with validation
//!
//! Strongly-typed wrappers for the identifiers the gate and the registry key on.
//! Each newtype ensures data validity at construction time.

use std::fmt::{self, Display, Formatter};
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::errors::BridgeError;

// ============================================================================
// Platform
// ============================================================================

/// Runtime platform identifier reported by the host environment
///
/// Stored lowercase and used only as a lookup key into the capability
/// descriptor. The well-known values are `web`, `ios`, `android` and
/// `electron` (desktop runtimes).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct Platform(String);

impl Platform {
    /// Browser runtime
    pub const WEB: &'static str = "web";
    /// iOS runtime
    pub const IOS: &'static str = "ios";
    /// Android runtime
    pub const ANDROID: &'static str = "android";
    /// Desktop runtime
    pub const ELECTRON: &'static str = "electron";

    /// Every platform the built-in descriptor knows about
    pub const KNOWN: [&'static str; 4] = [Self::WEB, Self::IOS, Self::ANDROID, Self::ELECTRON];

    /// Create a new Platform, normalizing to lowercase
    ///
    /// # Errors
    ///
    /// Returns `BridgeError::InvalidArgument` if the identifier is blank.
    pub fn new(value: impl AsRef<str>) -> Result<Self, BridgeError> {
        let trimmed = value.as_ref().trim();
        if trimmed.is_empty() {
            return Err(BridgeError::invalid_argument(
                "Platform identifier cannot be empty",
            ));
        }
        Ok(Self(trimmed.to_ascii_lowercase()))
    }

    #[must_use]
    pub fn web() -> Self {
        Self(Self::WEB.to_string())
    }

    #[must_use]
    pub fn ios() -> Self {
        Self(Self::IOS.to_string())
    }

    #[must_use]
    pub fn android() -> Self {
        Self(Self::ANDROID.to_string())
    }

    #[must_use]
    pub fn electron() -> Self {
        Self(Self::ELECTRON.to_string())
    }

    /// The platform this binary was compiled for
    #[must_use]
    pub fn current() -> Self {
        if cfg!(target_arch = "wasm32") {
            Self::web()
        } else if cfg!(target_os = "ios") {
            Self::ios()
        } else if cfg!(target_os = "android") {
            Self::android()
        } else {
            Self::electron()
        }
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for Platform {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

impl FromStr for Platform {
    type Err = BridgeError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::new(s)
    }
}

impl TryFrom<String> for Platform {
    type Error = BridgeError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::new(value)
    }
}

impl From<Platform> for String {
    fn from(platform: Platform) -> Self {
        platform.0
    }
}

// ============================================================================
// Plugin and capability identifiers
// ============================================================================

/// Identifier of a backing plugin as registered with the host
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct PluginId(String);

impl PluginId {
    /// The SQLite connection plugin
    pub const SQLITE: &'static str = "sqlite";
    /// The SQLite-backed key-value storage plugin
    pub const DATA_STORAGE: &'static str = "data-storage";

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn sqlite() -> Self {
        Self(Self::SQLITE.to_string())
    }

    #[must_use]
    pub fn data_storage() -> Self {
        Self(Self::DATA_STORAGE.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for PluginId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Identifier of a capability exposed by a plugin
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CapabilityId(String);

impl CapabilityId {
    /// The `SqliteHook` surface
    pub const USE_SQLITE: &'static str = "use-sqlite";
    /// The `StorageHook` surface
    pub const USE_STORAGE: &'static str = "use-storage";

    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    #[must_use]
    pub fn use_sqlite() -> Self {
        Self(Self::USE_SQLITE.to_string())
    }

    #[must_use]
    pub fn use_storage() -> Self {
        Self(Self::USE_STORAGE.to_string())
    }

    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl Display for CapabilityId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

// ============================================================================
// ConnectionId
// ============================================================================

/// Identifier assigned to every connection the registry opens
///
/// Only used for log correlation; identity in the registry is the
/// [`ConnectionKey`](super::ConnectionKey).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ConnectionId(Uuid);

impl ConnectionId {
    /// Create a new random ConnectionId
    #[must_use]
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }

    /// Get the inner UUID value
    #[must_use]
    pub const fn as_uuid(&self) -> &Uuid {
        &self.0
    }
}

impl Default for ConnectionId {
    fn default() -> Self {
        Self::new()
    }
}

impl Display for ConnectionId {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}
