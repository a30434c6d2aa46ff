//! Capability descriptor
//!
//! Static, read-only configuration describing, per plugin and capability, the
//! set of platforms on which the capability is supported. The descriptor has
//! no mutating methods: it is assembled once through
//! [`CapabilityDescriptorBuilder`] (or deserialized from the configuration
//! file) and only consulted afterwards.

use std::collections::BTreeMap;
use std::fmt::{self, Display, Formatter};

use serde::{Deserialize, Deserializer, Serialize};

use super::newtypes::{CapabilityId, Platform, PluginId};

type PlatformSupport = BTreeMap<String, bool>;
type CapabilitySet = BTreeMap<String, PlatformSupport>;

/// Per-plugin, per-capability platform support table
///
/// Serialized as a nested map:
///
/// ```yaml
/// sqlite:
///   use-sqlite:
///     web: true
///     ios: true
/// ```
///
/// Platform keys are case-insensitive: they are stored lowercased, matching
/// [`Platform::new`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct CapabilityDescriptor {
    plugins: BTreeMap<String, CapabilitySet>,
}

impl CapabilityDescriptor {
    /// An empty descriptor (nothing is available anywhere)
    #[must_use]
    pub fn empty() -> Self {
        Self {
            plugins: BTreeMap::new(),
        }
    }

    /// The descriptor shipped with SQLBridge: both hooks on every known platform
    #[must_use]
    pub fn builtin() -> Self {
        Self::builder()
            .support_all(PluginId::SQLITE, CapabilityId::USE_SQLITE)
            .support_all(PluginId::DATA_STORAGE, CapabilityId::USE_STORAGE)
            .build()
    }

    /// Start building a descriptor
    #[must_use]
    pub fn builder() -> CapabilityDescriptorBuilder {
        CapabilityDescriptorBuilder::default()
    }

    /// Whether `capability` of `plugin` is supported on `platform`
    ///
    /// Returns false when the plugin is unknown, when the capability is
    /// unknown, or when the platform is absent or marked `false`.
    pub fn is_available(&self, plugin: &str, capability: &str, platform: &Platform) -> bool {
        self.plugins
            .get(plugin)
            .and_then(|capabilities| capabilities.get(capability))
            .and_then(|support| support.get(platform.as_str()))
            .copied()
            .unwrap_or(false)
    }

    /// Whether the descriptor mentions `plugin` at all
    pub fn has_plugin(&self, plugin: &str) -> bool {
        self.plugins.contains_key(plugin)
    }

    /// Plugin identifiers in sorted order
    pub fn plugins(&self) -> impl Iterator<Item = &str> {
        self.plugins.keys().map(String::as_str)
    }

    /// Capability identifiers of `plugin` in sorted order
    pub fn capabilities(&self, plugin: &str) -> Vec<&str> {
        self.plugins
            .get(plugin)
            .map(|capabilities| capabilities.keys().map(String::as_str).collect())
            .unwrap_or_default()
    }

    /// Platforms on which `capability` of `plugin` is marked supported
    pub fn supported_platforms(&self, plugin: &str, capability: &str) -> Vec<&str> {
        self.plugins
            .get(plugin)
            .and_then(|capabilities| capabilities.get(capability))
            .map(|support| {
                support
                    .iter()
                    .filter(|(_, supported)| **supported)
                    .map(|(platform, _)| platform.as_str())
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Returns true if no plugin is described
    pub fn is_empty(&self) -> bool {
        self.plugins.is_empty()
    }
}

impl<'de> Deserialize<'de> for CapabilityDescriptor {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = BTreeMap::<String, CapabilitySet>::deserialize(deserializer)?;
        let mut builder = Self::builder();
        for (plugin, capabilities) in raw {
            builder = builder.plugin(plugin.as_str());
            for (capability, support) in capabilities {
                builder = builder.capability(&plugin, capability.as_str());
                for (platform, supported) in support {
                    builder =
                        builder.support(plugin.as_str(), capability.as_str(), platform, supported);
                }
            }
        }
        Ok(builder.build())
    }
}

impl Default for CapabilityDescriptor {
    fn default() -> Self {
        Self::builtin()
    }
}

/// Builder for [`CapabilityDescriptor`]
#[derive(Debug, Default)]
pub struct CapabilityDescriptorBuilder {
    plugins: BTreeMap<String, CapabilitySet>,
}

impl CapabilityDescriptorBuilder {
    /// Mark `capability` of `plugin` as supported (or not) on `platform`
    #[must_use]
    pub fn support(
        mut self,
        plugin: impl Into<String>,
        capability: impl Into<String>,
        platform: impl Into<String>,
        supported: bool,
    ) -> Self {
        self.plugins
            .entry(plugin.into())
            .or_default()
            .entry(capability.into())
            .or_default()
            .insert(platform.into().to_ascii_lowercase(), supported);
        self
    }

    /// Mark `capability` of `plugin` as supported on every known platform
    #[must_use]
    pub fn support_all(self, plugin: &str, capability: &str) -> Self {
        Platform::KNOWN
            .iter()
            .fold(self, |builder, platform| {
                builder.support(plugin, capability, *platform, true)
            })
    }

    /// Declare a capability without any platform
    #[must_use]
    pub fn capability(mut self, plugin: &str, capability: impl Into<String>) -> Self {
        self.plugins
            .entry(plugin.to_string())
            .or_default()
            .entry(capability.into())
            .or_default();
        self
    }

    /// Declare a plugin without any capability
    #[must_use]
    pub fn plugin(mut self, plugin: impl Into<String>) -> Self {
        self.plugins.entry(plugin.into()).or_default();
        self
    }

    #[must_use]
    pub fn build(self) -> CapabilityDescriptor {
        CapabilityDescriptor {
            plugins: self.plugins,
        }
    }
}

// ============================================================================
// Unavailability
// ============================================================================

/// Why a capability is unavailable
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum UnavailableReason {
    /// The host did not register the plugin
    PluginNotRegistered,
    /// The descriptor does not mention the plugin
    PluginNotDescribed,
    /// The descriptor does not mark the platform as supported
    PlatformNotSupported,
}

impl Display for UnavailableReason {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        let text = match self {
            Self::PluginNotRegistered => "plugin not registered",
            Self::PluginNotDescribed => "plugin not described",
            Self::PlatformNotSupported => "platform not supported",
        };
        f.write_str(text)
    }
}

/// A capability that failed the gate
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Unavailable {
    pub plugin: String,
    pub capability: String,
    pub platform: Platform,
    pub reason: UnavailableReason,
}

impl Display for Unavailable {
    fn fmt(&self, f: &mut Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{} on {} ({})",
            self.plugin, self.capability, self.platform, self.reason
        )
    }
}
