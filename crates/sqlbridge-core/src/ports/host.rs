//! Host environment port
//!
//! The host reports which platform the process runs on and which plugins
//! were registered with it. Both answers are treated as fixed for the
//! lifetime of a hook.

use std::collections::BTreeSet;

use crate::domain::{Platform, PluginId};

/// Port trait for the runtime host
pub trait IHostEnvironment: Send + Sync {
    /// Platform identifier of the current runtime
    fn platform(&self) -> Platform;

    /// Whether `plugin` has been registered with the host
    fn is_plugin_available(&self, plugin: &str) -> bool;
}

/// A host whose answers are fixed at construction
///
/// Used by the CLI, which links its plugins statically, and by tests that
/// need to simulate other platforms.
#[derive(Debug, Clone)]
pub struct StaticHost {
    platform: Platform,
    plugins: BTreeSet<String>,
}

impl StaticHost {
    /// A host on `platform` with no plugin registered
    pub fn new(platform: Platform) -> Self {
        Self {
            platform,
            plugins: BTreeSet::new(),
        }
    }

    /// A host on the compile-time platform with both SQLite plugins registered
    pub fn detect() -> Self {
        Self::new(Platform::current())
            .with_plugin(PluginId::SQLITE)
            .with_plugin(PluginId::DATA_STORAGE)
    }

    /// Register a plugin
    #[must_use]
    pub fn with_plugin(mut self, plugin: impl Into<String>) -> Self {
        self.plugins.insert(plugin.into());
        self
    }

    /// Replace the reported platform
    #[must_use]
    pub fn with_platform(mut self, platform: Platform) -> Self {
        self.platform = platform;
        self
    }
}

impl IHostEnvironment for StaticHost {
    fn platform(&self) -> Platform {
        self.platform.clone()
    }

    fn is_plugin_available(&self, plugin: &str) -> bool {
        self.plugins.contains(plugin)
    }
}
