//! Capability gate
//!
//! Decides, before any backing call, whether a capability is usable on the
//! current platform. A hook evaluates the gate once, when it is built, and
//! keeps the outcome as a [`Gated`] value: either the operations it can
//! dispatch to, or the reason they are missing. Every call on an unavailable
//! hook fails with [`BridgeError::FeatureNotAvailable`] without reaching the
//! backend.

use crate::domain::{BridgeError, BridgeResult, CapabilityDescriptor, Platform};
use crate::ports::IHostEnvironment;

pub use crate::domain::{Unavailable, UnavailableReason};

/// Pure availability check against the descriptor
///
/// False when `plugin` is absent from the descriptor; otherwise whether
/// `platform` is present and `true` for `capability`.
pub fn is_available(
    descriptor: &CapabilityDescriptor,
    plugin: &str,
    capability: &str,
    platform: &Platform,
) -> bool {
    descriptor.has_plugin(plugin) && descriptor.is_available(plugin, capability, platform)
}

/// Evaluate the gate for the host's current platform
///
/// # Errors
///
/// Returns the [`Unavailable`] description when the host has not registered
/// the plugin or the descriptor does not support it on the host platform.
pub fn check(
    host: &dyn IHostEnvironment,
    descriptor: &CapabilityDescriptor,
    plugin: &str,
    capability: &str,
) -> Result<(), Unavailable> {
    let platform = host.platform();
    let reason = if !host.is_plugin_available(plugin) {
        Some(UnavailableReason::PluginNotRegistered)
    } else if !descriptor.has_plugin(plugin) {
        Some(UnavailableReason::PluginNotDescribed)
    } else if !is_available(descriptor, plugin, capability, &platform) {
        Some(UnavailableReason::PlatformNotSupported)
    } else {
        None
    };

    match reason {
        None => Ok(()),
        Some(reason) => Err(Unavailable {
            plugin: plugin.to_string(),
            capability: capability.to_string(),
            platform,
            reason,
        }),
    }
}

/// Outcome of the gate, fixed for the lifetime of the hook holding it
#[derive(Debug)]
pub enum Gated<T> {
    /// The capability is usable; dispatch to `T`
    Available(T),
    /// The capability is unusable; every call fails with this description
    Unavailable(Unavailable),
}

impl<T> Gated<T> {
    /// Evaluate the gate and build the operations only if it passes
    pub fn evaluate(
        host: &dyn IHostEnvironment,
        descriptor: &CapabilityDescriptor,
        plugin: &str,
        capability: &str,
        build: impl FnOnce() -> T,
    ) -> Self {
        match check(host, descriptor, plugin, capability) {
            Ok(()) => {
                tracing::debug!(plugin, capability, "Capability available");
                Self::Available(build())
            }
            Err(unavailable) => {
                tracing::warn!(
                    plugin,
                    capability,
                    platform = %unavailable.platform,
                    reason = %unavailable.reason,
                    "Capability not available, operations will fail fast"
                );
                Self::Unavailable(unavailable)
            }
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, Self::Available(_))
    }

    /// The failure description, if unavailable
    pub fn unavailable(&self) -> Option<&Unavailable> {
        match self {
            Self::Available(_) => None,
            Self::Unavailable(unavailable) => Some(unavailable),
        }
    }

    /// Borrow the operations or fail with `FeatureNotAvailable`
    pub fn get(&self) -> BridgeResult<&T> {
        match self {
            Self::Available(ops) => Ok(ops),
            Self::Unavailable(unavailable) => {
                Err(BridgeError::FeatureNotAvailable(unavailable.clone()))
            }
        }
    }

    /// Take the operations or fail with `FeatureNotAvailable`
    pub fn into_inner(self) -> BridgeResult<T> {
        match self {
            Self::Available(ops) => Ok(ops),
            Self::Unavailable(unavailable) => Err(BridgeError::FeatureNotAvailable(unavailable)),
        }
    }
}
