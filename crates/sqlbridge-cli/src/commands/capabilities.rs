//! Capabilities command - Show what the host platform can use
//!
//! Lists every plugin capability in the configured descriptor together with
//! the platforms it supports and the gate outcome on the current host.

use anyhow::Result;
use tracing::info;

use sqlbridge_core::gate;
use sqlbridge_core::ports::IHostEnvironment;

use super::Context;

/// Arguments for the capabilities subcommand
#[derive(Debug, clap::Args)]
pub struct CapabilitiesCommand {
    /// Only show this plugin
    #[arg(long)]
    pub plugin: Option<String>,
}

impl CapabilitiesCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let formatter = ctx.formatter();
        let host = ctx.host()?;
        let descriptor = &ctx.config.capabilities;
        let platform = host.platform();

        info!(platform = %platform, "Checking capabilities");

        let mut entries = Vec::new();
        for plugin in descriptor.plugins() {
            if self.plugin.as_deref().is_some_and(|wanted| wanted != plugin) {
                continue;
            }
            for capability in descriptor.capabilities(plugin) {
                let outcome = gate::check(&host, descriptor, plugin, capability);
                entries.push(serde_json::json!({
                    "plugin": plugin,
                    "capability": capability,
                    "platforms": descriptor.supported_platforms(plugin, capability),
                    "available": outcome.is_ok(),
                    "reason": outcome.err().map(|u| u.reason.to_string()),
                }));
            }
        }

        if ctx.format.is_json() {
            formatter.print_json(&serde_json::json!({
                "platform": platform.as_str(),
                "capabilities": entries,
            }));
            return Ok(());
        }

        formatter.success(&format!("Platform: {}", platform));
        if entries.is_empty() {
            formatter.warn("No capability described");
            return Ok(());
        }
        for entry in &entries {
            let mark = if entry["available"] == true {
                "available"
            } else {
                "unavailable"
            };
            formatter.info(&format!(
                "{}/{}: {} (platforms: {})",
                entry["plugin"].as_str().unwrap_or_default(),
                entry["capability"].as_str().unwrap_or_default(),
                mark,
                entry["platforms"]
                    .as_array()
                    .map(|platforms| platforms
                        .iter()
                        .filter_map(|p| p.as_str())
                        .collect::<Vec<_>>()
                        .join(", "))
                    .unwrap_or_default()
            ));
        }
        Ok(())
    }
}
