//! Store command - Key-value storage operations
//!
//! Opens the store named by `--database` (default from configuration),
//! selects `--table` and runs one operation on it.

use anyhow::{bail, Result};
use clap::Subcommand;
use tracing::info;

use sqlbridge_core::domain::StoreOptions;

use super::Context;

/// Arguments for the store subcommand
#[derive(Debug, clap::Args)]
pub struct StoreCommand {
    /// Store database name
    #[arg(long)]
    pub database: Option<String>,

    /// Table inside the store
    #[arg(long)]
    pub table: Option<String>,

    #[command(subcommand)]
    pub action: StoreAction,
}

/// Store operations
#[derive(Debug, Subcommand)]
pub enum StoreAction {
    /// Print the value stored under a key
    Get { key: String },
    /// Store a value under a key
    Set { key: String, value: String },
    /// Remove a key
    Remove { key: String },
    /// List keys in insertion order
    Keys,
    /// List values in insertion order
    Values,
    /// List key-value pairs in insertion order
    Entries,
    /// Remove every key of the table
    Clear,
    /// Delete the whole store
    Drop,
}

impl StoreCommand {
    fn options(&self) -> StoreOptions {
        let mut options = StoreOptions::new();
        if let Some(database) = &self.database {
            options = options.with_database(database.as_str());
        }
        if let Some(table) = &self.table {
            options = options.with_table(table.as_str());
        }
        options
    }

    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let formatter = ctx.formatter();
        let json = ctx.format.is_json();
        let hook = ctx.storage_hook()?;
        let options = self.options();

        if let StoreAction::Drop = self.action {
            let deleted = hook.delete_store(&options).await?;
            if json {
                formatter.print_json(&serde_json::json!({ "result": deleted }));
            } else if deleted {
                formatter.success("Store deleted");
            } else {
                formatter.warn("Store does not exist");
            }
            return Ok(());
        }

        if !hook.open_store(&options).await? {
            bail!("Failed to open store");
        }

        match &self.action {
            StoreAction::Get { key } => {
                let value = hook.get_item(key).await?;
                if json {
                    formatter.print_json(&serde_json::json!({ "key": key, "value": value }));
                } else {
                    match value {
                        Some(value) => println!("{}", value),
                        None => formatter.warn(&format!("No value for {}", key)),
                    }
                }
            }
            StoreAction::Set { key, value } => {
                hook.set_item(key, value).await?;
                info!(key = %key, "Stored value");
                if json {
                    formatter.print_json(&serde_json::json!({ "result": true }));
                } else {
                    formatter.success(&format!("Set {}", key));
                }
            }
            StoreAction::Remove { key } => {
                let removed = hook.remove_item(key).await?;
                if json {
                    formatter.print_json(&serde_json::json!({ "result": removed }));
                } else if removed {
                    formatter.success(&format!("Removed {}", key));
                } else {
                    formatter.warn(&format!("No value for {}", key));
                }
            }
            StoreAction::Keys => {
                let keys = hook.get_all_keys().await?;
                if json {
                    formatter.print_json(&serde_json::json!({ "keys": keys }));
                } else {
                    keys.iter().for_each(|key| println!("{}", key));
                }
            }
            StoreAction::Values => {
                let values = hook.get_all_values().await?;
                if json {
                    formatter.print_json(&serde_json::json!({ "values": values }));
                } else {
                    values.iter().for_each(|value| println!("{}", value));
                }
            }
            StoreAction::Entries => {
                let entries = hook.get_all_keys_values().await?;
                if json {
                    formatter.print_json(&serde_json::json!({ "keysvalues": entries }));
                } else {
                    for entry in &entries {
                        println!("{}\t{}", entry.key, entry.value);
                    }
                }
            }
            StoreAction::Clear => {
                let cleared = hook.clear().await?;
                if json {
                    formatter.print_json(&serde_json::json!({ "result": cleared }));
                } else {
                    formatter.success("Store table cleared");
                }
            }
            StoreAction::Drop => {}
        }
        Ok(())
    }
}
