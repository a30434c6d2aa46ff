//! SQL command - Statements, queries and JSON transfer on one database
//!
//! Each invocation opens a connection through the SQLite hook, performs one
//! operation and closes every connection before returning.

use std::path::{Path, PathBuf};

use anyhow::{Context as _, Result};
use clap::Subcommand;
use tracing::{info, warn};

use sqlbridge_core::domain::{ChangesResult, ConnectionOptions, StatusResult};
use sqlbridge_core::SqliteHook;
use sqlbridge_sqlite::SqlxSqliteBackend;

use super::{parse_values, Context};
use crate::output::OutputFormatter;

/// SQL subcommands
#[derive(Debug, Subcommand)]
pub enum SqlCommand {
    /// Execute raw statements separated by `;`
    Exec {
        /// Database name
        database: String,
        /// Statements to execute
        statements: String,
    },
    /// Execute one statement with bound values
    Run {
        database: String,
        statement: String,
        /// Values to bind, as a JSON array
        #[arg(long)]
        values: Option<String>,
    },
    /// Run a query and print the rows
    Query {
        database: String,
        statement: String,
        /// Values to bind, as a JSON array
        #[arg(long)]
        values: Option<String>,
        /// Open the database read-only
        #[arg(long)]
        read_only: bool,
    },
    /// Create the sync table, optionally setting the sync date
    Sync {
        database: String,
        /// New synchronization date (RFC 3339)
        #[arg(long)]
        date: Option<String>,
    },
    /// Export a database as a JSON document
    Export {
        database: String,
        /// Export mode: full or partial
        #[arg(long, default_value = "full")]
        mode: String,
    },
    /// Import a JSON document into the database it names
    Import {
        /// Path to the JSON document
        file: PathBuf,
    },
    /// Check a JSON document is importable
    ValidateJson {
        /// Path to the JSON document
        file: PathBuf,
    },
    /// Check whether a database exists
    Exists { database: String },
    /// Delete a database file
    Delete { database: String },
}

impl SqlCommand {
    pub async fn execute(&self, ctx: &Context) -> Result<()> {
        let formatter = ctx.formatter();
        let hook = ctx.sqlite_hook()?;

        let outcome = self.dispatch(ctx, &hook, formatter.as_ref()).await;
        close_connections(&hook, formatter.as_ref()).await;
        outcome
    }

    async fn dispatch(
        &self,
        ctx: &Context,
        hook: &SqliteHook<SqlxSqliteBackend>,
        formatter: &dyn OutputFormatter,
    ) -> Result<()> {
        let json = ctx.format.is_json();
        match self {
            SqlCommand::Exec {
                database,
                statements,
            } => {
                let conn = hook
                    .create_connection(database, &ConnectionOptions::new())
                    .await?;
                let result = hook.execute(&conn, statements).await?;
                print_changes(formatter, json, "Executed", &result)
            }
            SqlCommand::Run {
                database,
                statement,
                values,
            } => {
                let values = parse_values(values.as_deref())?;
                let conn = hook
                    .create_connection(database, &ConnectionOptions::new())
                    .await?;
                let result = hook.run(&conn, statement, Some(values.as_slice())).await?;
                print_changes(formatter, json, "Ran", &result)
            }
            SqlCommand::Query {
                database,
                statement,
                values,
                read_only,
            } => {
                let values = parse_values(values.as_deref())?;
                let options = ConnectionOptions::new().with_read_only(*read_only);
                let conn = hook.create_connection(database, &options).await?;
                let result = hook.query(&conn, statement, Some(values.as_slice())).await?;

                formatter.rows(&result.values);
                if let Some(message) = &result.message {
                    formatter.warn(message);
                }
                Ok(())
            }
            SqlCommand::Sync { database, date } => {
                let conn = hook
                    .create_connection(database, &ConnectionOptions::new())
                    .await?;
                let created = hook.create_sync_table(&conn).await?;
                let status = match date {
                    Some(date) => Some(hook.set_sync_date(&conn, date).await?),
                    None => None,
                };

                if json {
                    formatter.print_json(&serde_json::json!({
                        "syncTable": created,
                        "syncDate": status,
                    }));
                    return Ok(());
                }
                if created.changes.changes > 0 {
                    formatter.success(&format!("Created sync table in {}", database));
                } else {
                    formatter.success(&format!("Sync table already present in {}", database));
                }
                if let Some(status) = status {
                    print_status(formatter, false, "Sync date set", &status);
                }
                Ok(())
            }
            SqlCommand::Export { database, mode } => {
                let conn = hook
                    .create_connection(database, &ConnectionOptions::new().with_read_only(true))
                    .await?;
                let result = hook.export_to_json(&conn, mode).await?;
                if let Some(message) = &result.message {
                    formatter.warn(message);
                }
                // The document itself is the output in both formats
                println!("{}", serde_json::to_string_pretty(&result.export)?);
                Ok(())
            }
            SqlCommand::Import { file } => {
                let document = read_document(file)?;
                let result = hook.import_from_json(&document).await?;
                info!(file = %file.display(), changes = result.changes.changes, "Imported document");
                print_changes(formatter, json, "Imported", &result)
            }
            SqlCommand::ValidateJson { file } => {
                let document = read_document(file)?;
                let status = hook.is_json_valid(&document).await?;
                print_status(formatter, json, "Document is valid", &status);
                Ok(())
            }
            SqlCommand::Exists { database } => {
                let status = hook.is_db_exists(database).await?;
                if json {
                    formatter.print_json(&serde_json::to_value(&status)?);
                } else if status.result {
                    formatter.success(&format!("{} exists", database));
                } else {
                    formatter.info(&format!("{} does not exist", database));
                }
                Ok(())
            }
            SqlCommand::Delete { database } => {
                let status = hook.delete_db(database).await?;
                print_status(formatter, json, &format!("Deleted {}", database), &status);
                Ok(())
            }
        }
    }
}

fn read_document(file: &Path) -> Result<String> {
    std::fs::read_to_string(file)
        .with_context(|| format!("Failed to read {}", file.display()))
}

async fn close_connections(hook: &SqliteHook<SqlxSqliteBackend>, formatter: &dyn OutputFormatter) {
    // An unavailable hook has nothing to close
    if let Ok(report) = hook.close_all_connections().await {
        for (key, error) in &report.failures {
            warn!(connection = %key, error = %error, "Failed to close connection");
            formatter.warn(&format!("Failed to close {}: {}", key, error));
        }
    }
}

fn print_changes(
    formatter: &dyn OutputFormatter,
    json: bool,
    verb: &str,
    result: &ChangesResult,
) -> Result<()> {
    if json {
        formatter.print_json(&serde_json::to_value(result)?);
        return Ok(());
    }
    match &result.message {
        Some(message) => formatter.error(message),
        None => formatter.success(&format!(
            "{}: {} change(s), last id {}",
            verb, result.changes.changes, result.changes.last_id
        )),
    }
    Ok(())
}

fn print_status(formatter: &dyn OutputFormatter, json: bool, success: &str, status: &StatusResult) {
    if json {
        formatter.print_json(&serde_json::json!({
            "result": status.result,
            "message": status.message,
        }));
    } else if status.result {
        formatter.success(success);
    } else {
        formatter.error(status.message.as_deref().unwrap_or("Operation failed"));
    }
}
