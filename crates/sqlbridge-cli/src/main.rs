//! SQLBridge CLI - Command-line interface for SQLBridge
//!
//! Provides commands for:
//! - Inspecting which capabilities the host platform exposes
//! - Running statements, queries and JSON import/export on a database
//! - Reading and writing the key-value store
//! - Viewing and validating the configuration

use std::path::PathBuf;

use anyhow::Result;
use clap::{Parser, Subcommand};
use tracing_subscriber::EnvFilter;

use sqlbridge_core::config::Config;

mod commands;
mod output;

use commands::{
    capabilities::CapabilitiesCommand, completions::CompletionsCommand, config::ConfigCommand,
    sql::SqlCommand, store::StoreCommand, Context,
};
use output::OutputFormat;

#[derive(Debug, Parser)]
#[command(
    name = "sqlbridge",
    version,
    about = "Capability-gated SQLite connections and key-value storage"
)]
pub struct Cli {
    /// Output in JSON format
    #[arg(long, global = true)]
    json: bool,

    /// Verbose output (can be repeated: -v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    verbose: u8,

    /// Use alternate config file
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Report this platform instead of the detected one (web, ios, android, electron)
    #[arg(long, global = true)]
    platform: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Show which plugins and capabilities are available
    Capabilities(CapabilitiesCommand),
    /// Run statements against a database
    #[command(subcommand)]
    Sql(SqlCommand),
    /// Read and write the key-value store
    Store(StoreCommand),
    /// View and validate configuration
    #[command(subcommand)]
    Config(ConfigCommand),
    /// Generate shell completions
    Completions(CompletionsCommand),
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let config_path = cli.config.clone().unwrap_or_else(Config::default_path);
    let mut config = Config::load_or_default(&config_path);
    if let Some(platform) = cli.platform.clone() {
        config.host.platform = Some(platform);
    }

    // Setup tracing
    let filter = match cli.verbose {
        0 => config.logging.level.as_str(),
        1 => "debug",
        _ => "trace",
    };
    let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter));

    if config.logging.json {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(env_filter)
            .with_writer(std::io::stderr)
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .with_writer(std::io::stderr)
            .init();
    }

    let format = if cli.json {
        OutputFormat::Json
    } else {
        OutputFormat::Human
    };
    let ctx = Context::new(config, config_path, format);

    match cli.command {
        Commands::Capabilities(cmd) => cmd.execute(&ctx).await,
        Commands::Sql(cmd) => cmd.execute(&ctx).await,
        Commands::Store(cmd) => cmd.execute(&ctx).await,
        Commands::Config(cmd) => cmd.execute(&ctx).await,
        Commands::Completions(cmd) => cmd.execute(&ctx).await,
    }
}
