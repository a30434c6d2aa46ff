//! `sqlbridge completions <shell>`
//!
//! Prints a completion script for the `sql`, `store` and `config`
//! subcommands on stdout, or writes it into `--dir` under the file name
//! the shell expects (`sqlbridge.bash`, `_sqlbridge`, `sqlbridge.fish`, ...).
//!
//! ```text
//! sqlbridge completions zsh --dir ~/.zfunc
//! sqlbridge completions fish > ~/.config/fish/completions/sqlbridge.fish
//! ```

use std::io::{self, Write};
use std::path::PathBuf;

use anyhow::{Context as _, Result};
use clap::CommandFactory;
use clap_complete::Shell;

use super::Context;

const BIN_NAME: &str = "sqlbridge";

#[derive(Debug, clap::Args)]
pub struct CompletionsCommand {
    /// Target shell
    #[arg(value_enum)]
    pub shell: Shell,

    /// Write the script into this directory instead of stdout
    #[arg(long)]
    pub dir: Option<PathBuf>,
}

impl CompletionsCommand {
    pub async fn execute(&self, _ctx: &Context) -> Result<()> {
        let mut cmd = crate::Cli::command();
        match &self.dir {
            Some(dir) => {
                std::fs::create_dir_all(dir)
                    .with_context(|| format!("Failed to create {}", dir.display()))?;
                let path = clap_complete::generate_to(self.shell, &mut cmd, BIN_NAME, dir)?;
                tracing::info!(shell = %self.shell, path = %path.display(), "Wrote completions");
            }
            None => {
                let script = render(self.shell, &mut cmd);
                io::stdout().write_all(&script)?;
            }
        }
        Ok(())
    }
}

fn render(shell: Shell, cmd: &mut clap::Command) -> Vec<u8> {
    let mut script = Vec::new();
    clap_complete::generate(shell, cmd, BIN_NAME, &mut script);
    script
}
