//! CLI for cnkl.

mod commands;

use anyhow::Result;
use clap::{Args, Parser, Subcommand};
use clap_complete::Shell;
use cnkl_core::config;
use std::path::PathBuf;

use commands::{run_checksum, run_completions, run_inspect, run_verify};

/// Top-level CLI for cnkl.
#[derive(Debug, Parser)]
#[command(name = "cnkl")]
#[command(about = "cnkl: verify downloaded macOS installers against Apple chunklists", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Verify a downloaded file chunk by chunk against its chunklist.
    Verify(VerifyArgs),

    /// Decode a chunklist and print its header and chunk table.
    Inspect {
        /// Path to the chunklist file.
        path: PathBuf,
        /// List every chunk, not just the summary.
        #[arg(long)]
        chunks: bool,
        /// Print JSON instead of text.
        #[arg(long)]
        json: bool,
    },

    /// Compute SHA-256 of a file.
    Checksum {
        /// Path to the file.
        path: PathBuf,
    },

    /// Print shell completions to stdout.
    Completions {
        /// Target shell.
        shell: Shell,
    },
}

#[derive(Debug, Clone, Args)]
pub struct VerifyArgs {
    /// Downloaded file to verify (e.g. InstallAssistant.pkg).
    pub file: PathBuf,

    /// Chunklist read from a local file. One of `--chunklist` or `--chunklist-url` is required.
    #[arg(
        long,
        value_name = "PATH",
        conflicts_with = "chunklist_url",
        required_unless_present = "chunklist_url"
    )]
    pub chunklist: Option<PathBuf>,

    /// Chunklist fetched over HTTP(S). A 404 or empty response counts as no chunklist.
    #[arg(long, value_name = "URL")]
    pub chunklist_url: Option<String>,

    /// Fail when no chunklist is available instead of trusting the file.
    #[arg(long)]
    pub require_chunklist: bool,

    /// Skip verification even if a chunklist is available.
    #[arg(long, conflicts_with = "require_chunklist")]
    pub no_verify: bool,

    /// Progress poll interval in milliseconds (overrides config).
    #[arg(long, value_name = "MS")]
    pub poll_interval_ms: Option<u64>,

    /// Print the result as JSON on stdout.
    #[arg(long)]
    pub json: bool,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Verify(args) => run_verify(&args, &cfg).await?,
            CliCommand::Inspect { path, chunks, json } => run_inspect(&path, chunks, json)?,
            CliCommand::Checksum { path } => run_checksum(&path).await?,
            CliCommand::Completions { shell } => run_completions(shell),
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
