//! CLI for the otad update downloader.

mod commands;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use otad_core::config::{self, OtadConfig};
use std::path::PathBuf;

use commands::{run_download, run_reset, run_status};

/// Top-level CLI for the otad update downloader.
#[derive(Debug, Parser)]
#[command(name = "otad")]
#[command(about = "otad: resumable OTA update downloader", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Download the update file, resuming prior progress if present.
    Run {
        /// Update URL. Overrides `url` from config.toml.
        url: Option<String>,
        /// Directory the update file is written to. Overrides the configured one.
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
    },

    /// Show resumable progress from a previous run.
    Status {
        /// Directory the update file is written to.
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
    },

    /// Delete the temp file and checkpoint, discarding prior progress.
    Reset {
        /// Directory the update file is written to.
        #[arg(long, value_name = "DIR")]
        dir: Option<PathBuf>,
    },
}

impl CliCommand {
    pub fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);

        match cli.command {
            CliCommand::Run { url, dir } => {
                let url = url
                    .or_else(|| cfg.url.clone())
                    .context("no URL given; pass one or set `url` in config.toml")?;
                let dir = resolve_dir(dir, &cfg)?;
                run_download(&cfg, &url, &dir)?;
            }
            CliCommand::Status { dir } => run_status(&resolve_dir(dir, &cfg)?)?,
            CliCommand::Reset { dir } => run_reset(&resolve_dir(dir, &cfg)?)?,
        }

        Ok(())
    }
}

fn resolve_dir(flag: Option<PathBuf>, cfg: &OtadConfig) -> Result<PathBuf> {
    match flag.or_else(|| cfg.download_dir.clone()) {
        Some(dir) => Ok(dir),
        None => Ok(std::env::current_dir()?),
    }
}
