//! CLI for the batchdl agent: `serve` runs the engine behind a control
//! socket, every other subcommand is a client of that socket.

mod commands;
mod control_socket;

use anyhow::Result;
use batchdl_core::config;
use batchdl_core::ControlCommand;
use clap::{Parser, Subcommand};
use std::path::PathBuf;

use commands::{
    run_add, run_control, run_exists, run_root, run_serve, run_shutdown, run_status, run_watch,
    AddArgs,
};

/// Top-level CLI for the batchdl agent.
#[derive(Debug, Parser)]
#[command(name = "batchdl")]
#[command(about = "batchdl: batch downloader with live progress and runtime control", long_about = None)]
pub struct Cli {
    /// Control socket path (default: from config, else the XDG state dir).
    #[arg(long, global = true, value_name = "PATH")]
    pub socket: Option<PathBuf>,

    #[command(subcommand)]
    pub command: CliCommand,
}

#[derive(Debug, Subcommand)]
pub enum CliCommand {
    /// Run the download agent and listen on the control socket.
    Serve,

    /// Submit a batch of URLs to the running agent.
    Add {
        /// Direct HTTP/HTTPS URLs to download.
        #[arg(required = true)]
        urls: Vec<String>,
        /// Destination directory, relative to the configured root.
        #[arg(long, default_value = "")]
        dest: String,
        /// Transfers of this batch allowed to run at once.
        #[arg(long, value_name = "N")]
        concurrency: Option<i64>,
        /// Per-transfer limit in bytes per second (0 = unlimited).
        #[arg(long, value_name = "BYTES")]
        throttle: Option<i64>,
    },

    /// Stop a running transfer; its partial file is kept.
    Cancel { id: u64 },

    /// Restart a stopped or failed transfer from where it left off.
    Resume { id: u64 },

    /// Forget a transfer (cancelling it if running).
    Remove { id: u64 },

    /// Forget every completed, stopped or failed transfer.
    Clear,

    /// Print progress records until interrupted.
    Watch,

    /// Check that the agent is up and show its version.
    Status,

    /// Print the directory destinations are resolved against.
    Root,

    /// Check that a destination directory exists under the root.
    Exists {
        /// Directory relative to the root.
        dir: String,
    },

    /// Stop the agent; running transfers end as stopped.
    Shutdown,
}

impl CliCommand {
    pub async fn run_from_args() -> Result<()> {
        let cli = Cli::parse();
        let cfg = config::load_or_init()?;
        tracing::debug!("loaded config: {:?}", cfg);
        let socket = match cli.socket {
            Some(path) => path,
            None => cfg.effective_socket_path()?,
        };

        match cli.command {
            CliCommand::Serve => run_serve(&cfg, &socket).await?,
            CliCommand::Add {
                urls,
                dest,
                concurrency,
                throttle,
            } => {
                let args = AddArgs {
                    urls,
                    dest,
                    concurrency: concurrency.unwrap_or(cfg.default_concurrency),
                    throttle: throttle.unwrap_or(cfg.default_throttle_bytes_per_sec),
                };
                run_add(&socket, args).await?;
            }
            CliCommand::Cancel { id } => run_control(&socket, ControlCommand::Cancel(id)).await?,
            CliCommand::Resume { id } => run_control(&socket, ControlCommand::Resume(id)).await?,
            CliCommand::Remove { id } => run_control(&socket, ControlCommand::Remove(id)).await?,
            CliCommand::Clear => run_control(&socket, ControlCommand::Clear).await?,
            CliCommand::Watch => run_watch(&socket).await?,
            CliCommand::Status => run_status(&socket).await?,
            CliCommand::Root => run_root(&socket).await?,
            CliCommand::Exists { dir } => run_exists(&socket, &dir).await?,
            CliCommand::Shutdown => run_shutdown(&socket).await?,
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests;
