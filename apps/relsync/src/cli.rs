//! Command line interface definition

use clap::{Parser, Subcommand};
use relsync_types::ColorChoice;
use std::path::PathBuf;

/// relsync - Keep a blob store mirror of the latest GitHub Actions runner
#[derive(Parser)]
#[command(name = "relsync")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Mirror the latest GitHub Actions runner release into a blob store")]
#[command(long_about = None)]
pub struct Cli {
    /// Defaults to `sync`
    #[command(subcommand)]
    pub command: Option<Commands>,

    #[command(flatten)]
    pub global: GlobalArgs,
}

impl Cli {
    /// The command to run, `sync` when none was given
    pub fn command(&self) -> Commands {
        self.command.clone().unwrap_or(Commands::Sync { retries: None })
    }
}

/// Global arguments available for all commands
#[derive(Parser)]
pub struct GlobalArgs {
    /// Output in JSON format
    #[arg(long, global = true)]
    pub json: bool,

    /// Enable debug logging
    #[arg(long, global = true)]
    pub debug: bool,

    /// Color output control
    #[arg(long, global = true, value_enum)]
    pub color: Option<ColorChoice>,

    /// Use alternate config file
    #[arg(long, global = true, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Container holding the mirrored object
    #[arg(long, global = true)]
    pub container: Option<String>,

    /// Key of the mirrored object
    #[arg(long, global = true)]
    pub object_key: Option<String>,

    /// Operating system the asset is selected for (linux, osx, win)
    #[arg(long, global = true)]
    pub os: Option<String>,

    /// Architecture the asset is selected for (x64, arm64, arm)
    #[arg(long, global = true)]
    pub arch: Option<String>,

    /// Root directory of the filesystem blob store
    #[arg(long, global = true, value_name = "PATH")]
    pub store_root: Option<PathBuf>,

    /// Server-side encryption setting recorded with the object
    #[arg(long, global = true)]
    pub sse: Option<String>,
}

/// Available commands
#[derive(Subcommand, Clone, Debug, PartialEq, Eq)]
pub enum Commands {
    /// Check the mirror and transfer the latest asset when it is stale
    Sync {
        /// Re-run a failed cycle this many times when the failure is transient
        #[arg(long)]
        retries: Option<u32>,
    },

    /// Report what a sync would do without writing anything
    #[command(alias = "check")]
    Status,
}
