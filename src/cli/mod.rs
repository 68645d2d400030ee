//! Command-line interface definitions.

use std::path::PathBuf;

use clap::{Parser, Subcommand};

#[derive(Debug, Parser)]
#[command(name = "helmsman", version, about = "Cluster task orchestrator adapter")]
pub struct Cli {
    /// Emit machine-readable JSON output where applicable.
    #[arg(long, global = true)]
    pub json: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Debug, Subcommand)]
pub enum Commands {
    /// Run the orchestrator daemon with the HTTP status surface.
    Serve {
        /// Load configuration from this file instead of the default chain.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Configuration helpers.
    Config {
        #[command(subcommand)]
        command: ConfigCommands,
    },
}

#[derive(Debug, Subcommand)]
pub enum ConfigCommands {
    /// Validate the merged configuration and exit.
    Validate {
        /// Load configuration from this file instead of the default chain.
        #[arg(long)]
        config: Option<PathBuf>,
    },
    /// Print the effective merged configuration.
    Show {
        /// Load configuration from this file instead of the default chain.
        #[arg(long)]
        config: Option<PathBuf>,
    },
}
