//! Command-line argument definitions using clap.

use crate::output::OutputFormat;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

/// Propagate ban/unban actions across every server you moderate
///
/// Manage the engine configuration or replay a recorded scenario
/// against an in-memory fleet to see how actions propagate.
#[derive(Parser, Debug)]
#[command(name = "bansync")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Config file (defaults to the per-user config directory)
    #[arg(short, long, env = "BANSYNC_CONFIG", global = true)]
    pub config: Option<PathBuf>,

    /// Output format
    #[arg(short, long, global = true, value_enum)]
    pub output: Option<OutputFormat>,

    /// Increase verbosity
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Replay a scenario file against an in-memory fleet
    Replay(ReplayArgs),

    /// Manage engine configuration
    Config(ConfigArgs),
}

// ============================================================================
// Replay command
// ============================================================================

#[derive(Args, Debug)]
pub struct ReplayArgs {
    /// Scenario file (JSON)
    pub file: PathBuf,

    /// Print notification payloads instead of posting them
    #[arg(long)]
    pub dry_run: bool,

    /// Wait between events according to their offsets
    #[arg(long)]
    pub realtime: bool,
}

// ============================================================================
// Config command
// ============================================================================

#[derive(Args, Debug)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub command: ConfigCommands,
}

#[derive(Subcommand, Debug)]
pub enum ConfigCommands {
    /// Show the effective configuration
    Show,

    /// Set a configuration value
    Set {
        /// Dotted key (e.g., mass.threshold, notifications.bot_name)
        key: String,
        /// New value
        value: String,
    },

    /// Show the config file path
    Path,

    /// Write a config file with default values
    Init {
        /// Overwrite an existing file
        #[arg(long)]
        force: bool,
    },
}
