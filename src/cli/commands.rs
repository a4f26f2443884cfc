//! CLI command definitions using clap.
//!
//! Defines the main CLI structure and subcommands:
//! - simulate: run a scripted animation/request scenario through a barrier
//! - config: show the effective configuration

use clap::{Parser, Subcommand};
use std::path::PathBuf;

/// Quiesce - hold async results until animations settle
#[derive(Parser, Debug)]
#[command(name = "quiesce")]
#[command(author, version, about, long_about = None)]
pub struct Cli {
    /// Optional config file path
    #[arg(short, long, global = true)]
    pub config: Option<PathBuf>,

    /// Verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Check if verbose mode is enabled
    pub fn is_verbose(&self) -> bool {
        self.verbose
    }
}

/// Main subcommands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Run a scripted scenario and report when each request was released
    Simulate {
        /// Animation as DURATION_MS[:RUNTIME_MS|never], repeatable
        #[arg(short, long = "animation", value_name = "SPEC")]
        animations: Vec<String>,

        /// Request as [ok|fail]:SETTLE_MS, repeatable
        #[arg(short, long = "request", value_name = "SPEC")]
        requests: Vec<String>,

        /// Override the expiry floor (ms)
        #[arg(long)]
        min_timeout: Option<u64>,

        /// Override the expiry used without a declared duration (ms)
        #[arg(long)]
        default_timeout: Option<u64>,

        /// Emit the report as JSON
        #[arg(long)]
        json: bool,
    },

    /// Show the effective configuration
    Config,
}
