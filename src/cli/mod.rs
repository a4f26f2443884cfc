//! CLI module for quiesce - command-line interface and subcommands.
//!
//! Provides the entry point for the scenario simulator and config display.

pub mod commands;
pub mod simulate;

pub use commands::Cli;
