//! CLI interface and argument parsing
//!
//! This module provides the command-line interface for Sluice using clap.

pub mod commands;

use clap::{Parser, Subcommand};

/// Sluice - scheduled incremental exports from SQL to object storage
#[derive(Parser, Debug)]
#[command(name = "sluice")]
#[command(version, about, long_about = None)]
#[command(author = "Sluice Contributors")]
pub struct Cli {
    /// Path to configuration file
    #[arg(short, long, default_value = "sluice.toml", env = "SLUICE_CONFIG")]
    pub config: String,

    /// Log level (trace, debug, info, warn, error)
    #[arg(short, long, env = "SLUICE_LOG_LEVEL")]
    pub log_level: Option<String>,

    /// Subcommand to execute
    #[command(subcommand)]
    pub command: Commands,
}

/// Available commands
#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Schedule every exporter and run until interrupted
    Run(commands::run::RunArgs),

    /// Run every exporter (or one) exactly once and exit
    Export(commands::export::ExportArgs),

    /// Validate configuration file
    ValidateConfig(commands::validate::ValidateArgs),

    /// Show the watermark of every configured job
    Status(commands::status::StatusArgs),

    /// Initialize a new configuration file
    Init(commands::init::InitArgs),
}
