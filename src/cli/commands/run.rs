//! Run command implementation
//!
//! Starts the supervisor: every exporter is scheduled on its cron expression
//! and the process keeps running until SIGINT or SIGTERM.

use crate::config::load_config;
use crate::core::scheduler::Supervisor;
use crate::domain::SluiceError;
use clap::Args;
use tokio::sync::watch;

/// Arguments for the run command
#[derive(Args, Debug)]
pub struct RunArgs {
    /// Dry run mode - write artifacts locally, skip upload and watermark commit
    #[arg(long)]
    pub dry_run: bool,
}

impl RunArgs {
    /// Execute the run command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Starting scheduler");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.export.dry_run = true;
        }

        println!(
            "⏱️  Scheduling {} exporter(s); press Ctrl+C to stop",
            config.exporters.len()
        );

        match Supervisor::new(config).run(shutdown_signal).await {
            Ok(report) => {
                println!();
                println!(
                    "✅ Stopped: {} run(s) drained, {} aborted",
                    report.drained, report.aborted
                );
                Ok(0)
            }
            Err(SluiceError::Configuration(message)) => {
                eprintln!("Configuration error: {message}");
                Ok(2)
            }
            Err(SluiceError::Connection(message)) => {
                eprintln!("Connection error: {message}");
                Ok(4)
            }
            Err(e) => {
                tracing::error!(error = %e, "Scheduler failed to start");
                eprintln!("Fatal error: {e}");
                Ok(5) // Fatal error exit code
            }
        }
    }
}
