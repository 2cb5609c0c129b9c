// Sluice - Incremental SQL-to-object-storage exporter
// Copyright (c) 2025 Sluice Contributors
// Licensed under the MIT License

use clap::Parser;
use sluice::cli::{Cli, Commands};
use sluice::config::{load_config, LoggingConfig};
use sluice::logging::{init_logging, LoggingGuard};
use std::process;
use tokio::sync::watch;

#[tokio::main]
async fn main() {
    // Load environment variables from .env file if present
    // This is optional - if .env doesn't exist, it's silently ignored
    let _ = dotenvy::dotenv();

    // Parse CLI arguments
    let cli = Cli::parse();

    let guard = match setup_logging(&cli) {
        Ok(guard) => guard,
        Err(e) => {
            eprintln!("Failed to initialize logging: {e}");
            process::exit(5);
        }
    };

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        "Sluice - Incremental SQL-to-object-storage exporter"
    );

    // Create shutdown signal channel for graceful shutdown
    let (shutdown_tx, shutdown_rx) = watch::channel(false);

    // Spawn signal handler task
    tokio::spawn(async move {
        #[cfg(unix)]
        {
            use tokio::signal::unix::{signal, SignalKind};
            let mut sigterm = match signal(SignalKind::terminate()) {
                Ok(sigterm) => sigterm,
                Err(e) => {
                    tracing::error!(error = %e, "Failed to install SIGTERM handler");
                    if tokio::signal::ctrl_c().await.is_ok() {
                        let _ = shutdown_tx.send(true);
                    }
                    return;
                }
            };

            tokio::select! {
                _ = tokio::signal::ctrl_c() => {
                    tracing::info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
                    println!("\n⚠️  Shutdown signal received, finishing in-flight runs...");
                    let _ = shutdown_tx.send(true);
                }
                _ = sigterm.recv() => {
                    tracing::info!("Received SIGTERM, initiating graceful shutdown...");
                    println!("\n⚠️  Shutdown signal received, finishing in-flight runs...");
                    let _ = shutdown_tx.send(true);
                }
            }
        }

        #[cfg(not(unix))]
        {
            if let Err(e) = tokio::signal::ctrl_c().await {
                tracing::error!(error = %e, "Failed to listen for Ctrl+C");
            } else {
                tracing::info!("Received SIGINT (Ctrl+C), initiating graceful shutdown...");
                println!("\n⚠️  Shutdown signal received, finishing in-flight runs...");
                let _ = shutdown_tx.send(true);
            }
        }
    });

    // Execute command and get exit code
    let exit_code = match execute_command(&cli, shutdown_rx).await {
        Ok(code) => code,
        Err(e) => {
            tracing::error!(error = %e, "Command execution failed");
            eprintln!("Error: {e}");
            5 // Fatal error exit code
        }
    };

    // Flush file logs before exiting
    drop(guard);
    process::exit(exit_code);
}

/// Initialize logging for the selected command
///
/// Long-running and exporting commands honor the `[logging]` section of the
/// configuration file; the others log to the console only. An unreadable
/// configuration falls back to console logging so the command itself can
/// report the problem.
fn setup_logging(cli: &Cli) -> anyhow::Result<LoggingGuard> {
    let file_config = match &cli.command {
        Commands::Run(_) | Commands::Export(_) => load_config(&cli.config).ok(),
        _ => None,
    };

    let log_level = cli
        .log_level
        .clone()
        .or_else(|| file_config.as_ref().map(|c| c.application.log_level.clone()))
        .unwrap_or_else(|| "info".to_string());

    let logging_config = file_config
        .map(|c| c.logging)
        .unwrap_or_else(|| LoggingConfig {
            local_enabled: false,
            ..LoggingConfig::default()
        });

    Ok(init_logging(&log_level, &logging_config)?)
}

/// Execute the CLI command
async fn execute_command(cli: &Cli, shutdown_signal: watch::Receiver<bool>) -> anyhow::Result<i32> {
    match &cli.command {
        Commands::Run(args) => args.execute(&cli.config, shutdown_signal).await,
        Commands::Export(args) => args.execute(&cli.config, shutdown_signal).await,
        Commands::ValidateConfig(args) => args.execute(&cli.config).await,
        Commands::Status(args) => args.execute(&cli.config).await,
        Commands::Init(args) => args.execute().await,
    }
}
