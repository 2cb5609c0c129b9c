//! Validate config command implementation
//!
//! This module implements the `validate-config` command for validating
//! the Sluice configuration file.

use crate::adapters::database::create_sql_executors;
use crate::config::load_config;
use crate::config::SluiceConfig;
use clap::Args;
use secrecy::ExposeSecret;

/// Arguments for the validate-config command
#[derive(Args, Debug)]
pub struct ValidateArgs {
    /// Also open a connection to every configured database
    #[arg(long)]
    pub check_connections: bool,
}

impl ValidateArgs {
    /// Execute the validate-config command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!(config_path = %config_path, "Validating configuration");

        println!("🔍 Validating configuration file: {config_path}");
        println!();

        // Loading runs substitution, overrides and validation
        let config = match load_config(config_path) {
            Ok(c) => {
                println!("✅ Configuration is valid");
                c
            }
            Err(e) => {
                println!("❌ Failed to load configuration file");
                println!("   Error: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        let jobs = match config.job_definitions() {
            Ok(jobs) => jobs,
            Err(e) => {
                println!("❌ Invalid exporter definitions");
                println!("   Error: {e}");
                return Ok(2);
            }
        };

        println!();
        print_summary(&config);

        println!();
        println!("Exporters:");
        for job in &jobs {
            println!(
                "  [{}] {} -> {}:{}{}.* ({}, {})",
                job.position,
                job.id,
                job.storage,
                job.destination_prefix,
                job.file_name,
                job.schedule,
                match &job.key_column {
                    Some(key) => format!("incremental on {key}"),
                    None => "full extraction".to_string(),
                }
            );
        }

        if self.check_connections {
            println!();
            println!("🔌 Checking database connections...");
            let executors = match create_sql_executors(&config) {
                Ok(executors) => executors,
                Err(e) => {
                    println!("❌ Failed to create database clients: {e}");
                    return Ok(2);
                }
            };

            let mut failed = false;
            for (name, executor) in &executors {
                match executor.test_connection().await {
                    Ok(()) => println!("  ✅ {name}: {}", executor.describe()),
                    Err(e) => {
                        tracing::error!(database = %name, error = %e, "Connection check failed");
                        println!("  ❌ {name}: {e}");
                        failed = true;
                    }
                }
            }

            if failed {
                return Ok(4); // Connection error exit code
            }
        }

        Ok(0)
    }
}

fn print_summary(config: &SluiceConfig) {
    println!("Configuration Summary:");
    println!("  Log Level: {}", config.application.log_level);
    println!("  Watermark File: {}", config.application.watermark_file);
    println!(
        "  First Run Naming: {:?}",
        config.application.first_run_naming
    );
    println!(
        "  Schedule Timezone: {:?}",
        config.application.schedule_timezone
    );
    println!("  Overlap Policy: {:?}", config.scheduler.overlap_policy);
    println!(
        "  Query Timeout: {}s",
        config.export.query_timeout_seconds
    );
    println!(
        "  Upload Retries: {} (initial delay {}ms, max {}ms)",
        config.export.upload_retry.max_retries,
        config.export.upload_retry.initial_delay_ms,
        config.export.upload_retry.max_delay_ms
    );
    println!("  Dry Run: {}", config.export.dry_run);

    println!("  Databases:");
    for (name, database) in &config.databases {
        println!(
            "    {name}: {} {} (max {} connections, ssl {})",
            database.kind.as_str(),
            database.connection_string.expose_secret().redacted_url(),
            database.max_connections,
            database.ssl_mode
        );
    }

    println!("  Storages:");
    for (name, storage) in &config.storages {
        println!("    {name}: {}", storage.describe());
    }
}
