//! Status command implementation
//!
//! This module implements the `status` command for displaying the
//! watermark record aligned with the configured jobs.

use crate::config::{load_config, ScheduleTimezone};
use crate::core::scheduler::Trigger;
use crate::core::state::WatermarkStore;
use crate::domain::JobId;
use clap::Args;
use serde::Serialize;
use std::collections::HashMap;

/// One line of status output
#[derive(Debug, Serialize)]
struct StatusRow {
    position: usize,
    job: String,
    /// `None` for full-extraction jobs
    watermark: Option<i64>,
    schedule: String,
    next_run: Option<String>,
    destination: String,
}

/// Arguments for the status command
#[derive(Args, Debug)]
pub struct StatusArgs {
    /// Filter by job id
    #[arg(long)]
    pub job: Option<String>,

    /// Print machine-readable JSON instead of a table
    #[arg(long)]
    pub json: bool,
}

impl StatusArgs {
    /// Execute the status command
    pub async fn execute(&self, config_path: &str) -> anyhow::Result<i32> {
        tracing::info!("Checking export status");

        if !self.json {
            println!("📊 Export Status");
            println!();
        }

        // Load configuration
        let config = match load_config(config_path) {
            Ok(c) => c,
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
        let ids: Vec<JobId> = jobs.iter().map(|job| job.id.clone()).collect();

        // Loading never writes; a missing record reads as all zeros
        let store = match WatermarkStore::load(&config.application.watermark_file, &ids).await {
            Ok(s) => s,
            Err(e) => {
                println!("❌ Failed to load watermarks");
                println!("   Error: {e}");
                return Ok(5); // Fatal error exit code
            }
        };
        let watermarks: HashMap<JobId, i64> = store.snapshot().await.into_iter().collect();

        let filtered: Vec<_> = jobs
            .iter()
            .filter(|job| match &self.job {
                Some(id) => job.id.as_str() == id.as_str(),
                None => true,
            })
            .collect();

        if filtered.is_empty() {
            println!("No jobs match the specified filters.");
            return Ok(0);
        }

        let now = chrono::Utc::now();
        let timezone = config.application.schedule_timezone;
        let rows: Vec<StatusRow> = filtered
            .into_iter()
            .map(|job| StatusRow {
                position: job.position,
                job: job.id.to_string(),
                watermark: job
                    .key_column
                    .as_ref()
                    .map(|_| watermarks.get(&job.id).copied().unwrap_or(0)),
                schedule: job.schedule.clone(),
                next_run: Trigger::parse(&job.schedule)
                    .ok()
                    .and_then(|trigger| trigger.with_timezone(timezone).next_after(now))
                    .map(|at| match timezone {
                        ScheduleTimezone::Utc => at.format("%Y-%m-%d %H:%M:%S UTC").to_string(),
                        ScheduleTimezone::Local => at
                            .with_timezone(&chrono::Local)
                            .format("%Y-%m-%d %H:%M:%S %:z")
                            .to_string(),
                    }),
                destination: config
                    .storages
                    .get(&job.storage)
                    .map(|storage| format!("{}/{}", storage.describe(), job.destination_prefix))
                    .unwrap_or_else(|| job.storage.clone()),
            })
            .collect();

        if self.json {
            println!("{}", serde_json::to_string_pretty(&rows)?);
            return Ok(0);
        }

        println!("Watermark record: {}", store.path().display());
        println!();
        println!(
            "{:<4} {:<24} {:<14} {:<22} {:<26} {:<30}",
            "#", "Job", "Watermark", "Schedule", "Next Run", "Destination"
        );
        println!("{}", "-".repeat(124));

        for row in &rows {
            println!(
                "{:<4} {:<24} {:<14} {:<22} {:<26} {:<30}",
                row.position,
                row.job,
                row.watermark
                    .map_or_else(|| "full".to_string(), |w| w.to_string()),
                row.schedule,
                row.next_run.as_deref().unwrap_or("never"),
                row.destination
            );
        }

        println!();
        Ok(0)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_args_defaults() {
        let args = StatusArgs {
            job: None,
            json: false,
        };
        assert!(args.job.is_none());
    }

    #[test]
    fn test_status_args_with_filter() {
        let args = StatusArgs {
            job: Some("orders".to_string()),
            json: true,
        };
        assert_eq!(args.job, Some("orders".to_string()));
    }

    #[tokio::test]
    async fn test_missing_config_exits_two() {
        let args = StatusArgs {
            job: None,
            json: false,
        };
        assert_eq!(args.execute("/nonexistent/sluice.toml").await.unwrap(), 2);
    }
}
