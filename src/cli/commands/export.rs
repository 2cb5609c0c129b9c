//! Export command implementation
//!
//! This module implements the `export` command: every exporter (or the one
//! selected with `--job`) runs exactly once, in configured order, and the
//! process exits. Watermarks are read from and committed to the same record
//! the `run` command uses.

use crate::config::load_config;
use crate::core::export::{ExportPipeline, ExportSummary, RunOutcome};
use crate::core::scheduler::execute_job;
use crate::core::state::WatermarkStore;
use crate::domain::{JobDefinition, JobId, RunErrorDetail};
use clap::Args;
use std::time::Instant;
use tokio::sync::watch;

/// Arguments for the export command
#[derive(Args, Debug)]
pub struct ExportArgs {
    /// Run only the exporter with this job id
    #[arg(long)]
    pub job: Option<String>,

    /// Dry run mode - write artifacts locally, skip upload and watermark commit
    #[arg(long)]
    pub dry_run: bool,
}

impl ExportArgs {
    /// Execute the export command
    pub async fn execute(
        &self,
        config_path: &str,
        shutdown_signal: watch::Receiver<bool>,
    ) -> anyhow::Result<i32> {
        tracing::info!("Starting export command");

        let mut config = match load_config(config_path) {
            Ok(c) => c,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load configuration");
                eprintln!("Failed to load configuration: {e}");
                return Ok(2); // Configuration error exit code
            }
        };

        // Apply dry-run flag from CLI
        if self.dry_run {
            tracing::info!("Enabling dry-run mode from CLI");
            config.export.dry_run = true;
        }

        let all_jobs = match config.job_definitions() {
            Ok(jobs) => jobs,
            Err(e) => {
                eprintln!("Configuration validation failed: {e}");
                return Ok(2);
            }
        };
        let ids: Vec<JobId> = all_jobs.iter().map(|job| job.id.clone()).collect();

        let jobs: Vec<JobDefinition> = match &self.job {
            Some(selected) => {
                let selected: Vec<_> = all_jobs
                    .into_iter()
                    .filter(|job| job.id.as_str() == selected.as_str())
                    .collect();
                if selected.is_empty() {
                    eprintln!(
                        "Unknown job '{}'. Configured jobs: {}",
                        self.job.as_deref().unwrap_or_default(),
                        ids.iter().map(JobId::as_str).collect::<Vec<_>>().join(", ")
                    );
                    return Ok(2);
                }
                selected
            }
            None => all_jobs,
        };

        if config.export.dry_run {
            tracing::info!("Dry run mode enabled - nothing will be uploaded");
            println!("🔍 DRY RUN MODE - artifacts are written locally only, watermarks are kept");
            println!();
        }

        // The store always aligns with every configured job, so the record
        // keeps one entry per job even when only one runs.
        let store = match WatermarkStore::load(&config.application.watermark_file, &ids).await {
            Ok(store) => store,
            Err(e) => {
                tracing::error!(error = %e, "Failed to load watermark record");
                eprintln!("Failed to load watermark record: {e}");
                return Ok(5); // Fatal error exit code
            }
        };

        let pipeline = match ExportPipeline::from_config(&config) {
            Ok(pipeline) => pipeline,
            Err(e) => {
                tracing::error!(error = %e, "Failed to create export pipeline");
                eprintln!("Failed to initialize export: {e}");
                return Ok(4); // Connection error exit code
            }
        };

        println!("🚀 Starting export of {} job(s)...", jobs.len());
        println!();

        let (summary, interrupted) = run_once(&pipeline, &store, &jobs, shutdown_signal).await;
        summary.log_summary();

        println!();
        println!("📊 Export Summary:");
        println!("  Jobs: {}", summary.total_jobs);
        println!("  Exported: {}", summary.exported);
        println!("  No New Rows: {}", summary.no_new_rows);
        if summary.dry_runs > 0 {
            println!("  Dry Runs: {}", summary.dry_runs);
        }
        println!("  Failed: {}", summary.failed);
        println!("  Rows: {}", summary.total_rows);
        println!("  Duration: {:.2}s", summary.duration.as_secs_f64());
        println!();

        if !summary.errors.is_empty() {
            println!("⚠️  Errors encountered:");
            for error in &summary.errors {
                println!(
                    "  - {}: {}",
                    error.job_id.as_deref().unwrap_or("-"),
                    error.message
                );
            }
            println!();
        }

        let exit_code = if interrupted {
            println!("⚠️  Export interrupted. Jobs that did not run keep their watermark.");
            tracing::info!("Export interrupted by user signal");
            130 // SIGINT exit code (standard Unix convention)
        } else if summary.is_successful() {
            println!("✅ Export completed successfully!");
            0
        } else {
            println!("⚠️  Export completed with failures");
            1 // Partial success
        };

        Ok(exit_code)
    }
}

/// Run `jobs` in order, stopping before the next job once shutdown is requested
async fn run_once(
    pipeline: &ExportPipeline,
    store: &WatermarkStore,
    jobs: &[JobDefinition],
    shutdown: watch::Receiver<bool>,
) -> (ExportSummary, bool) {
    let started = Instant::now();
    let mut summary = ExportSummary::new();
    let mut interrupted = false;

    for job in jobs {
        if *shutdown.borrow() {
            interrupted = true;
            break;
        }

        match execute_job(pipeline, store, job).await {
            Ok(report) => {
                match &report.outcome {
                    RunOutcome::Exported { key, rows, .. } => {
                        println!("  ✅ {}: {rows} row(s) -> {key}", job.id)
                    }
                    RunOutcome::NoNewRows => println!("  ➖ {}: no new rows", job.id),
                    RunOutcome::DryRun {
                        artifact,
                        rows,
                        would_advance_to,
                    } => println!(
                        "  🔍 {}: {rows} row(s) -> {artifact} (would advance to {would_advance_to})",
                        job.id
                    ),
                }
                summary.record(&report);
            }
            Err(e) => {
                println!("  ❌ {}: {e}", job.id);
                let current = store.get(&job.id).await.unwrap_or_default();
                summary.add_error(
                    RunErrorDetail::from(&e)
                        .with_job_id(job.id.as_str())
                        .with_watermark(current),
                );
            }
        }
    }

    (summary.with_duration(started.elapsed()), interrupted)
}
