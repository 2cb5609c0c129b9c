//! Core business logic for Sluice.
//!
//! # Modules
//!
//! - [`export`] - Query composition, artifact naming and the export pipeline
//! - [`state`] - Durable per-job watermarks
//! - [`scheduler`] - Cron triggers, the job scheduler and the supervisor
//!
//! # Run Workflow
//!
//! Each time a job's trigger fires:
//!
//! 1. **Read**: take the job's watermark from the store
//! 2. **Bound**: find the highest key above the watermark
//! 3. **Extract**: query exactly the new key range
//! 4. **Write**: serialize rows to CSV, optionally zip or gzip
//! 5. **Upload**: put the artifact to object storage, with retries
//! 6. **Commit**: persist the new watermark for the job
//!
//! A failure at any step leaves the watermark where it was, so the next
//! trigger exports the same range again.
//!
//! # Example
//!
//! ```rust,no_run
//! use sluice::config::load_config;
//! use sluice::core::scheduler::Supervisor;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("sluice.toml")?;
//! let (shutdown_tx, shutdown_rx) = tokio::sync::watch::channel(false);
//!
//! let supervisor = tokio::spawn(Supervisor::new(config).run(shutdown_rx));
//! tokio::signal::ctrl_c().await?;
//! shutdown_tx.send(true)?;
//!
//! let report = supervisor.await??;
//! println!("aborted {} runs", report.aborted);
//! # Ok(())
//! # }
//! ```

pub mod export;
pub mod scheduler;
pub mod state;
