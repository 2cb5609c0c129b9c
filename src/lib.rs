// Sluice - Incremental SQL-to-object-storage exporter
// Copyright (c) 2025 Sluice Contributors
// Licensed under the MIT License

//! # Sluice - scheduled incremental exports
//!
//! Sluice runs SQL queries on cron schedules, writes each result set to a
//! CSV artifact (optionally zipped or gzipped) and uploads it to object
//! storage. Jobs with an incrementing key column only export rows above the
//! key they last exported, tracked in a durable per-job watermark record.
//!
//! ## Architecture
//!
//! Sluice follows a layered architecture:
//!
//! - [`cli`] - Command-line interface and argument parsing
//! - [`core`] - Export pipeline, watermark store and scheduler
//! - [`adapters`] - PostgreSQL, MySQL, object storage and artifact writers
//! - [`domain`] - Core domain types and errors
//! - [`config`] - Configuration management
//! - [`logging`] - Structured logging and observability
//!
//! ## Quick Start
//!
//! ```rust,no_run
//! use sluice::config::load_config;
//! use sluice::core::scheduler::Supervisor;
//! use tokio::sync::watch;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let config = load_config("sluice.toml")?;
//!
//!     let (shutdown_tx, shutdown_rx) = watch::channel(false);
//!     tokio::spawn(async move {
//!         let _ = tokio::signal::ctrl_c().await;
//!         let _ = shutdown_tx.send(true);
//!     });
//!
//!     let report = Supervisor::new(config).run(shutdown_rx).await?;
//!     println!("{} in-flight runs drained", report.drained);
//!     Ok(())
//! }
//! ```
//!
//! ## Incremental runs
//!
//! For a job at watermark `w`, a run first asks the database for the largest
//! key above `w`, then extracts exactly the rows in `(w, max]`. The watermark
//! only moves after the artifact is uploaded, so a failed run is repeated
//! over the same range:
//!
//! ```rust,no_run
//! use sluice::config::load_config;
//! use sluice::core::export::ExportPipeline;
//! use sluice::core::scheduler::execute_job;
//! use sluice::core::state::WatermarkStore;
//!
//! # async fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("sluice.toml")?;
//! let jobs = config.job_definitions()?;
//! let ids: Vec<_> = jobs.iter().map(|job| job.id.clone()).collect();
//!
//! let store = WatermarkStore::load(&config.application.watermark_file, &ids).await?;
//! let pipeline = ExportPipeline::from_config(&config)?;
//!
//! for job in &jobs {
//!     let report = execute_job(&pipeline, &store, job).await?;
//!     println!("{}: {} rows, watermark {}", job.id, report.rows(), report.watermark);
//! }
//! # Ok(())
//! # }
//! ```
//!
//! ## Error Handling
//!
//! Library functions return [`domain::Result`], an alias over
//! [`domain::SluiceError`]. A failed run never stops the scheduler; it is
//! logged and the job's watermark stays where it was.

pub mod adapters;
pub mod cli;
pub mod config;
pub mod core;
pub mod domain;
pub mod logging;
