//! Process supervisor
//!
//! Wires the watermark store, export pipeline and scheduler together for the
//! long-running `run` command and blocks until shutdown is requested.

use super::job_scheduler::{JobScheduler, ShutdownReport};
use crate::config::schema::SluiceConfig;
use crate::core::export::ExportPipeline;
use crate::core::state::WatermarkStore;
use crate::domain::{JobId, Result};
use std::sync::Arc;
use tokio::sync::watch;

/// Owns the startup and shutdown sequence
pub struct Supervisor {
    config: SluiceConfig,
    pipeline: Option<Arc<ExportPipeline>>,
}

impl Supervisor {
    /// Create a supervisor for a validated configuration
    pub fn new(config: SluiceConfig) -> Self {
        Self {
            config,
            pipeline: None,
        }
    }

    /// Use `pipeline` instead of building the production adapters
    pub fn with_pipeline(mut self, pipeline: Arc<ExportPipeline>) -> Self {
        self.pipeline = Some(pipeline);
        self
    }

    /// Load state, schedule every job and run until `shutdown` fires
    ///
    /// # Errors
    ///
    /// Returns an error if the watermark record cannot be loaded or a
    /// collaborator cannot be built. Failures of individual runs are logged
    /// and never end the supervisor.
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> Result<ShutdownReport> {
        let jobs = self.config.job_definitions()?;
        let ids: Vec<JobId> = jobs.iter().map(|job| job.id.clone()).collect();

        let store = Arc::new(
            WatermarkStore::load(&self.config.application.watermark_file, &ids).await?,
        );
        tracing::info!(
            path = %store.path().display(),
            jobs = ids.len(),
            "Watermark store loaded"
        );

        let pipeline = match self.pipeline {
            Some(pipeline) => pipeline,
            None => Arc::new(ExportPipeline::from_config(&self.config)?),
        };

        let scheduler = JobScheduler::new(jobs, pipeline, store, &self.config.scheduler)?
            .with_timezone(self.config.application.schedule_timezone);
        let report = scheduler.run(shutdown).await;

        tracing::info!(
            drained = report.drained,
            aborted = report.aborted,
            "Supervisor stopped"
        );
        Ok(report)
    }
}
