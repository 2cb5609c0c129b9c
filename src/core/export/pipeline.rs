//! Export pipeline
//!
//! One run of one job: find the new key range, extract it, write the
//! artifact, upload it, and report the watermark to commit. The pipeline
//! never touches the watermark store; the caller commits the returned value.
//!
//! For an incremental job starting at watermark `w`:
//!
//! 1. `SELECT MAX(key) ... AND (key > w)` finds the candidate `c`
//! 2. no candidate: nothing is queried, written or uploaded
//! 3. `... AND (key > w) AND (key <= c)` extracts exactly `(w, c]`
//! 4. the artifact is uploaded and `c` is returned
//!
//! Any failure returns an error and the watermark stays at `w`, so the next
//! run extracts the same range again.

use crate::adapters::artifact::{ArtifactWriter, CsvArtifactWriter};
use crate::adapters::database::{create_sql_executors, SqlExecutor, SqlExecutors};
use crate::adapters::storage::{create_uploaders, upload_with_retry, ObjectUploader, ObjectUploaders};
use crate::config::schema::{
    ExportConfig, FirstRunNaming, RetryConfig, ScheduleTimezone, SluiceConfig,
};
use crate::core::export::naming::artifact_stem;
use crate::core::export::query::QueryTemplate;
use crate::core::export::summary::{RunOutcome, RunReport};
use crate::domain::{JobDefinition, Result, RowSet, SluiceError};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::Instrument;
use uuid::Uuid;

/// Tunables shared by every run
#[derive(Debug, Clone)]
pub struct PipelineSettings {
    /// Bound on each SQL statement
    pub query_timeout: Duration,
    /// Bound on each upload attempt
    pub upload_timeout: Duration,
    /// Upload retry policy
    pub upload_retry: RetryConfig,
    /// Delete the artifact once uploaded
    pub remove_local_after_upload: bool,
    /// Write artifacts but skip upload and commit
    pub dry_run: bool,
    /// Naming of a job's first batch
    pub first_run_naming: FirstRunNaming,
    /// Clock of the artifact timestamp suffix
    pub timezone: ScheduleTimezone,
}

impl PipelineSettings {
    /// Settings from the `[export]` and `[application]` sections
    pub fn from_config(config: &SluiceConfig) -> Self {
        Self {
            query_timeout: Duration::from_secs(config.export.query_timeout_seconds),
            upload_timeout: Duration::from_secs(config.export.upload_timeout_seconds),
            upload_retry: config.export.upload_retry.clone(),
            remove_local_after_upload: config.export.remove_local_after_upload,
            dry_run: config.export.dry_run,
            first_run_naming: config.application.first_run_naming,
            timezone: config.application.schedule_timezone,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        let export = ExportConfig::default();
        Self {
            query_timeout: Duration::from_secs(export.query_timeout_seconds),
            upload_timeout: Duration::from_secs(export.upload_timeout_seconds),
            upload_retry: export.upload_retry,
            remove_local_after_upload: export.remove_local_after_upload,
            dry_run: export.dry_run,
            first_run_naming: FirstRunNaming::default(),
            timezone: ScheduleTimezone::default(),
        }
    }
}

/// Runs export jobs against their configured database and storage
pub struct ExportPipeline {
    executors: SqlExecutors,
    uploaders: ObjectUploaders,
    writer: Arc<dyn ArtifactWriter>,
    settings: PipelineSettings,
}

impl ExportPipeline {
    /// Create a pipeline from explicit collaborators
    pub fn new(
        executors: SqlExecutors,
        uploaders: ObjectUploaders,
        writer: Arc<dyn ArtifactWriter>,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            executors,
            uploaders,
            writer,
            settings,
        }
    }

    /// Create a pipeline with the production adapters for `config`
    ///
    /// # Errors
    ///
    /// Returns an error if a database pool or storage backend cannot be built.
    pub fn from_config(config: &SluiceConfig) -> Result<Self> {
        Ok(Self::new(
            create_sql_executors(config)?,
            create_uploaders(config)?,
            Arc::new(CsvArtifactWriter::new()),
            PipelineSettings::from_config(config),
        ))
    }

    /// Pipeline settings
    pub fn settings(&self) -> &PipelineSettings {
        &self.settings
    }

    /// Run `job` once, starting from watermark `current`
    ///
    /// # Errors
    ///
    /// Returns the first failure of the run. The watermark to keep is then
    /// `current`.
    pub async fn run(&self, job: &JobDefinition, current: i64) -> Result<RunReport> {
        let run_id = Uuid::new_v4();
        let span = tracing::info_span!("export_run", job = %job.id, run_id = %run_id);
        self.run_in_span(job, current, run_id).instrument(span).await
    }

    async fn run_in_span(&self, job: &JobDefinition, current: i64, run_id: Uuid) -> Result<RunReport> {
        let started = Instant::now();
        let executor = self.executor(job)?;
        let uploader = self.uploader(job)?;

        let (data_query, candidate) = match job.key_column.as_deref() {
            Some(key) => {
                let template = QueryTemplate::parse(&job.query)?;
                let bound = self
                    .query(executor.as_ref(), &template.bound_query(key, current))
                    .await?
                    .scalar_i64()?;

                match bound {
                    Some(candidate) if candidate > current => {
                        tracing::debug!(
                            job = %job.id,
                            run_id = %run_id,
                            from = current,
                            to = candidate,
                            "New key range found"
                        );
                        (template.data_query(key, current, candidate), Some(candidate))
                    }
                    _ => {
                        tracing::info!(job = %job.id, run_id = %run_id, watermark = current, "No new rows");
                        return Ok(RunReport {
                            job_id: job.id.clone(),
                            run_id,
                            started_from: current,
                            watermark: current,
                            outcome: RunOutcome::NoNewRows,
                            duration: started.elapsed(),
                        });
                    }
                }
            }
            None => {
                tracing::debug!(job = %job.id, run_id = %run_id, "No key column, running full extraction");
                (job.query.clone(), None)
            }
        };

        let rows = self.query(executor.as_ref(), &data_query).await?;
        let naming = self.settings.first_run_naming;
        let stem = match self.settings.timezone {
            ScheduleTimezone::Utc => {
                artifact_stem(&job.file_name, current, candidate, naming, chrono::Utc::now())
            }
            ScheduleTimezone::Local => {
                artifact_stem(&job.file_name, current, candidate, naming, chrono::Local::now())
            }
        };
        let artifact = self
            .writer
            .write(rows, &job.local_folder, &stem, job.compression)
            .await?;
        let watermark = candidate.map_or(current, |c| c.max(current));

        tracing::debug!(
            job = %job.id,
            run_id = %run_id,
            artifact = %artifact.path.display(),
            rows = artifact.rows,
            bytes = artifact.bytes,
            "Artifact written"
        );

        if self.settings.dry_run {
            tracing::info!(
                job = %job.id,
                run_id = %run_id,
                artifact = %artifact.path.display(),
                would_advance_to = watermark,
                "Dry run: skipping upload and watermark commit"
            );
            return Ok(RunReport {
                job_id: job.id.clone(),
                run_id,
                started_from: current,
                watermark: current,
                outcome: RunOutcome::DryRun {
                    artifact: artifact.name,
                    rows: artifact.rows,
                    would_advance_to: watermark,
                },
                duration: started.elapsed(),
            });
        }

        let key = job.destination_key(&artifact.name);
        upload_with_retry(
            uploader.as_ref(),
            &artifact.path,
            &key,
            &self.settings.upload_retry,
            self.settings.upload_timeout,
        )
        .await
        .map_err(|e| {
            tracing::warn!(
                job = %job.id,
                run_id = %run_id,
                artifact = %artifact.path.display(),
                "Upload failed, artifact kept in staging folder"
            );
            SluiceError::from(e)
        })?;

        tracing::info!(
            job = %job.id,
            run_id = %run_id,
            key = %key,
            storage = %uploader.describe(),
            "Artifact uploaded"
        );

        if self.settings.remove_local_after_upload {
            if let Err(e) = tokio::fs::remove_file(&artifact.path).await {
                tracing::warn!(
                    job = %job.id,
                    artifact = %artifact.path.display(),
                    error = %e,
                    "Failed to remove uploaded artifact"
                );
            }
        }

        Ok(RunReport {
            job_id: job.id.clone(),
            run_id,
            started_from: current,
            watermark,
            outcome: RunOutcome::Exported {
                artifact: artifact.name,
                key,
                rows: artifact.rows,
                bytes: artifact.bytes,
            },
            duration: started.elapsed(),
        })
    }

    async fn query(&self, executor: &dyn SqlExecutor, sql: &str) -> Result<RowSet> {
        match tokio::time::timeout(self.settings.query_timeout, executor.execute(sql)).await {
            Ok(result) => result,
            Err(_) => Err(SluiceError::Timeout(format!(
                "query on {} exceeded {}s",
                executor.describe(),
                self.settings.query_timeout.as_secs()
            ))),
        }
    }

    fn executor(&self, job: &JobDefinition) -> Result<Arc<dyn SqlExecutor>> {
        self.executors.get(&job.database).cloned().ok_or_else(|| {
            SluiceError::Configuration(format!(
                "Job '{}' references unknown database '{}'",
                job.id, job.database
            ))
        })
    }

    fn uploader(&self, job: &JobDefinition) -> Result<Arc<dyn ObjectUploader>> {
        self.uploaders.get(&job.storage).cloned().ok_or_else(|| {
            SluiceError::Configuration(format!(
                "Job '{}' references unknown storage '{}'",
                job.id, job.storage
            ))
        })
    }
}
