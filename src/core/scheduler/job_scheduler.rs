//! Job scheduler
//!
//! Every job gets its own trigger task that sleeps until the job's next cron
//! fire time and then starts a run. Runs of different jobs proceed
//! concurrently; a job never has more than one run in flight. A run reads
//! the job's watermark, executes the pipeline and forwards the resulting
//! watermark to the store.
//!
//! On shutdown the trigger tasks stop, in-flight runs get
//! `shutdown_timeout` to finish, and whatever is left is aborted. Aborting is
//! safe because the watermark record is only ever replaced by rename.

use super::trigger::Trigger;
use crate::config::schema::{OverlapPolicy, ScheduleTimezone, SchedulerConfig};
use crate::core::export::{ExportPipeline, RunReport};
use crate::core::state::WatermarkStore;
use crate::domain::{JobDefinition, Result, RunErrorDetail};
use crate::{log_job_complete, log_job_start};
use chrono::Utc;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::watch;
use tokio::task::JoinHandle;

/// Counts reported when the scheduler stops
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ShutdownReport {
    /// Runs that finished within the shutdown timeout
    pub drained: usize,
    /// Runs that were aborted
    pub aborted: usize,
}

/// Runs one job once: read watermark, run the pipeline, commit
///
/// Dry-run reports are not committed. The commit is the store's serialized
/// update, so concurrent runs of different jobs never lose each other's
/// values.
///
/// # Errors
///
/// Returns the pipeline error, or a persistence error if the commit fails.
/// Either way the job's durable watermark is unchanged.
pub async fn execute_job(
    pipeline: &ExportPipeline,
    store: &WatermarkStore,
    job: &JobDefinition,
) -> Result<RunReport> {
    let current = store.get(&job.id).await?;
    log_job_start!(&job.id, current);

    let report = match pipeline.run(job, current).await {
        Ok(report) => report,
        Err(e) => {
            let detail = RunErrorDetail::from(&e)
                .with_job_id(job.id.as_str())
                .with_watermark(current);
            tracing::error!(
                job = %job.id,
                watermark = current,
                retryable = detail.retryable,
                error = %detail.message,
                "Export run failed, watermark unchanged"
            );
            return Err(e);
        }
    };

    if report.should_commit() {
        let committed = store.commit(&job.id, report.watermark).await?;
        log_job_complete!(&job.id, report.rows(), committed, report.duration);
    } else {
        log_job_complete!(&job.id, report.rows(), current, report.duration);
    }

    Ok(report)
}

struct ScheduledJob {
    job: Arc<JobDefinition>,
    trigger: Trigger,
}

/// Fires every job on its own schedule until shutdown
pub struct JobScheduler {
    jobs: Vec<ScheduledJob>,
    pipeline: Arc<ExportPipeline>,
    store: Arc<WatermarkStore>,
    overlap_policy: OverlapPolicy,
    shutdown_timeout: Duration,
}

impl JobScheduler {
    /// Create a scheduler for `jobs`
    ///
    /// # Errors
    ///
    /// Returns a configuration error if a job's schedule does not parse.
    pub fn new(
        jobs: Vec<JobDefinition>,
        pipeline: Arc<ExportPipeline>,
        store: Arc<WatermarkStore>,
        config: &SchedulerConfig,
    ) -> Result<Self> {
        let jobs = jobs
            .into_iter()
            .map(|job| {
                let trigger = Trigger::parse(&job.schedule)?;
                Ok(ScheduledJob {
                    job: Arc::new(job),
                    trigger,
                })
            })
            .collect::<Result<Vec<_>>>()?;

        Ok(Self {
            jobs,
            pipeline,
            store,
            overlap_policy: config.overlap_policy,
            shutdown_timeout: Duration::from_secs(config.shutdown_timeout_secs),
        })
    }

    /// Evaluate every job's schedule in `timezone`
    pub fn with_timezone(mut self, timezone: ScheduleTimezone) -> Self {
        self.jobs = self
            .jobs
            .into_iter()
            .map(|scheduled| ScheduledJob {
                trigger: scheduled.trigger.with_timezone(timezone),
                ..scheduled
            })
            .collect();
        self
    }

    /// Number of scheduled jobs
    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    /// Whether no jobs are scheduled
    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    /// Run until `shutdown` turns true (or its sender is dropped)
    pub async fn run(self, shutdown: watch::Receiver<bool>) -> ShutdownReport {
        tracing::info!(
            jobs = self.jobs.len(),
            overlap_policy = ?self.overlap_policy,
            "Scheduler started"
        );

        let triggers: Vec<JoinHandle<Option<JoinHandle<()>>>> = self
            .jobs
            .into_iter()
            .map(|scheduled| {
                tokio::spawn(trigger_loop(
                    scheduled,
                    Arc::clone(&self.pipeline),
                    Arc::clone(&self.store),
                    self.overlap_policy,
                    shutdown.clone(),
                ))
            })
            .collect();

        let mut in_flight = Vec::new();
        for trigger in triggers {
            match trigger.await {
                Ok(Some(run)) if !run.is_finished() => in_flight.push(run),
                Ok(_) => {}
                Err(e) => tracing::error!(error = %e, "Trigger task failed"),
            }
        }

        drain(in_flight, self.shutdown_timeout).await
    }
}

async fn trigger_loop(
    scheduled: ScheduledJob,
    pipeline: Arc<ExportPipeline>,
    store: Arc<WatermarkStore>,
    policy: OverlapPolicy,
    mut shutdown: watch::Receiver<bool>,
) -> Option<JoinHandle<()>> {
    let ScheduledJob { job, trigger } = scheduled;
    let mut current: Option<JoinHandle<()>> = None;
    let mut last_fire = Utc::now();

    loop {
        if *shutdown.borrow() {
            break;
        }

        let from = Utc::now().max(last_fire);
        let Some((at, wait)) = trigger.next_fire(from) else {
            tracing::warn!(job = %job.id, schedule = %trigger.expression(), "Schedule has no future fire times");
            break;
        };
        tracing::debug!(job = %job.id, next_fire = %at, "Waiting for trigger");

        tokio::select! {
            _ = tokio::time::sleep(wait) => {}
            _ = shutdown.changed() => break,
        }
        last_fire = at;

        if let Some(run) = current.as_ref() {
            if !run.is_finished() {
                tracing::warn!(
                    job = %job.id,
                    "Previous run still in progress, skipping this trigger"
                );
                continue;
            }
        }

        let run = tokio::spawn({
            let job = Arc::clone(&job);
            let pipeline = Arc::clone(&pipeline);
            let store = Arc::clone(&store);
            async move {
                // Failures are logged inside; the next trigger retries.
                let _ = execute_job(&pipeline, &store, &job).await;
            }
        });

        match policy {
            OverlapPolicy::Skip => current = Some(run),
            OverlapPolicy::Wait => {
                let mut run = run;
                tokio::select! {
                    _ = &mut run => {}
                    _ = shutdown.changed() => return Some(run),
                }
            }
        }
    }

    current
}

async fn drain(runs: Vec<JoinHandle<()>>, timeout: Duration) -> ShutdownReport {
    if runs.is_empty() {
        tracing::info!("Scheduler stopped, no runs in flight");
        return ShutdownReport::default();
    }

    tracing::info!(
        in_flight = runs.len(),
        timeout_secs = timeout.as_secs(),
        "Waiting for in-flight runs to finish"
    );

    let aborts: Vec<_> = runs.iter().map(JoinHandle::abort_handle).collect();
    let total = runs.len();

    match tokio::time::timeout(timeout, futures::future::join_all(runs)).await {
        Ok(_) => {
            tracing::info!(drained = total, "All in-flight runs finished");
            ShutdownReport {
                drained: total,
                aborted: 0,
            }
        }
        Err(_) => {
            let aborted = aborts.iter().filter(|a| !a.is_finished()).count();
            for handle in &aborts {
                handle.abort();
            }
            tracing::warn!(
                aborted,
                "Shutdown timeout elapsed, aborting remaining runs; their watermarks are unchanged"
            );
            ShutdownReport {
                drained: total - aborted,
                aborted,
            }
        }
    }
}
