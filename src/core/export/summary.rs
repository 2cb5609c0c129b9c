//! Run reports and export summaries
//!
//! This module defines structures for tracking and reporting export results.

use crate::domain::{JobId, RunErrorDetail};
use std::time::Duration;
use uuid::Uuid;

/// What a single pipeline run did
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum RunOutcome {
    /// An artifact was written and uploaded
    Exported {
        /// Artifact file name
        artifact: String,
        /// Object key it was uploaded to
        key: String,
        /// Rows in the artifact
        rows: usize,
        /// Artifact size in bytes
        bytes: u64,
    },
    /// Incremental job found no rows above its watermark; nothing uploaded
    NoNewRows,
    /// Dry run: artifact written locally, not uploaded, watermark kept
    DryRun {
        /// Artifact file name
        artifact: String,
        /// Rows in the artifact
        rows: usize,
        /// Watermark a real run would have committed
        would_advance_to: i64,
    },
}

/// Result of one successful pipeline run
#[derive(Debug, Clone)]
pub struct RunReport {
    /// Job that ran
    pub job_id: JobId,

    /// Unique id of this run, for correlating log lines
    pub run_id: Uuid,

    /// Watermark the run started from
    pub started_from: i64,

    /// Watermark to commit (never below `started_from`)
    pub watermark: i64,

    /// What happened
    pub outcome: RunOutcome,

    /// Wall time of the run
    pub duration: Duration,
}

impl RunReport {
    /// Rows exported (0 when nothing was uploaded)
    pub fn rows(&self) -> usize {
        match &self.outcome {
            RunOutcome::Exported { rows, .. } | RunOutcome::DryRun { rows, .. } => *rows,
            RunOutcome::NoNewRows => 0,
        }
    }

    /// Whether the scheduler should commit `watermark`
    pub fn should_commit(&self) -> bool {
        !matches!(self.outcome, RunOutcome::DryRun { .. })
    }
}

/// Summary of a one-shot export over several jobs
#[derive(Debug, Clone, Default)]
pub struct ExportSummary {
    /// Jobs run
    pub total_jobs: usize,

    /// Jobs that uploaded an artifact
    pub exported: usize,

    /// Jobs that had nothing new
    pub no_new_rows: usize,

    /// Dry-run jobs
    pub dry_runs: usize,

    /// Jobs that failed
    pub failed: usize,

    /// Rows exported across all jobs
    pub total_rows: usize,

    /// Duration of the export
    pub duration: Duration,

    /// Errors encountered during export
    pub errors: Vec<RunErrorDetail>,
}

impl ExportSummary {
    /// Create a new empty export summary
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the duration
    pub fn with_duration(mut self, duration: Duration) -> Self {
        self.duration = duration;
        self
    }

    /// Count a successful run
    pub fn record(&mut self, report: &RunReport) {
        self.total_jobs += 1;
        self.total_rows += report.rows();
        match report.outcome {
            RunOutcome::Exported { .. } => self.exported += 1,
            RunOutcome::NoNewRows => self.no_new_rows += 1,
            RunOutcome::DryRun { .. } => self.dry_runs += 1,
        }
    }

    /// Count a failed run
    pub fn add_error(&mut self, error: RunErrorDetail) {
        self.total_jobs += 1;
        self.failed += 1;
        self.errors.push(error);
    }

    /// Check if every job succeeded
    pub fn is_successful(&self) -> bool {
        self.failed == 0
    }

    /// Log the summary
    pub fn log_summary(&self) {
        tracing::info!(
            total_jobs = self.total_jobs,
            exported = self.exported,
            no_new_rows = self.no_new_rows,
            dry_runs = self.dry_runs,
            failed = self.failed,
            total_rows = self.total_rows,
            duration_ms = self.duration.as_millis() as u64,
            "Export completed"
        );

        for error in &self.errors {
            tracing::warn!(
                job = error.job_id.as_deref().unwrap_or("-"),
                retryable = error.retryable,
                message = %error.message,
                "Export error"
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn report(outcome: RunOutcome) -> RunReport {
        RunReport {
            job_id: JobId::new("orders").unwrap(),
            run_id: Uuid::new_v4(),
            started_from: 3,
            watermark: 5,
            outcome,
            duration: Duration::from_millis(10),
        }
    }

    #[test]
    fn test_export_summary_creation() {
        let summary = ExportSummary::new().with_duration(Duration::from_secs(2));
        assert_eq!(summary.total_jobs, 0);
        assert_eq!(summary.duration, Duration::from_secs(2));
        assert!(summary.is_successful());
    }

    #[test]
    fn test_summary_counts_outcomes() {
        let mut summary = ExportSummary::new();
        summary.record(&report(RunOutcome::Exported {
            artifact: "orders.csv".to_string(),
            key: "exports/orders.csv".to_string(),
            rows: 2,
            bytes: 20,
        }));
        summary.record(&report(RunOutcome::NoNewRows));
        summary.add_error(RunErrorDetail::new("boom").with_job_id("users"));

        assert_eq!(summary.total_jobs, 3);
        assert_eq!(summary.exported, 1);
        assert_eq!(summary.no_new_rows, 1);
        assert_eq!(summary.total_rows, 2);
        assert!(!summary.is_successful());
    }

    #[test]
    fn test_dry_run_is_not_committed() {
        let dry = report(RunOutcome::DryRun {
            artifact: "orders.csv".to_string(),
            rows: 1,
            would_advance_to: 9,
        });
        assert!(!dry.should_commit());
        assert!(report(RunOutcome::NoNewRows).should_commit());
    }
}
