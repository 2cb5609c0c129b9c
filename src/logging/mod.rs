//! Logging and observability
//!
//! This module provides structured logging with support for:
//! - Console output with configurable log levels
//! - JSON-formatted local file logging with rotation
//! - Helper macros for the job lifecycle events every run emits
//!
//! # Example
//!
//! ```no_run
//! use sluice::logging::init_logging;
//! use sluice::config::LoggingConfig;
//!
//! let config = LoggingConfig::default();
//! let _guard = init_logging("info", &config).expect("Failed to initialize logging");
//!
//! // Use tracing macros for logging
//! tracing::info!("Application started");
//! tracing::error!(error = "Something went wrong", "Error occurred");
//! ```

pub mod structured;

// Re-export commonly used items
pub use structured::{init_logging, LoggingGuard};

/// Log the start of a job run
///
/// # Example
///
/// ```no_run
/// use sluice::log_job_start;
/// use sluice::domain::JobId;
///
/// let job = JobId::new("orders").unwrap();
/// log_job_start!(&job, 42);
/// ```
#[macro_export]
macro_rules! log_job_start {
    ($job:expr, $watermark:expr) => {
        tracing::info!(
            job = %$job,
            watermark = $watermark,
            "Starting export run"
        );
    };
}

/// Log the completion of a job run
///
/// # Example
///
/// ```no_run
/// use sluice::log_job_complete;
/// use sluice::domain::JobId;
/// use std::time::Duration;
///
/// let job = JobId::new("orders").unwrap();
/// log_job_complete!(&job, 3, 45, Duration::from_millis(120));
/// ```
#[macro_export]
macro_rules! log_job_complete {
    ($job:expr, $rows:expr, $watermark:expr, $duration:expr) => {
        tracing::info!(
            job = %$job,
            rows = $rows,
            watermark = $watermark,
            duration_ms = $duration.as_millis() as u64,
            "Export run completed"
        );
    };
}

/// Log a retry attempt
///
/// # Example
///
/// ```no_run
/// use sluice::log_retry_attempt;
///
/// log_retry_attempt!(2, 3, "Connection timeout");
/// ```
#[macro_export]
macro_rules! log_retry_attempt {
    ($attempt:expr, $max_attempts:expr, $reason:expr) => {
        tracing::warn!(
            attempt = $attempt,
            max_attempts = $max_attempts,
            reason = %$reason,
            "Retrying operation"
        );
    };
}
