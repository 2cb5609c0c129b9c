//! Domain error types
//!
//! This module defines the error hierarchy for Sluice. Errors are split by
//! blast radius: configuration and persistence failures are surfaced to the
//! process, everything raised while running a single job is contained in that
//! job's run and retried on its next trigger.

use thiserror::Error;

/// Main Sluice error type
///
/// This is the primary error type used throughout the application.
/// It wraps specific error types and provides context for error handling.
#[derive(Debug, Error)]
pub enum SluiceError {
    /// Configuration-related errors (fatal at startup)
    #[error("Configuration error: {0}")]
    Configuration(String),

    /// Failed to obtain a database connection
    #[error("Connection error: {0}")]
    Connection(String),

    /// A SQL statement failed
    #[error("Query error: {0}")]
    Query(String),

    /// A bounded operation exceeded its timeout
    #[error("Operation timed out: {0}")]
    Timeout(String),

    /// Writing or compressing the export artifact failed
    #[error("Serialization error: {0}")]
    Serialization(String),

    /// Object storage errors
    #[error("Storage error: {0}")]
    Storage(#[from] StorageError),

    /// The watermark record could not be read or written
    #[error("Watermark persistence error: {0}")]
    Persistence(String),

    /// Validation errors
    #[error("Validation error: {0}")]
    Validation(String),

    /// I/O errors
    #[error("I/O error: {0}")]
    Io(String),

    /// Generic errors with context
    #[error("{0}")]
    Other(String),
}

impl SluiceError {
    /// Whether a later attempt of the same operation may succeed
    ///
    /// Per-job failures are always retried on the next trigger; this only
    /// tells the in-run retry loop whether an immediate retry makes sense.
    pub fn is_retryable(&self) -> bool {
        match self {
            SluiceError::Connection(_) | SluiceError::Timeout(_) => true,
            SluiceError::Storage(e) => e.is_retryable(),
            _ => false,
        }
    }
}

/// Object storage errors
///
/// Errors raised while uploading export artifacts. These don't expose the
/// underlying object store client types.
#[derive(Debug, Error)]
pub enum StorageError {
    /// The storage backend could not be built from configuration
    #[error("Invalid storage configuration: {0}")]
    InvalidConfig(String),

    /// A single PUT failed
    #[error("Failed to upload '{key}': {message}")]
    PutFailed { key: String, message: String },

    /// A single PUT exceeded the upload timeout
    #[error("Upload of '{key}' timed out after {seconds}s")]
    Timeout { key: String, seconds: u64 },

    /// Every retry attempt failed
    #[error("Upload of '{key}' failed after {attempts} attempts: {last_error}")]
    RetriesExhausted {
        key: String,
        attempts: usize,
        last_error: String,
    },

    /// The local artifact could not be read
    #[error("Failed to read artifact {path}: {message}")]
    ArtifactUnreadable { path: String, message: String },
}

impl StorageError {
    /// Whether the failure is transient
    pub fn is_retryable(&self) -> bool {
        matches!(
            self,
            StorageError::PutFailed { .. } | StorageError::Timeout { .. }
        )
    }
}

/// Outcome detail of a failed job run
///
/// Provides additional context for run failures in logs and summaries
#[derive(Debug, Clone)]
pub struct RunErrorDetail {
    /// Job the error belongs to
    pub job_id: Option<String>,

    /// Watermark the failed run started from
    pub watermark: Option<i64>,

    /// Error message
    pub message: String,

    /// Whether the error is retryable
    pub retryable: bool,
}

impl RunErrorDetail {
    /// Creates a new run error detail
    pub fn new(message: impl Into<String>) -> Self {
        Self {
            job_id: None,
            watermark: None,
            message: message.into(),
            retryable: false,
        }
    }

    /// Sets the job ID
    pub fn with_job_id(mut self, job_id: impl Into<String>) -> Self {
        self.job_id = Some(job_id.into());
        self
    }

    /// Sets the starting watermark
    pub fn with_watermark(mut self, watermark: i64) -> Self {
        self.watermark = Some(watermark);
        self
    }

    /// Marks the error as retryable
    pub fn retryable(mut self) -> Self {
        self.retryable = true;
        self
    }
}

impl From<&SluiceError> for RunErrorDetail {
    fn from(err: &SluiceError) -> Self {
        let detail = RunErrorDetail::new(err.to_string());
        if err.is_retryable() {
            detail.retryable()
        } else {
            detail
        }
    }
}

// Conversion from std::io::Error
impl From<std::io::Error> for SluiceError {
    fn from(err: std::io::Error) -> Self {
        SluiceError::Io(err.to_string())
    }
}

// Conversion from toml parse errors
impl From<toml::de::Error> for SluiceError {
    fn from(err: toml::de::Error) -> Self {
        SluiceError::Configuration(format!("TOML parse error: {err}"))
    }
}

impl From<csv::Error> for SluiceError {
    fn from(err: csv::Error) -> Self {
        SluiceError::Serialization(format!("CSV write failed: {err}"))
    }
}

impl From<zip::result::ZipError> for SluiceError {
    fn from(err: zip::result::ZipError) -> Self {
        SluiceError::Serialization(format!("Zip write failed: {err}"))
    }
}

impl From<cron::error::Error> for SluiceError {
    fn from(err: cron::error::Error) -> Self {
        SluiceError::Configuration(format!("Invalid schedule expression: {err}"))
    }
}
