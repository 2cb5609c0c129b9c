//! Durable per-job watermark store
//!
//! The store owns the in-memory watermarks of every configured job. The only
//! way to change one is [`WatermarkStore::commit`], which takes the store's
//! lock, applies the new value and rewrites the whole record before the lock
//! is released. Concurrent commits from different jobs therefore each see the
//! other's latest value and no update is lost.
//!
//! The record is replaced by writing a temporary sibling file, syncing it and
//! renaming it over the old one, so a crash leaves either the previous or the
//! new complete record on disk.

use super::record::{render, Record};
use crate::domain::{JobId, Result, SluiceError};
use std::collections::HashMap;
use std::fs::{self, File};
use std::io::{ErrorKind, Write};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;

/// Watermark store backed by a single record file
pub struct WatermarkStore {
    path: PathBuf,
    jobs: Vec<JobId>,
    slots: HashMap<JobId, usize>,
    values: Mutex<Vec<i64>>,
}

impl WatermarkStore {
    /// Load the record at `path` and align it with `jobs`
    ///
    /// A missing record is a first run: every job starts at 0.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the record exists but cannot be read or
    /// parsed.
    pub async fn load(path: impl Into<PathBuf>, jobs: &[JobId]) -> Result<Self> {
        let path = path.into();

        let record = match tokio::fs::read_to_string(&path).await {
            Ok(text) => Record::parse(&text)?,
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                tracing::info!(
                    path = %path.display(),
                    "No watermark record found, all jobs start from 0"
                );
                Record::Empty
            }
            Err(e) => {
                return Err(SluiceError::Persistence(format!(
                    "Failed to read watermark record {}: {e}",
                    path.display()
                )))
            }
        };

        if matches!(record, Record::Positional(_)) {
            tracing::warn!(
                path = %path.display(),
                "Watermark record is in positional form; it will be rewritten keyed by job id"
            );
        }

        let aligned = record.align(jobs);
        for ignored in &aligned.ignored {
            tracing::warn!(entry = %ignored, "Watermark entry matches no configured job, ignoring");
        }
        if !aligned.defaulted.is_empty() && record != Record::Empty {
            tracing::info!(
                jobs = ?aligned.defaulted.iter().map(JobId::as_str).collect::<Vec<_>>(),
                "Jobs without a recorded watermark start from 0"
            );
        }

        for (job, value) in jobs.iter().zip(&aligned.values) {
            tracing::debug!(job = %job, watermark = value, "Loaded watermark");
        }

        Ok(Self {
            path,
            jobs: jobs.to_vec(),
            slots: jobs.iter().cloned().enumerate().map(|(i, j)| (j, i)).collect(),
            values: Mutex::new(aligned.values),
        })
    }

    /// Path of the record file
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Current watermark of a job
    ///
    /// # Errors
    ///
    /// Returns a validation error if the job is not part of this store.
    pub async fn get(&self, job: &JobId) -> Result<i64> {
        let slot = self.slot(job)?;
        Ok(self.values.lock().await[slot])
    }

    /// Every job with its current watermark, in job order
    pub async fn snapshot(&self) -> Vec<(JobId, i64)> {
        let values = self.values.lock().await;
        self.jobs.iter().cloned().zip(values.iter().copied()).collect()
    }

    /// Record a finished run of `job` and persist the full record
    ///
    /// The stored value becomes `max(current, value)`, so a watermark never
    /// moves backwards. Returns the value now in effect.
    ///
    /// # Errors
    ///
    /// Returns a persistence error if the record cannot be written; the
    /// job's in-memory value is then restored to its last durable value.
    pub async fn commit(&self, job: &JobId, value: i64) -> Result<i64> {
        let slot = self.slot(job)?;
        let mut values = self.values.lock().await;

        let previous = values[slot];
        let next = previous.max(value);
        values[slot] = next;

        let entries: Vec<(JobId, i64)> =
            self.jobs.iter().cloned().zip(values.iter().copied()).collect();
        let path = self.path.clone();

        let written = tokio::task::spawn_blocking(move || write_atomic(&path, &render(&entries)))
            .await
            .map_err(|e| SluiceError::Persistence(format!("Watermark writer panicked: {e}")))
            .and_then(|r| r);

        match written {
            Ok(()) => {
                tracing::debug!(job = %job, watermark = next, "Watermark committed");
                Ok(next)
            }
            Err(e) => {
                values[slot] = previous;
                tracing::error!(
                    job = %job,
                    watermark = previous,
                    error = %e,
                    "Failed to persist watermark record, keeping previous value"
                );
                Err(e)
            }
        }
    }

    fn slot(&self, job: &JobId) -> Result<usize> {
        self.slots
            .get(job)
            .copied()
            .ok_or_else(|| SluiceError::Validation(format!("Unknown job '{job}'")))
    }
}

/// Replace `path` with `contents` via temp file, fsync and rename
fn write_atomic(path: &Path, contents: &str) -> Result<()> {
    let persist = |e: std::io::Error| {
        SluiceError::Persistence(format!(
            "Failed to write watermark record {}: {e}",
            path.display()
        ))
    };

    let parent = match path.parent() {
        Some(p) if !p.as_os_str().is_empty() => p.to_path_buf(),
        _ => PathBuf::from("."),
    };
    fs::create_dir_all(&parent).map_err(persist)?;

    let mut tmp_name = path
        .file_name()
        .map(|n| n.to_os_string())
        .unwrap_or_else(|| "watermarks".into());
    tmp_name.push(".tmp");
    let tmp_path = parent.join(tmp_name);

    let replaced = write_synced(&tmp_path, contents).and_then(|()| fs::rename(&tmp_path, path));
    if let Err(e) = replaced {
        match fs::remove_file(&tmp_path) {
            Ok(()) => {}
            Err(cleanup) if cleanup.kind() == ErrorKind::NotFound => {}
            Err(cleanup) => tracing::warn!(
                path = %tmp_path.display(),
                error = %cleanup,
                "Failed to remove temporary watermark record"
            ),
        }
        return Err(persist(e));
    }

    // Directory sync makes the rename durable; not every platform supports it.
    #[cfg(unix)]
    if let Err(e) = File::open(&parent).and_then(|dir| dir.sync_all()) {
        tracing::warn!(
            path = %parent.display(),
            error = %e,
            "Failed to sync watermark directory, the last commit may not survive a crash"
        );
    }

    Ok(())
}

fn write_synced(path: &Path, contents: &str) -> std::io::Result<()> {
    let mut file = File::create(path)?;
    file.write_all(contents.as_bytes())?;
    file.sync_all()
}
