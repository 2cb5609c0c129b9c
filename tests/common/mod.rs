//! Shared fakes for integration tests
//!
//! `FakeTable` answers the two statements the pipeline issues against an
//! in-memory table keyed by `id`; `RecordingUploader` keeps uploaded objects
//! in memory and can be told to fail.

#![allow(dead_code)]

use async_trait::async_trait;
use regex::Regex;
use sluice::adapters::artifact::CsvArtifactWriter;
use sluice::adapters::database::{SqlExecutor, SqlExecutors};
use sluice::adapters::storage::{ObjectUploader, ObjectUploaders};
use sluice::config::RetryConfig;
use sluice::core::export::{ExportPipeline, PipelineSettings};
use sluice::domain::{
    CompressionMode, JobDefinition, JobId, Result, RowSet, SluiceError, StorageError,
};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;

/// In-memory `orders(id, item)` table
pub struct FakeTable {
    rows: Mutex<Vec<(i64, String)>>,
    after_bound: Mutex<Vec<i64>>,
    queries: Mutex<Vec<String>>,
    delay: Duration,
    in_flight: AtomicUsize,
    max_in_flight: AtomicUsize,
}

impl FakeTable {
    pub fn new(keys: &[i64]) -> Arc<Self> {
        Self::with_delay(keys, Duration::ZERO)
    }

    pub fn with_delay(keys: &[i64], delay: Duration) -> Arc<Self> {
        Arc::new(Self {
            rows: Mutex::new(keys.iter().map(|k| (*k, format!("item-{k}"))).collect()),
            after_bound: Mutex::new(Vec::new()),
            queries: Mutex::new(Vec::new()),
            delay,
            in_flight: AtomicUsize::new(0),
            max_in_flight: AtomicUsize::new(0),
        })
    }

    pub fn insert(&self, keys: &[i64]) {
        let mut rows = self.rows.lock().unwrap();
        rows.extend(keys.iter().map(|k| (*k, format!("item-{k}"))));
    }

    /// Insert `keys` right after the next `MAX(id)` statement is answered,
    /// as a concurrent writer committing between the two pipeline queries
    pub fn insert_after_next_bound(&self, keys: &[i64]) {
        self.after_bound.lock().unwrap().extend_from_slice(keys);
    }

    pub fn queries(&self) -> Vec<String> {
        self.queries.lock().unwrap().clone()
    }

    /// Highest number of statements that ran at the same time
    pub fn max_in_flight(&self) -> usize {
        self.max_in_flight.load(Ordering::SeqCst)
    }

    fn answer(&self, sql: &str) -> RowSet {
        let lower = Regex::new(r"\(id > (-?\d+)\)").unwrap();
        let upper = Regex::new(r"\(id <= (-?\d+)\)").unwrap();
        let after = lower
            .captures(sql)
            .map(|c| c[1].parse::<i64>().unwrap())
            .unwrap_or(i64::MIN);
        let up_to = upper
            .captures(sql)
            .map(|c| c[1].parse::<i64>().unwrap())
            .unwrap_or(i64::MAX);

        let mut selected: Vec<_> = self
            .rows
            .lock()
            .unwrap()
            .iter()
            .filter(|(k, _)| *k > after && *k <= up_to)
            .cloned()
            .collect();
        selected.sort();

        if sql.contains("MAX(id)") {
            let mut set = RowSet::new(vec!["max".to_string()]);
            set.push(vec![selected.last().map(|(k, _)| k.to_string())]);

            let late: Vec<i64> = self.after_bound.lock().unwrap().drain(..).collect();
            self.insert(&late);
            return set;
        }

        let mut set = RowSet::new(vec!["id".to_string(), "item".to_string()]);
        for (key, item) in selected {
            set.push(vec![Some(key.to_string()), Some(item)]);
        }
        set
    }
}

#[async_trait]
impl SqlExecutor for FakeTable {
    async fn execute(&self, query: &str) -> Result<RowSet> {
        self.queries.lock().unwrap().push(query.to_string());

        let now = self.in_flight.fetch_add(1, Ordering::SeqCst) + 1;
        self.max_in_flight.fetch_max(now, Ordering::SeqCst);
        if !self.delay.is_zero() {
            tokio::time::sleep(self.delay).await;
        }
        self.in_flight.fetch_sub(1, Ordering::SeqCst);

        Ok(self.answer(query))
    }

    fn describe(&self) -> String {
        "fake://orders".to_string()
    }
}

/// Executor whose connection is always down
pub struct UnreachableDatabase;

#[async_trait]
impl SqlExecutor for UnreachableDatabase {
    async fn execute(&self, _query: &str) -> Result<RowSet> {
        Err(SluiceError::Connection("connection refused".to_string()))
    }

    fn describe(&self) -> String {
        "fake://down".to_string()
    }
}

/// Uploader keeping objects in memory
#[derive(Default)]
pub struct RecordingUploader {
    objects: Mutex<Vec<(String, Vec<u8>)>>,
    failures_left: AtomicUsize,
    attempts: AtomicUsize,
}

impl RecordingUploader {
    pub fn new() -> Arc<Self> {
        Arc::new(Self::default())
    }

    /// Fail the next `n` upload attempts with a transient error
    pub fn fail_next(&self, n: usize) {
        self.failures_left.store(n, Ordering::SeqCst);
    }

    pub fn keys(&self) -> Vec<String> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .map(|(k, _)| k.clone())
            .collect()
    }

    pub fn object(&self, key: &str) -> Option<Vec<u8>> {
        self.objects
            .lock()
            .unwrap()
            .iter()
            .find(|(k, _)| k == key)
            .map(|(_, data)| data.clone())
    }

    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ObjectUploader for RecordingUploader {
    async fn upload(&self, local: &Path, key: &str) -> std::result::Result<(), StorageError> {
        self.attempts.fetch_add(1, Ordering::SeqCst);

        let left = self.failures_left.load(Ordering::SeqCst);
        if left > 0 {
            self.failures_left.store(left - 1, Ordering::SeqCst);
            return Err(StorageError::PutFailed {
                key: key.to_string(),
                message: "503 Slow Down".to_string(),
            });
        }

        let data = tokio::fs::read(local)
            .await
            .map_err(|e| StorageError::ArtifactUnreadable {
                path: local.display().to_string(),
                message: e.to_string(),
            })?;
        self.objects.lock().unwrap().push((key.to_string(), data));
        Ok(())
    }

    fn describe(&self) -> String {
        "memory://".to_string()
    }
}

/// Settings with retries fast enough for tests
pub fn fast_settings() -> PipelineSettings {
    PipelineSettings {
        query_timeout: Duration::from_secs(5),
        upload_timeout: Duration::from_secs(5),
        upload_retry: RetryConfig {
            max_retries: 2,
            initial_delay_ms: 1,
            max_delay_ms: 5,
            backoff_multiplier: 2.0,
        },
        ..PipelineSettings::default()
    }
}

pub fn pipeline(
    database: Arc<dyn SqlExecutor>,
    uploader: Arc<dyn ObjectUploader>,
    settings: PipelineSettings,
) -> ExportPipeline {
    let mut executors = SqlExecutors::new();
    executors.insert("shop".to_string(), database);
    let mut uploaders = ObjectUploaders::new();
    uploaders.insert("archive".to_string(), uploader);
    ExportPipeline::new(
        executors,
        uploaders,
        Arc::new(CsvArtifactWriter::new()),
        settings,
    )
}

pub fn job(name: &str, key_column: Option<&str>, staging: &Path) -> JobDefinition {
    JobDefinition {
        id: JobId::new(name).unwrap(),
        position: 0,
        schedule: "* * * * * *".to_string(),
        query: "SELECT id, item FROM orders".to_string(),
        key_column: key_column.map(str::to_string),
        database: "shop".to_string(),
        storage: "archive".to_string(),
        local_folder: PathBuf::from(staging),
        destination_prefix: "exports/".to_string(),
        file_name: name.to_string(),
        compression: CompressionMode::None,
    }
}

/// Files left in a staging folder
pub fn staged_files(dir: &Path) -> Vec<String> {
    match std::fs::read_dir(dir) {
        Ok(entries) => entries
            .filter_map(|e| e.ok())
            .map(|e| e.file_name().to_string_lossy().to_string())
            .collect(),
        Err(_) => Vec::new(),
    }
}
