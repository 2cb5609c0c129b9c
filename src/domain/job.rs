//! Export job definitions
//!
//! A [`JobDefinition`] is the immutable, validated form of one `[[exporters]]`
//! entry. It is built once at startup and shared by the scheduler and the
//! export pipeline for the lifetime of the process.

use crate::domain::ids::JobId;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;

/// Compression applied to the exported CSV before upload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum CompressionMode {
    /// Plain `.csv`
    #[default]
    None,
    /// `.zip` archive holding a single deflated CSV entry
    Zip,
    /// gzip stream, `.csv.gz`
    Gzip,
}

impl CompressionMode {
    /// File extension of the uploaded artifact, without leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            CompressionMode::None => "csv",
            CompressionMode::Zip => "zip",
            CompressionMode::Gzip => "csv.gz",
        }
    }
}

impl fmt::Display for CompressionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            CompressionMode::None => write!(f, "none"),
            CompressionMode::Zip => write!(f, "zip"),
            CompressionMode::Gzip => write!(f, "gzip"),
        }
    }
}

impl FromStr for CompressionMode {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "none" => Ok(CompressionMode::None),
            "zip" => Ok(CompressionMode::Zip),
            "gzip" | "gz" => Ok(CompressionMode::Gzip),
            other => Err(format!(
                "Invalid compression '{other}'. Must be one of: none, zip, gzip"
            )),
        }
    }
}

/// One configured, independently scheduled extraction-and-upload task
#[derive(Debug, Clone)]
pub struct JobDefinition {
    /// Stable identity used as the watermark key
    pub id: JobId,

    /// Position in the configured exporter list
    pub position: usize,

    /// Normalized cron expression (with seconds field)
    pub schedule: String,

    /// SQL query template
    pub query: String,

    /// Incrementing key column; `None` means every run is a full extraction
    pub key_column: Option<String>,

    /// Name of the `[databases.*]` entry to query
    pub database: String,

    /// Name of the `[storages.*]` entry to upload to
    pub storage: String,

    /// Staging folder where artifacts are written before upload
    pub local_folder: PathBuf,

    /// Prefix prepended to the artifact name to form the object key
    pub destination_prefix: String,

    /// Stable file name stem
    pub file_name: String,

    /// Artifact compression
    pub compression: CompressionMode,
}

impl JobDefinition {
    /// Whether runs of this job are incremental
    pub fn is_incremental(&self) -> bool {
        self.key_column.is_some()
    }

    /// Object key for an artifact file name
    pub fn destination_key(&self, artifact_name: &str) -> String {
        format!("{}{}", self.destination_prefix, artifact_name)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn job(key_column: Option<&str>) -> JobDefinition {
        JobDefinition {
            id: JobId::new("orders").unwrap(),
            position: 0,
            schedule: "0 * * * * *".to_string(),
            query: "SELECT * FROM orders".to_string(),
            key_column: key_column.map(str::to_string),
            database: "main".to_string(),
            storage: "archive".to_string(),
            local_folder: PathBuf::from("/tmp"),
            destination_prefix: "exports/orders/".to_string(),
            file_name: "orders".to_string(),
            compression: CompressionMode::None,
        }
    }

    #[test]
    fn test_compression_extension() {
        assert_eq!(CompressionMode::None.extension(), "csv");
        assert_eq!(CompressionMode::Zip.extension(), "zip");
        assert_eq!(CompressionMode::Gzip.extension(), "csv.gz");
    }

    #[test]
    fn test_compression_from_str() {
        assert_eq!(
            CompressionMode::from_str("GZIP").unwrap(),
            CompressionMode::Gzip
        );
        assert!(CompressionMode::from_str("bzip2").is_err());
    }

    #[test]
    fn test_compression_serde() {
        #[derive(Deserialize)]
        struct Wrapper {
            compression: CompressionMode,
        }
        let w: Wrapper = toml::from_str("compression = \"zip\"").unwrap();
        assert_eq!(w.compression, CompressionMode::Zip);
    }

    #[test]
    fn test_is_incremental() {
        assert!(job(Some("id")).is_incremental());
        assert!(!job(None).is_incremental());
    }

    #[test]
    fn test_destination_key() {
        assert_eq!(
            job(None).destination_key("orders.csv"),
            "exports/orders/orders.csv"
        );
    }
}
