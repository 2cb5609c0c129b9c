//! Artifact writer trait

use crate::domain::{CompressionMode, Result, RowSet};
use async_trait::async_trait;
use std::path::{Path, PathBuf};

/// A file written to the staging folder, ready for upload
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Artifact {
    /// File name, including extension
    pub name: String,

    /// Full local path
    pub path: PathBuf,

    /// Data rows written (header excluded)
    pub rows: usize,

    /// Size on disk in bytes
    pub bytes: u64,
}

/// Serializes a row set into a local file
#[async_trait]
pub trait ArtifactWriter: Send + Sync {
    /// Write `rows` to `<dir>/<stem>.<ext>`, where the extension follows
    /// the compression mode
    ///
    /// # Errors
    ///
    /// Returns a serialization error if the file cannot be written.
    async fn write(
        &self,
        rows: RowSet,
        dir: &Path,
        stem: &str,
        compression: CompressionMode,
    ) -> Result<Artifact>;
}
