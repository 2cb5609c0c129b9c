//! CSV artifact writer with optional zip or gzip compression
//!
//! Rows are written with a header line; SQL NULL becomes an empty field.
//! A zip artifact holds a single deflated entry named `<stem>.csv`.

use super::traits::{Artifact, ArtifactWriter};
use crate::domain::{CompressionMode, Result, RowSet, SluiceError};
use async_trait::async_trait;
use flate2::write::GzEncoder;
use flate2::Compression;
use std::fs::{self, File};
use std::io::{BufWriter, Write};
use std::path::Path;
use zip::write::FileOptions;
use zip::ZipWriter;

/// Writes CSV files, blocking work runs on the blocking thread pool
#[derive(Debug, Clone, Copy, Default)]
pub struct CsvArtifactWriter;

impl CsvArtifactWriter {
    /// Create a new writer
    pub fn new() -> Self {
        Self
    }
}

#[async_trait]
impl ArtifactWriter for CsvArtifactWriter {
    async fn write(
        &self,
        rows: RowSet,
        dir: &Path,
        stem: &str,
        compression: CompressionMode,
    ) -> Result<Artifact> {
        let name = format!("{stem}.{}", compression.extension());
        let path = dir.join(&name);
        let dir = dir.to_path_buf();
        let entry_name = format!("{stem}.csv");

        tokio::task::spawn_blocking(move || {
            fs::create_dir_all(&dir).map_err(|e| {
                SluiceError::Serialization(format!(
                    "Failed to create staging folder {}: {e}",
                    dir.display()
                ))
            })?;
            write_blocking(&rows, &path, &entry_name, compression)?;

            let bytes = fs::metadata(&path)?.len();
            Ok(Artifact {
                name,
                path,
                rows: rows.len(),
                bytes,
            })
        })
        .await
        .map_err(|e| SluiceError::Serialization(format!("Artifact writer panicked: {e}")))?
    }
}

fn write_blocking(
    rows: &RowSet,
    path: &Path,
    entry_name: &str,
    compression: CompressionMode,
) -> Result<()> {
    let file = File::create(path).map_err(|e| {
        SluiceError::Serialization(format!("Failed to create {}: {e}", path.display()))
    })?;

    match compression {
        CompressionMode::None => {
            let mut out = write_csv(rows, BufWriter::new(file))?;
            out.flush()?;
        }
        CompressionMode::Gzip => {
            let encoder = GzEncoder::new(BufWriter::new(file), Compression::default());
            let mut out = write_csv(rows, encoder)?.finish()?;
            out.flush()?;
        }
        CompressionMode::Zip => {
            let mut zip = ZipWriter::new(file);
            let options =
                FileOptions::default().compression_method(zip::CompressionMethod::Deflated);
            zip.start_file(entry_name, options)?;
            let mut zip = write_csv(rows, zip)?;
            zip.finish()?;
        }
    }

    Ok(())
}

/// Write header and rows, returning the underlying writer
fn write_csv<W: Write>(rows: &RowSet, out: W) -> Result<W> {
    let mut wtr = csv::WriterBuilder::new().from_writer(out);

    if !rows.columns.is_empty() {
        wtr.write_record(&rows.columns)?;
    }
    for row in &rows.rows {
        wtr.write_record(row.iter().map(|cell| cell.as_deref().unwrap_or("")))?;
    }
    wtr.flush()?;

    wtr.into_inner()
        .map_err(|e| SluiceError::Serialization(format!("CSV flush failed: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;
    use flate2::read::GzDecoder;
    use std::io::Read;
    use tempfile::TempDir;

    fn sample() -> RowSet {
        let mut rows = RowSet::new(vec!["id".to_string(), "note".to_string()]);
        rows.push(vec![Some("1".to_string()), Some("hello, world".to_string())]);
        rows.push(vec![Some("2".to_string()), None]);
        rows
    }

    #[tokio::test]
    async fn test_plain_csv() {
        let dir = TempDir::new().unwrap();
        let artifact = CsvArtifactWriter::new()
            .write(sample(), dir.path(), "orders", CompressionMode::None)
            .await
            .unwrap();

        assert_eq!(artifact.name, "orders.csv");
        assert_eq!(artifact.rows, 2);
        let text = fs::read_to_string(&artifact.path).unwrap();
        assert_eq!(text, "id,note\n1,\"hello, world\"\n2,\n");
        assert_eq!(artifact.bytes, text.len() as u64);
    }

    #[tokio::test]
    async fn test_gzip_csv() {
        let dir = TempDir::new().unwrap();
        let artifact = CsvArtifactWriter::new()
            .write(sample(), dir.path(), "orders", CompressionMode::Gzip)
            .await
            .unwrap();

        assert_eq!(artifact.name, "orders.csv.gz");
        let mut text = String::new();
        GzDecoder::new(File::open(&artifact.path).unwrap())
            .read_to_string(&mut text)
            .unwrap();
        assert!(text.starts_with("id,note\n1,"));
    }

    #[tokio::test]
    async fn test_zip_holds_single_csv_entry() {
        let dir = TempDir::new().unwrap();
        let artifact = CsvArtifactWriter::new()
            .write(sample(), dir.path(), "orders_20262401_101500", CompressionMode::Zip)
            .await
            .unwrap();

        assert_eq!(artifact.name, "orders_20262401_101500.zip");
        let mut archive = zip::ZipArchive::new(File::open(&artifact.path).unwrap()).unwrap();
        assert_eq!(archive.len(), 1);
        let mut entry = archive.by_index(0).unwrap();
        assert_eq!(entry.name(), "orders_20262401_101500.csv");
        let mut text = String::new();
        entry.read_to_string(&mut text).unwrap();
        assert!(text.ends_with("2,\n"));
    }

    #[tokio::test]
    async fn test_empty_rowset_writes_header_only() {
        let dir = TempDir::new().unwrap();
        let rows = RowSet::new(vec!["id".to_string()]);
        let artifact = CsvArtifactWriter::new()
            .write(rows, &dir.path().join("nested"), "empty", CompressionMode::None)
            .await
            .unwrap();

        assert_eq!(artifact.rows, 0);
        assert_eq!(fs::read_to_string(&artifact.path).unwrap(), "id\n");
    }
}
