//! Export artifact serialization
//!
//! Turns query results into the files that get uploaded: CSV, optionally
//! zipped or gzipped.

pub mod csv_writer;
pub mod traits;

pub use csv_writer::CsvArtifactWriter;
pub use traits::{Artifact, ArtifactWriter};
