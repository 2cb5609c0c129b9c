//! Export pipeline and its building blocks
//!
//! This module provides the core export logic for Sluice, including:
//! - Structured composition of incremental queries
//! - Artifact naming
//! - The per-run export pipeline
//! - Run reports and export summaries

pub mod naming;
pub mod pipeline;
pub mod query;
pub mod summary;

pub use pipeline::{ExportPipeline, PipelineSettings};
pub use query::QueryTemplate;
pub use summary::{ExportSummary, RunOutcome, RunReport};
