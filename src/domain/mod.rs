//! Domain models and types for Sluice.
//!
//! # Overview
//!
//! The domain layer provides:
//! - **Strongly-typed identifiers** ([`JobId`])
//! - **Job definitions** ([`JobDefinition`], [`CompressionMode`])
//! - **Query results** ([`RowSet`])
//! - **Error types** ([`SluiceError`], [`StorageError`])
//! - **Result type alias** ([`Result`])
//!
//! # Error Handling
//!
//! All fallible operations return [`Result<T, SluiceError>`]:
//!
//! ```rust
//! use sluice::domain::{Result, SluiceError};
//!
//! fn example(rows: usize) -> Result<usize> {
//!     if rows == 0 {
//!         return Err(SluiceError::Validation("empty export".to_string()));
//!     }
//!     Ok(rows)
//! }
//! ```

pub mod errors;
pub mod ids;
pub mod job;
pub mod result;
pub mod rows;

// Re-export commonly used types for convenience
pub use errors::{RunErrorDetail, SluiceError, StorageError};
pub use ids::JobId;
pub use job::{CompressionMode, JobDefinition};
pub use result::Result;
pub use rows::RowSet;
