//! Database abstraction traits
//!
//! This module defines the trait that SQL source adapters must implement to
//! feed the export pipeline.

use crate::domain::{Result, RowSet};
use async_trait::async_trait;

/// Executes SQL against one configured source database
///
/// Rows come back as text cells. Implementations must be cheap to share
/// between concurrently running jobs.
#[async_trait]
pub trait SqlExecutor: Send + Sync {
    /// Execute a single statement and return every row it produced
    ///
    /// # Errors
    ///
    /// Returns a connection error if no connection could be obtained, or a
    /// query error if the statement failed.
    async fn execute(&self, query: &str) -> Result<RowSet>;

    /// Test the database connection
    ///
    /// # Errors
    ///
    /// Returns an error if the connection test fails.
    async fn test_connection(&self) -> Result<()> {
        self.execute("SELECT 1").await.map(|_| ())
    }

    /// Source description safe for logs (credentials redacted)
    fn describe(&self) -> String;
}
