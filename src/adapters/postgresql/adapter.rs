//! PostgreSQL adapter implementing the SQL executor trait

use crate::adapters::database::traits::SqlExecutor;
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::domain::{Result, RowSet};
use async_trait::async_trait;
use std::sync::Arc;

/// PostgreSQL implementation of [`SqlExecutor`]
///
/// This wraps the PostgreSQLClient so it can be shared by every job reading
/// from the same database.
pub struct PostgreSQLExecutor {
    client: Arc<PostgreSQLClient>,
}

impl PostgreSQLExecutor {
    /// Create a new PostgreSQL executor
    pub fn new(client: PostgreSQLClient) -> Self {
        Self {
            client: Arc::new(client),
        }
    }

    /// Get a reference to the underlying client
    pub fn client(&self) -> &Arc<PostgreSQLClient> {
        &self.client
    }
}

#[async_trait]
impl SqlExecutor for PostgreSQLExecutor {
    async fn execute(&self, query: &str) -> Result<RowSet> {
        tracing::debug!(target_db = %self.describe(), query = %query, "Executing query");
        self.client.query_text(query).await
    }

    fn describe(&self) -> String {
        self.client.connection_string_safe()
    }
}
