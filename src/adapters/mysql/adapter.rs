//! MySQL adapter implementing the SQL executor trait

use crate::adapters::database::traits::SqlExecutor;
use crate::adapters::mysql::client::MySqlClient;
use crate::domain::{Result, RowSet};
use async_trait::async_trait;

/// MySQL implementation of [`SqlExecutor`]
pub struct MySqlExecutor {
    client: MySqlClient,
}

impl MySqlExecutor {
    /// Create a new MySQL executor
    pub fn new(client: MySqlClient) -> Self {
        Self { client }
    }
}

#[async_trait]
impl SqlExecutor for MySqlExecutor {
    async fn execute(&self, query: &str) -> Result<RowSet> {
        tracing::debug!(target_db = %self.describe(), query = %query, "Executing query");
        self.client.query_text(query).await
    }

    fn describe(&self) -> String {
        self.client.connection_string_safe()
    }
}
