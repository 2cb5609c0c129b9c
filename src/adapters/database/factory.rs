//! SQL executor factory
//!
//! Builds one executor per `[databases.<name>]` entry. Pools connect lazily,
//! so an unreachable database only fails the jobs that use it.

use crate::adapters::database::traits::SqlExecutor;
use crate::adapters::mysql::{MySqlClient, MySqlExecutor};
use crate::adapters::postgresql::adapter::PostgreSQLExecutor;
use crate::adapters::postgresql::client::PostgreSQLClient;
use crate::config::schema::{DatabaseConfig, DatabaseKind, SluiceConfig};
use crate::domain::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// Executors keyed by database reference name
pub type SqlExecutors = HashMap<String, Arc<dyn SqlExecutor>>;

/// Create the executor for every configured database
///
/// # Errors
///
/// Returns an error if a connection string cannot be parsed or a pool
/// cannot be built.
pub fn create_sql_executors(config: &SluiceConfig) -> Result<SqlExecutors> {
    let mut executors = SqlExecutors::new();

    for (name, database) in &config.databases {
        let executor = create_sql_executor(database)?;
        tracing::info!(
            database = %name,
            kind = database.kind.as_str(),
            target = %executor.describe(),
            "Created connection pool"
        );
        executors.insert(name.clone(), executor);
    }

    Ok(executors)
}

/// Create the executor for one database entry, by its kind
///
/// # Errors
///
/// Returns a configuration error if the connection string cannot be parsed.
pub fn create_sql_executor(database: &DatabaseConfig) -> Result<Arc<dyn SqlExecutor>> {
    Ok(match database.kind {
        DatabaseKind::Postgresql => {
            Arc::new(PostgreSQLExecutor::new(PostgreSQLClient::new(database.clone())?))
        }
        DatabaseKind::Mysql => Arc::new(MySqlExecutor::new(MySqlClient::new(database.clone())?)),
    })
}
