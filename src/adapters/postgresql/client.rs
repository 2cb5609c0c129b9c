//! PostgreSQL client implementation
//!
//! This module provides the pooled client used to run export queries.

use crate::config::schema::DatabaseConfig;
use crate::domain::{Result, RowSet, SluiceError};
use deadpool_postgres::{Manager, ManagerConfig, Pool, RecyclingMethod, Runtime};
use postgres_native_tls::MakeTlsConnector;
use secrecy::ExposeSecret;
use std::time::Duration;
use tokio_postgres::config::SslMode;
use tokio_postgres::{NoTls, SimpleQueryMessage};

/// PostgreSQL client for Sluice
///
/// Holds a connection pool for one `[databases.<name>]` entry. Queries are
/// sent over the simple query protocol, so every column arrives as text no
/// matter its SQL type.
pub struct PostgreSQLClient {
    /// Connection pool
    pool: Pool,

    /// Configuration
    config: DatabaseConfig,
}

impl PostgreSQLClient {
    /// Create a new PostgreSQL client
    ///
    /// The pool connects lazily on first use.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the connection string cannot be
    /// parsed or the TLS connector or pool cannot be built.
    pub fn new(config: DatabaseConfig) -> Result<Self> {
        let mut pg_config: tokio_postgres::Config = config
            .connection_string
            .expose_secret()
            .parse()
            .map_err(|e| {
                SluiceError::Configuration(format!("Invalid PostgreSQL connection string: {e}"))
            })?;

        let timeout = Duration::from_secs(config.connection_timeout_seconds);
        pg_config.connect_timeout(timeout);
        pg_config.ssl_mode(match config.ssl_mode.as_str() {
            "disable" => SslMode::Disable,
            "require" => SslMode::Require,
            _ => SslMode::Prefer,
        });

        let manager_config = ManagerConfig {
            recycling_method: RecyclingMethod::Fast,
        };

        let manager = if config.ssl_mode == "disable" {
            Manager::from_config(pg_config, NoTls, manager_config)
        } else {
            let connector = native_tls::TlsConnector::builder().build().map_err(|e| {
                SluiceError::Configuration(format!("Failed to build TLS connector: {e}"))
            })?;
            Manager::from_config(pg_config, MakeTlsConnector::new(connector), manager_config)
        };

        let pool = Pool::builder(manager)
            .max_size(config.max_connections)
            .runtime(Runtime::Tokio1)
            .wait_timeout(Some(timeout))
            .create_timeout(Some(timeout))
            .recycle_timeout(Some(timeout))
            .build()
            .map_err(|e| {
                SluiceError::Configuration(format!("Failed to create connection pool: {e}"))
            })?;

        Ok(Self { pool, config })
    }

    /// Get a connection from the pool
    ///
    /// # Errors
    ///
    /// Returns a connection error if a connection cannot be obtained.
    pub async fn get_connection(&self) -> Result<deadpool_postgres::Object> {
        self.pool.get().await.map_err(|e| {
            SluiceError::Connection(format!(
                "Failed to get connection to {}: {e}",
                self.connection_string_safe()
            ))
        })
    }

    /// Run one statement and collect its rows as text
    ///
    /// The server-side statement timeout is applied first, on the same
    /// connection.
    ///
    /// # Errors
    ///
    /// Returns a connection error if the connection is lost, or a query error
    /// if the statement fails.
    pub async fn query_text(&self, query: &str) -> Result<RowSet> {
        let client = self.get_connection().await?;

        let timeout_query = format!(
            "SET statement_timeout = {}",
            self.config.statement_timeout_seconds * 1000
        );
        client
            .batch_execute(&timeout_query)
            .await
            .map_err(|e| map_pg_error("Failed to set statement timeout", e))?;

        let messages = client
            .simple_query(query)
            .await
            .map_err(|e| map_pg_error("Query failed", e))?;

        let mut rows = RowSet::default();
        for message in messages {
            match message {
                SimpleQueryMessage::RowDescription(columns) => {
                    if rows.columns.is_empty() {
                        rows.columns = columns.iter().map(|c| c.name().to_string()).collect();
                    }
                }
                SimpleQueryMessage::Row(row) => {
                    if rows.columns.is_empty() {
                        rows.columns = row.columns().iter().map(|c| c.name().to_string()).collect();
                    }
                    rows.push((0..row.len()).map(|i| row.get(i).map(str::to_string)).collect());
                }
                _ => {}
            }
        }

        Ok(rows)
    }

    /// Get the connection string (without credentials)
    pub fn connection_string_safe(&self) -> String {
        self.config.connection_string.expose_secret().redacted_url()
    }

    /// Get the pool statistics
    pub fn pool_status(&self) -> deadpool_postgres::Status {
        self.pool.status()
    }
}

fn map_pg_error(context: &str, e: tokio_postgres::Error) -> SluiceError {
    if e.is_closed() {
        SluiceError::Connection(format!("{context}: {e}"))
    } else {
        SluiceError::Query(format!("{context}: {e}"))
    }
}
