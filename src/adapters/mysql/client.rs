//! MySQL client implementation

use crate::config::schema::DatabaseConfig;
use crate::domain::{Result, RowSet, SluiceError};
use secrecy::ExposeSecret;
use sqlx::mysql::{MySqlConnectOptions, MySqlPool, MySqlPoolOptions, MySqlRow, MySqlSslMode};
use sqlx::{Column, Executor, Row};
use std::str::FromStr;
use std::time::Duration;

/// MySQL client for Sluice
///
/// Holds a connection pool for one `[databases.<name>]` entry. Statements go
/// over the text protocol, so every column can be read back as a string.
pub struct MySqlClient {
    pool: MySqlPool,
    config: DatabaseConfig,
}

impl MySqlClient {
    /// Create a new MySQL client
    ///
    /// The pool connects lazily on first use. Every new connection sets
    /// `max_execution_time` from `statement_timeout_seconds`.
    ///
    /// # Errors
    ///
    /// Returns a configuration error if the connection string cannot be
    /// parsed.
    pub fn new(config: DatabaseConfig) -> Result<Self> {
        let url: &str = config.connection_string.expose_secret().as_ref();
        let options = MySqlConnectOptions::from_str(url)
            .map_err(|e| SluiceError::Configuration(format!("Invalid MySQL connection string: {e}")))?
            .ssl_mode(match config.ssl_mode.as_str() {
                "disable" => MySqlSslMode::Disabled,
                "require" => MySqlSslMode::Required,
                _ => MySqlSslMode::Preferred,
            });

        let timeout_ms = config.statement_timeout_seconds * 1000;
        let pool = MySqlPoolOptions::new()
            .max_connections(u32::try_from(config.max_connections).unwrap_or(u32::MAX))
            .acquire_timeout(Duration::from_secs(config.connection_timeout_seconds))
            .after_connect(move |conn, _meta| {
                Box::pin(async move {
                    let statement = format!("SET SESSION max_execution_time = {timeout_ms}");
                    conn.execute(statement.as_str()).await?;
                    Ok(())
                })
            })
            .connect_lazy_with(options);

        Ok(Self { pool, config })
    }

    /// Run one statement and collect its rows as text
    ///
    /// # Errors
    ///
    /// Returns a connection error if the server cannot be reached, a query
    /// error if the statement fails, or a serialization error if a cell is
    /// not valid UTF-8.
    pub async fn query_text(&self, query: &str) -> Result<RowSet> {
        let rows: Vec<MySqlRow> = sqlx::raw_sql(query)
            .fetch_all(&self.pool)
            .await
            .map_err(|e| map_sqlx_error(&self.connection_string_safe(), e))?;

        let mut set = RowSet::default();
        if let Some(first) = rows.first() {
            set.columns = first
                .columns()
                .iter()
                .map(|c| c.name().to_string())
                .collect();
        }

        for row in &rows {
            let cells = (0..row.len())
                .map(|i| {
                    row.try_get_unchecked::<Option<String>, _>(i).map_err(|e| {
                        SluiceError::Serialization(format!(
                            "Column '{}' is not text: {e}",
                            set.columns.get(i).map_or("?", String::as_str)
                        ))
                    })
                })
                .collect::<Result<Vec<_>>>()?;
            set.push(cells);
        }

        Ok(set)
    }

    /// Get the connection string (without credentials)
    pub fn connection_string_safe(&self) -> String {
        self.config.connection_string.expose_secret().redacted_url()
    }

    /// Number of open connections
    pub fn pool_size(&self) -> u32 {
        self.pool.size()
    }
}

fn map_sqlx_error(target: &str, e: sqlx::Error) -> SluiceError {
    match e {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed => {
            SluiceError::Connection(format!("Failed to reach {target}: {e}"))
        }
        other => SluiceError::Query(format!("Query failed on {target}: {other}")),
    }
}
