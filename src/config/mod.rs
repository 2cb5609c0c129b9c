//! Configuration management for Sluice.
//!
//! # Overview
//!
//! Sluice uses a TOML configuration file with support for:
//! - Environment variable substitution (`${VAR_NAME}`)
//! - `SLUICE_*` environment overrides
//! - Default values for optional settings
//! - Validation of every exporter before anything is scheduled
//!
//! # Example Configuration
//!
//! ```toml
//! [application]
//! log_level = "info"
//! watermark_file = "watermarks.txt"
//!
//! [databases.shop]
//! connection_string = "${SHOP_DATABASE_URL}"
//!
//! [storages.archive]
//! kind = "s3"
//! bucket = "shop-exports"
//! region = "eu-west-1"
//!
//! [[exporters]]
//! name = "orders"
//! schedule = "0 */15 * * * *"
//! query = "SELECT * FROM orders WHERE status = 'paid'"
//! key_column = "id"
//! database = "shop"
//! storage = "archive"
//! destination_prefix = "orders/"
//! file_name = "orders"
//! compression = "gzip"
//! ```
//!
//! # Loading
//!
//! ```rust,no_run
//! use sluice::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("sluice.toml")?;
//! for job in config.job_definitions()? {
//!     println!("{} runs on '{}'", job.id, job.schedule);
//! }
//! # Ok(())
//! # }
//! ```

pub mod loader;
pub mod schema;
pub mod secret;

// Re-export commonly used types
pub use loader::{load_config, parse_config};
pub use schema::{
    ApplicationConfig, DatabaseConfig, DatabaseKind, ExportConfig, ExporterConfig,
    FirstRunNaming, LocalStorageConfig, LoggingConfig, OverlapPolicy, RetryConfig,
    S3StorageConfig, ScheduleTimezone, SchedulerConfig, SluiceConfig, StorageConfig,
};
pub use secret::{secret_string, secret_string_opt, SecretString, SecretValue};
