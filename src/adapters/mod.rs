//! External system integrations for Sluice.
//!
//! This module provides adapters for the systems an export touches:
//!
//! - [`database`] - SQL source abstraction (trait-based)
//! - [`postgresql`] - PostgreSQL implementation
//! - [`mysql`] - MySQL implementation
//! - [`artifact`] - CSV/zip/gzip artifact writer
//! - [`storage`] - Object storage upload (S3, S3-compatible, local directory)
//!
//! # Design Pattern
//!
//! Adapters follow the **Adapter Pattern** to isolate external dependencies and
//! enable testing with in-memory implementations. The export pipeline only sees
//! the [`database::SqlExecutor`], [`artifact::ArtifactWriter`] and
//! [`storage::ObjectUploader`] traits.
//!
//! # Building the collaborators
//!
//! ```rust,no_run
//! use sluice::adapters::database::create_sql_executors;
//! use sluice::adapters::storage::create_uploaders;
//! use sluice::config::load_config;
//!
//! # fn example() -> Result<(), Box<dyn std::error::Error>> {
//! let config = load_config("sluice.toml")?;
//! let executors = create_sql_executors(&config)?;
//! let uploaders = create_uploaders(&config)?;
//! println!("{} databases, {} storages", executors.len(), uploaders.len());
//! # Ok(())
//! # }
//! ```

pub mod artifact;
pub mod database;
pub mod mysql;
pub mod postgresql;
pub mod storage;
