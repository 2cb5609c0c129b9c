//! PostgreSQL source integration
//!
//! This module provides the pooled PostgreSQL client that export queries are
//! run against.

pub mod adapter;
pub mod client;

pub use adapter::PostgreSQLExecutor;
pub use client::PostgreSQLClient;
