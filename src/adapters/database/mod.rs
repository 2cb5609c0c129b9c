//! Database abstraction layer
//!
//! This module provides a trait-based abstraction over SQL sources, so the
//! export pipeline can run against PostgreSQL or MySQL in production and
//! in-memory fakes in tests.

pub mod factory;
pub mod traits;

pub use factory::{create_sql_executor, create_sql_executors, SqlExecutors};
pub use traits::SqlExecutor;
