//! MySQL source integration
//!
//! Databases configured with `kind = "mysql"` (legacy `dbtype`) are read
//! through a lazily connecting `sqlx` pool.

pub mod adapter;
pub mod client;

pub use adapter::MySqlExecutor;
pub use client::MySqlClient;
