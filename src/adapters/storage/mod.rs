//! Object storage upload
//!
//! Artifacts are uploaded through the [`ObjectUploader`] trait. The
//! production implementation is built on `object_store`; retries and
//! per-attempt timeouts are layered on top by [`upload_with_retry`].

pub mod factory;
pub mod retry;
pub mod store;
pub mod traits;

pub use factory::{create_uploaders, ObjectUploaders};
pub use retry::{backoff_delay, upload_with_retry};
pub use store::ObjectStoreUploader;
pub use traits::ObjectUploader;
