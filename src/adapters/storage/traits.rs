//! Object storage abstraction

use crate::domain::StorageError;
use async_trait::async_trait;
use std::path::Path;

/// Uploads finished artifacts to one configured storage
#[async_trait]
pub trait ObjectUploader: Send + Sync {
    /// Upload the file at `local` under object key `key`, replacing any
    /// existing object
    ///
    /// # Errors
    ///
    /// Returns a storage error if the file cannot be read or the PUT fails.
    async fn upload(&self, local: &Path, key: &str) -> Result<(), StorageError>;

    /// Destination description for logs
    fn describe(&self) -> String;
}
