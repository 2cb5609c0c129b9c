//! Uploader factory

use super::store::ObjectStoreUploader;
use super::traits::ObjectUploader;
use crate::config::schema::SluiceConfig;
use crate::domain::Result;
use std::collections::HashMap;
use std::sync::Arc;

/// Uploaders keyed by storage reference name
pub type ObjectUploaders = HashMap<String, Arc<dyn ObjectUploader>>;

/// Create the uploader for every configured storage
///
/// # Errors
///
/// Returns a storage error if any backend cannot be built.
pub fn create_uploaders(config: &SluiceConfig) -> Result<ObjectUploaders> {
    let mut uploaders = ObjectUploaders::new();

    for (name, storage) in &config.storages {
        let uploader = ObjectStoreUploader::from_config(storage)?;
        tracing::info!(storage = %name, location = %uploader.describe(), "Created uploader");
        uploaders.insert(name.clone(), Arc::new(uploader) as Arc<dyn ObjectUploader>);
    }

    Ok(uploaders)
}
