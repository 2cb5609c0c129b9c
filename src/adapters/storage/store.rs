//! `object_store` backed uploader
//!
//! One implementation covers Amazon S3, S3-compatible services and a local
//! directory, since all of them implement the same [`ObjectStore`] trait.
//!
//! S3 uploads carry a `Content-Type` matching the artifact extension and
//! request the configured server-side encryption. The local backend stores
//! plain files and takes neither.

use super::traits::ObjectUploader;
use crate::config::schema::{LocalStorageConfig, S3StorageConfig, StorageConfig};
use crate::domain::StorageError;
use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::{AmazonS3Builder, AmazonS3ConfigKey};
use object_store::local::LocalFileSystem;
use object_store::path::Path as ObjectPath;
use object_store::{Attribute, Attributes, ObjectStore, PutOptions, PutPayload};
use secrecy::ExposeSecret;
use std::path::{Path, PathBuf};
use std::sync::Arc;

/// Uploader writing through an [`ObjectStore`]
pub struct ObjectStoreUploader {
    store: Arc<dyn ObjectStore>,
    location: String,
    content_type: bool,
}

impl ObjectStoreUploader {
    /// Wrap an existing store
    pub fn new(store: Arc<dyn ObjectStore>, location: impl Into<String>) -> Self {
        Self {
            store,
            location: location.into(),
            content_type: false,
        }
    }

    /// Send a `Content-Type` attribute with every object
    ///
    /// Only for backends that accept attributes on put.
    pub fn with_content_type(mut self, enabled: bool) -> Self {
        self.content_type = enabled;
        self
    }

    /// Build the store described by a `[storages.<name>]` entry
    ///
    /// # Errors
    ///
    /// Returns [`StorageError::InvalidConfig`] if the backend rejects the
    /// settings or a local base directory cannot be created.
    pub fn from_config(config: &StorageConfig) -> Result<Self, StorageError> {
        Ok(match config {
            StorageConfig::S3(cfg) => {
                Self::new(build_s3(cfg)?, config.describe()).with_content_type(true)
            }
            StorageConfig::Local(cfg) => Self::new(build_local(cfg)?, config.describe()),
        })
    }
}

#[async_trait]
impl ObjectUploader for ObjectStoreUploader {
    async fn upload(&self, local: &Path, key: &str) -> Result<(), StorageError> {
        let data = tokio::fs::read(local)
            .await
            .map_err(|e| StorageError::ArtifactUnreadable {
                path: local.display().to_string(),
                message: e.to_string(),
            })?;

        let location = ObjectPath::parse(key).map_err(|e| {
            StorageError::InvalidConfig(format!("Invalid object key '{key}': {e}"))
        })?;

        let mut attributes = Attributes::new();
        if self.content_type {
            attributes.insert(Attribute::ContentType, content_type(key).into());
        }
        let options = PutOptions {
            attributes,
            ..Default::default()
        };

        self.store
            .put_opts(&location, PutPayload::from(Bytes::from(data)), options)
            .await
            .map_err(|e| StorageError::PutFailed {
                key: key.to_string(),
                message: e.to_string(),
            })?;

        Ok(())
    }

    fn describe(&self) -> String {
        self.location.clone()
    }
}

/// MIME type of an artifact, from its key
pub fn content_type(key: &str) -> &'static str {
    if key.ends_with(".csv") {
        "text/csv"
    } else if key.ends_with(".zip") {
        "application/zip"
    } else if key.ends_with(".gz") {
        "application/gzip"
    } else {
        "application/octet-stream"
    }
}

fn build_s3(cfg: &S3StorageConfig) -> Result<Arc<dyn ObjectStore>, StorageError> {
    let store = s3_builder(cfg)
        .build()
        .map_err(|e| StorageError::InvalidConfig(format!("S3: {e}")))?;
    Ok(Arc::new(store))
}

/// `object_store` 0.11 does not re-export its `S3EncryptionConfigKey`, so the
/// encryption keys are resolved through `AmazonS3ConfigKey`'s string form.
#[derive(Clone, Copy, Debug)]
enum S3EncryptionConfigKey {
    ServerSideEncryption,
    KmsKeyId,
}

impl S3EncryptionConfigKey {
    fn config_key(self) -> AmazonS3ConfigKey {
        let name = match self {
            Self::ServerSideEncryption => "aws_server_side_encryption",
            Self::KmsKeyId => "aws_sse_kms_key_id",
        };
        name.parse().expect("object_store recognises S3 encryption config keys")
    }
}

fn s3_builder(cfg: &S3StorageConfig) -> AmazonS3Builder {
    let mut builder = AmazonS3Builder::from_env()
        .with_bucket_name(&cfg.bucket)
        .with_region(&cfg.region);

    // S3-compatible endpoints such as MinIO need path-style requests
    if let Some(endpoint) = &cfg.endpoint {
        builder = builder
            .with_endpoint(endpoint)
            .with_virtual_hosted_style_request(false);
    }
    if cfg.allow_http {
        builder = builder.with_allow_http(true);
    }

    if let Some(ak) = &cfg.access_key_id {
        builder = builder.with_access_key_id(ak);
    }
    if let Some(sk) = &cfg.secret_access_key {
        let sk: &str = sk.expose_secret().as_ref();
        builder = builder.with_secret_access_key(sk);
    }
    if let Some(token) = &cfg.session_token {
        let token: &str = token.expose_secret().as_ref();
        builder = builder.with_token(token);
    }

    if cfg.server_side_encryption != "none" {
        builder = builder.with_config(
            S3EncryptionConfigKey::ServerSideEncryption.config_key(),
            &cfg.server_side_encryption,
        );
    }
    if let Some(key_id) = &cfg.kms_key_id {
        builder = builder.with_config(
            S3EncryptionConfigKey::KmsKeyId.config_key(),
            key_id,
        );
    }

    builder
}

fn build_local(cfg: &LocalStorageConfig) -> Result<Arc<dyn ObjectStore>, StorageError> {
    let path = PathBuf::from(cfg.base_directory.trim());

    // LocalFileSystem::new_with_prefix requires an absolute path that exists
    std::fs::create_dir_all(&path).map_err(|e| {
        StorageError::InvalidConfig(format!(
            "Failed to create storage directory '{}': {e}",
            path.display()
        ))
    })?;
    let absolute_path = path.canonicalize().map_err(|e| {
        StorageError::InvalidConfig(format!(
            "Failed to resolve absolute path for '{}': {e}",
            path.display()
        ))
    })?;

    LocalFileSystem::new_with_prefix(absolute_path)
        .map(|fs| Arc::new(fs) as Arc<dyn ObjectStore>)
        .map_err(|e| StorageError::InvalidConfig(format!("LocalFileSystem: {e}")))
}
