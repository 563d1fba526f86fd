#[cfg(feature = "storage-local")]
use crate::LocalStorage;
#[cfg(feature = "storage-s3")]
use crate::{s3::S3Settings, S3Storage};
use crate::{Storage, StorageBackend, StorageError, StorageResult};
use std::sync::Arc;
use tabula_core::models::StorageConfiguration;

/// Create a storage backend from a tenant storage configuration.
pub async fn create_storage(config: &StorageConfiguration) -> StorageResult<Arc<dyn Storage>> {
    match config.backend {
        #[cfg(feature = "storage-s3")]
        StorageBackend::S3 => {
            let bucket = config.bucket.clone().ok_or_else(|| {
                StorageError::ConfigError(format!(
                    "Storage configuration {} has no bucket",
                    config.id
                ))
            })?;
            let region = config.region.clone().ok_or_else(|| {
                StorageError::ConfigError(format!(
                    "Storage configuration {} has no region",
                    config.id
                ))
            })?;

            let storage = S3Storage::new(S3Settings {
                bucket,
                region,
                endpoint_url: config.endpoint.clone(),
                access_key_id: config.access_key_id.clone(),
                secret_access_key: config.secret_access_key.clone(),
                access_mode: config.access_mode,
                public_base_url: config.public_base_url.clone(),
            })
            .await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-s3"))]
        StorageBackend::S3 => Err(StorageError::ConfigError(
            "S3 storage backend not available (storage-s3 feature not enabled)".to_string(),
        )),

        #[cfg(feature = "storage-local")]
        StorageBackend::Local => {
            let root = config.local_root.clone().ok_or_else(|| {
                StorageError::ConfigError(format!(
                    "Storage configuration {} has no local root directory",
                    config.id
                ))
            })?;

            let storage = LocalStorage::new(root, config.public_base_url.clone()).await?;
            Ok(Arc::new(storage))
        }

        #[cfg(not(feature = "storage-local"))]
        StorageBackend::Local => Err(StorageError::ConfigError(
            "Local storage backend not available (storage-local feature not enabled)".to_string(),
        )),
    }
}
