use crate::traits::{Storage, StorageError, StorageResult};
use async_trait::async_trait;
use bytes::Bytes;
use object_store::aws::{AmazonS3, AmazonS3Builder};
use object_store::path::Path;
use object_store::{ObjectStoreExt, PutPayload, Result as ObjectResult};
use tabula_core::models::AccessMode;

/// Connection settings for an S3 or S3-compatible bucket.
#[derive(Clone, Default)]
pub struct S3Settings {
    pub bucket: String,
    pub region: String,
    /// Custom endpoint for S3-compatible providers (MinIO, DigitalOcean Spaces, ...)
    pub endpoint_url: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub access_mode: AccessMode,
    /// Overrides the derived public URL for `public_read` objects (e.g. a CDN)
    pub public_base_url: Option<String>,
}

/// S3 storage implementation
#[derive(Clone)]
pub struct S3Storage {
    store: AmazonS3,
    bucket: String,
    region: String,
    endpoint_url: Option<String>,
    access_mode: AccessMode,
    public_base_url: Option<String>,
}

impl S3Storage {
    /// Create a new S3Storage instance.
    ///
    /// Explicit credentials take precedence over `AWS_*` environment variables.
    pub async fn new(settings: S3Settings) -> StorageResult<Self> {
        let S3Settings {
            bucket,
            region,
            endpoint_url,
            access_key_id,
            secret_access_key,
            access_mode,
            public_base_url,
        } = settings;

        let mut builder = AmazonS3Builder::from_env()
            .with_region(region.clone())
            .with_bucket_name(bucket.clone());

        if let Some(ref endpoint) = endpoint_url {
            let allow_http = endpoint.starts_with("http://");
            builder = builder
                .with_endpoint(endpoint.clone())
                .with_allow_http(allow_http);
        }

        match (access_key_id, secret_access_key) {
            (Some(key_id), Some(secret)) => {
                builder = builder
                    .with_access_key_id(key_id)
                    .with_secret_access_key(secret);
            }
            (None, None) => {}
            _ => {
                return Err(StorageError::ConfigError(
                    "access_key_id and secret_access_key must be set together".to_string(),
                ))
            }
        }

        let store = builder
            .build()
            .map_err(|e| StorageError::ConfigError(e.to_string()))?;

        Ok(S3Storage {
            store,
            bucket,
            region,
            endpoint_url,
            access_mode,
            public_base_url,
        })
    }

    /// Address of a stored object.
    ///
    /// Private objects are addressed by their `s3://bucket/key` URI. Public objects get an
    /// HTTP URL: the configured public base URL, else path-style on the custom endpoint, else
    /// the AWS virtual-hosted form `https://{bucket}.s3.{region}.amazonaws.com/{key}`.
    fn generate_url(&self, key: &str) -> String {
        match self.access_mode {
            AccessMode::Private => format!("s3://{}/{}", self.bucket, key),
            AccessMode::PublicRead => {
                if let Some(ref base) = self.public_base_url {
                    format!("{}/{}", base.trim_end_matches('/'), key)
                } else if let Some(ref endpoint) = self.endpoint_url {
                    format!("{}/{}/{}", endpoint.trim_end_matches('/'), self.bucket, key)
                } else {
                    format!(
                        "https://{}.s3.{}.amazonaws.com/{}",
                        self.bucket, self.region, key
                    )
                }
            }
        }
    }
}

#[async_trait]
impl Storage for S3Storage {
    async fn upload_with_key(
        &self,
        storage_key: &str,
        data: Bytes,
        _content_type: &str,
    ) -> StorageResult<String> {
        if storage_key.contains("..") || storage_key.starts_with('/') {
            return Err(StorageError::InvalidKey(
                "Storage key contains invalid characters".to_string(),
            ));
        }

        let size = data.len() as u64;
        let location = Path::from(storage_key.to_string());
        let start = std::time::Instant::now();

        let result: ObjectResult<_> = self.store.put(&location, PutPayload::from(data)).await;

        result.map_err(|e| {
            tracing::error!(
                error = %e,
                bucket = %self.bucket,
                key = %storage_key,
                size_bytes = size,
                duration_ms = start.elapsed().as_secs_f64() * 1000.0,
                "S3 upload failed"
            );
            StorageError::UploadFailed(e.to_string())
        })?;

        let url = self.generate_url(storage_key);

        tracing::info!(
            bucket = %self.bucket,
            key = %storage_key,
            size_bytes = size,
            duration_ms = start.elapsed().as_secs_f64() * 1000.0,
            "S3 upload successful"
        );

        Ok(url)
    }
}
