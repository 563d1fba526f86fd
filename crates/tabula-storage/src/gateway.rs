//! Storage gateway used by the upload orchestrator.
//!
//! The gateway renders the storage key from the configuration's path template, resolves the
//! backend through a `StorageResolver`, and writes the bytes exactly once per call.

use async_trait::async_trait;
use bytes::Bytes;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use std::sync::Arc;
use tabula_core::models::StorageConfiguration;
use tokio::sync::RwLock;
use uuid::Uuid;

use crate::factory::create_storage;
use crate::keys::{render_key, KeyParams};
use crate::traits::{Storage, StorageResult};

/// Who is storing what.
#[derive(Debug, Clone)]
pub struct StoreContext {
    pub organization_id: Uuid,
    pub user_id: Uuid,
    /// Without the dot
    pub extension: String,
    pub content_type: String,
}

/// Location of a stored file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct StoredObject {
    /// Storage key, relative to the backend root
    pub path: String,
    pub url: String,
}

/// Maps a storage configuration to a live backend.
#[async_trait]
pub trait StorageResolver: Send + Sync {
    async fn resolve(&self, config: &StorageConfiguration) -> StorageResult<Arc<dyn Storage>>;
}

/// Resolver backed by `create_storage`, caching one backend per configuration revision.
#[derive(Default)]
pub struct FactoryResolver {
    cache: RwLock<HashMap<Uuid, (DateTime<Utc>, Arc<dyn Storage>)>>,
}

impl FactoryResolver {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl StorageResolver for FactoryResolver {
    async fn resolve(&self, config: &StorageConfiguration) -> StorageResult<Arc<dyn Storage>> {
        if let Some((revision, storage)) = self.cache.read().await.get(&config.id) {
            if *revision == config.updated_at {
                return Ok(storage.clone());
            }
        }

        let storage = create_storage(config).await?;
        self.cache
            .write()
            .await
            .insert(config.id, (config.updated_at, storage.clone()));

        tracing::debug!(
            storage_configuration_id = %config.id,
            backend = %config.backend,
            "Storage backend initialized"
        );

        Ok(storage)
    }
}

#[derive(Clone)]
pub struct StorageGateway {
    resolver: Arc<dyn StorageResolver>,
}

impl StorageGateway {
    pub fn new(resolver: Arc<dyn StorageResolver>) -> Self {
        Self { resolver }
    }

    /// Gateway that builds backends from configuration on demand.
    pub fn from_factory() -> Self {
        Self::new(Arc::new(FactoryResolver::new()))
    }

    /// Persist `data` under a freshly rendered key. No content-based deduplication.
    #[tracing::instrument(
        skip(self, config, data),
        fields(storage_configuration_id = %config.id, size_bytes = data.len())
    )]
    pub async fn store(
        &self,
        config: &StorageConfiguration,
        data: Bytes,
        ctx: &StoreContext,
    ) -> StorageResult<StoredObject> {
        let key = render_key(
            &config.path_template,
            &KeyParams {
                base_path: &config.base_path,
                organization_id: ctx.organization_id,
                user_id: ctx.user_id,
                extension: &ctx.extension,
                uuid: Uuid::new_v4(),
                date: Utc::now(),
            },
        )?;

        let storage = self.resolver.resolve(config).await?;
        let url = storage
            .upload_with_key(&key, data, &ctx.content_type)
            .await?;

        Ok(StoredObject { path: key, url })
    }
}
