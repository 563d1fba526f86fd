//! In-memory storage doubles for orchestrator and gateway tests.

use async_trait::async_trait;
use bytes::Bytes;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tabula_core::models::StorageConfiguration;

use crate::gateway::StorageResolver;
use crate::traits::{Storage, StorageError, StorageResult};

/// Storage that records every write key and discards the bytes.
#[derive(Clone, Default)]
pub struct RecordingStorage {
    puts: Arc<Mutex<Vec<String>>>,
    failure: Option<String>,
    delay: Option<Duration>,
}

impl RecordingStorage {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every upload fails with `UploadFailed(message)`.
    pub fn failing(message: impl Into<String>) -> Self {
        Self {
            failure: Some(message.into()),
            ..Self::default()
        }
    }

    /// Every upload sleeps for `delay` before writing.
    pub fn slow(delay: Duration) -> Self {
        Self {
            delay: Some(delay),
            ..Self::default()
        }
    }

    /// Number of upload attempts, failed ones included.
    pub fn put_count(&self) -> usize {
        self.puts.lock().map(|p| p.len()).unwrap_or(0)
    }

    pub fn keys(&self) -> Vec<String> {
        self.puts.lock().map(|p| p.clone()).unwrap_or_default()
    }
}

#[async_trait]
impl Storage for RecordingStorage {
    async fn upload_with_key(
        &self,
        storage_key: &str,
        _data: Bytes,
        _content_type: &str,
    ) -> StorageResult<String> {
        if let Ok(mut puts) = self.puts.lock() {
            puts.push(storage_key.to_string());
        }
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
        if let Some(ref message) = self.failure {
            return Err(StorageError::UploadFailed(message.clone()));
        }
        Ok(format!("memory://{}", storage_key))
    }
}

/// Resolver that hands out the same backend for every configuration.
pub struct StaticResolver {
    storage: Arc<dyn Storage>,
}

impl StaticResolver {
    pub fn new(storage: Arc<dyn Storage>) -> Self {
        Self { storage }
    }
}

#[async_trait]
impl StorageResolver for StaticResolver {
    async fn resolve(&self, _config: &StorageConfiguration) -> StorageResult<Arc<dyn Storage>> {
        Ok(self.storage.clone())
    }
}
