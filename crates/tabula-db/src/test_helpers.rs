//! In-memory store implementations for testing
//!
//! These allow exercising the upload pipeline without a database.

use async_trait::async_trait;
use chrono::Utc;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;
use tabula_core::models::{
    ColumnRule, NewUploadOperation, StorageConfiguration, UploadConfiguration, UploadOperation,
};
use tabula_core::AppError;
use uuid::Uuid;

use crate::traits::{ConfigurationStore, OperationLedger};

fn poisoned() -> AppError {
    AppError::Internal("in-memory store lock poisoned".to_string())
}

/// In-memory configuration store
#[derive(Clone, Default)]
pub struct InMemoryConfigurationStore {
    configurations: Arc<Mutex<HashMap<Uuid, UploadConfiguration>>>,
    columns: Arc<Mutex<HashMap<Uuid, Vec<ColumnRule>>>>,
    storage: Arc<Mutex<HashMap<Uuid, StorageConfiguration>>>,
    delay: Option<Duration>,
}

impl InMemoryConfigurationStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Every lookup sleeps for `delay` first.
    pub fn with_delay(mut self, delay: Duration) -> Self {
        self.delay = Some(delay);
        self
    }

    pub fn add_storage(&self, storage: StorageConfiguration) {
        self.storage.lock().unwrap().insert(storage.id, storage);
    }

    pub fn add_configuration(&self, configuration: UploadConfiguration, columns: Vec<ColumnRule>) {
        self.columns
            .lock()
            .unwrap()
            .insert(configuration.id, columns);
        self.configurations
            .lock()
            .unwrap()
            .insert(configuration.id, configuration);
    }

    async fn pause(&self) {
        if let Some(delay) = self.delay {
            tokio::time::sleep(delay).await;
        }
    }
}

#[async_trait]
impl ConfigurationStore for InMemoryConfigurationStore {
    async fn get_upload_configuration(
        &self,
        id: Uuid,
    ) -> Result<Option<UploadConfiguration>, AppError> {
        self.pause().await;
        let configurations = self.configurations.lock().map_err(|_| poisoned())?;
        Ok(configurations.get(&id).cloned())
    }

    async fn list_column_rules(&self, configuration_id: Uuid) -> Result<Vec<ColumnRule>, AppError> {
        let columns = self.columns.lock().map_err(|_| poisoned())?;
        let mut rules = columns.get(&configuration_id).cloned().unwrap_or_default();
        rules.sort_by_key(|r| r.position);
        Ok(rules)
    }

    async fn get_storage_configuration(
        &self,
        id: Uuid,
    ) -> Result<Option<StorageConfiguration>, AppError> {
        let storage = self.storage.lock().map_err(|_| poisoned())?;
        Ok(storage.get(&id).cloned())
    }
}

/// In-memory append-only ledger
#[derive(Clone, Default)]
pub struct InMemoryOperationLedger {
    records: Arc<Mutex<Vec<UploadOperation>>>,
    fail_appends: bool,
}

impl InMemoryOperationLedger {
    pub fn new() -> Self {
        Self::default()
    }

    /// Ledger whose appends always fail with a persistence error.
    pub fn failing() -> Self {
        Self {
            fail_appends: true,
            ..Self::default()
        }
    }

    pub fn records(&self) -> Vec<UploadOperation> {
        self.records.lock().unwrap().clone()
    }

    pub fn count(&self) -> usize {
        self.records.lock().unwrap().len()
    }
}

#[async_trait]
impl OperationLedger for InMemoryOperationLedger {
    async fn append(&self, operation: NewUploadOperation) -> Result<Uuid, AppError> {
        if self.fail_appends {
            return Err(AppError::Database(sqlx::Error::PoolTimedOut));
        }
        let id = Uuid::new_v4();
        let mut records = self.records.lock().map_err(|_| poisoned())?;
        records.push(UploadOperation::from_new(id, operation, Utc::now()));
        Ok(id)
    }

    async fn get(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<UploadOperation>, AppError> {
        let records = self.records.lock().map_err(|_| poisoned())?;
        Ok(records
            .iter()
            .find(|r| r.id == id && r.organization_id == organization_id)
            .cloned())
    }

    async fn list_by_configuration(
        &self,
        organization_id: Uuid,
        configuration_id: Uuid,
        limit: i64,
    ) -> Result<Vec<UploadOperation>, AppError> {
        let records = self.records.lock().map_err(|_| poisoned())?;
        Ok(records
            .iter()
            .rev()
            .filter(|r| {
                r.organization_id == organization_id && r.configuration_id == configuration_id
            })
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn list_by_user(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<UploadOperation>, AppError> {
        let records = self.records.lock().map_err(|_| poisoned())?;
        Ok(records
            .iter()
            .rev()
            .filter(|r| r.organization_id == organization_id && r.user_id == user_id)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tabula_core::models::{DataType, OperationErrorPayload, OperationStatus};

    fn new_operation(org: Uuid, config: Uuid, user: Uuid) -> NewUploadOperation {
        NewUploadOperation {
            configuration_id: config,
            organization_id: org,
            user_id: user,
            file_name: "contacts.csv".to_string(),
            storage_path: String::new(),
            file_size: 12,
            total_rows: 1,
            valid_rows: 1,
            status: OperationStatus::Completed,
            error_count: 0,
            payload: OperationErrorPayload::default(),
        }
    }

    #[tokio::test]
    async fn test_load_bundle_composes_lookups() {
        let store = InMemoryConfigurationStore::new();
        let storage = StorageConfiguration::local("/tmp");
        let config = UploadConfiguration::new(Uuid::new_v4(), "contacts", storage.id);
        let columns = vec![
            ColumnRule::new(config.id, "name", DataType::String, 2),
            ColumnRule::new(config.id, "email", DataType::Email, 1),
        ];
        store.add_storage(storage.clone());
        store.add_configuration(config.clone(), columns);

        let bundle = store.load_bundle(config.id).await.unwrap().unwrap();
        assert_eq!(bundle.storage.id, storage.id);
        assert_eq!(bundle.columns[0].header_name, "email");

        assert!(store.load_bundle(Uuid::new_v4()).await.unwrap().is_none());
    }

    #[tokio::test]
    async fn test_load_bundle_with_dangling_storage_is_invalid_config() {
        let store = InMemoryConfigurationStore::new();
        let config = UploadConfiguration::new(Uuid::new_v4(), "contacts", Uuid::new_v4());
        store.add_configuration(config.clone(), vec![]);

        let err = store.load_bundle(config.id).await.unwrap_err();
        assert_eq!(err.error_type(), "InvalidConfig");
    }

    #[tokio::test]
    async fn test_ledger_lists_newest_first_within_tenant() {
        let ledger = InMemoryOperationLedger::new();
        let (org, config, user) = (Uuid::new_v4(), Uuid::new_v4(), Uuid::new_v4());

        let first = ledger.append(new_operation(org, config, user)).await.unwrap();
        let second = ledger.append(new_operation(org, config, user)).await.unwrap();
        ledger
            .append(new_operation(Uuid::new_v4(), config, user))
            .await
            .unwrap();

        let listed = ledger.list_by_configuration(org, config, 10).await.unwrap();
        assert_eq!(
            listed.iter().map(|r| r.id).collect::<Vec<_>>(),
            vec![second, first]
        );

        let by_user = ledger.list_by_user(org, user, 1).await.unwrap();
        assert_eq!(by_user.len(), 1);
        assert!(ledger.get(Uuid::new_v4(), first).await.unwrap().is_none());
    }
}
