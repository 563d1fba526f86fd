//! Repository trait abstractions
//!
//! The upload orchestrator depends on these traits rather than on the Postgres repositories,
//! so it can be exercised with the in-memory doubles from `test_helpers`.

use async_trait::async_trait;
use tabula_core::models::{
    ColumnRule, ConfigurationBundle, NewUploadOperation, StorageConfiguration,
    UploadConfiguration, UploadOperation,
};
use tabula_core::AppError;
use uuid::Uuid;

/// Read-only access to tenant configuration.
#[async_trait]
pub trait ConfigurationStore: Send + Sync {
    async fn get_upload_configuration(
        &self,
        id: Uuid,
    ) -> Result<Option<UploadConfiguration>, AppError>;

    /// Column rules of a configuration ordered by position
    async fn list_column_rules(&self, configuration_id: Uuid) -> Result<Vec<ColumnRule>, AppError>;

    async fn get_storage_configuration(
        &self,
        id: Uuid,
    ) -> Result<Option<StorageConfiguration>, AppError>;

    /// Configuration, its columns and its storage configuration in one call.
    ///
    /// Returns `Ok(None)` for an unknown configuration. Activity and tenant ownership are not
    /// checked here.
    async fn load_bundle(&self, id: Uuid) -> Result<Option<ConfigurationBundle>, AppError> {
        let Some(configuration) = self.get_upload_configuration(id).await? else {
            return Ok(None);
        };

        let columns = self.list_column_rules(id).await?;

        let storage = self
            .get_storage_configuration(configuration.storage_configuration_id)
            .await?
            .ok_or_else(|| {
                AppError::InvalidConfig(format!(
                    "Storage configuration {} referenced by upload configuration {} does not exist",
                    configuration.storage_configuration_id, id
                ))
            })?;

        Ok(Some(ConfigurationBundle {
            configuration,
            columns,
            storage,
        }))
    }
}

/// Append-only audit trail of upload attempts.
#[async_trait]
pub trait OperationLedger: Send + Sync {
    /// Persist a record and return its id. Records are never updated or deleted.
    async fn append(&self, operation: NewUploadOperation) -> Result<Uuid, AppError>;

    async fn get(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<UploadOperation>, AppError>;

    /// Newest first, at most `limit` records
    async fn list_by_configuration(
        &self,
        organization_id: Uuid,
        configuration_id: Uuid,
        limit: i64,
    ) -> Result<Vec<UploadOperation>, AppError>;

    /// Newest first, at most `limit` records
    async fn list_by_user(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<UploadOperation>, AppError>;
}
