//! Configuration repository: read access to upload_configurations, column_rules and
//! storage_configurations.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{PgPool, Postgres};
use tabula_core::models::{
    AccessMode, ColumnRule, DataType, StorageConfiguration, UploadConfiguration,
};
use tabula_core::{AppError, StorageBackend};
use uuid::Uuid;

use crate::traits::ConfigurationStore;

/// Row type for upload_configurations table (for FromRow).
#[derive(Debug, sqlx::FromRow)]
pub struct UploadConfigurationRow {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    pub allowed_extensions: Vec<String>,
    pub delimiter: String,
    pub max_file_size: i64,
    pub max_row_count: Option<i64>,
    pub min_data_rows: i64,
    pub allow_partial_upload: bool,
    pub is_active: bool,
    pub storage_configuration_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UploadConfigurationRow {
    pub fn to_upload_configuration(self) -> Result<UploadConfiguration, AppError> {
        let mut chars = self.delimiter.chars();
        let delimiter = match (chars.next(), chars.next()) {
            (Some(c), None) => c,
            _ => {
                return Err(AppError::InvalidConfig(format!(
                    "Upload configuration {} has an invalid delimiter",
                    self.id
                )))
            }
        };

        Ok(UploadConfiguration {
            id: self.id,
            organization_id: self.organization_id,
            name: self.name,
            allowed_extensions: self
                .allowed_extensions
                .into_iter()
                .map(|e| e.trim().trim_start_matches('.').to_lowercase())
                .collect(),
            delimiter,
            max_file_size: self.max_file_size,
            max_row_count: self.max_row_count,
            min_data_rows: self.min_data_rows,
            allow_partial_upload: self.allow_partial_upload,
            is_active: self.is_active,
            storage_configuration_id: self.storage_configuration_id,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Row type for column_rules table (for FromRow).
#[derive(Debug, sqlx::FromRow)]
pub struct ColumnRuleRow {
    pub id: Uuid,
    pub configuration_id: Uuid,
    pub header_name: String,
    pub display_name: String,
    pub data_type: String,
    pub required: bool,
    pub values_required: bool,
    pub min_length: Option<i32>,
    pub max_length: Option<i32>,
    pub min_value: Option<f64>,
    pub max_value: Option<f64>,
    pub pattern: Option<String>,
    pub position: i32,
}

impl ColumnRuleRow {
    pub fn to_column_rule(self) -> Result<ColumnRule, AppError> {
        let data_type: DataType = self.data_type.parse().map_err(|_| {
            AppError::InvalidConfig(format!(
                "Column rule {} has unknown data type '{}'",
                self.id, self.data_type
            ))
        })?;

        Ok(ColumnRule {
            id: self.id,
            configuration_id: self.configuration_id,
            header_name: self.header_name,
            display_name: self.display_name,
            data_type,
            required: self.required,
            values_required: self.values_required,
            min_length: self.min_length,
            max_length: self.max_length,
            min_value: self.min_value,
            max_value: self.max_value,
            pattern: self.pattern,
            position: self.position,
        })
    }
}

/// Row type for storage_configurations table (for FromRow).
#[derive(sqlx::FromRow)]
pub struct StorageConfigurationRow {
    pub id: Uuid,
    pub name: String,
    pub backend: StorageBackend,
    pub base_path: String,
    pub path_template: String,
    pub access_mode: String,
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    pub secret_access_key: Option<String>,
    pub public_base_url: Option<String>,
    pub local_root: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StorageConfigurationRow {
    pub fn to_storage_configuration(self) -> Result<StorageConfiguration, AppError> {
        let access_mode: AccessMode = self.access_mode.parse().map_err(|_| {
            AppError::InvalidConfig(format!(
                "Storage configuration {} has unknown access mode '{}'",
                self.id, self.access_mode
            ))
        })?;

        Ok(StorageConfiguration {
            id: self.id,
            name: self.name,
            backend: self.backend,
            base_path: self.base_path,
            path_template: self.path_template,
            access_mode,
            bucket: self.bucket,
            region: self.region,
            endpoint: self.endpoint,
            access_key_id: self.access_key_id,
            secret_access_key: self.secret_access_key,
            public_base_url: self.public_base_url,
            local_root: self.local_root,
            created_at: self.created_at,
            updated_at: self.updated_at,
        })
    }
}

/// Repository for tenant configuration tables.
#[derive(Clone)]
pub struct ConfigurationRepository {
    pool: PgPool,
}

impl ConfigurationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl ConfigurationStore for ConfigurationRepository {
    #[tracing::instrument(
        skip(self),
        fields(db.table = "upload_configurations", db.record_id = %id)
    )]
    async fn get_upload_configuration(
        &self,
        id: Uuid,
    ) -> Result<Option<UploadConfiguration>, AppError> {
        let row: Option<UploadConfigurationRow> =
            sqlx::query_as::<Postgres, UploadConfigurationRow>(
                r#"
                SELECT
                    id,
                    organization_id,
                    name,
                    allowed_extensions,
                    delimiter,
                    max_file_size,
                    max_row_count,
                    min_data_rows,
                    allow_partial_upload,
                    is_active,
                    storage_configuration_id,
                    created_at,
                    updated_at
                FROM upload_configurations
                WHERE id = $1
                "#,
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.to_upload_configuration()).transpose()
    }

    #[tracing::instrument(
        skip(self),
        fields(db.table = "column_rules", configuration_id = %configuration_id)
    )]
    async fn list_column_rules(
        &self,
        configuration_id: Uuid,
    ) -> Result<Vec<ColumnRule>, AppError> {
        let rows: Vec<ColumnRuleRow> = sqlx::query_as::<Postgres, ColumnRuleRow>(
            r#"
            SELECT
                id,
                configuration_id,
                header_name,
                display_name,
                data_type,
                required,
                values_required,
                min_length,
                max_length,
                min_value,
                max_value,
                pattern,
                position
            FROM column_rules
            WHERE configuration_id = $1
            ORDER BY position ASC
            "#,
        )
        .bind(configuration_id)
        .fetch_all(&self.pool)
        .await?;

        rows.into_iter().map(|r| r.to_column_rule()).collect()
    }

    #[tracing::instrument(
        skip(self),
        fields(db.table = "storage_configurations", db.record_id = %id)
    )]
    async fn get_storage_configuration(
        &self,
        id: Uuid,
    ) -> Result<Option<StorageConfiguration>, AppError> {
        let row: Option<StorageConfigurationRow> =
            sqlx::query_as::<Postgres, StorageConfigurationRow>(
                r#"
                SELECT
                    id,
                    name,
                    backend,
                    base_path,
                    path_template,
                    access_mode,
                    bucket,
                    region,
                    endpoint,
                    access_key_id,
                    secret_access_key,
                    public_base_url,
                    local_root,
                    created_at,
                    updated_at
                FROM storage_configurations
                WHERE id = $1
                "#,
            )
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.to_storage_configuration()).transpose()
    }
}
