//! Operation repository: append-only access to the upload_operations ledger.

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::types::Json;
use sqlx::{PgPool, Postgres};
use tabula_core::constants::MAX_LEDGER_PAGE_SIZE;
use tabula_core::models::{
    NewUploadOperation, OperationErrorPayload, OperationStatus, UploadOperation,
};
use tabula_core::AppError;
use uuid::Uuid;

use crate::traits::OperationLedger;

const OPERATION_COLUMNS: &str = r#"
    id,
    configuration_id,
    organization_id,
    user_id,
    file_name,
    storage_path,
    file_size,
    total_rows,
    valid_rows,
    status,
    error_count,
    payload,
    created_at
"#;

/// Row type for upload_operations table (for FromRow).
#[derive(Debug, sqlx::FromRow)]
pub struct UploadOperationRow {
    pub id: Uuid,
    pub configuration_id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub file_name: String,
    pub storage_path: String,
    pub file_size: i64,
    pub total_rows: i64,
    pub valid_rows: i64,
    pub status: String,
    pub error_count: i64,
    pub payload: Json<OperationErrorPayload>,
    pub created_at: DateTime<Utc>,
}

impl UploadOperationRow {
    pub fn to_upload_operation(self) -> Result<UploadOperation, AppError> {
        let status: OperationStatus = self.status.parse().map_err(|e: anyhow::Error| {
            AppError::Internal(format!("Operation {} has {}", self.id, e))
        })?;

        Ok(UploadOperation {
            id: self.id,
            configuration_id: self.configuration_id,
            organization_id: self.organization_id,
            user_id: self.user_id,
            file_name: self.file_name,
            storage_path: self.storage_path,
            file_size: self.file_size,
            total_rows: self.total_rows,
            valid_rows: self.valid_rows,
            status,
            error_count: self.error_count,
            payload: self.payload.0,
            created_at: self.created_at,
        })
    }
}

fn clamp_limit(limit: i64) -> i64 {
    limit.clamp(1, MAX_LEDGER_PAGE_SIZE)
}

/// Repository for the upload_operations ledger.
#[derive(Clone)]
pub struct OperationRepository {
    pool: PgPool,
}

impl OperationRepository {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl OperationLedger for OperationRepository {
    #[tracing::instrument(
        skip(self, operation),
        fields(
            db.table = "upload_operations",
            configuration_id = %operation.configuration_id,
            status = %operation.status
        )
    )]
    async fn append(&self, operation: NewUploadOperation) -> Result<Uuid, AppError> {
        let id: Uuid = sqlx::query_scalar::<Postgres, Uuid>(
            r#"
            INSERT INTO upload_operations (
                configuration_id, organization_id, user_id, file_name, storage_path,
                file_size, total_rows, valid_rows, status, error_count, payload
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            RETURNING id
            "#,
        )
        .bind(operation.configuration_id)
        .bind(operation.organization_id)
        .bind(operation.user_id)
        .bind(&operation.file_name)
        .bind(&operation.storage_path)
        .bind(operation.file_size)
        .bind(operation.total_rows)
        .bind(operation.valid_rows)
        .bind(operation.status.to_string())
        .bind(operation.error_count)
        .bind(Json(&operation.payload))
        .fetch_one(&self.pool)
        .await
        .map_err(|e| {
            tracing::error!(
                error = %e,
                configuration_id = %operation.configuration_id,
                storage_path = %operation.storage_path,
                "Failed to insert upload operation"
            );
            AppError::Database(e)
        })?;

        tracing::info!(
            operation_id = %id,
            configuration_id = %operation.configuration_id,
            status = %operation.status,
            error_count = operation.error_count,
            "Upload operation recorded"
        );

        Ok(id)
    }

    #[tracing::instrument(skip(self), fields(db.table = "upload_operations", db.record_id = %id))]
    async fn get(
        &self,
        organization_id: Uuid,
        id: Uuid,
    ) -> Result<Option<UploadOperation>, AppError> {
        let sql = format!(
            "SELECT {} FROM upload_operations WHERE organization_id = $1 AND id = $2",
            OPERATION_COLUMNS
        );
        let row: Option<UploadOperationRow> = sqlx::query_as::<Postgres, UploadOperationRow>(&sql)
            .bind(organization_id)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;

        row.map(|r| r.to_upload_operation()).transpose()
    }

    #[tracing::instrument(skip(self), fields(db.table = "upload_operations"))]
    async fn list_by_configuration(
        &self,
        organization_id: Uuid,
        configuration_id: Uuid,
        limit: i64,
    ) -> Result<Vec<UploadOperation>, AppError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM upload_operations
            WHERE organization_id = $1 AND configuration_id = $2
            ORDER BY created_at DESC
            LIMIT $3
            "#,
            OPERATION_COLUMNS
        );
        let rows: Vec<UploadOperationRow> = sqlx::query_as::<Postgres, UploadOperationRow>(&sql)
            .bind(organization_id)
            .bind(configuration_id)
            .bind(clamp_limit(limit))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(|r| r.to_upload_operation()).collect()
    }

    #[tracing::instrument(skip(self), fields(db.table = "upload_operations"))]
    async fn list_by_user(
        &self,
        organization_id: Uuid,
        user_id: Uuid,
        limit: i64,
    ) -> Result<Vec<UploadOperation>, AppError> {
        let sql = format!(
            r#"
            SELECT {}
            FROM upload_operations
            WHERE organization_id = $1 AND user_id = $2
            ORDER BY created_at DESC
            LIMIT $3
            "#,
            OPERATION_COLUMNS
        );
        let rows: Vec<UploadOperationRow> = sqlx::query_as::<Postgres, UploadOperationRow>(&sql)
            .bind(organization_id)
            .bind(user_id)
            .bind(clamp_limit(limit))
            .fetch_all(&self.pool)
            .await?;

        rows.into_iter().map(|r| r.to_upload_operation()).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_limit_is_bounded() {
        assert_eq!(clamp_limit(0), 1);
        assert_eq!(clamp_limit(50), 50);
        assert_eq!(clamp_limit(10_000), MAX_LEDGER_PAGE_SIZE);
    }

    #[test]
    fn test_row_with_unknown_status_is_rejected() {
        let row = UploadOperationRow {
            id: Uuid::new_v4(),
            configuration_id: Uuid::new_v4(),
            organization_id: Uuid::new_v4(),
            user_id: Uuid::new_v4(),
            file_name: "contacts.csv".to_string(),
            storage_path: String::new(),
            file_size: 10,
            total_rows: 0,
            valid_rows: 0,
            status: "archived".to_string(),
            error_count: 0,
            payload: Json(OperationErrorPayload::default()),
            created_at: Utc::now(),
        };
        assert!(row.to_upload_operation().is_err());
    }
}
