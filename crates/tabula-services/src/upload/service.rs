//! Upload orchestrator
//!
//! Runs one submission through the pipeline:
//! authenticate → resolve configuration → validate → decide → store → record.
//!
//! Parameter, authentication and configuration failures return before anything is written.
//! Every attempt that gets past configuration resolution, and is not cancelled before the
//! storage write, produces exactly one ledger record.

use std::sync::Arc;

use tabula_core::models::{
    CallerIdentity, ConfigurationBundle, FileMetadata, NewUploadOperation, OperationErrorPayload,
    OperationStatus, ValidationResult,
};
use tabula_core::AppError;
use tabula_db::{ConfigurationStore, OperationLedger};
use tabula_processing::{CompiledRules, ValidationEngine};
use tabula_storage::{StorageGateway, StoreContext, StoredObject};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::types::{OrchestratorSettings, UploadFile, UploadRequest, UploadResult};

const DEFAULT_CONTENT_TYPE: &str = "text/csv";

/// Configuration resolved and compiled for one submission
struct ResolvedConfiguration {
    bundle: ConfigurationBundle,
    rules: CompiledRules,
}

/// Ledger context shared by every record of one attempt
struct Attempt<'a> {
    caller: CallerIdentity,
    configuration_id: Uuid,
    file: &'a UploadFile,
}

impl Attempt<'_> {
    fn record(
        &self,
        result: &ValidationResult,
        status: OperationStatus,
        storage_path: String,
        failure: Option<String>,
    ) -> NewUploadOperation {
        NewUploadOperation {
            configuration_id: self.configuration_id,
            organization_id: self.caller.organization_id,
            user_id: self.caller.user_id,
            file_name: self.file.file_name.clone(),
            storage_path,
            file_size: self.file.data.len() as i64,
            total_rows: result.total_rows as i64,
            valid_rows: result.valid_rows as i64,
            status,
            error_count: result.error_count() as i64,
            payload: OperationErrorPayload {
                errors: result.errors.clone(),
                valid_rows: result.valid_rows as i64,
                total_rows: result.total_rows as i64,
                failure,
            },
        }
    }
}

/// Composes configuration lookup, validation, storage and the ledger.
#[derive(Clone)]
pub struct UploadOrchestrator {
    configurations: Arc<dyn ConfigurationStore>,
    ledger: Arc<dyn OperationLedger>,
    gateway: StorageGateway,
    engine: ValidationEngine,
    settings: OrchestratorSettings,
}

impl UploadOrchestrator {
    pub fn new(
        configurations: Arc<dyn ConfigurationStore>,
        ledger: Arc<dyn OperationLedger>,
        gateway: StorageGateway,
        settings: OrchestratorSettings,
    ) -> Self {
        Self {
            configurations,
            ledger,
            gateway,
            engine: ValidationEngine::new(),
            settings,
        }
    }

    /// Process one submission.
    ///
    /// Validation failures are not errors: a rejected file comes back as `Ok` with status
    /// `failed` and code `VALIDATION_FAILED`. `Err` is reserved for failures that stop the
    /// pipeline (parameters, authentication, configuration, storage, persistence,
    /// cancellation).
    pub async fn submit(
        &self,
        request: UploadRequest,
        cancel: CancellationToken,
    ) -> Result<UploadResult, AppError> {
        let caller = request
            .caller
            .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))?;

        let (file, raw_config_id) = match (request.file, request.config_id) {
            (Some(file), Some(config_id)) if !config_id.trim().is_empty() => (file, config_id),
            (None, _) => {
                return Err(AppError::MissingParameters(
                    "A file is required".to_string(),
                ))
            }
            _ => {
                return Err(AppError::MissingParameters(
                    "config_id is required".to_string(),
                ))
            }
        };

        let configuration_id = Uuid::parse_str(raw_config_id.trim()).map_err(|_| {
            AppError::InvalidConfigId(format!("Invalid configuration id: {}", raw_config_id))
        })?;

        let resolved = self.resolve_configuration(configuration_id, &caller).await?;

        tracing::info!(
            configuration_id = %configuration_id,
            user_id = %caller.user_id,
            file_name = %file.file_name,
            file_size = file.data.len(),
            "Validating upload"
        );

        let metadata = FileMetadata::new(file.file_name.clone(), file.data.len() as i64);
        let result = self.validate(&file, metadata.clone(), resolved.rules).await?;

        if cancel.is_cancelled() {
            tracing::info!(
                configuration_id = %configuration_id,
                "Upload cancelled before storage"
            );
            return Err(AppError::Cancelled("Upload cancelled by the caller".to_string()));
        }

        let attempt = Attempt {
            caller,
            configuration_id,
            file: &file,
        };
        let configuration = &resolved.bundle.configuration;

        if !result.is_valid && !configuration.allow_partial_upload {
            let record = attempt.record(&result, OperationStatus::Failed, String::new(), None);
            let operation_id = self.append(record, None).await?;

            tracing::info!(
                operation_id = %operation_id,
                error_count = result.error_count(),
                "Upload rejected by validation"
            );
            return Ok(UploadResult::rejected(operation_id, &result));
        }

        let stored = match self.store(&resolved.bundle, &file, &metadata, &caller).await {
            Ok(stored) => stored,
            Err(error) => {
                self.append(
                    attempt.record(
                        &result,
                        OperationStatus::Failed,
                        String::new(),
                        Some(error.to_string()),
                    ),
                    None,
                )
                .await?;
                return Err(error);
            }
        };

        let status = if result.is_valid {
            OperationStatus::Completed
        } else {
            OperationStatus::PartiallyCompleted
        };
        let operation_id = self
            .append(
                attempt.record(&result, status, stored.path.clone(), None),
                Some(&stored.path),
            )
            .await?;

        tracing::info!(
            operation_id = %operation_id,
            storage_path = %stored.path,
            status = %status,
            valid_rows = result.valid_rows,
            total_rows = result.total_rows,
            "Upload stored"
        );

        Ok(UploadResult::accepted(operation_id, &result))
    }

    /// Load, authorize and compile the configuration. Every failure here maps to a
    /// no-side-effect error.
    async fn resolve_configuration(
        &self,
        configuration_id: Uuid,
        caller: &CallerIdentity,
    ) -> Result<ResolvedConfiguration, AppError> {
        let bundle = tokio::time::timeout(
            self.settings.lookup_timeout,
            self.configurations.load_bundle(configuration_id),
        )
        .await
        .map_err(|_| {
            tracing::error!(
                configuration_id = %configuration_id,
                "Configuration lookup timed out"
            );
            AppError::Internal(format!(
                "Configuration lookup timed out after {:?}",
                self.settings.lookup_timeout
            ))
        })??;

        // Inactive and foreign configurations are indistinguishable from unknown ones.
        let bundle = bundle
            .filter(|b| b.configuration.is_resolvable_for(caller.organization_id))
            .ok_or_else(|| {
                AppError::InvalidConfig(format!(
                    "Upload configuration {} not found",
                    configuration_id
                ))
            })?;

        let rules = CompiledRules::compile(&bundle.configuration, &bundle.columns).map_err(|e| {
            tracing::warn!(
                configuration_id = %configuration_id,
                error = %e,
                "Configuration does not compile"
            );
            AppError::InvalidConfig(format!(
                "Upload configuration {} is invalid: {}",
                configuration_id, e
            ))
        })?;

        Ok(ResolvedConfiguration { bundle, rules })
    }

    /// Run the engine on a blocking worker thread.
    async fn validate(
        &self,
        file: &UploadFile,
        metadata: FileMetadata,
        rules: CompiledRules,
    ) -> Result<ValidationResult, AppError> {
        let engine = self.engine;
        let data = file.data.clone();

        tokio::task::spawn_blocking(move || engine.validate_compiled(&data, &metadata, &rules))
            .await
            .map_err(|e| AppError::Internal(format!("Validation task failed: {}", e)))
    }

    async fn store(
        &self,
        bundle: &ConfigurationBundle,
        file: &UploadFile,
        metadata: &FileMetadata,
        caller: &CallerIdentity,
    ) -> Result<StoredObject, AppError> {
        let content_type = if file.content_type.trim().is_empty() {
            DEFAULT_CONTENT_TYPE.to_string()
        } else {
            file.content_type.clone()
        };
        let context = StoreContext {
            organization_id: caller.organization_id,
            user_id: caller.user_id,
            extension: metadata.extension(),
            content_type,
        };

        match tokio::time::timeout(
            self.settings.storage_timeout,
            self.gateway
                .store(&bundle.storage, file.data.clone(), &context),
        )
        .await
        {
            Ok(Ok(stored)) => Ok(stored),
            Ok(Err(e)) => {
                tracing::error!(
                    error = %e,
                    storage_configuration_id = %bundle.storage.id,
                    "Failed to store upload"
                );
                Err(AppError::Storage(format!("Failed to store file: {}", e)))
            }
            Err(_) => {
                tracing::error!(
                    storage_configuration_id = %bundle.storage.id,
                    "Storage write timed out"
                );
                Err(AppError::Storage(format!(
                    "Storage write timed out after {:?}",
                    self.settings.storage_timeout
                )))
            }
        }
    }

    /// Append a ledger record. `orphaned_path` is logged when the append fails after the file
    /// was already stored.
    async fn append(
        &self,
        record: NewUploadOperation,
        orphaned_path: Option<&str>,
    ) -> Result<Uuid, AppError> {
        let configuration_id = record.configuration_id;
        self.ledger.append(record).await.map_err(|e| {
            tracing::error!(
                error = %e,
                configuration_id = %configuration_id,
                orphaned_path = orphaned_path.unwrap_or(""),
                "Failed to record upload operation"
            );
            e
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::upload::types::UploadStatus;
    use bytes::Bytes;
    use std::time::Duration;
    use tabula_core::models::{
        ColumnRule, DataType, StorageConfiguration, UploadConfiguration, ValidationErrorCode,
    };
    use tabula_core::ErrorMetadata;
    use tabula_db::test_helpers::{InMemoryConfigurationStore, InMemoryOperationLedger};
    use tabula_storage::test_helpers::{RecordingStorage, StaticResolver};

    struct Harness {
        orchestrator: UploadOrchestrator,
        configurations: InMemoryConfigurationStore,
        ledger: InMemoryOperationLedger,
        storage: RecordingStorage,
        caller: CallerIdentity,
    }

    impl Harness {
        fn new() -> Self {
            Self::build(
                InMemoryConfigurationStore::new(),
                InMemoryOperationLedger::new(),
                RecordingStorage::new(),
                OrchestratorSettings::default(),
            )
        }

        fn build(
            configurations: InMemoryConfigurationStore,
            ledger: InMemoryOperationLedger,
            storage: RecordingStorage,
            settings: OrchestratorSettings,
        ) -> Self {
            let gateway =
                StorageGateway::new(Arc::new(StaticResolver::new(Arc::new(storage.clone()))));
            let orchestrator = UploadOrchestrator::new(
                Arc::new(configurations.clone()),
                Arc::new(ledger.clone()),
                gateway,
                settings,
            );
            Self {
                orchestrator,
                configurations,
                ledger,
                storage,
                caller: CallerIdentity::new(Uuid::new_v4(), Uuid::new_v4()),
            }
        }

        /// Email-only configuration owned by the harness caller.
        fn email_configuration(&self, allow_partial: bool) -> Uuid {
            let storage = StorageConfiguration::local("/unused");
            let mut config =
                UploadConfiguration::new(self.caller.organization_id, "contacts", storage.id);
            config.max_file_size = 1_000_000;
            config.allow_partial_upload = allow_partial;
            let columns = vec![ColumnRule::new(config.id, "email", DataType::Email, 1)
                .values_required()];
            let id = config.id;
            self.configurations.add_storage(storage);
            self.configurations.add_configuration(config, columns);
            id
        }

        fn request(&self, config_id: Uuid, file_name: &str, body: &'static str) -> UploadRequest {
            UploadRequest {
                file: Some(UploadFile {
                    file_name: file_name.to_string(),
                    content_type: "text/csv".to_string(),
                    data: Bytes::from_static(body.as_bytes()),
                }),
                config_id: Some(config_id.to_string()),
                caller: Some(self.caller),
            }
        }

        async fn submit(&self, request: UploadRequest) -> Result<UploadResult, AppError> {
            self.orchestrator
                .submit(request, CancellationToken::new())
                .await
        }
    }

    #[tokio::test]
    async fn test_invalid_row_rejects_without_storage() {
        let harness = Harness::new();
        let config_id = harness.email_configuration(false);

        let result = harness
            .submit(harness.request(config_id, "contacts.csv", "email\na@b.com\nnot-an-email\n"))
            .await
            .unwrap();

        assert_eq!(result.status, UploadStatus::Failed);
        let error = result.error.unwrap();
        assert_eq!(error.code, "VALIDATION_FAILED");
        let details = error.details.unwrap();
        assert_eq!(details.row_level_errors.total, 1);
        assert_eq!(
            details.row_level_errors.samples[0].code,
            ValidationErrorCode::InvalidEmail
        );
        assert_eq!(details.row_level_errors.samples[0].row_number(), Some(3));

        assert_eq!(harness.storage.put_count(), 0);
        let records = harness.ledger.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, OperationStatus::Failed);
        assert_eq!(records[0].storage_path, "");
        assert_eq!(records[0].error_count, 1);
        assert_eq!(Some(records[0].id), result.operation_id);
    }

    #[tokio::test]
    async fn test_partial_upload_stores_and_records_errors() {
        let harness = Harness::new();
        let config_id = harness.email_configuration(true);

        let result = harness
            .submit(harness.request(config_id, "contacts.csv", "email\na@b.com\nnot-an-email\n"))
            .await
            .unwrap();

        assert_eq!(result.status, UploadStatus::PartiallyCompleted);
        assert_eq!(result.processed_rows, Some(1));
        assert_eq!(result.total_rows, Some(2));
        assert_eq!(result.error.as_ref().unwrap().code, "VALIDATION_ERRORS");

        assert_eq!(harness.storage.put_count(), 1);
        let records = harness.ledger.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, OperationStatus::PartiallyCompleted);
        assert_eq!(records[0].error_count, 1);
        assert_eq!(records[0].storage_path, harness.storage.keys()[0]);
        assert!(records[0]
            .storage_path
            .starts_with(&format!("uploads/{}/", harness.caller.organization_id)));
    }

    #[tokio::test]
    async fn test_partial_law_counts() {
        let harness = Harness::new();
        let config_id = harness.email_configuration(true);

        let result = harness
            .submit(harness.request(
                config_id,
                "contacts.csv",
                "email\na@b.com\nbad\nc@d.org\nworse\n\ne@f.net\n",
            ))
            .await
            .unwrap();

        assert_eq!(result.status, UploadStatus::PartiallyCompleted);
        assert_eq!(result.total_rows, Some(5));
        assert_eq!(result.processed_rows, Some(3));
        assert_eq!(harness.ledger.records()[0].error_count, 2);
    }

    #[tokio::test]
    async fn test_header_only_file_completes() {
        let harness = Harness::new();
        let config_id = harness.email_configuration(false);

        let result = harness
            .submit(harness.request(config_id, "contacts.csv", "email\n"))
            .await
            .unwrap();

        assert_eq!(result.status, UploadStatus::Success);
        assert_eq!(result.total_rows, Some(0));
        assert_eq!(result.processed_rows, Some(0));
        assert!(result.error.is_none());
        assert_eq!(harness.storage.put_count(), 1);
        assert_eq!(harness.ledger.records()[0].status, OperationStatus::Completed);
    }

    #[tokio::test]
    async fn test_missing_required_column_stored_when_partial_allowed() {
        let harness = Harness::new();
        let storage = StorageConfiguration::local("/unused");
        let mut config =
            UploadConfiguration::new(harness.caller.organization_id, "people", storage.id);
        config.max_file_size = 1_000_000;
        config.allow_partial_upload = true;
        let columns = vec![
            ColumnRule::new(config.id, "email", DataType::Email, 1).required(),
            ColumnRule::new(config.id, "name", DataType::String, 2),
        ];
        let config_id = config.id;
        harness.configurations.add_storage(storage);
        harness.configurations.add_configuration(config, columns);

        let result = harness
            .submit(harness.request(config_id, "people.csv", "name\nAnn\nBob\n"))
            .await
            .unwrap();

        assert_eq!(result.status, UploadStatus::PartiallyCompleted);
        assert_eq!(result.total_rows, Some(2));
        assert_eq!(result.processed_rows, Some(2));
        let details = result.error.unwrap().details.unwrap();
        assert_eq!(
            details.file_level_errors[0].code,
            ValidationErrorCode::MissingRequiredColumn
        );

        assert_eq!(harness.storage.put_count(), 1);
        let records = harness.ledger.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, OperationStatus::PartiallyCompleted);
        assert_eq!(records[0].error_count, 1);
    }

    #[tokio::test]
    async fn test_file_level_error_rejected_without_partial() {
        let harness = Harness::new();
        let config_id = harness.email_configuration(false);

        let result = harness
            .submit(harness.request(config_id, "contacts.xlsx", "email\na@b.com\n"))
            .await
            .unwrap();

        assert!(result.is_rejected());
        let details = result.error.unwrap().details.unwrap();
        assert_eq!(
            details.file_level_errors[0].code,
            ValidationErrorCode::InvalidFileType
        );
        assert_eq!(harness.storage.put_count(), 0);
        assert_eq!(harness.ledger.count(), 1);
    }

    #[tokio::test]
    async fn test_short_circuit_failures_leave_no_record() {
        let harness = Harness::new();
        let config_id = harness.email_configuration(false);

        let mut unauthenticated = harness.request(config_id, "c.csv", "email\n");
        unauthenticated.caller = None;
        let err = harness.submit(unauthenticated).await.unwrap_err();
        assert_eq!(err.error_code(), "UNAUTHORIZED");

        let mut no_file = harness.request(config_id, "c.csv", "email\n");
        no_file.file = None;
        let err = harness.submit(no_file).await.unwrap_err();
        assert_eq!(err.error_code(), "MISSING_PARAMETERS");

        let mut no_config = harness.request(config_id, "c.csv", "email\n");
        no_config.config_id = None;
        let err = harness.submit(no_config).await.unwrap_err();
        assert_eq!(err.error_code(), "MISSING_PARAMETERS");

        let mut malformed = harness.request(config_id, "c.csv", "email\n");
        malformed.config_id = Some("not-a-uuid".to_string());
        let err = harness.submit(malformed).await.unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG_ID");

        let err = harness
            .submit(harness.request(Uuid::new_v4(), "c.csv", "email\n"))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
        assert_eq!(err.http_status_code(), 404);

        assert_eq!(harness.ledger.count(), 0);
        assert_eq!(harness.storage.put_count(), 0);
    }

    #[tokio::test]
    async fn test_foreign_and_inactive_configurations_are_unknown() {
        let harness = Harness::new();
        let storage = StorageConfiguration::local("/unused");
        let foreign = UploadConfiguration::new(Uuid::new_v4(), "other", storage.id);
        let mut inactive =
            UploadConfiguration::new(harness.caller.organization_id, "old", storage.id);
        inactive.is_active = false;
        harness.configurations.add_storage(storage);
        harness.configurations.add_configuration(foreign.clone(), vec![]);
        harness.configurations.add_configuration(inactive.clone(), vec![]);

        for id in [foreign.id, inactive.id] {
            let err = harness
                .submit(harness.request(id, "c.csv", "email\n"))
                .await
                .unwrap_err();
            assert_eq!(err.error_code(), "INVALID_CONFIG");
        }
        assert_eq!(harness.ledger.count(), 0);
    }

    #[tokio::test]
    async fn test_uncompilable_configuration_is_invalid_config() {
        let harness = Harness::new();
        let storage = StorageConfiguration::local("/unused");
        let config = UploadConfiguration::new(harness.caller.organization_id, "bad", storage.id);
        let columns =
            vec![ColumnRule::new(config.id, "code", DataType::String, 1).with_pattern("([")];
        let id = config.id;
        harness.configurations.add_storage(storage);
        harness.configurations.add_configuration(config, columns);

        let err = harness
            .submit(harness.request(id, "c.csv", "code\n1\n"))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "INVALID_CONFIG");
        assert_eq!(harness.ledger.count(), 0);
    }

    #[tokio::test]
    async fn test_storage_failure_recorded_once() {
        let harness = Harness::build(
            InMemoryConfigurationStore::new(),
            InMemoryOperationLedger::new(),
            RecordingStorage::failing("bucket unreachable"),
            OrchestratorSettings::default(),
        );
        let config_id = harness.email_configuration(false);

        let err = harness
            .submit(harness.request(config_id, "c.csv", "email\na@b.com\n"))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "STORAGE_ERROR");

        assert_eq!(harness.storage.put_count(), 1);
        let records = harness.ledger.records();
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].status, OperationStatus::Failed);
        assert_eq!(records[0].storage_path, "");
        assert!(records[0]
            .payload
            .failure
            .as_deref()
            .unwrap()
            .contains("bucket unreachable"));
    }

    #[tokio::test]
    async fn test_storage_timeout_is_storage_error() {
        let harness = Harness::build(
            InMemoryConfigurationStore::new(),
            InMemoryOperationLedger::new(),
            RecordingStorage::slow(Duration::from_millis(500)),
            OrchestratorSettings {
                lookup_timeout: Duration::from_secs(5),
                storage_timeout: Duration::from_millis(20),
            },
        );
        let config_id = harness.email_configuration(false);

        let err = harness
            .submit(harness.request(config_id, "c.csv", "email\na@b.com\n"))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "STORAGE_ERROR");
        assert_eq!(harness.ledger.count(), 1);
    }

    #[tokio::test]
    async fn test_lookup_timeout_is_internal_error() {
        let harness = Harness::build(
            InMemoryConfigurationStore::new().with_delay(Duration::from_millis(500)),
            InMemoryOperationLedger::new(),
            RecordingStorage::new(),
            OrchestratorSettings {
                lookup_timeout: Duration::from_millis(20),
                storage_timeout: Duration::from_secs(5),
            },
        );
        let config_id = harness.email_configuration(false);

        let err = harness
            .submit(harness.request(config_id, "c.csv", "email\n"))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "INTERNAL_ERROR");
        assert_eq!(harness.ledger.count(), 0);
    }

    #[tokio::test]
    async fn test_cancelled_before_storage_leaves_no_trace() {
        let harness = Harness::new();
        let config_id = harness.email_configuration(false);
        let cancel = CancellationToken::new();
        cancel.cancel();

        let err = harness
            .orchestrator
            .submit(harness.request(config_id, "c.csv", "email\na@b.com\n"), cancel)
            .await
            .unwrap_err();

        assert_eq!(err.error_code(), "CANCELLED");
        assert_eq!(err.http_status_code(), 499);
        assert_eq!(harness.ledger.count(), 0);
        assert_eq!(harness.storage.put_count(), 0);
    }

    #[tokio::test]
    async fn test_ledger_failure_is_database_error() {
        let harness = Harness::build(
            InMemoryConfigurationStore::new(),
            InMemoryOperationLedger::failing(),
            RecordingStorage::new(),
            OrchestratorSettings::default(),
        );
        let config_id = harness.email_configuration(false);

        let err = harness
            .submit(harness.request(config_id, "c.csv", "email\na@b.com\n"))
            .await
            .unwrap_err();
        assert_eq!(err.error_code(), "DATABASE_ERROR");
        assert_eq!(harness.storage.put_count(), 1);
    }

    #[tokio::test]
    async fn test_retried_submission_is_independent() {
        let harness = Harness::new();
        let config_id = harness.email_configuration(false);

        for _ in 0..2 {
            harness
                .submit(harness.request(config_id, "c.csv", "email\na@b.com\n"))
                .await
                .unwrap();
        }
        let keys = harness.storage.keys();
        assert_eq!(keys.len(), 2);
        assert_ne!(keys[0], keys[1]);
        assert_eq!(harness.ledger.count(), 2);
    }
}
