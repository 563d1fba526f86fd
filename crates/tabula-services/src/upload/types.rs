//! Types used by the upload orchestrator

use bytes::Bytes;
use serde::Serialize;
use std::time::Duration;
use tabula_core::constants::MAX_ERROR_SAMPLES;
use tabula_core::models::{CallerIdentity, ValidationError, ValidationResult};
use tabula_core::{AppError, Config, ErrorMetadata};
use uuid::Uuid;

pub const VALIDATION_FAILED: &str = "VALIDATION_FAILED";
pub const VALIDATION_ERRORS: &str = "VALIDATION_ERRORS";

/// Uploaded file as received at the submission boundary
#[derive(Debug, Clone)]
pub struct UploadFile {
    pub file_name: String,
    pub content_type: String,
    pub data: Bytes,
}

/// One submission. Every part is optional so that absence can be reported with the
/// right error code.
#[derive(Debug, Clone, Default)]
pub struct UploadRequest {
    pub file: Option<UploadFile>,
    pub config_id: Option<String>,
    pub caller: Option<CallerIdentity>,
}

/// Timeouts applied to external calls
#[derive(Debug, Clone, Copy)]
pub struct OrchestratorSettings {
    pub lookup_timeout: Duration,
    pub storage_timeout: Duration,
}

impl Default for OrchestratorSettings {
    fn default() -> Self {
        Self {
            lookup_timeout: Duration::from_secs(10),
            storage_timeout: Duration::from_secs(60),
        }
    }
}

impl OrchestratorSettings {
    pub fn from_config(config: &Config) -> Self {
        Self {
            lookup_timeout: config.config_lookup_timeout(),
            storage_timeout: config.storage_timeout(),
        }
    }
}

#[derive(Debug, Clone, Copy, Serialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum UploadStatus {
    Success,
    PartiallyCompleted,
    Failed,
}

/// Row-level errors with a bounded sample
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct RowErrorSummary {
    pub total: usize,
    pub samples: Vec<ValidationError>,
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorDetails {
    pub file_level_errors: Vec<ValidationError>,
    pub row_level_errors: RowErrorSummary,
}

impl ErrorDetails {
    /// All file-level errors and at most `MAX_ERROR_SAMPLES` row-level ones.
    pub fn from_validation(result: &ValidationResult) -> Self {
        let file_level_errors: Vec<ValidationError> =
            result.file_level_errors().cloned().collect();
        let total = result.errors.len() - file_level_errors.len();
        let samples = result
            .row_level_errors()
            .take(MAX_ERROR_SAMPLES)
            .cloned()
            .collect();

        Self {
            file_level_errors,
            row_level_errors: RowErrorSummary { total, samples },
        }
    }
}

#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct ErrorBody {
    pub code: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<ErrorDetails>,
}

/// Outcome returned to the submitter
#[derive(Debug, Clone, Serialize, PartialEq)]
pub struct UploadResult {
    pub status: UploadStatus,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub operation_id: Option<Uuid>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub processed_rows: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub total_rows: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorBody>,
}

impl UploadResult {
    pub(crate) fn accepted(operation_id: Uuid, result: &ValidationResult) -> Self {
        let (status, error) = if result.is_valid {
            (UploadStatus::Success, None)
        } else {
            (
                UploadStatus::PartiallyCompleted,
                Some(ErrorBody {
                    code: VALIDATION_ERRORS.to_string(),
                    message: format!(
                        "Stored with {} validation errors; {} of {} rows valid",
                        result.error_count(),
                        result.valid_rows,
                        result.total_rows
                    ),
                    details: Some(ErrorDetails::from_validation(result)),
                }),
            )
        };

        Self {
            status,
            operation_id: Some(operation_id),
            processed_rows: Some(result.valid_rows),
            total_rows: Some(result.total_rows),
            error,
        }
    }

    pub(crate) fn rejected(operation_id: Uuid, result: &ValidationResult) -> Self {
        Self {
            status: UploadStatus::Failed,
            operation_id: Some(operation_id),
            processed_rows: Some(0),
            total_rows: Some(result.total_rows),
            error: Some(ErrorBody {
                code: VALIDATION_FAILED.to_string(),
                message: format!("File failed validation with {} errors", result.error_count()),
                details: Some(ErrorDetails::from_validation(result)),
            }),
        }
    }

    /// Failure payload for an error that stopped the pipeline.
    pub fn from_error(error: &AppError) -> Self {
        Self {
            status: UploadStatus::Failed,
            operation_id: None,
            processed_rows: None,
            total_rows: None,
            error: Some(ErrorBody {
                code: error.error_code().to_string(),
                message: error.client_message(),
                details: None,
            }),
        }
    }

    /// True when the file was rejected by validation.
    pub fn is_rejected(&self) -> bool {
        self.status == UploadStatus::Failed
    }
}
