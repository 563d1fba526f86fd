use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

use super::ValidationError;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum OperationStatus {
    Completed,
    PartiallyCompleted,
    Failed,
}

impl Display for OperationStatus {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            OperationStatus::Completed => write!(f, "completed"),
            OperationStatus::PartiallyCompleted => write!(f, "partially_completed"),
            OperationStatus::Failed => write!(f, "failed"),
        }
    }
}

impl FromStr for OperationStatus {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "completed" => Ok(OperationStatus::Completed),
            "partially_completed" => Ok(OperationStatus::PartiallyCompleted),
            "failed" => Ok(OperationStatus::Failed),
            _ => Err(anyhow::anyhow!("Invalid operation status: {}", s)),
        }
    }
}

/// Structured payload stored with every ledger record.
#[derive(Debug, Clone, Default, Serialize, Deserialize, PartialEq, Eq)]
pub struct OperationErrorPayload {
    pub errors: Vec<ValidationError>,
    pub valid_rows: i64,
    pub total_rows: i64,
    /// Set when the file validated but could not be stored
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub failure: Option<String>,
}

/// A ledger record about to be appended.
#[derive(Debug, Clone, PartialEq)]
pub struct NewUploadOperation {
    pub configuration_id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub file_name: String,
    /// Empty when nothing was stored
    pub storage_path: String,
    pub file_size: i64,
    pub total_rows: i64,
    pub valid_rows: i64,
    pub status: OperationStatus,
    pub error_count: i64,
    pub payload: OperationErrorPayload,
}

/// Immutable audit record of one upload attempt.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadOperation {
    pub id: Uuid,
    pub configuration_id: Uuid,
    pub organization_id: Uuid,
    pub user_id: Uuid,
    pub file_name: String,
    pub storage_path: String,
    pub file_size: i64,
    pub total_rows: i64,
    pub valid_rows: i64,
    pub status: OperationStatus,
    pub error_count: i64,
    pub payload: OperationErrorPayload,
    pub created_at: DateTime<Utc>,
}

impl UploadOperation {
    pub fn from_new(id: Uuid, new: NewUploadOperation, created_at: DateTime<Utc>) -> Self {
        Self {
            id,
            configuration_id: new.configuration_id,
            organization_id: new.organization_id,
            user_id: new.user_id,
            file_name: new.file_name,
            storage_path: new.storage_path,
            file_size: new.file_size,
            total_rows: new.total_rows,
            valid_rows: new.valid_rows,
            status: new.status,
            error_count: new.error_count,
            payload: new.payload,
            created_at,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_text_form() {
        assert_eq!(
            OperationStatus::PartiallyCompleted.to_string(),
            "partially_completed"
        );
        assert_eq!(
            "failed".parse::<OperationStatus>().unwrap(),
            OperationStatus::Failed
        );
        assert!("pending".parse::<OperationStatus>().is_err());
    }

    #[test]
    fn test_payload_omits_absent_failure() {
        let payload = OperationErrorPayload {
            errors: vec![],
            valid_rows: 2,
            total_rows: 2,
            failure: None,
        };
        let json = serde_json::to_value(&payload).unwrap();
        assert!(json.get("failure").is_none());
        assert_eq!(json["valid_rows"], 2);
    }
}
