use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::{ColumnRule, StorageConfiguration};
use crate::constants::DEFAULT_DELIMITER;

/// Tenant-owned rule set describing which files are accepted and where they are stored.
///
/// An inactive configuration is soft-deleted: it never resolves for submission, but ledger
/// records referencing it stay queryable.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct UploadConfiguration {
    pub id: Uuid,
    pub organization_id: Uuid,
    pub name: String,
    /// Lowercase, without the leading dot
    pub allowed_extensions: Vec<String>,
    pub delimiter: char,
    /// Bytes
    pub max_file_size: i64,
    pub max_row_count: Option<i64>,
    pub min_data_rows: i64,
    pub allow_partial_upload: bool,
    pub is_active: bool,
    pub storage_configuration_id: Uuid,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl UploadConfiguration {
    pub fn new(
        organization_id: Uuid,
        name: impl Into<String>,
        storage_configuration_id: Uuid,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            organization_id,
            name: name.into(),
            allowed_extensions: vec!["csv".to_string()],
            delimiter: DEFAULT_DELIMITER,
            max_file_size: 10 * 1024 * 1024,
            max_row_count: None,
            min_data_rows: 0,
            allow_partial_upload: false,
            is_active: true,
            storage_configuration_id,
            created_at: now,
            updated_at: now,
        }
    }

    /// Case-insensitive membership test; `extension` is given without the dot.
    pub fn allows_extension(&self, extension: &str) -> bool {
        self.allowed_extensions
            .iter()
            .any(|allowed| allowed.trim_start_matches('.').eq_ignore_ascii_case(extension))
    }

    /// Whether the configuration may be used by the given tenant.
    pub fn is_resolvable_for(&self, organization_id: Uuid) -> bool {
        self.is_active && self.organization_id == organization_id
    }
}

/// Everything needed to validate and store one submission.
#[derive(Debug, Clone)]
pub struct ConfigurationBundle {
    pub configuration: UploadConfiguration,
    /// Ordered by position
    pub columns: Vec<ColumnRule>,
    pub storage: StorageConfiguration,
}
