use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt::{Debug, Display, Formatter, Result as FmtResult};
use std::str::FromStr;
use uuid::Uuid;

use crate::constants::DEFAULT_PATH_TEMPLATE;
use crate::storage_types::StorageBackend;

#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AccessMode {
    #[default]
    Private,
    PublicRead,
}

impl Display for AccessMode {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            AccessMode::Private => write!(f, "private"),
            AccessMode::PublicRead => write!(f, "public_read"),
        }
    }
}

impl FromStr for AccessMode {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "private" => Ok(AccessMode::Private),
            "public_read" | "public-read" => Ok(AccessMode::PublicRead),
            _ => Err(anyhow::anyhow!("Invalid access mode: {}", s)),
        }
    }
}

/// Where and how accepted files are persisted. Shared by any number of upload configurations.
#[derive(Clone, Serialize, Deserialize, PartialEq)]
pub struct StorageConfiguration {
    pub id: Uuid,
    pub name: String,
    pub backend: StorageBackend,
    pub base_path: String,
    /// Key template, e.g. `{base_path}/{organization_id}/{date}/{uuid}.{extension}`
    pub path_template: String,
    pub access_mode: AccessMode,
    pub bucket: Option<String>,
    pub region: Option<String>,
    pub endpoint: Option<String>,
    pub access_key_id: Option<String>,
    #[serde(skip_serializing, default)]
    pub secret_access_key: Option<String>,
    pub public_base_url: Option<String>,
    /// Filesystem root for the local backend
    pub local_root: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl StorageConfiguration {
    /// Local filesystem storage under `root`, keys prefixed with `uploads`.
    pub fn local(root: impl Into<String>) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4(),
            name: "local".to_string(),
            backend: StorageBackend::Local,
            base_path: "uploads".to_string(),
            path_template: DEFAULT_PATH_TEMPLATE.to_string(),
            access_mode: AccessMode::Private,
            bucket: None,
            region: None,
            endpoint: None,
            access_key_id: None,
            secret_access_key: None,
            public_base_url: None,
            local_root: Some(root.into()),
            created_at: now,
            updated_at: now,
        }
    }
}

impl Debug for StorageConfiguration {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        f.debug_struct("StorageConfiguration")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("backend", &self.backend)
            .field("base_path", &self.base_path)
            .field("path_template", &self.path_template)
            .field("access_mode", &self.access_mode)
            .field("bucket", &self.bucket)
            .field("region", &self.region)
            .field("endpoint", &self.endpoint)
            .field("access_key_id", &self.access_key_id)
            .field(
                "secret_access_key",
                &self.secret_access_key.as_ref().map(|_| "[REDACTED]"),
            )
            .field("public_base_url", &self.public_base_url)
            .field("local_root", &self.local_root)
            .finish()
    }
}
