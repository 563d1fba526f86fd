//! Tabula Storage Library
//!
//! This crate persists accepted files. It provides the `Storage` trait with local filesystem
//! and S3 implementations, the path template renderer, and the `StorageGateway` the upload
//! orchestrator talks to.
//!
//! # Storage key format
//!
//! Keys are rendered from the storage configuration's path template. Supported tokens are
//! `{base_path}`, `{uuid}`, `{extension}`, `{organization_id}`, `{user_id}` and `{date}`
//! (`YYYY/MM/DD`). Rendered keys never contain `..` or a leading `/`, and empty segments
//! are collapsed. Key rendering is centralized in the `keys` module so all backends agree.

pub mod factory;
pub mod gateway;
pub mod keys;
#[cfg(feature = "storage-local")]
pub mod local;
#[cfg(feature = "storage-s3")]
pub mod s3;
#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;
pub mod traits;

// Re-export commonly used types
pub use factory::create_storage;
pub use gateway::{FactoryResolver, StorageGateway, StorageResolver, StoreContext, StoredObject};
#[cfg(feature = "storage-local")]
pub use local::LocalStorage;
#[cfg(feature = "storage-s3")]
pub use s3::S3Storage;
pub use tabula_core::StorageBackend;
pub use traits::{Storage, StorageError, StorageResult};
