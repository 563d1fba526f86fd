//! Tabula Core Library
//!
//! This crate provides the domain model (upload configurations, column rules, storage
//! configurations, ledger records, validation errors), the error taxonomy, and the
//! environment configuration shared by every Tabula component.

pub mod config;
pub mod constants;
pub mod error;
pub mod models;
pub mod storage_types;

// Re-export commonly used types
pub use config::{BaseConfig, Config, IngestConfig};
pub use error::{AppError, ErrorMetadata, LogLevel};
pub use storage_types::StorageBackend;
