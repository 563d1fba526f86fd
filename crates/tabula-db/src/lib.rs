//! Tabula Database Layer
//!
//! This crate provides the read-only configuration store and the append-only operation
//! ledger, both as traits with Postgres repositories behind them.

// Module declarations
pub mod db;
pub mod traits;

#[cfg(any(test, feature = "test-helpers"))]
pub mod test_helpers;

// Re-exports: Postgres repositories
pub use db::{ConfigurationRepository, OperationRepository};

// Re-exports: Store traits
pub use traits::{ConfigurationStore, OperationLedger};
