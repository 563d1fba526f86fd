//! Data models for the ingestion pipeline
//!
//! Tenant-owned configuration (upload configurations, column rules, storage configurations),
//! the immutable ledger record written per attempt, and the validation error shape shared by
//! the engine, the ledger payload and the HTTP response.

mod caller;
mod column_rule;
mod storage_configuration;
mod upload_configuration;
mod upload_operation;
mod validation;

pub use caller::*;
pub use column_rule::*;
pub use storage_configuration::*;
pub use upload_configuration::*;
pub use upload_operation::*;
pub use validation::*;
