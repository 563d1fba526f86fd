//! Tabula Services Library
//!
//! Business services composing the configuration store, validation engine, storage gateway
//! and operation ledger.

pub mod upload;

pub use upload::{
    Authenticator, ErrorBody, ErrorDetails, OrchestratorSettings, RowErrorSummary,
    UploadFile, UploadOrchestrator, UploadRequest, UploadResult, UploadStatus,
};
