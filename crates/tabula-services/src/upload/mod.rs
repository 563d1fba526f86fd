//! Upload pipeline: authenticate -> resolve configuration -> validate -> store -> record

mod service;
mod traits;
mod types;

pub use service::UploadOrchestrator;
pub use traits::Authenticator;
pub use types::{
    ErrorBody, ErrorDetails, OrchestratorSettings, RowErrorSummary, UploadFile, UploadRequest,
    UploadResult, UploadStatus,
};
