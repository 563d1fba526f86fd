//! Application state and sub-state extractors.
//!
//! Handlers extract the sub-state they need via Axum's `FromRef`.

use sqlx::PgPool;
use std::sync::Arc;
use tabula_db::{ConfigurationStore, OperationLedger};
use tabula_services::{Authenticator, UploadOrchestrator};

/// Stores read by the template and ledger endpoints, plus the pool for readiness checks.
#[derive(Clone)]
pub struct DbState {
    /// Absent when the stores are not backed by Postgres
    pub pool: Option<PgPool>,
    pub configurations: Arc<dyn ConfigurationStore>,
    pub ledger: Arc<dyn OperationLedger>,
}

#[derive(Clone)]
pub struct UploadState {
    pub orchestrator: UploadOrchestrator,
}

#[derive(Clone)]
pub struct AppState {
    pub db: DbState,
    pub uploads: UploadState,
    pub authenticator: Arc<dyn Authenticator>,
}

// ----- FromRef for sub-state extraction -----

impl axum::extract::FromRef<Arc<AppState>> for DbState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.db.clone()
    }
}

impl axum::extract::FromRef<Arc<AppState>> for UploadState {
    fn from_ref(state: &Arc<AppState>) -> Self {
        state.uploads.clone()
    }
}
