//! Wiring of repositories, storage and the orchestrator into `AppState`

use std::sync::Arc;

use sqlx::PgPool;
use tabula_core::Config;
use tabula_db::{ConfigurationRepository, ConfigurationStore, OperationLedger, OperationRepository};
use tabula_services::{Authenticator, OrchestratorSettings, UploadOrchestrator};
use tabula_storage::StorageGateway;

use crate::auth::JwtAuthenticator;
use crate::state::{AppState, DbState, UploadState};

/// Production state: Postgres-backed stores, factory-built storage backends, JWT callers.
pub fn initialize_services(config: &Config, pool: PgPool) -> Arc<AppState> {
    let configurations: Arc<dyn ConfigurationStore> =
        Arc::new(ConfigurationRepository::new(pool.clone()));
    let ledger: Arc<dyn OperationLedger> = Arc::new(OperationRepository::new(pool.clone()));

    build_state(
        config,
        Some(pool),
        configurations,
        ledger,
        StorageGateway::from_factory(),
        Arc::new(JwtAuthenticator::new(config.jwt_secret())),
    )
}

/// Assemble state from explicit collaborators.
pub fn build_state(
    config: &Config,
    pool: Option<PgPool>,
    configurations: Arc<dyn ConfigurationStore>,
    ledger: Arc<dyn OperationLedger>,
    gateway: StorageGateway,
    authenticator: Arc<dyn Authenticator>,
) -> Arc<AppState> {
    let orchestrator = UploadOrchestrator::new(
        configurations.clone(),
        ledger.clone(),
        gateway,
        OrchestratorSettings::from_config(config),
    );

    tracing::info!(
        lookup_timeout_secs = config.config_lookup_timeout().as_secs(),
        storage_timeout_secs = config.storage_timeout().as_secs(),
        "Upload orchestrator initialized"
    );

    Arc::new(AppState {
        db: DbState {
            pool,
            configurations,
            ledger,
        },
        uploads: UploadState { orchestrator },
        authenticator,
    })
}
