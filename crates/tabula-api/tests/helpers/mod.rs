//! Test helpers: build AppState and router over in-memory stores.
//!
//! Run with `cargo test -p tabula-api`. No database or object store is needed.

use axum_test::multipart::{MultipartForm, Part};
use axum_test::TestServer;
use chrono::Duration;
use std::sync::Arc;
use tabula_api::constants::API_PREFIX;
use tabula_api::setup::{routes, services};
use tabula_api::JwtAuthenticator;
use tabula_core::models::{
    CallerIdentity, ColumnRule, DataType, StorageConfiguration, UploadConfiguration,
};
use tabula_core::{BaseConfig, Config, IngestConfig};
use tabula_db::test_helpers::{InMemoryConfigurationStore, InMemoryOperationLedger};
use tabula_storage::test_helpers::{RecordingStorage, StaticResolver};
use tabula_storage::StorageGateway;
use uuid::Uuid;

pub const TEST_JWT_SECRET: &str = "test-jwt-secret-at-least-32-characters-long";

/// API path with version prefix (e.g. `/api/v0/uploads`).
pub fn api_path(path: &str) -> String {
    format!("{}{}", API_PREFIX, path)
}

pub fn test_config() -> Config {
    Config(Box::new(IngestConfig {
        base: BaseConfig {
            server_port: 0,
            cors_origins: vec!["http://localhost:3000".to_string()],
            db_max_connections: 1,
            db_timeout_seconds: 1,
            jwt_secret: TEST_JWT_SECRET.to_string(),
            environment: "test".to_string(),
            log_format: "text".to_string(),
        },
        database_url: "postgres://unused".to_string(),
        max_request_body_bytes: 5 * 1024 * 1024,
        config_lookup_timeout_secs: 5,
        storage_timeout_secs: 5,
        http_concurrency_limit: 64,
    }))
}

/// Test application: server plus handles on the in-memory collaborators.
pub struct TestApp {
    pub server: TestServer,
    pub configurations: InMemoryConfigurationStore,
    pub ledger: InMemoryOperationLedger,
    pub storage: RecordingStorage,
    pub caller: CallerIdentity,
    pub token: String,
}

impl TestApp {
    pub fn client(&self) -> &TestServer {
        &self.server
    }

    /// Token for another user of the same organization.
    pub fn token_for(&self, caller: CallerIdentity) -> String {
        JwtAuthenticator::new(TEST_JWT_SECRET)
            .issue(caller, Duration::hours(1))
            .unwrap()
    }

    /// Register a configuration with a single required email column.
    pub fn email_configuration(&self, allow_partial: bool) -> UploadConfiguration {
        let storage = StorageConfiguration::local("/unused");
        let mut config =
            UploadConfiguration::new(self.caller.organization_id, "contacts", storage.id);
        config.max_file_size = 1_000_000;
        config.allow_partial_upload = allow_partial;
        let columns = vec![
            ColumnRule::new(config.id, "email", DataType::Email, 1)
                .required()
                .values_required(),
            ColumnRule::new(config.id, "name", DataType::String, 2).with_length(None, Some(20)),
        ];
        self.configurations.add_storage(storage);
        self.configurations.add_configuration(config.clone(), columns);
        config
    }

    pub async fn upload(
        &self,
        token: Option<&str>,
        config_id: Option<&str>,
        file_name: &str,
        body: &'static str,
    ) -> axum_test::TestResponse {
        let part = Part::bytes(bytes::Bytes::from_static(body.as_bytes()))
            .file_name(file_name.to_string())
            .mime_type("text/csv");
        let mut form = MultipartForm::new().add_part("file", part);
        if let Some(id) = config_id {
            form = form.add_text("config_id", id.to_string());
        }

        let mut request = self.server.post(&api_path("/uploads")).multipart(form);
        if let Some(token) = token {
            request = request.add_header("Authorization", format!("Bearer {}", token));
        }
        request.await
    }
}

pub fn setup_test_app() -> TestApp {
    setup_test_app_with_storage(RecordingStorage::new())
}

pub fn setup_test_app_with_storage(storage: RecordingStorage) -> TestApp {
    let config = test_config();
    let configurations = InMemoryConfigurationStore::new();
    let ledger = InMemoryOperationLedger::new();
    let gateway = StorageGateway::new(Arc::new(StaticResolver::new(Arc::new(storage.clone()))));
    let authenticator = JwtAuthenticator::new(TEST_JWT_SECRET);

    let caller = CallerIdentity::new(Uuid::new_v4(), Uuid::new_v4());
    let token = authenticator.issue(caller, Duration::hours(1)).unwrap();

    let state = services::build_state(
        &config,
        None,
        Arc::new(configurations.clone()),
        Arc::new(ledger.clone()),
        gateway,
        Arc::new(authenticator),
    );
    let app = routes::setup_routes(&config, state).expect("Failed to build routes");
    let server = TestServer::new(app.into_make_service()).expect("Failed to create test server");

    TestApp {
        server,
        configurations,
        ledger,
        storage,
        caller,
        token,
    }
}
