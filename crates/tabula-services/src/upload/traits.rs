//! Collaborator traits consumed by the upload pipeline

use async_trait::async_trait;
use tabula_core::models::CallerIdentity;

/// Resolves the caller behind a request.
///
/// Implementations receive the raw credential presented with the request (for HTTP, the
/// bearer token) and return `None` when it is absent or not acceptable. The orchestrator
/// turns `None` into an `UNAUTHORIZED` failure.
#[async_trait]
pub trait Authenticator: Send + Sync {
    async fn authenticate(&self, credential: Option<&str>) -> Option<CallerIdentity>;
}
