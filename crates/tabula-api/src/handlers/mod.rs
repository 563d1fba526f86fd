pub mod operations;
pub mod templates;
pub mod uploads;

use std::sync::Arc;

use axum::http::HeaderMap;
use tabula_core::models::CallerIdentity;
use tabula_core::AppError;

use crate::auth::bearer_token;
use crate::state::AppState;

/// Resolve the caller or fail with `UNAUTHORIZED`.
pub(crate) async fn require_caller(
    state: &Arc<AppState>,
    headers: &HeaderMap,
) -> Result<CallerIdentity, AppError> {
    state
        .authenticator
        .authenticate(bearer_token(headers))
        .await
        .ok_or_else(|| AppError::Unauthorized("Authentication required".to_string()))
}
