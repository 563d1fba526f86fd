//! File submission endpoint

use std::sync::Arc;

use axum::{
    extract::{Multipart, State},
    http::HeaderMap,
    response::Response,
};
use tabula_core::AppError;
use tabula_services::UploadRequest;
use tokio_util::sync::CancellationToken;

use crate::auth::bearer_token;
use crate::error::upload_response;
use crate::state::AppState;
use crate::utils::upload::{extract_upload_form, UploadForm};

/// `POST /uploads`: multipart form with `file` and `config_id`.
///
/// The pipeline runs on its own task. If the client goes away the handler future is
/// dropped, which cancels the token; the pipeline stops at its checkpoint unless the
/// storage write has already begun.
#[tracing::instrument(skip_all)]
pub async fn submit_upload(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    multipart: Multipart,
) -> Response {
    let caller = state
        .authenticator
        .authenticate(bearer_token(&headers))
        .await;

    // The body is not read for unauthenticated callers.
    let form = if caller.is_some() {
        match extract_upload_form(multipart).await {
            Ok(form) => form,
            Err(e) => return upload_response(Err(e)),
        }
    } else {
        UploadForm::default()
    };

    let request = UploadRequest {
        file: form.file,
        config_id: form.config_id,
        caller,
    };

    let cancel = CancellationToken::new();
    let guard = cancel.clone().drop_guard();
    let orchestrator = state.uploads.orchestrator.clone();

    let outcome = tokio::spawn(async move { orchestrator.submit(request, cancel).await })
        .await
        .unwrap_or_else(|e| Err(AppError::Internal(format!("Upload task failed: {}", e))));
    guard.disarm();

    upload_response(outcome)
}
