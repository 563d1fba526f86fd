//! Template download endpoint

use std::sync::Arc;

use axum::{
    extract::{Path, State},
    http::{header, HeaderMap, HeaderValue},
    response::IntoResponse,
};
use tabula_core::AppError;
use tabula_processing::{build_template, template_file_name};
use uuid::Uuid;

use super::require_caller;
use crate::error::HttpAppError;
use crate::state::AppState;

/// `GET /configurations/{id}/template`: a file holding only the expected header line.
#[tracing::instrument(skip(state, headers))]
pub async fn download_template(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<String>,
) -> Result<impl IntoResponse, HttpAppError> {
    let caller = require_caller(&state, &headers).await?;
    let id = Uuid::parse_str(&id)
        .map_err(|_| AppError::InvalidConfigId(format!("Invalid configuration id: {}", id)))?;

    let configuration = state
        .db
        .configurations
        .get_upload_configuration(id)
        .await?
        .filter(|c| c.is_resolvable_for(caller.organization_id))
        .ok_or_else(|| AppError::InvalidConfig(format!("Upload configuration {} not found", id)))?;

    let columns = state.db.configurations.list_column_rules(id).await?;
    let body = build_template(&configuration, &columns)?;

    let disposition = format!(
        "attachment; filename=\"{}\"",
        template_file_name(&configuration)
    );
    let disposition = HeaderValue::from_str(&disposition)
        .map_err(|e| AppError::Internal(format!("Invalid content disposition: {}", e)))?;

    Ok((
        [
            (header::CONTENT_TYPE, HeaderValue::from_static("text/csv; charset=utf-8")),
            (header::CONTENT_DISPOSITION, disposition),
        ],
        body,
    ))
}
