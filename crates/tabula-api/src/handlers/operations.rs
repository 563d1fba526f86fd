//! Read-only ledger lookups for downstream reporting

use std::sync::Arc;

use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde::Deserialize;
use tabula_core::models::UploadOperation;
use tabula_core::AppError;
use uuid::Uuid;

use super::require_caller;
use crate::constants::DEFAULT_OPERATIONS_LIMIT;
use crate::error::HttpAppError;
use crate::state::AppState;

#[derive(Debug, Deserialize)]
pub struct OperationsQuery {
    pub config_id: Option<Uuid>,
    pub user_id: Option<Uuid>,
    pub limit: Option<i64>,
}

/// `GET /operations?config_id=..` or `?user_id=..`, newest first, scoped to the caller's
/// organization.
#[tracing::instrument(skip(state, headers))]
pub async fn list_operations(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Query(query): Query<OperationsQuery>,
) -> Result<Json<Vec<UploadOperation>>, HttpAppError> {
    let caller = require_caller(&state, &headers).await?;
    let limit = query.limit.unwrap_or(DEFAULT_OPERATIONS_LIMIT);
    let ledger = &state.db.ledger;

    let operations = match (query.config_id, query.user_id) {
        (Some(config_id), None) => {
            ledger
                .list_by_configuration(caller.organization_id, config_id, limit)
                .await?
        }
        (None, Some(user_id)) => {
            ledger
                .list_by_user(caller.organization_id, user_id, limit)
                .await?
        }
        _ => {
            return Err(AppError::MissingParameters(
                "Exactly one of config_id or user_id is required".to_string(),
            )
            .into())
        }
    };

    Ok(Json(operations))
}

/// `GET /operations/{id}`
#[tracing::instrument(skip(state, headers))]
pub async fn get_operation(
    State(state): State<Arc<AppState>>,
    headers: HeaderMap,
    Path(id): Path<Uuid>,
) -> Result<Json<UploadOperation>, HttpAppError> {
    let caller = require_caller(&state, &headers).await?;

    let operation = state
        .db
        .ledger
        .get(caller.organization_id, id)
        .await?
        .ok_or_else(|| AppError::NotFound(format!("Upload operation {} not found", id)))?;

    Ok(Json(operation))
}
