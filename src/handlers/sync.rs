use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, State};
use axum::response::Response;
use axum::Json;

use crate::auth::AuthenticatedOperator;
use crate::models::sync::SyncPayload;
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::{empty_success, success};

/// `GET /api/v1/sync/:operator_id`
pub async fn pull(
    State(state): State<AppState>,
    AuthenticatedOperator(claims): AuthenticatedOperator,
    operator_id: Result<Path<i64>, PathRejection>,
) -> Result<Response, AppError> {
    let Path(operator_id) = operator_id
        .map_err(|_| AppError::BadRequest("Invalid operator id".to_string()))?;
    tracing::debug!(caller = claims.id, operator_id, "Pull requested");

    let records = state.sync.pull(operator_id).await?;
    Ok(success(records, "Request successful"))
}

/// `PUT /api/v1/sync`. The marks are attributed to the token's operator.
pub async fn push(
    State(state): State<AppState>,
    AuthenticatedOperator(claims): AuthenticatedOperator,
    payload: Result<Json<SyncPayload>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(payload) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Unreadable sync body");
        AppError::BadRequest("Invalid request payload".to_string())
    })?;

    state.sync.push(claims.id, payload.data).await?;
    Ok(empty_success("Attendance status updated successfully"))
}
