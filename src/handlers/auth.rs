use axum::extract::rejection::JsonRejection;
use axum::extract::State;
use axum::http::StatusCode;
use axum::response::Response;
use axum::Json;
use serde::Serialize;

use crate::auth::{LoginRequest, RegisterRequest};
use crate::state::AppState;
use crate::utils::error::AppError;
use crate::utils::response::success;

#[derive(Serialize)]
struct RegisteredOperator {
    id: i64,
}

/// `POST /api/v1/operator/login`
pub async fn login(
    State(state): State<AppState>,
    payload: Result<Json<LoginRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Unreadable login body");
        AppError::BadRequest("Invalid request body".to_string())
    })?;

    let response = state.sessions.authenticate(request).await?;
    Ok(success(response, "Login Success!"))
}

/// `POST /api/v1/operator/register`, mounted only when registration is
/// enabled.
pub async fn register(
    State(state): State<AppState>,
    payload: Result<Json<RegisterRequest>, JsonRejection>,
) -> Result<Response, AppError> {
    let Json(request) = payload.map_err(|rejection| {
        tracing::debug!(error = %rejection, "Unreadable registration body");
        AppError::BadRequest("Invalid request body".to_string())
    })?;

    let id = state.sessions.register(request).await?;
    let mut response = success(RegisteredOperator { id }, "Operator registered");
    *response.status_mut() = StatusCode::CREATED;
    Ok(response)
}
