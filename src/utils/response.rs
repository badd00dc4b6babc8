use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::Serialize;
use serde_json::Value;
use uuid::Uuid;

/// Envelope shared by every endpoint. `data` is only populated for 2xx
/// responses and `errors` only for the rest.
#[derive(Debug, Serialize)]
pub struct ApiResponse<T>
where
    T: Serialize,
{
    pub response_id: String,
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<T>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub errors: Option<Value>,
}

impl<T: Serialize> ApiResponse<T> {
    fn new(message: impl Into<String>, data: Option<T>, errors: Option<Value>) -> Self {
        Self {
            response_id: Uuid::new_v4().to_string(),
            message: message.into(),
            data,
            errors,
        }
    }
}

pub fn success<T>(data: T, message: impl Into<String>) -> Response
where
    T: Serialize,
{
    let body = ApiResponse::new(message, Some(data), None);
    (StatusCode::OK, Json(body)).into_response()
}

pub fn empty_success(message: impl Into<String>) -> Response {
    let body: ApiResponse<()> = ApiResponse::new(message, None, None);
    (StatusCode::OK, Json(body)).into_response()
}

pub fn error(message: impl Into<String>, errors: Option<Value>, status: StatusCode) -> Response {
    let body: ApiResponse<()> = ApiResponse::new(message, None, errors);
    (status, Json(body)).into_response()
}
