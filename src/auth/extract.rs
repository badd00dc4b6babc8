use axum::async_trait;
use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;

use crate::auth::token::Claims;
use crate::state::AppState;
use crate::utils::error::AppError;

/// Operator behind the `Authorization: Bearer` token of a request.
#[derive(Debug, Clone)]
pub struct AuthenticatedOperator(pub Claims);

#[async_trait]
impl FromRequestParts<AppState> for AuthenticatedOperator {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self, Self::Rejection> {
        let token = parts
            .headers
            .get(AUTHORIZATION)
            .and_then(|value| value.to_str().ok())
            .and_then(|value| value.strip_prefix("Bearer "))
            .map(str::trim)
            .filter(|token| !token.is_empty())
            .ok_or_else(|| AppError::AuthError("Unauthorized".to_string()))?;

        let claims = state.sessions.authorize(token).await?;
        Ok(Self(claims))
    }
}
