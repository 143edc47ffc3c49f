//! Bearer token authentication middleware
//!
//! Applied to protected routes only; `/health` stays public. An empty token
//! list disables checking entirely.

use axum::{
    extract::{Request, State},
    http::{header, StatusCode},
    middleware::Next,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use tracing::warn;

use crate::AppState;

pub async fn auth_middleware(
    State(state): State<AppState>,
    request: Request,
    next: Next,
) -> Result<Response, AuthError> {
    if state.auth_tokens.is_empty() {
        return Ok(next.run(request).await);
    }

    let header_value = request
        .headers()
        .get(header::AUTHORIZATION)
        .ok_or(AuthError::MissingCredentials)?
        .to_str()
        .map_err(|_| AuthError::InvalidCredentials)?;

    let token = header_value
        .strip_prefix("Bearer ")
        .map(str::trim)
        .filter(|t| !t.is_empty())
        .ok_or(AuthError::InvalidCredentials)?;

    if !state.auth_tokens.contains(token) {
        warn!(path = %request.uri().path(), "Rejected request with unknown bearer token");
        return Err(AuthError::InvalidCredentials);
    }

    Ok(next.run(request).await)
}

/// Authentication failures (always 401)
#[derive(Debug)]
pub enum AuthError {
    MissingCredentials,
    InvalidCredentials,
}

impl IntoResponse for AuthError {
    fn into_response(self) -> Response {
        let message = match self {
            AuthError::MissingCredentials => "Missing bearer token",
            AuthError::InvalidCredentials => "Invalid bearer token",
        };

        let body = Json(json!({
            "error": "UNAUTHORIZED",
            "message": message,
        }));

        (
            StatusCode::UNAUTHORIZED,
            [(header::WWW_AUTHENTICATE, "Bearer")],
            body,
        )
            .into_response()
    }
}
