//! Error types for seedling-elab HTTP API

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

use crate::services::ElaborationError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Unknown seed or no session (404)
    #[error("Not found: {0}")]
    NotFound(String),

    /// Session unknown, foreign or terminal (409)
    #[error("Session mismatch: {0}")]
    SessionMismatch(String),

    /// Invalid request body or field (400)
    #[error("Validation error: {0}")]
    Validation(String),

    /// seedling-common error
    #[error("Common error: {0}")]
    Common(#[from] seedling_common::Error),
}

impl From<ElaborationError> for ApiError {
    fn from(err: ElaborationError) -> Self {
        match err {
            ElaborationError::NotFound(msg) => ApiError::NotFound(msg),
            ElaborationError::SessionMismatch(msg) => ApiError::SessionMismatch(msg),
            ElaborationError::Validation(msg) => ApiError::Validation(msg),
            ElaborationError::Storage(err) => ApiError::Common(err),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message) = match self {
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg),
            ApiError::SessionMismatch(msg) => (StatusCode::CONFLICT, "SESSION_MISMATCH", msg),
            ApiError::Validation(msg) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR", msg),
            ApiError::Common(err) => {
                tracing::error!(error = %err, "Request failed");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "INTERNAL_ERROR",
                    "Internal storage error".to_string(),
                )
            }
        };

        let body = Json(json!({
            "error": error_code,
            "message": message,
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

#[cfg(test)]
mod tests {
    use super::*;
    use http_body_util::BodyExt;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = response.into_body().collect().await.unwrap().to_bytes();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_error_kinds_map_to_status_and_code() {
        let cases = [
            (ApiError::NotFound("x".into()), StatusCode::NOT_FOUND, "NOT_FOUND"),
            (ApiError::SessionMismatch("x".into()), StatusCode::CONFLICT, "SESSION_MISMATCH"),
            (ApiError::Validation("x".into()), StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
        ];

        for (error, status, code) in cases {
            let response = error.into_response();
            assert_eq!(response.status(), status);
            let body = body_json(response).await;
            assert_eq!(body["error"], code);
            assert_eq!(body["message"], "x");
        }
    }

    #[tokio::test]
    async fn test_storage_errors_hide_details() {
        let err = ApiError::from(ElaborationError::Storage(seedling_common::Error::Internal(
            "disk on fire".into(),
        )));
        let response = err.into_response();
        assert_eq!(response.status(), StatusCode::INTERNAL_SERVER_ERROR);

        let body = body_json(response).await;
        assert_eq!(body["error"], "INTERNAL_ERROR");
        assert!(!body["message"].as_str().unwrap().contains("disk"));
    }
}
