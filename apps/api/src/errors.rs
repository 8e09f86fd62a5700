use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;

/// Application-level error type.
/// Implements `IntoResponse` so Axum handlers can return `Result<T, AppError>`.
#[derive(Debug, Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Unprocessable entity: {0}")]
    UnprocessableEntity(String),

    /// Too little profile or university data to produce any fit score.
    #[error("Insufficient data: {0}")]
    InsufficientData(String),

    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    #[error("LLM error: {0}")]
    Llm(String),

    #[error("Embedding error: {0}")]
    Embedding(String),

    #[error("S3 error: {0}")]
    S3(String),

    #[error("Internal server error: {0}")]
    Internal(#[from] anyhow::Error),
}

impl AppError {
    /// HTTP status and stable machine-readable code for this error.
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            AppError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
            AppError::Validation(_) => (StatusCode::BAD_REQUEST, "VALIDATION_ERROR"),
            AppError::Conflict(_) => (StatusCode::CONFLICT, "CONFLICT"),
            AppError::UnprocessableEntity(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "UNPROCESSABLE_ENTITY")
            }
            AppError::InsufficientData(_) => {
                (StatusCode::UNPROCESSABLE_ENTITY, "INSUFFICIENT_DATA")
            }
            AppError::Database(_) => (StatusCode::INTERNAL_SERVER_ERROR, "DATABASE_ERROR"),
            AppError::Llm(_) => (StatusCode::INTERNAL_SERVER_ERROR, "LLM_ERROR"),
            AppError::Embedding(_) => (StatusCode::BAD_GATEWAY, "EMBEDDING_ERROR"),
            AppError::S3(_) => (StatusCode::INTERNAL_SERVER_ERROR, "S3_ERROR"),
            AppError::Internal(_) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR"),
        }
    }

    /// Message safe to show to API callers. Upstream failures are logged and masked.
    fn public_message(&self) -> String {
        match self {
            AppError::NotFound(msg)
            | AppError::Validation(msg)
            | AppError::Conflict(msg)
            | AppError::UnprocessableEntity(msg)
            | AppError::InsufficientData(msg) => msg.clone(),
            AppError::Database(e) => {
                tracing::error!("Database error: {e}");
                "A database error occurred".to_string()
            }
            AppError::Llm(msg) => {
                tracing::error!("LLM error: {msg}");
                "An AI processing error occurred".to_string()
            }
            AppError::Embedding(msg) => {
                tracing::error!("Embedding error: {msg}");
                "The embedding service is unavailable".to_string()
            }
            AppError::S3(msg) => {
                tracing::error!("S3 error: {msg}");
                "A storage error occurred".to_string()
            }
            AppError::Internal(e) => {
                tracing::error!("Internal error: {e:?}");
                "An internal server error occurred".to_string()
            }
        }
    }
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        let message = self.public_message();

        let body = Json(json!({
            "error": {
                "code": code,
                "message": message
            }
        }));

        (status, body).into_response()
    }
}
