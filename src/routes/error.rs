use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde_json::json;

/// API-facing error taxonomy.
///
/// A missing AOI and an AOI owned by someone else are reported with the
/// same NotFound response so callers cannot probe for existence.
#[derive(Debug, thiserror::Error)]
pub enum ApiError {
    #[error("AOI not found")]
    NotFound,

    #[error("Access denied")]
    Forbidden,

    #[error("{0}")]
    InvalidState(String),

    #[error("Invalid request: {0}")]
    Validation(String),

    #[error("Internal error")]
    Internal(#[source] Box<dyn std::error::Error + Send + Sync>),
}

impl ApiError {
    fn status(&self) -> StatusCode {
        match self {
            ApiError::NotFound => StatusCode::NOT_FOUND,
            ApiError::Forbidden => StatusCode::FORBIDDEN,
            ApiError::InvalidState(_) | ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        if let ApiError::Internal(ref source) = self {
            tracing::error!(error = %source, "Request failed with internal error");
        }
        let body = Json(json!({ "error": self.to_string() }));
        (self.status(), body).into_response()
    }
}

impl From<sqlx::Error> for ApiError {
    fn from(e: sqlx::Error) -> Self {
        ApiError::Internal(Box::new(e))
    }
}

impl From<crate::services::queue::QueueError> for ApiError {
    fn from(e: crate::services::queue::QueueError) -> Self {
        ApiError::Internal(Box::new(e))
    }
}

impl From<crate::services::engine::EngineError> for ApiError {
    fn from(e: crate::services::engine::EngineError) -> Self {
        ApiError::Internal(Box::new(e))
    }
}

impl From<garde::Report> for ApiError {
    fn from(report: garde::Report) -> Self {
        ApiError::Validation(report.to_string())
    }
}
