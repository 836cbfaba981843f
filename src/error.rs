// src/error.rs

use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde_json::json;
use thiserror::Error;

/// Global Application Error Enum.
/// Every core operation fails with one of these kinds; the HTTP layer only
/// decides the status code.
#[derive(Debug, Error)]
pub enum AppError {
    /// Persistence failure (I/O, constraint violation). 500.
    #[error("internal server error: {0}")]
    InternalServerError(String),

    /// Invalid input, e.g. a question outside the session's test. 400.
    #[error("bad request: {0}")]
    BadRequest(String),

    /// 401 Unauthorized
    #[error("unauthorized: {0}")]
    AuthError(String),

    /// Authenticated, but not allowed to touch this resource. 403.
    #[error("forbidden: {0}")]
    Forbidden(String),

    /// 404 Not Found
    #[error("not found: {0}")]
    NotFound(String),

    /// Test is not currently open for attempts. 403.
    #[error("unavailable: {0}")]
    Unavailable(String),

    /// Operation not allowed in the session's current state. 409.
    #[error("invalid state: {0}")]
    InvalidState(String),
}

impl AppError {
    pub fn status_code(&self) -> StatusCode {
        match self {
            AppError::InternalServerError(_) => StatusCode::INTERNAL_SERVER_ERROR,
            AppError::BadRequest(_) => StatusCode::BAD_REQUEST,
            AppError::AuthError(_) => StatusCode::UNAUTHORIZED,
            AppError::Forbidden(_) | AppError::Unavailable(_) => StatusCode::FORBIDDEN,
            AppError::NotFound(_) => StatusCode::NOT_FOUND,
            AppError::InvalidState(_) => StatusCode::CONFLICT,
        }
    }
}

/// Converts the error into a JSON response with appropriate HTTP status code.
impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let status = self.status_code();
        let error_message = match self {
            AppError::InternalServerError(msg) => {
                tracing::error!("Internal Server Error: {}", msg);
                "Internal Server Error".to_string()
            }
            AppError::BadRequest(msg)
            | AppError::AuthError(msg)
            | AppError::Forbidden(msg)
            | AppError::NotFound(msg)
            | AppError::Unavailable(msg)
            | AppError::InvalidState(msg) => msg,
        };
        let body = Json(json!({
            "error": error_message,
        }));

        (status, body).into_response()
    }
}

/// Converts `sqlx::Error` into `AppError::InternalServerError`.
/// Allows using `?` operator on database queries.
impl From<sqlx::Error> for AppError {
    fn from(err: sqlx::Error) -> Self {
        AppError::InternalServerError(err.to_string())
    }
}

impl From<validator::ValidationErrors> for AppError {
    fn from(err: validator::ValidationErrors) -> Self {
        AppError::BadRequest(err.to_string())
    }
}
