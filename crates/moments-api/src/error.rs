use axum::{
    Json,
    http::StatusCode,
    response::{IntoResponse, Response},
};
use serde::Serialize;
use tracing::error;

use moments_db::{DbError, ErrorCategory};
use moments_types::ValidationError;

/// Error envelope returned by every handler: `{ "code", "message" }`.
#[derive(Debug)]
pub struct ApiError {
    status: StatusCode,
    code: &'static str,
    message: String,
}

#[derive(Serialize)]
struct Envelope<'a> {
    code: &'a str,
    message: &'a str,
}

impl ApiError {
    pub fn new(status: StatusCode, code: &'static str, message: impl Into<String>) -> Self {
        Self {
            status,
            code,
            message: message.into(),
        }
    }

    pub fn forbidden(message: impl Into<String>) -> Self {
        Self::new(StatusCode::FORBIDDEN, "forbidden", message)
    }

    pub fn not_found(message: impl Into<String>) -> Self {
        Self::new(StatusCode::NOT_FOUND, "not_found", message)
    }

    pub fn internal() -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, "internal_error", "internal server error")
    }

    pub fn status(&self) -> StatusCode {
        self.status
    }

    pub fn code(&self) -> &'static str {
        self.code
    }
}

impl From<ValidationError> for ApiError {
    fn from(e: ValidationError) -> Self {
        Self::new(StatusCode::BAD_REQUEST, "invalid_request", e.to_string())
    }
}

impl From<DbError> for ApiError {
    fn from(e: DbError) -> Self {
        match e.category() {
            ErrorCategory::Validation => Self::new(StatusCode::BAD_REQUEST, "invalid_request", e.to_string()),
            ErrorCategory::NotFound => Self::not_found(e.to_string()),
            ErrorCategory::Conflict => Self::new(StatusCode::CONFLICT, "conflict", e.to_string()),
            ErrorCategory::Misuse => Self::new(StatusCode::BAD_REQUEST, "invalid_request", e.to_string()),
            ErrorCategory::Database => {
                error!("Database error: {}", e);
                Self::internal()
            }
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = Envelope {
            code: self.code,
            message: &self.message,
        };
        (self.status, Json(body)).into_response()
    }
}
