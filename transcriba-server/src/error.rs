//! HTTP error mapping
//!
//! Every handler returns `ApiResult`; domain errors are turned into a status
//! code and a `{"error": {"code", "message"}}` body in one place.

use axum::{
    extract::rejection::{JsonRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::error;
use transcriba_common::Error as DomainError;

/// API error type
#[derive(Debug, Error)]
pub enum ApiError {
    /// Malformed body, query string or path parameter (400)
    #[error("Invalid request: {0}")]
    BadRequest(String),

    /// Error raised by a domain operation
    #[error(transparent)]
    Domain(#[from] DomainError),
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::BadRequest(rejection.body_text())
    }
}

impl ApiError {
    /// Status and machine readable code for this error
    pub fn status_and_code(&self) -> (StatusCode, &'static str) {
        match self {
            ApiError::BadRequest(_) => (StatusCode::BAD_REQUEST, "BAD_REQUEST"),
            ApiError::Domain(err) => match err {
                DomainError::NotFound(_) => (StatusCode::NOT_FOUND, "NOT_FOUND"),
                DomainError::WrongFormat => (StatusCode::BAD_REQUEST, "WRONG_FORMAT"),
                DomainError::WrongInput(_) => (StatusCode::BAD_REQUEST, "WRONG_INPUT"),
                DomainError::Unauthorized(_) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED"),
                DomainError::Forbidden => (StatusCode::FORBIDDEN, "FORBIDDEN"),
                DomainError::Duplicate(_) => (StatusCode::CONFLICT, "DUPLICATE"),
                DomainError::Replay => (StatusCode::CONFLICT, "REPLAY"),
                DomainError::Occupied => (StatusCode::CONFLICT, "OCCUPIED"),
                DomainError::BusyUser => (StatusCode::CONFLICT, "BUSY_USER"),
                DomainError::WrongRoleOrder
                | DomainError::Database(_)
                | DomainError::Io(_)
                | DomainError::Json(_)
                | DomainError::Config(_)
                | DomainError::Remote(_)
                | DomainError::Internal(_) => {
                    (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR")
                }
            },
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = self.status_and_code();
        if status.is_server_error() {
            error!("Request failed: {}", self);
        }

        let body = Json(json!({
            "error": {
                "code": code,
                "message": self.to_string(),
            }
        }));

        (status, body).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
