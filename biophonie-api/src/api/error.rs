//! HTTP error responses
//!
//! Every failure leaves the service as `{"message": "..."}` with the status
//! matching its kind. Internal failures are logged with their details and only a
//! generic message goes back to the client.

use axum::{
    extract::rejection::{JsonRejection, PathRejection, QueryRejection},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use biophonie_common::Error;
use serde_json::json;
use thiserror::Error;
use tracing::error;

pub const INTERNAL_MESSAGE: &str = "internal server error, please try again later";

#[derive(Debug, Error)]
pub enum ApiError {
    /// 400
    #[error("{0}")]
    Validation(String),

    /// 404
    #[error("{0}")]
    NotFound(String),

    /// 409, unique constraint violated
    #[error("{0}")]
    Conflict(String),

    /// 403
    #[error("{0}")]
    Forbidden(String),

    /// 401, missing or invalid credential, or not an admin
    #[error("{0}")]
    Unauthorized(String),

    /// 500, details are logged and never returned
    #[error("{0}")]
    Internal(String),
}

impl ApiError {
    pub fn status(&self) -> StatusCode {
        match self {
            ApiError::Validation(_) => StatusCode::BAD_REQUEST,
            ApiError::NotFound(_) => StatusCode::NOT_FOUND,
            ApiError::Conflict(_) => StatusCode::CONFLICT,
            ApiError::Forbidden(_) => StatusCode::FORBIDDEN,
            ApiError::Unauthorized(_) => StatusCode::UNAUTHORIZED,
            ApiError::Internal(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }
}

impl From<Error> for ApiError {
    fn from(err: Error) -> Self {
        if err.is_unique_violation() {
            return ApiError::Conflict("resource already exists".to_string());
        }
        match err {
            Error::InvalidInput(msg) => ApiError::Validation(msg),
            Error::NotFound(msg) => ApiError::NotFound(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        ApiError::Validation(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let status = self.status();
        let message = match self {
            ApiError::Internal(details) => {
                error!("Request failed: {}", details);
                INTERNAL_MESSAGE.to_string()
            }
            ApiError::Validation(msg)
            | ApiError::NotFound(msg)
            | ApiError::Conflict(msg)
            | ApiError::Forbidden(msg)
            | ApiError::Unauthorized(msg) => msg,
        };

        (status, Json(json!({ "message": message }))).into_response()
    }
}

/// Parse a path id: a non-negative integer that fits the store's id type
pub fn parse_id(raw: &str) -> Result<i64, ApiError> {
    raw.parse::<u64>()
        .ok()
        .and_then(|id| i64::try_from(id).ok())
        .ok_or_else(|| ApiError::Validation(format!("invalid id: {}", raw)))
}
