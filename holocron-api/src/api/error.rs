//! API error type
//!
//! Response bodies carry only a short code; detail goes to the server log.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde_json::json;
use thiserror::Error;
use tracing::{debug, error};

#[derive(Debug, Error)]
pub enum ApiError {
    /// 404
    #[error("Not found: {0}")]
    NotFound(String),

    /// 400
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// 500
    #[error("Internal error: {0}")]
    Internal(String),
}

impl From<holocron_common::Error> for ApiError {
    fn from(err: holocron_common::Error) -> Self {
        match err {
            holocron_common::Error::NotFound(what) => ApiError::NotFound(what),
            holocron_common::Error::InvalidInput(msg) => ApiError::BadRequest(msg),
            other => ApiError::Internal(other.to_string()),
        }
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code) = match &self {
            ApiError::NotFound(what) => {
                debug!("Not found: {}", what);
                (StatusCode::NOT_FOUND, "not_found")
            }
            ApiError::BadRequest(msg) => {
                debug!("Bad request: {}", msg);
                (StatusCode::BAD_REQUEST, "bad_request")
            }
            ApiError::Internal(msg) => {
                error!("Request failed: {}", msg);
                (StatusCode::INTERNAL_SERVER_ERROR, "internal")
            }
        };

        (status, Json(json!({ "error": code }))).into_response()
    }
}

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;
