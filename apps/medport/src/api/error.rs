//! HTTP error mapping.
//!
//! | Error | Status | Body |
//! |-------|--------|------|
//! | validation | 400 | `{"errors": {"path": ["message"]}}` |
//! | unreadable JSON body | 400 (413 if too large) | `{"error": "..."}` |
//! | missing record | 404 | `{"error": "..."}` |
//! | bad or missing API key | 401 | `{"error": "unauthorized"}` |
//! | rate limited | 429 | `{"error": "rate limit exceeded"}` |
//! | storage / encoding | 500 | `{"error": "internal storage error"}` |

use axum::Json;
use axum::extract::rejection::{JsonRejection, PathRejection, QueryRejection};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use medport_core::MedportError;
use serde_json::json;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error(transparent)]
    Store(#[from] MedportError),

    /// The request could not be read (body, path or query).
    #[error("{message}")]
    BadRequest { status: StatusCode, message: String },

    #[error("unauthorized")]
    Unauthorized,

    #[error("rate limit exceeded")]
    RateLimited,
}

impl ApiError {
    fn bad_request(message: impl Into<String>) -> Self {
        Self::BadRequest {
            status: StatusCode::BAD_REQUEST,
            message: message.into(),
        }
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        // Oversized bodies keep their 413; everything else is a plain 400.
        let status = if rejection.status() == StatusCode::PAYLOAD_TOO_LARGE {
            StatusCode::PAYLOAD_TOO_LARGE
        } else {
            StatusCode::BAD_REQUEST
        };
        Self::BadRequest {
            status,
            message: rejection.body_text(),
        }
    }
}

impl From<PathRejection> for ApiError {
    fn from(rejection: PathRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl From<QueryRejection> for ApiError {
    fn from(rejection: QueryRejection) -> Self {
        Self::bad_request(rejection.body_text())
    }
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        match self {
            Self::Store(MedportError::Validation(errors)) => (
                StatusCode::BAD_REQUEST,
                Json(json!({ "errors": errors.to_map() })),
            )
                .into_response(),
            Self::Store(err @ MedportError::NotFound { .. }) => (
                StatusCode::NOT_FOUND,
                Json(json!({ "error": err.to_string() })),
            )
                .into_response(),
            Self::Store(err) => {
                tracing::error!(error = %err, "store failure");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    Json(json!({ "error": "internal storage error" })),
                )
                    .into_response()
            }
            Self::BadRequest { status, message } => {
                (status, Json(json!({ "error": message }))).into_response()
            }
            Self::Unauthorized => (
                StatusCode::UNAUTHORIZED,
                Json(json!({ "error": "unauthorized" })),
            )
                .into_response(),
            Self::RateLimited => (
                StatusCode::TOO_MANY_REQUESTS,
                Json(json!({ "error": "rate limit exceeded" })),
            )
                .into_response(),
        }
    }
}
