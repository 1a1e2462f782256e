//! HTTP request handlers.

mod anchor;
mod health;
mod ingest;
mod query;

pub use anchor::force_anchor;
pub use health::health_check;
pub use ingest::receive_event;
pub use query::{get_proof, verify_event};

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::Serialize;

/// Error response with code and message.
#[derive(Debug, Serialize)]
pub struct ErrorResponse {
    /// Error details including code and message.
    pub error: ErrorDetail,
}

/// Detailed error information.
#[derive(Debug, Serialize)]
pub struct ErrorDetail {
    /// Stable machine-readable error code.
    pub code: &'static str,
    /// Human-readable error description.
    pub message: String,
}

/// Creates a standardized error response.
pub(crate) fn error_response(
    status: StatusCode,
    code: &'static str,
    message: impl Into<String>,
) -> Response {
    (status, Json(ErrorResponse { error: ErrorDetail { code, message: message.into() } }))
        .into_response()
}
