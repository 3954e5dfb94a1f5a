//! API error types and helpers.
//!
//! # Purpose and responsibility
//! Centralizes HTTP error construction so every portal endpoint answers with
//! the same `{code, message, request_id}` shape.
//!
//! # Key invariants and assumptions
//! - Status codes must align with the error category.
//! - Remote API failures surface as 502 with a Spanish user-facing message;
//!   details go to the log.
use crate::api::types::ErrorResponse;
use axum::Json;
use axum::http::StatusCode;
use axum::response::IntoResponse;
use metamapa_client::ClientError;

/// Structured API error returned by handlers.
#[derive(Debug)]
pub struct ApiError {
    pub status: StatusCode,
    pub body: ErrorResponse,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> axum::response::Response {
        (self.status, Json(self.body)).into_response()
    }
}

fn api_error(status: StatusCode, code: &str, message: &str) -> ApiError {
    ApiError {
        status,
        body: ErrorResponse {
            code: code.to_string(),
            message: message.to_string(),
            request_id: None,
        },
    }
}

pub fn api_not_found(message: &str) -> ApiError {
    api_error(StatusCode::NOT_FOUND, "not_found", message)
}

pub fn api_unauthorized(message: &str) -> ApiError {
    api_error(StatusCode::UNAUTHORIZED, "unauthorized", message)
}

pub fn api_forbidden(message: &str) -> ApiError {
    api_error(StatusCode::FORBIDDEN, "forbidden", message)
}

pub fn api_validation_error(message: &str) -> ApiError {
    api_error(StatusCode::BAD_REQUEST, "validation_error", message)
}

/// Build a 502 from a remote API failure.
///
/// `remote_prefix` is used when the API answered with an error message
/// (`"{prefix}: {message}"`); `connection_message` when it could not be
/// reached or its answer could not be read.
pub fn api_upstream(err: &ClientError, remote_prefix: &str, connection_message: &str) -> ApiError {
    tracing::error!(error = %err, "metamapa api call failed");
    let message = match err.remote_message() {
        Some(remote) => format!("{remote_prefix}: {remote}"),
        None if err.is_connection() => connection_message.to_string(),
        None => remote_prefix.to_string(),
    };
    api_error(StatusCode::BAD_GATEWAY, "upstream_error", &message)
}
