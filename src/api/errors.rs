use axum::Json;
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;

use crate::error::RelayError;

/// Structured API error that serializes to JSON.
#[derive(Debug)]
pub enum ApiError {
    UnknownEvent(String),
    MalformedPayload(RelayError),
    InternalError(String),
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorResponse {
    error: ErrorDetail,
}

#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
struct ErrorDetail {
    code: String,
    message: String,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message) = match self {
            ApiError::UnknownEvent(name) => (
                StatusCode::BAD_REQUEST,
                "UNKNOWN_EVENT",
                format!("Unknown event: {name}"),
            ),
            ApiError::MalformedPayload(err) => {
                (StatusCode::BAD_REQUEST, "MALFORMED_PAYLOAD", err.to_string())
            }
            ApiError::InternalError(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg)
            }
        };

        let body = ErrorResponse {
            error: ErrorDetail {
                code: code.to_string(),
                message,
            },
        };

        (status, Json(body)).into_response()
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        match err {
            RelayError::UnknownEvent(name) => ApiError::UnknownEvent(name),
            err @ RelayError::MalformedPayload { .. } => ApiError::MalformedPayload(err),
            other => ApiError::InternalError(other.to_string()),
        }
    }
}
