//! API error types and JSON error response formatting.
//!
//! ApiError gives every endpoint the same JSON error shape and maps
//! upstream failures onto HTTP status codes.

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::Json;
use serde::{Deserialize, Serialize};

use crate::upstream::UpstreamError;

/// JSON error response body.
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Machine-readable error code (e.g., "bad_request", "bad_gateway").
    pub error: String,
    /// Human-readable error message.
    pub message: String,
    /// Optional details, such as the upstream error body.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// API error type that maps to HTTP status codes and JSON responses.
#[derive(Debug)]
pub enum ApiError {
    /// 400 Bad Request - missing or invalid input.
    BadRequest(String),
    /// 404 Not Found - unknown endpoint.
    NotFound(String),
    /// 500 Internal Server Error - misconfiguration or unexpected failure.
    Internal(String),
    /// 502 Bad Gateway - the upstream provider failed.
    BadGateway { message: String, details: String },
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, message, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::Internal(msg) => {
                (StatusCode::INTERNAL_SERVER_ERROR, "internal_error", msg, None)
            }
            ApiError::BadGateway { message, details } => (
                StatusCode::BAD_GATEWAY,
                "bad_gateway",
                message,
                Some(serde_json::Value::String(details)),
            ),
        };

        let body = ErrorBody {
            error: error_code.to_string(),
            message,
            details,
        };

        (status, Json(body)).into_response()
    }
}

impl From<UpstreamError> for ApiError {
    fn from(err: UpstreamError) -> Self {
        match err {
            UpstreamError::MissingApiKey(var) => {
                ApiError::Internal(format!("{} is not configured", var))
            }
            UpstreamError::Status { status, body } => ApiError::BadGateway {
                message: format!("upstream returned status {}", status),
                details: body,
            },
            other => ApiError::BadGateway {
                message: "upstream request failed".to_string(),
                details: other.to_string(),
            },
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    async fn body_of(err: ApiError) -> (StatusCode, ErrorBody) {
        let resp = err.into_response();
        let status = resp.status();
        let bytes = axum::body::to_bytes(resp.into_body(), 64 * 1024)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_bad_request_shape() {
        let (status, body) = body_of(ApiError::BadRequest("message is required".into())).await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body.error, "bad_request");
        assert_eq!(body.message, "message is required");
        assert!(body.details.is_none());
    }

    #[tokio::test]
    async fn test_upstream_status_maps_to_bad_gateway() {
        let err: ApiError = UpstreamError::Status {
            status: 429,
            body: "rate limited".to_string(),
        }
        .into();
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert_eq!(body.error, "bad_gateway");
        assert_eq!(body.message, "upstream returned status 429");
        assert_eq!(body.details, Some(serde_json::json!("rate limited")));
    }

    #[tokio::test]
    async fn test_missing_key_is_internal() {
        let err: ApiError = UpstreamError::MissingApiKey("OPENAI_API_KEY".to_string()).into();
        let (status, body) = body_of(err).await;
        assert_eq!(status, StatusCode::INTERNAL_SERVER_ERROR);
        assert_eq!(body.message, "OPENAI_API_KEY is not configured");
    }

    #[tokio::test]
    async fn test_timeout_maps_to_bad_gateway() {
        let (status, body) = body_of(UpstreamError::Timeout.into()).await;
        assert_eq!(status, StatusCode::BAD_GATEWAY);
        assert!(body.details.is_some());
    }
}
