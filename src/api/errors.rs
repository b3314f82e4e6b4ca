//! API Error Handling
//!
//! Structured error responses with proper HTTP status codes and request tracking.

use super::middleware::RequestId;
use crate::errors::CasinoError;
use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Top-level API error response with request tracking
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub request_id: String,
    pub error: ErrorBody,
}

/// Error body with structured information
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ErrorBody {
    /// Error code (NOT_FOUND, BAD_REQUEST, CONFLICT, etc.)
    pub code: String,
    /// Human-readable error message
    pub message: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<serde_json::Value>,
}

/// Body returned for retried requests that already took effect
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct NoopResponse {
    pub request_id: String,
    pub status: String,
    pub message: String,
}

/// API error types with request tracking
#[derive(Debug)]
pub struct ApiError {
    pub kind: ApiErrorKind,
    pub request_id: String,
}

#[derive(Debug)]
pub enum ApiErrorKind {
    BadRequest(String),
    /// Bet larger than both balances combined
    InsufficientFunds { requested: f64, available: f64 },
    Unauthorized(String),
    Forbidden(String),
    NotFound(String),
    Conflict(String),
    TooManyRequests(String),
    InternalError(String),
    ServiceUnavailable(String),
    /// Benign replay; answered with 200
    Noop(String),
}

impl ApiError {
    pub fn new(request_id: &RequestId, kind: ApiErrorKind) -> Self {
        Self {
            kind,
            request_id: request_id.0.clone(),
        }
    }

    pub fn bad_request(request_id: &RequestId, message: impl Into<String>) -> Self {
        Self::new(request_id, ApiErrorKind::BadRequest(message.into()))
    }

    pub fn unauthorized(request_id: &RequestId, message: impl Into<String>) -> Self {
        Self::new(request_id, ApiErrorKind::Unauthorized(message.into()))
    }

    pub fn forbidden(request_id: &RequestId, message: impl Into<String>) -> Self {
        Self::new(request_id, ApiErrorKind::Forbidden(message.into()))
    }

    /// Translate a core error into its HTTP form
    pub fn from_core(request_id: &RequestId, err: CasinoError) -> Self {
        let kind = match err {
            CasinoError::Validation(msg) => ApiErrorKind::BadRequest(msg),
            CasinoError::InsufficientFunds { requested, available } => {
                ApiErrorKind::InsufficientFunds { requested, available }
            }
            CasinoError::Conflict(msg) => ApiErrorKind::Conflict(msg),
            CasinoError::NotFound(msg) => ApiErrorKind::NotFound(msg),
            CasinoError::StaleState(msg) => ApiErrorKind::Noop(msg),
            CasinoError::Forbidden(msg) => ApiErrorKind::Forbidden(msg),
            CasinoError::RateLimited(msg) => ApiErrorKind::TooManyRequests(msg),
            CasinoError::ExternalDependency(msg) => ApiErrorKind::ServiceUnavailable(msg),
            CasinoError::Configuration(e) => ApiErrorKind::InternalError(e.to_string()),
        };
        Self::new(request_id, kind)
    }
}

/// Attach the request id to a core result
pub trait ApiResultExt<T> {
    fn for_request(self, request_id: &RequestId) -> Result<T, ApiError>;
}

impl<T> ApiResultExt<T> for Result<T, CasinoError> {
    fn for_request(self, request_id: &RequestId) -> Result<T, ApiError> {
        self.map_err(|err| ApiError::from_core(request_id, err))
    }
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.kind {
            ApiErrorKind::BadRequest(msg) => write!(f, "[{}] Bad Request: {}", self.request_id, msg),
            ApiErrorKind::InsufficientFunds { requested, available } => write!(
                f,
                "[{}] Insufficient Funds: requested {:.2}, available {:.2}",
                self.request_id, requested, available
            ),
            ApiErrorKind::Unauthorized(msg) => write!(f, "[{}] Unauthorized: {}", self.request_id, msg),
            ApiErrorKind::Forbidden(msg) => write!(f, "[{}] Forbidden: {}", self.request_id, msg),
            ApiErrorKind::NotFound(msg) => write!(f, "[{}] Not Found: {}", self.request_id, msg),
            ApiErrorKind::Conflict(msg) => write!(f, "[{}] Conflict: {}", self.request_id, msg),
            ApiErrorKind::TooManyRequests(msg) => write!(f, "[{}] Too Many Requests: {}", self.request_id, msg),
            ApiErrorKind::InternalError(msg) => write!(f, "[{}] Internal Error: {}", self.request_id, msg),
            ApiErrorKind::ServiceUnavailable(msg) => {
                write!(f, "[{}] Service Unavailable: {}", self.request_id, msg)
            }
            ApiErrorKind::Noop(msg) => write!(f, "[{}] Noop: {}", self.request_id, msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, code, message, details) = match self.kind {
            ApiErrorKind::Noop(message) => {
                let body = Json(NoopResponse {
                    request_id: self.request_id,
                    status: "noop".to_string(),
                    message,
                });
                return (StatusCode::OK, body).into_response();
            }
            ApiErrorKind::BadRequest(msg) => (StatusCode::BAD_REQUEST, "BAD_REQUEST", msg, None),
            ApiErrorKind::InsufficientFunds { requested, available } => (
                StatusCode::BAD_REQUEST,
                "INSUFFICIENT_FUNDS",
                "Insufficient funds".to_string(),
                Some(serde_json::json!({ "requested": requested, "available": available })),
            ),
            ApiErrorKind::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "UNAUTHORIZED", msg, None),
            ApiErrorKind::Forbidden(msg) => (StatusCode::FORBIDDEN, "FORBIDDEN", msg, None),
            ApiErrorKind::NotFound(msg) => (StatusCode::NOT_FOUND, "NOT_FOUND", msg, None),
            ApiErrorKind::Conflict(msg) => (StatusCode::CONFLICT, "CONFLICT", msg, None),
            ApiErrorKind::TooManyRequests(msg) => (StatusCode::TOO_MANY_REQUESTS, "RATE_LIMITED", msg, None),
            ApiErrorKind::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, "INTERNAL_ERROR", msg, None),
            ApiErrorKind::ServiceUnavailable(msg) => {
                (StatusCode::SERVICE_UNAVAILABLE, "SERVICE_UNAVAILABLE", msg, None)
            }
        };

        let body = Json(ErrorResponse {
            request_id: self.request_id,
            error: ErrorBody {
                code: code.to_string(),
                message,
                details,
            },
        });

        (status, body).into_response()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn status_of(err: CasinoError) -> StatusCode {
        ApiError::from_core(&RequestId("r".into()), err).into_response().status()
    }

    #[test]
    fn test_status_mapping() {
        assert_eq!(status_of(CasinoError::validation("x")), StatusCode::BAD_REQUEST);
        assert_eq!(
            status_of(CasinoError::InsufficientFunds { requested: 5.0, available: 1.0 }),
            StatusCode::BAD_REQUEST
        );
        assert_eq!(status_of(CasinoError::conflict("x")), StatusCode::CONFLICT);
        assert_eq!(status_of(CasinoError::not_found("x")), StatusCode::NOT_FOUND);
        assert_eq!(status_of(CasinoError::Forbidden("x".into())), StatusCode::FORBIDDEN);
        assert_eq!(status_of(CasinoError::RateLimited("x".into())), StatusCode::TOO_MANY_REQUESTS);
        assert_eq!(
            status_of(CasinoError::ExternalDependency("x".into())),
            StatusCode::SERVICE_UNAVAILABLE
        );
    }

    #[test]
    fn test_stale_state_is_ok_noop() {
        assert_eq!(status_of(CasinoError::stale("deposit d-1")), StatusCode::OK);
    }
}
