//! API error responses.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use relay_core::RelayError;
use serde::Serialize;
use tracing::{error, warn};

/// Error returned by a handler, rendered as an OpenAI-style error body
#[derive(Debug, Clone)]
pub struct ApiError {
    /// HTTP status
    pub status: StatusCode,
    /// Human-readable message
    pub message: String,
    /// Machine-readable error type
    pub error_type: String,
    /// Optional code (offending field for validation errors)
    pub code: Option<String>,
}

impl ApiError {
    /// Create an error
    pub fn new(status: StatusCode, message: impl Into<String>, error_type: impl Into<String>) -> Self {
        Self {
            status,
            message: message.into(),
            error_type: error_type.into(),
            code: None,
        }
    }

    /// Attach a code
    #[must_use]
    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    /// 400 Bad Request
    pub fn bad_request(message: impl Into<String>) -> Self {
        Self::new(StatusCode::BAD_REQUEST, message, "invalid_request_error")
    }

    /// 401 Unauthorized
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::new(StatusCode::UNAUTHORIZED, message, "authentication_error")
    }

    /// 500 Internal Server Error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::new(StatusCode::INTERNAL_SERVER_ERROR, message, "internal_error")
    }
}

/// Error response body
#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: ErrorDetail<'a>,
}

#[derive(Debug, Serialize)]
struct ErrorDetail<'a> {
    message: &'a str,
    #[serde(rename = "type")]
    error_type: &'a str,
    code: Option<&'a str>,
}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let body = ErrorBody {
            error: ErrorDetail {
                message: &self.message,
                error_type: &self.error_type,
                code: self.code.as_deref(),
            },
        };

        (self.status, Json(body)).into_response()
    }
}

impl From<RelayError> for ApiError {
    fn from(err: RelayError) -> Self {
        let status =
            StatusCode::from_u16(err.status_code()).unwrap_or(StatusCode::INTERNAL_SERVER_ERROR);

        if status.is_server_error() {
            error!(error = %err, status = status.as_u16(), "Request failed");
        } else {
            warn!(error = %err, status = status.as_u16(), "Request rejected");
        }

        let code = match &err {
            RelayError::Validation { field, .. } => field.clone(),
            RelayError::NonRetryableStatus { status, .. } => Some(status.to_string()),
            _ => None,
        };

        Self {
            status,
            message: err.to_string(),
            error_type: err.error_type().to_string(),
            code,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_relay_error_mapping() {
        let exhausted: ApiError = RelayError::PoolExhausted { attempts: 3 }.into();
        assert_eq!(exhausted.status, StatusCode::BAD_GATEWAY);
        assert_eq!(exhausted.message, "All credentials exhausted after 3 attempts");
        assert_eq!(exhausted.error_type, "upstream_error");

        let empty: ApiError = RelayError::NoCredentials.into();
        assert_eq!(empty.status, StatusCode::SERVICE_UNAVAILABLE);

        let cancelled: ApiError = RelayError::Cancelled.into();
        assert_eq!(cancelled.status.as_u16(), 499);

        let invalid: ApiError =
            RelayError::validation("Model is required", Some("model".to_string())).into();
        assert_eq!(invalid.status, StatusCode::BAD_REQUEST);
        assert_eq!(invalid.code.as_deref(), Some("model"));
    }
}
