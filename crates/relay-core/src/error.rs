//! Error types for the relay.
//!
//! Every failure the relay can observe maps onto one `RelayError` variant.
//! The upstream client uses [`RelayError::is_retryable`] to decide whether a
//! failed attempt rotates to the next credential.

use thiserror::Error;

/// Result alias used across the relay crates
pub type RelayResult<T> = Result<T, RelayError>;

/// Relay error taxonomy
#[derive(Debug, Clone, Error)]
pub enum RelayError {
    /// Network or I/O failure while reaching the upstream
    #[error("Transport error: {message}")]
    Transport {
        /// Underlying error description
        message: String,
    },

    /// Upstream answered with 401, 403 or a 5xx status
    #[error("Upstream returned retryable status {status}")]
    RetryableStatus {
        /// HTTP status code
        status: u16,
    },

    /// Upstream answered with an ordinary client error
    #[error("Upstream returned non-retryable status {status}: {body}")]
    NonRetryableStatus {
        /// HTTP status code
        status: u16,
        /// Response body, possibly truncated
        body: String,
    },

    /// Every credential in the pool was tried and failed
    #[error("All credentials exhausted after {attempts} attempts")]
    PoolExhausted {
        /// Number of attempts made
        attempts: usize,
    },

    /// The credential pool is empty
    #[error("No upstream credentials configured")]
    NoCredentials,

    /// A single streamed record could not be decoded
    #[error("Failed to decode stream record: {message}")]
    RecordDecode {
        /// Decoder error description
        message: String,
    },

    /// The governing call was cancelled
    #[error("Request cancelled")]
    Cancelled,

    /// A buffered upstream response body could not be parsed
    #[error("Failed to parse upstream response: {message}")]
    ResponseParse {
        /// Parser error description
        message: String,
    },

    /// The upstream byte stream failed mid-flight
    #[error("Stream error: {message}")]
    Stream {
        /// Error description
        message: String,
    },

    /// Inbound request validation failed
    #[error("Validation error: {message}")]
    Validation {
        /// Error message
        message: String,
        /// Offending field, if known
        field: Option<String>,
    },

    /// Inbound request is missing or carries an invalid API key
    #[error("Unauthorized: {message}")]
    Unauthorized {
        /// Error message
        message: String,
    },

    /// Invalid configuration
    #[error("Configuration error: {message}")]
    Configuration {
        /// Error message
        message: String,
    },

    /// Internal error
    #[error("Internal error: {message}")]
    Internal {
        /// Error message
        message: String,
    },
}

impl RelayError {
    /// Create a transport error
    pub fn transport(message: impl Into<String>) -> Self {
        Self::Transport {
            message: message.into(),
        }
    }

    /// Create a stream error
    pub fn stream(message: impl Into<String>) -> Self {
        Self::Stream {
            message: message.into(),
        }
    }

    /// Create a response parse error
    pub fn response_parse(message: impl Into<String>) -> Self {
        Self::ResponseParse {
            message: message.into(),
        }
    }

    /// Create a record decode error
    pub fn record_decode(message: impl Into<String>) -> Self {
        Self::RecordDecode {
            message: message.into(),
        }
    }

    /// Create a validation error
    pub fn validation(message: impl Into<String>, field: Option<String>) -> Self {
        Self::Validation {
            message: message.into(),
            field,
        }
    }

    /// Create an unauthorized error
    pub fn unauthorized(message: impl Into<String>) -> Self {
        Self::Unauthorized {
            message: message.into(),
        }
    }

    /// Create a configuration error
    pub fn configuration(message: impl Into<String>) -> Self {
        Self::Configuration {
            message: message.into(),
        }
    }

    /// Create an internal error
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal {
            message: message.into(),
        }
    }

    /// Classify an upstream HTTP status.
    ///
    /// Returns `None` for statuses below 400.
    #[must_use]
    pub fn from_status(status: u16, body: impl Into<String>) -> Option<Self> {
        match status {
            0..=399 => None,
            401 | 403 | 500.. => Some(Self::RetryableStatus { status }),
            _ => Some(Self::NonRetryableStatus {
                status,
                body: body.into(),
            }),
        }
    }

    /// Whether a failed attempt should rotate to the next credential
    #[must_use]
    pub fn is_retryable(&self) -> bool {
        matches!(self, Self::Transport { .. } | Self::RetryableStatus { .. })
    }

    /// HTTP status code the inbound surface should answer with
    #[must_use]
    pub fn status_code(&self) -> u16 {
        match self {
            Self::Validation { .. } => 400,
            Self::Unauthorized { .. } => 401,
            Self::Cancelled => 499,
            Self::Transport { .. }
            | Self::RetryableStatus { .. }
            | Self::NonRetryableStatus { .. }
            | Self::PoolExhausted { .. }
            | Self::Stream { .. }
            | Self::RecordDecode { .. } => 502,
            Self::NoCredentials => 503,
            Self::ResponseParse { .. } | Self::Configuration { .. } | Self::Internal { .. } => 500,
        }
    }

    /// Machine-readable error type
    #[must_use]
    pub fn error_type(&self) -> &'static str {
        match self {
            Self::Validation { .. } => "invalid_request_error",
            Self::Unauthorized { .. } => "authentication_error",
            Self::Cancelled => "request_cancelled",
            Self::Transport { .. }
            | Self::RetryableStatus { .. }
            | Self::NonRetryableStatus { .. }
            | Self::PoolExhausted { .. }
            | Self::NoCredentials => "upstream_error",
            Self::Stream { .. } | Self::RecordDecode { .. } => "stream_error",
            Self::ResponseParse { .. } | Self::Configuration { .. } | Self::Internal { .. } => {
                "internal_error"
            }
        }
    }
}

impl From<serde_json::Error> for RelayError {
    fn from(err: serde_json::Error) -> Self {
        Self::internal(format!("JSON error: {err}"))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_status_classification() {
        assert!(RelayError::from_status(200, "").is_none());
        assert!(RelayError::from_status(302, "").is_none());

        for status in [401, 403, 500, 502, 503, 599] {
            let err = RelayError::from_status(status, "").expect("error status");
            assert!(err.is_retryable(), "status {status} should be retryable");
        }

        for status in [400, 404, 409, 422, 429] {
            let err = RelayError::from_status(status, "bad").expect("error status");
            assert!(!err.is_retryable(), "status {status} should not be retryable");
            assert!(matches!(err, RelayError::NonRetryableStatus { .. }));
        }
    }

    #[test]
    fn test_transport_is_retryable() {
        assert!(RelayError::transport("connection reset").is_retryable());
        assert!(!RelayError::Cancelled.is_retryable());
        assert!(!RelayError::PoolExhausted { attempts: 3 }.is_retryable());
    }

    #[test]
    fn test_pool_exhausted_names_attempts() {
        let err = RelayError::PoolExhausted { attempts: 4 };
        assert_eq!(err.to_string(), "All credentials exhausted after 4 attempts");
        assert_eq!(err.status_code(), 502);
    }

    #[test]
    fn test_status_codes() {
        assert_eq!(RelayError::validation("x", None).status_code(), 400);
        assert_eq!(RelayError::unauthorized("x").status_code(), 401);
        assert_eq!(RelayError::NoCredentials.status_code(), 503);
        assert_eq!(RelayError::response_parse("x").status_code(), 500);
    }
}
