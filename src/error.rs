//! Error taxonomy for the request-security pipeline.
//!
//! Every failure the pipeline can produce is surfaced through [`SecurityError`];
//! nothing is retried or swallowed internally.

use thiserror::Error;

use crate::config::Environment;
use crate::security::sanitizer::sanitize_input;

/// Errors surfaced to callers of the secure client.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum SecurityError {
    /// No bearer token is available; the caller must re-authenticate.
    #[error("Authentication required")]
    AuthenticationRequired,

    /// The echoed CSRF token was not issued by this client.
    #[error("CSRF token validation failed")]
    CsrfValidationFailed,

    /// The named rate-limit bucket rejected the call.
    #[error("Rate limit exceeded for '{0}'")]
    RateLimitExceeded(String),

    /// A file upload was rejected before any network call.
    #[error("File validation failed: {0}")]
    FileValidationFailed(String),

    /// The request deadline expired; any partial response was discarded.
    #[error("Request timed out after {0} ms")]
    Timeout(u64),

    /// Upstream answered with a non-2xx status.
    #[error("{message}")]
    Api {
        message: String,
        status: u16,
        detail: Option<String>,
    },

    /// The request never produced an HTTP status (connect/reset/decode failures).
    #[error("Network error: {message}")]
    Transport {
        message: String,
        detail: Option<String>,
    },

    /// The token store failed to read or persist.
    #[error("Storage error: {0}")]
    Storage(String),

    /// The caller supplied something that cannot be turned into a request.
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

/// Result type for pipeline operations.
pub type SecurityResult<T> = Result<T, SecurityError>;

impl SecurityError {
    /// Build an API error from an upstream status and message.
    pub fn api(status: u16, message: impl Into<String>) -> Self {
        Self::Api {
            message: sanitize_input(&message.into()),
            status,
            detail: None,
        }
    }

    /// HTTP status carried by the error, if any.
    pub fn status(&self) -> Option<u16> {
        match self {
            Self::Api { status, .. } => Some(*status),
            _ => None,
        }
    }

    /// Whether a caller could reasonably try the same request again later.
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::Timeout(_) | Self::Transport { .. } | Self::RateLimitExceeded(_) => true,
            Self::Api { status, .. } => *status == 429 || *status >= 500,
            _ => false,
        }
    }

    /// Internal diagnostic detail, present only outside production mode.
    pub fn detail(&self) -> Option<&str> {
        match self {
            Self::Api { detail, .. } | Self::Transport { detail, .. } => detail.as_deref(),
            _ => None,
        }
    }

    /// Sanitize message text and strip diagnostics when running in production.
    pub fn redact_for(self, environment: Environment) -> Self {
        let keep_detail = environment == Environment::Development;
        match self {
            Self::Api {
                message,
                status,
                detail,
            } => Self::Api {
                message: sanitize_input(&message),
                status,
                detail: detail.filter(|_| keep_detail),
            },
            Self::Transport { message, detail } => Self::Transport {
                message: sanitize_input(&message),
                detail: detail.filter(|_| keep_detail),
            },
            Self::RateLimitExceeded(bucket) => Self::RateLimitExceeded(sanitize_input(&bucket)),
            Self::FileValidationFailed(reason) => {
                Self::FileValidationFailed(sanitize_input(&reason))
            }
            Self::Storage(msg) => Self::Storage(sanitize_input(&msg)),
            Self::InvalidRequest(msg) => Self::InvalidRequest(sanitize_input(&msg)),
            other => other,
        }
    }

    /// Short machine-friendly label, used for event types and metrics.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::AuthenticationRequired => "authentication_required",
            Self::CsrfValidationFailed => "csrf_validation_failed",
            Self::RateLimitExceeded(_) => "rate_limit_exceeded",
            Self::FileValidationFailed(_) => "file_validation_failed",
            Self::Timeout(_) => "timeout",
            Self::Api { .. } => "api_error",
            Self::Transport { .. } => "transport_error",
            Self::Storage(_) => "storage_error",
            Self::InvalidRequest(_) => "invalid_request",
        }
    }
}

impl From<reqwest::Error> for SecurityError {
    fn from(err: reqwest::Error) -> Self {
        let mut detail = format!("{:?}", err);
        let mut source = std::error::Error::source(&err);
        while let Some(cause) = source {
            detail.push_str(&format!(" <- {}", cause));
            source = cause.source();
        }
        let message = if err.is_connect() {
            "connection failed"
        } else if err.is_decode() {
            "response could not be decoded"
        } else if err.is_body() {
            "response body could not be read"
        } else {
            "request failed"
        };
        Self::Transport {
            message: message.to_string(),
            detail: Some(detail),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_display() {
        let err = SecurityError::Timeout(50);
        assert_eq!(err.to_string(), "Request timed out after 50 ms");

        let err = SecurityError::RateLimitExceeded("login".into());
        assert!(err.to_string().contains("login"));

        let err = SecurityError::api(404, "Not found");
        assert_eq!(err.to_string(), "Not found");
        assert_eq!(err.status(), Some(404));
    }

    #[test]
    fn test_api_message_is_sanitized() {
        let err = SecurityError::api(500, "<script>alert(1)</script>boom");
        assert_eq!(err.to_string(), "boom");
    }

    #[test]
    fn test_production_strips_detail() {
        let err = SecurityError::Api {
            message: "upstream <b>failed</b>".into(),
            status: 502,
            detail: Some("stack: at handler.rs:10".into()),
        };

        let dev = err.clone().redact_for(Environment::Development);
        assert_eq!(dev.detail(), Some("stack: at handler.rs:10"));

        let prod = err.redact_for(Environment::Production);
        assert_eq!(prod.detail(), None);
        assert_eq!(prod.to_string(), "upstream bfailed/b");
    }

    #[test]
    fn test_retryable_classification() {
        assert!(SecurityError::Timeout(10).is_retryable());
        assert!(SecurityError::api(503, "down").is_retryable());
        assert!(SecurityError::api(429, "slow down").is_retryable());
        assert!(!SecurityError::api(400, "bad").is_retryable());
        assert!(!SecurityError::AuthenticationRequired.is_retryable());
        assert!(!SecurityError::CsrfValidationFailed.is_retryable());
    }
}
