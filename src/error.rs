use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

/// A single field-level validation failure.
///
/// Produced client-side by [`SummaryRequest`](crate::request::SummaryRequest)
/// validation, or decoded from the `errors` list of a 400 response.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    /// Name of the offending field, in wire spelling (e.g. `github_pr_url`).
    pub field: String,
    /// Human-readable description of the problem.
    pub message: String,
    /// Machine-readable code (e.g. `invalid_format`).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub code: Option<String>,
    /// The value that was rejected, when the server echoes it back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
            code: None,
            value: None,
        }
    }

    pub fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }
}

/// Error body returned by the summary service for any non-2xx status.
///
/// When the body cannot be decoded the executor synthesizes one from the
/// status line, so every [`SummaryError::Http`] carries a body.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ErrorBody {
    pub error: String,
    pub message: String,
    #[serde(default)]
    pub timestamp: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub correlation_id: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub method: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub details: Option<Value>,
    /// Field errors, present on validation failures.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub errors: Option<Vec<FieldError>>,
}

impl ErrorBody {
    /// Best-effort body for a response whose payload was not a decodable error.
    pub fn synthesized(status: u16, reason: Option<&str>) -> Self {
        let reason = reason.unwrap_or("HTTP Error");
        Self {
            error: reason.to_string(),
            message: format!("HTTP {}: {}", status, reason),
            timestamp: chrono::Utc::now().to_rfc3339(),
            correlation_id: None,
            path: None,
            method: None,
            details: None,
            errors: None,
        }
    }
}

/// Coarse classification of a [`SummaryError`], used for retry decisions
/// and user-facing messaging.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Validation,
    Network,
    Timeout,
    Http(u16),
    Cancelled,
    Decode,
    Config,
}

/// Errors produced by the summary client and its components.
#[derive(Error, Debug)]
pub enum SummaryError {
    /// Malformed input, caught client-side or reported by the service as a 400
    /// with a field-error list. Never retried.
    #[error("Validation failed: {message}")]
    Validation {
        message: String,
        errors: Vec<FieldError>,
        /// `Some(400)` when reported by the service, `None` when caught locally.
        http_status: Option<u16>,
        correlation_id: Option<String>,
    },

    /// The transport could not complete the exchange (DNS, refused connection, TLS).
    #[error("Network error: {0}")]
    Network(String),

    /// No response arrived before the configured deadline.
    #[error("Request timed out after {timeout_ms}ms")]
    Timeout { timeout_ms: u64 },

    /// The service answered with a non-2xx status.
    #[error("HTTP {status}: {}", body.message)]
    Http { status: u16, body: ErrorBody },

    /// The call was abandoned through its cancellation token.
    #[error("Request was cancelled")]
    Cancelled,

    /// A 2xx response body did not match the expected shape.
    #[error("Failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    /// Invalid configuration detected at load or update time.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),
}

impl SummaryError {
    /// Client-side validation failure built from a non-empty list of field errors.
    pub fn validation(errors: Vec<FieldError>) -> Self {
        let message = errors
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        SummaryError::Validation {
            message,
            errors,
            http_status: None,
            correlation_id: None,
        }
    }

    pub fn kind(&self) -> ErrorKind {
        match self {
            SummaryError::Validation { .. } => ErrorKind::Validation,
            SummaryError::Network(_) => ErrorKind::Network,
            SummaryError::Timeout { .. } => ErrorKind::Timeout,
            SummaryError::Http { status, .. } => ErrorKind::Http(*status),
            SummaryError::Cancelled => ErrorKind::Cancelled,
            SummaryError::Decode(_) => ErrorKind::Decode,
            SummaryError::InvalidConfig(_) => ErrorKind::Config,
        }
    }

    /// Network and timeout failures are always retryable; HTTP failures only
    /// for 5xx and 429. Everything else, cancellation included, is terminal.
    pub fn is_retryable(&self) -> bool {
        match self {
            SummaryError::Network(_) | SummaryError::Timeout { .. } => true,
            SummaryError::Http { status, .. } => *status >= 500 || *status == 429,
            _ => false,
        }
    }

    /// HTTP status carried by the failure, if a response was received.
    pub fn http_status(&self) -> Option<u16> {
        match self {
            SummaryError::Http { status, .. } => Some(*status),
            SummaryError::Validation { http_status, .. } => *http_status,
            _ => None,
        }
    }

    pub fn correlation_id(&self) -> Option<&str> {
        match self {
            SummaryError::Validation { correlation_id, .. } => correlation_id.as_deref(),
            SummaryError::Http { body, .. } => body.correlation_id.as_deref(),
            _ => None,
        }
    }

    /// Field-level errors; empty for every kind except `Validation`.
    pub fn field_errors(&self) -> &[FieldError] {
        match self {
            SummaryError::Validation { errors, .. } => errors,
            _ => &[],
        }
    }
}

pub type Result<T> = std::result::Result<T, SummaryError>;

#[cfg(test)]
mod tests {
    use super::*;

    fn http(status: u16) -> SummaryError {
        SummaryError::Http {
            status,
            body: ErrorBody::synthesized(status, None),
        }
    }

    #[test]
    fn test_retryable_statuses() {
        assert!(http(500).is_retryable());
        assert!(http(503).is_retryable());
        assert!(http(429).is_retryable());
        assert!(!http(400).is_retryable());
        assert!(!http(401).is_retryable());
        assert!(!http(403).is_retryable());
        assert!(!http(404).is_retryable());
    }

    #[test]
    fn test_transport_failures_retryable() {
        assert!(SummaryError::Network("connection refused".into()).is_retryable());
        assert!(SummaryError::Timeout { timeout_ms: 50 }.is_retryable());
    }

    #[test]
    fn test_terminal_kinds_not_retryable() {
        assert!(!SummaryError::Cancelled.is_retryable());
        assert!(!SummaryError::validation(vec![FieldError::new("a", "b")]).is_retryable());
        assert!(!SummaryError::InvalidConfig("x".into()).is_retryable());
    }

    #[test]
    fn test_validation_message_joins_fields() {
        let err = SummaryError::validation(vec![
            FieldError::new("github_pr_url", "is required"),
            FieldError::new("jira_ticket_id", "bad format"),
        ]);
        assert_eq!(err.kind(), ErrorKind::Validation);
        assert_eq!(err.field_errors().len(), 2);
        assert_eq!(
            err.to_string(),
            "Validation failed: github_pr_url: is required; jira_ticket_id: bad format"
        );
    }

    #[test]
    fn test_synthesized_body() {
        let body = ErrorBody::synthesized(502, Some("Bad Gateway"));
        assert_eq!(body.error, "Bad Gateway");
        assert_eq!(body.message, "HTTP 502: Bad Gateway");
        assert!(!body.timestamp.is_empty());
    }

    #[test]
    fn test_error_body_decodes_validation_payload() {
        let body: ErrorBody = serde_json::from_value(serde_json::json!({
            "error": "Validation Error",
            "message": "Validation failed",
            "timestamp": "2024-01-15T10:30:00Z",
            "correlation_id": "abc-123",
            "errors": [{"field": "github_pr_url", "message": "bad", "code": "invalid_format"}]
        }))
        .unwrap();
        assert_eq!(body.correlation_id.as_deref(), Some("abc-123"));
        let errors = body.errors.unwrap();
        assert_eq!(errors[0].code.as_deref(), Some("invalid_format"));
    }

    #[test]
    fn test_accessors() {
        let err = SummaryError::Http {
            status: 404,
            body: ErrorBody {
                correlation_id: Some("c-1".into()),
                ..ErrorBody::synthesized(404, Some("Not Found"))
            },
        };
        assert_eq!(err.http_status(), Some(404));
        assert_eq!(err.correlation_id(), Some("c-1"));
        assert!(err.field_errors().is_empty());
        assert_eq!(err.kind(), ErrorKind::Http(404));
    }
}
