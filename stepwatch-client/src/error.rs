//! Error types for the Stepwatch clients

use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Slack error codes that indicate a temporary condition
const RETRYABLE_SLACK_ERRORS: &[&str] = &[
    "ratelimited",
    "internal_error",
    "fatal_error",
    "request_timeout",
    "service_unavailable",
];

/// Errors that can occur when calling GitLab or Slack
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed (connect, timeout, TLS, body read)
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),

    /// Slack answered `ok: false`
    #[error("Slack rejected the call: {0}")]
    Rejected(String),

    /// Invalid request
    #[error("Invalid request: {0}")]
    InvalidRequest(String),
}

impl ClientError {
    /// Create an API error from status code and message
    pub fn api_error(status: u16, message: impl Into<String>) -> Self {
        Self::ApiError {
            status,
            message: message.into(),
        }
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 500)
    }

    /// Whether repeating the same call later may succeed
    pub fn is_retryable(&self) -> bool {
        match self {
            Self::RequestFailed(_) | Self::ParseError(_) => true,
            Self::ApiError { status: 429, .. } => true,
            Self::ApiError { .. } => self.is_server_error(),
            Self::Rejected(code) => RETRYABLE_SLACK_ERRORS.contains(&code.as_str()),
            Self::InvalidRequest(_) => false,
        }
    }
}
