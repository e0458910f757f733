//! Error types for the Dendro client

use serde::Deserialize;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when using the Dendro client
#[derive(Debug, Error)]
pub enum ClientError {
    /// HTTP request failed
    #[error("HTTP request failed: {0}")]
    RequestFailed(#[from] reqwest::Error),

    /// API returned an error status code
    #[error("API error (status {status}): {message}")]
    ApiError {
        /// HTTP status code
        status: u16,
        /// Error message from the API
        message: String,
        /// Machine-readable error kind, when the body carried one
        kind: Option<String>,
    },

    /// Failed to parse response
    #[error("Failed to parse response: {0}")]
    ParseError(String),
}

#[derive(Deserialize)]
struct ErrorBody {
    error: String,
    #[serde(default)]
    kind: Option<String>,
}

impl ClientError {
    /// Build an API error from a status code and the raw response body
    pub fn api_error(status: u16, body: impl Into<String>) -> Self {
        let body = body.into();
        match serde_json::from_str::<ErrorBody>(&body) {
            Ok(parsed) => Self::ApiError {
                status,
                message: parsed.error,
                kind: parsed.kind,
            },
            Err(_) => Self::ApiError {
                status,
                message: body,
                kind: None,
            },
        }
    }

    pub fn kind(&self) -> Option<&str> {
        match self {
            Self::ApiError { kind, .. } => kind.as_deref(),
            _ => None,
        }
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::ApiError { status: 404, .. })
    }

    /// Another writer changed the job first; re-read and retry if still relevant
    pub fn is_concurrent_modification(&self) -> bool {
        self.kind() == Some("concurrent_modification")
    }

    /// The job is no longer in a state that allows the request
    pub fn is_invalid_state(&self) -> bool {
        self.kind() == Some("invalid_state")
    }

    /// Check if this error is a client error (4xx status)
    pub fn is_client_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 400 && *status < 500)
    }

    /// Check if this error is a server error (5xx status)
    pub fn is_server_error(&self) -> bool {
        matches!(self, Self::ApiError { status, .. } if *status >= 500)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_api_error_parses_kind() {
        let body = r#"{"error":"job abc is no longer pending","kind":"concurrent_modification"}"#;
        let err = ClientError::api_error(409, body);
        assert!(err.is_concurrent_modification());
        assert!(!err.is_invalid_state());
        assert!(err.is_client_error());
        assert_eq!(err.to_string(), "API error (status 409): job abc is no longer pending");
    }

    #[test]
    fn test_api_error_keeps_plain_body() {
        let err = ClientError::api_error(502, "Bad Gateway");
        assert_eq!(err.kind(), None);
        assert!(err.is_server_error());
        assert_eq!(err.to_string(), "API error (status 502): Bad Gateway");
    }
}
