use serde::Deserialize;
use thiserror::Error;

use crate::auth::{StoreError, ValidationError};

#[derive(Error, Debug)]
pub enum GatewayError {
    /// The server rejected the credential; the session has been torn down
    #[error("Authentication failed. Please log in again.")]
    AuthenticationFailed,

    /// Any other failure status, or a success without a usable JSON body
    #[error("{message}")]
    RequestFailed { status: Option<u16>, message: String },

    #[error("Network error: {0}")]
    Network(#[from] reqwest::Error),

    /// The stored token failed the local check; the session has been torn down
    #[error("Session is no longer valid: {0}")]
    Validation(#[from] ValidationError),

    #[error("Credential storage failed: {0}")]
    Storage(#[from] StoreError),
}

/// Maximum length for response bodies quoted in logs
const MAX_ERROR_BODY_LENGTH: usize = 500;

impl GatewayError {
    /// Whether this error ended the session
    pub fn logged_out(&self) -> bool {
        matches!(
            self,
            GatewayError::AuthenticationFailed | GatewayError::Validation(_)
        )
    }

    /// HTTP status behind a `RequestFailed`, when there was one
    pub fn status(&self) -> Option<u16> {
        match self {
            GatewayError::RequestFailed { status, .. } => *status,
            GatewayError::AuthenticationFailed => Some(401),
            _ => None,
        }
    }

    pub fn is_not_found(&self) -> bool {
        self.status() == Some(404)
    }

    /// Build a `RequestFailed` for a failure status from its (possibly empty) body
    pub(crate) fn from_failure(status: u16, body: &[u8]) -> Self {
        let message = ErrorBody::parse(body)
            .and_then(ErrorBody::into_message)
            .unwrap_or_else(|| format!("HTTP error: status {}", status));
        GatewayError::RequestFailed {
            status: Some(status),
            message,
        }
    }

    pub(crate) fn invalid_body(status: u16, reason: impl std::fmt::Display) -> Self {
        GatewayError::RequestFailed {
            status: Some(status),
            message: format!("Invalid response body: {}", reason),
        }
    }

    /// Truncate a response body to avoid logging excessive data
    pub(crate) fn truncate_body(body: &[u8]) -> String {
        let text = String::from_utf8_lossy(body);
        if text.len() <= MAX_ERROR_BODY_LENGTH {
            return text.into_owned();
        }
        let cut = (0..=MAX_ERROR_BODY_LENGTH)
            .rev()
            .find(|&i| text.is_char_boundary(i))
            .unwrap_or(0);
        format!(
            "{}... (truncated, {} total bytes)",
            &text[..cut],
            text.len()
        )
    }
}

/// Error payload the backend sends with failure statuses: `{"error": "..."}`,
/// occasionally `{"message": "..."}`.
#[derive(Debug, Default, Deserialize)]
pub(crate) struct ErrorBody {
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    message: Option<String>,
}

impl ErrorBody {
    pub(crate) fn parse(body: &[u8]) -> Option<Self> {
        if body.is_empty() {
            return None;
        }
        serde_json::from_slice(body).ok()
    }

    pub(crate) fn into_message(self) -> Option<String> {
        self.error
            .filter(|e| !e.trim().is_empty())
            .or(self.message.filter(|m| !m.trim().is_empty()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn message(err: &GatewayError) -> String {
        err.to_string()
    }

    #[test]
    fn test_failure_uses_error_field() {
        let err = GatewayError::from_failure(500, br#"{"error":"boom"}"#);
        assert_eq!(message(&err), "boom");
        assert_eq!(err.status(), Some(500));
        assert!(!err.logged_out());
    }

    #[test]
    fn test_failure_falls_back_to_message_field() {
        let err = GatewayError::from_failure(400, br#"{"message":"bad input"}"#);
        assert_eq!(message(&err), "bad input");
    }

    #[test]
    fn test_failure_generic_fallback() {
        let bodies: [&[u8]; 4] = [
            b"",
            b"<html>oops</html>",
            br#"{"error":""}"#,
            br#"{"error":{"code":1}}"#,
        ];
        for body in bodies {
            let err = GatewayError::from_failure(503, body);
            assert_eq!(message(&err), "HTTP error: status 503");
        }
    }

    #[test]
    fn test_not_found() {
        assert!(GatewayError::from_failure(404, b"").is_not_found());
        assert!(!GatewayError::AuthenticationFailed.is_not_found());
    }

    #[test]
    fn test_logged_out_kinds() {
        assert!(GatewayError::AuthenticationFailed.logged_out());
        assert!(GatewayError::Validation(ValidationError::Expired).logged_out());
        assert!(!GatewayError::invalid_body(200, "empty").logged_out());
    }

    #[test]
    fn test_truncate_body() {
        let short = GatewayError::truncate_body(b"short");
        assert_eq!(short, "short");

        let long = "é".repeat(400);
        let truncated = GatewayError::truncate_body(long.as_bytes());
        assert!(truncated.contains("truncated, 800 total bytes"));
    }
}
