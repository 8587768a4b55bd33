//! Local checks on a bearer token.
//!
//! Tokens are three dot-separated base64url segments (header, payload,
//! signature). Only the payload is inspected: it must be a JSON object and,
//! when it carries an `exp` claim, that claim must lie in the future. The
//! signature is never verified here; the server remains the authority.
//!
//! These checks never touch the network. Callers holding a stored token
//! must clear the credential store whenever `validate` reports
//! [`ValidationError::requires_clear`].

use base64::alphabet;
use base64::engine::{DecodePaddingMode, GeneralPurpose, GeneralPurposeConfig};
use base64::Engine;
use chrono::Utc;
use serde::Deserialize;
use thiserror::Error;
use tracing::debug;

/// Number of dot-separated segments in a well-formed token
const TOKEN_SEGMENTS: usize = 3;

/// base64url decoder that accepts the payload with or without `=` padding
const PAYLOAD_ENGINE: GeneralPurpose = GeneralPurpose::new(
    &alphabet::URL_SAFE,
    GeneralPurposeConfig::new().with_decode_padding_mode(DecodePaddingMode::Indifferent),
);

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ValidationError {
    #[error("No session token")]
    Missing,

    #[error("Session token is malformed: {0}")]
    Malformed(String),

    #[error("Session token expired")]
    Expired,
}

impl ValidationError {
    /// Whether a stored token failing with this error must be removed.
    ///
    /// `Missing` has nothing to remove.
    pub fn requires_clear(&self) -> bool {
        !matches!(self, ValidationError::Missing)
    }
}

/// Claims read from the token payload.
#[derive(Debug, Clone, Default, PartialEq, Deserialize)]
pub struct TokenClaims {
    /// Expiration, in seconds since the Unix epoch
    #[serde(default)]
    pub exp: Option<f64>,
}

impl TokenClaims {
    /// Expired when `exp` is at or before `now` (seconds since epoch)
    pub fn is_expired_at(&self, now: i64) -> bool {
        match self.exp {
            Some(exp) => exp <= now as f64,
            None => false,
        }
    }
}

/// Decode the payload segment of a token without checking expiry.
pub fn decode_claims(token: &str) -> Result<TokenClaims, ValidationError> {
    if token.is_empty() {
        return Err(ValidationError::Missing);
    }

    let segments: Vec<&str> = token.split('.').collect();
    if segments.len() != TOKEN_SEGMENTS {
        return Err(ValidationError::Malformed(format!(
            "expected {} segments, found {}",
            TOKEN_SEGMENTS,
            segments.len()
        )));
    }

    let payload = segments
        .get(1)
        .ok_or_else(|| ValidationError::Malformed("missing payload".to_string()))?;

    let bytes = PAYLOAD_ENGINE
        .decode(payload)
        .map_err(|e| ValidationError::Malformed(format!("payload is not base64url: {}", e)))?;

    let value: serde_json::Value = serde_json::from_slice(&bytes)
        .map_err(|e| ValidationError::Malformed(format!("payload is not JSON: {}", e)))?;
    if !value.is_object() {
        return Err(ValidationError::Malformed(
            "payload is not a claims object".to_string(),
        ));
    }

    serde_json::from_value(value)
        .map_err(|e| ValidationError::Malformed(format!("invalid claims: {}", e)))
}

/// Validate a token against the clock at `now` (seconds since epoch).
pub fn validate_at(token: &str, now: i64) -> Result<TokenClaims, ValidationError> {
    let claims = decode_claims(token)?;
    if claims.is_expired_at(now) {
        debug!(exp = ?claims.exp, now, "Token expired");
        return Err(ValidationError::Expired);
    }
    Ok(claims)
}

/// Validate a token against the current time.
pub fn validate(token: &str) -> Result<TokenClaims, ValidationError> {
    validate_at(token, Utc::now().timestamp())
}

/// `true` when the token is structurally sound and not expired.
pub fn is_valid(token: Option<&str>) -> bool {
    match token {
        Some(token) => validate(token).is_ok(),
        None => false,
    }
}

// ============================================================================
// Tests
// ============================================================================

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use base64::engine::general_purpose::{STANDARD, URL_SAFE_NO_PAD};

    /// Build an unsigned token around an arbitrary payload
    pub(crate) fn token_with_payload(payload: &serde_json::Value) -> String {
        let header = URL_SAFE_NO_PAD.encode(br#"{"alg":"HS256","typ":"JWT"}"#);
        let body = URL_SAFE_NO_PAD.encode(payload.to_string());
        format!("{}.{}.signature", header, body)
    }

    /// Token expiring `offset_secs` from now (negative for the past)
    pub(crate) fn token_expiring_in(offset_secs: i64) -> String {
        let exp = Utc::now().timestamp() + offset_secs;
        token_with_payload(&serde_json::json!({ "sub": "1", "exp": exp }))
    }

    #[test]
    fn test_missing_token() {
        assert!(!is_valid(None));
        assert!(!is_valid(Some("")));
        assert_eq!(validate(""), Err(ValidationError::Missing));
        assert!(!ValidationError::Missing.requires_clear());
    }

    #[test]
    fn test_wrong_segment_count() {
        for token in ["abc", "a.b", "a.b.c.d", "...."] {
            let err = validate(token).unwrap_err();
            assert!(matches!(err, ValidationError::Malformed(_)), "{}", token);
            assert!(err.requires_clear());
        }
    }

    #[test]
    fn test_invalid_base64_payload() {
        let err = validate("header.!!not-base64!!.sig").unwrap_err();
        assert!(matches!(err, ValidationError::Malformed(_)));
    }

    #[test]
    fn test_invalid_json_payload() {
        let payload = URL_SAFE_NO_PAD.encode("not json at all");
        let err = validate(&format!("h.{}.s", payload)).unwrap_err();
        assert!(matches!(err, ValidationError::Malformed(_)));

        // Valid JSON that is not an object is not a claims set either
        let payload = URL_SAFE_NO_PAD.encode("[1,2,3]");
        assert!(matches!(
            validate(&format!("h.{}.s", payload)),
            Err(ValidationError::Malformed(_))
        ));
    }

    #[test]
    fn test_non_numeric_exp_is_malformed() {
        let token = token_with_payload(&serde_json::json!({ "exp": "tomorrow" }));
        assert!(matches!(
            validate(&token),
            Err(ValidationError::Malformed(_))
        ));
    }

    #[test]
    fn test_no_exp_claim_is_valid() {
        let token = token_with_payload(&serde_json::json!({ "sub": "42" }));
        assert!(is_valid(Some(&token)));
        assert_eq!(validate(&token).unwrap().exp, None);
    }

    #[test]
    fn test_future_exp_is_valid() {
        assert!(is_valid(Some(&token_expiring_in(3600))));
    }

    #[test]
    fn test_past_exp_is_expired() {
        let err = validate(&token_expiring_in(-60)).unwrap_err();
        assert_eq!(err, ValidationError::Expired);
        assert!(err.requires_clear());
    }

    #[test]
    fn test_exp_equal_to_now_is_expired() {
        let token = token_with_payload(&serde_json::json!({ "exp": 1_700_000_000 }));
        assert_eq!(
            validate_at(&token, 1_700_000_000),
            Err(ValidationError::Expired)
        );
        assert!(validate_at(&token, 1_699_999_999).is_ok());
    }

    #[test]
    fn test_padded_payload_is_accepted() {
        // Standard padding on a url-safe payload still decodes
        let body = STANDARD.encode(r#"{"exp":99999999999}"#);
        let token = format!("h.{}.s", body.replace('+', "-").replace('/', "_"));
        assert!(is_valid(Some(&token)));
    }
}
