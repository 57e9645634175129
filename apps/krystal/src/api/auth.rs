//! # Authentication Module
//!
//! API key authentication for the Krystal HTTP API.
//!
//! ## Configuration
//!
//! - `KRYSTAL_API_KEY`: If set, all requests (except /health) require this key
//!
//! ## Usage
//!
//! ```text
//! Authorization: Bearer <your-api-key>
//! ```

use axum::{
    body::Body,
    http::{Request, StatusCode, header},
    middleware::Next,
    response::Response,
};
use subtle::ConstantTimeEq;

/// Environment variable holding the API key.
pub const API_KEY_ENV: &str = "KRYSTAL_API_KEY";

// =============================================================================
// API KEY AUTHENTICATION
// =============================================================================

/// API key from `KRYSTAL_API_KEY`, `None` when unset or empty.
pub fn get_api_key_from_env() -> Option<String> {
    std::env::var(API_KEY_ENV).ok().filter(|k| !k.is_empty())
}

/// Compare an `Authorization` header value against the expected key.
///
/// Accepts `Bearer <key>` and a raw `<key>`. Both sides are padded to the
/// same length so the comparison time does not depend on where they differ.
pub(crate) fn key_matches(header_value: &str, expected: &str) -> bool {
    let provided = header_value
        .strip_prefix("Bearer ")
        .unwrap_or(header_value)
        .as_bytes();
    let expected = expected.as_bytes();

    let max_len = provided.len().max(expected.len());
    let mut padded_provided = vec![0u8; max_len];
    let mut padded_expected = vec![0u8; max_len];
    padded_provided[..provided.len()].copy_from_slice(provided);
    padded_expected[..expected.len()].copy_from_slice(expected);

    let bytes_match: bool = padded_provided.ct_eq(&padded_expected).into();
    bytes_match && provided.len() == expected.len()
}

/// API key authentication middleware.
///
/// `/health` is always allowed. Without a configured key every request passes.
pub async fn api_key_auth_middleware(
    request: Request<Body>,
    next: Next,
) -> Result<Response, (StatusCode, &'static str)> {
    let Some(expected) = get_api_key_from_env() else {
        return Ok(next.run(request).await);
    };

    if request.uri().path() == "/health" {
        return Ok(next.run(request).await);
    }

    let auth_header = request
        .headers()
        .get(header::AUTHORIZATION)
        .and_then(|v| v.to_str().ok());

    match auth_header {
        Some(value) if key_matches(value, &expected) => Ok(next.run(request).await),
        Some(_) => {
            tracing::warn!(
                event = "auth_failure",
                reason = "invalid_api_key",
                path = request.uri().path(),
                "Authentication failed: invalid API key"
            );
            Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
        }
        None => {
            tracing::warn!(
                event = "auth_failure",
                reason = "missing_authorization_header",
                path = request.uri().path(),
                "Missing Authorization header"
            );
            Err((StatusCode::UNAUTHORIZED, "Unauthorized"))
        }
    }
}

// =============================================================================
// TESTS
// =============================================================================

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn bearer_and_raw_keys_match() {
        assert!(key_matches("Bearer s3cret", "s3cret"));
        assert!(key_matches("s3cret", "s3cret"));
    }

    #[test]
    fn prefixes_and_extensions_do_not_match() {
        assert!(!key_matches("Bearer s3cre", "s3cret"));
        assert!(!key_matches("Bearer s3cret!", "s3cret"));
        assert!(!key_matches("", "s3cret"));
        assert!(!key_matches("bearer s3cret", "s3cret"));
    }
}
