//! Constant-time API-key authentication for the proxy's own HTTP surface
//! (§6, §9). Not to be confused with the credentials `llm` uses to reach a
//! backend provider.

use axum::{
    extract::{Request, State},
    http::{HeaderMap, HeaderValue, StatusCode, header},
    middleware::Next,
    response::{IntoResponse, Response},
};
use config::AuthConfig;
use secrecy::ExposeSecret;
use sha2::{Digest, Sha256};
use subtle::ConstantTimeEq;

/// Rejects the request unless it carries a key matching the configured
/// proxy API key. Accepts `x-api-key`, `Authorization: Bearer <key>`, or a
/// raw `Authorization: <key>` header.
pub async fn require_api_key(State(auth): State<AuthConfig>, request: Request, next: Next) -> Response {
    let Some(expected) = auth.api_key.as_ref() else {
        log::warn!("auth enabled but no API key configured; rejecting all requests");
        return unauthorized();
    };

    match extract_key(request.headers()) {
        Some(supplied) if keys_match(expected.expose_secret(), &supplied) => next.run(request).await,
        _ => unauthorized(),
    }
}

fn extract_key(headers: &HeaderMap) -> Option<String> {
    if let Some(value) = headers.get("x-api-key").and_then(|v| v.to_str().ok()) {
        return Some(value.to_string());
    }

    let value = headers.get(header::AUTHORIZATION).and_then(|v| v.to_str().ok())?;
    Some(value.strip_prefix("Bearer ").unwrap_or(value).to_string())
}

/// Hashed first so keys of differing length still compare in constant time
/// and the optimizer can't short-circuit the comparison the way it can `==`.
fn keys_match(expected: &str, supplied: &str) -> bool {
    let expected_hash = Sha256::digest(expected.as_bytes());
    let supplied_hash = Sha256::digest(supplied.as_bytes());
    expected_hash.ct_eq(&supplied_hash).into()
}

fn unauthorized() -> Response {
    let mut response = (
        StatusCode::UNAUTHORIZED,
        axum::Json(serde_json::json!({
            "type": "error",
            "error": {
                "type": "authentication_error",
                "message": "invalid or missing API key",
            },
        })),
    )
        .into_response();

    response
        .headers_mut()
        .insert(header::WWW_AUTHENTICATE, HeaderValue::from_static("Bearer"));

    response
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equal_keys_match() {
        assert!(keys_match("secret", "secret"));
    }

    #[test]
    fn differing_keys_do_not_match() {
        assert!(!keys_match("secret", "other"));
        assert!(!keys_match("secret", "secre"));
    }

    #[test]
    fn bearer_prefix_is_stripped() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer abc123"));
        assert_eq!(extract_key(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn raw_authorization_header_is_accepted() {
        let mut headers = HeaderMap::new();
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("abc123"));
        assert_eq!(extract_key(&headers), Some("abc123".to_string()));
    }

    #[test]
    fn x_api_key_header_takes_precedence() {
        let mut headers = HeaderMap::new();
        headers.insert("x-api-key", HeaderValue::from_static("direct-key"));
        headers.insert(header::AUTHORIZATION, HeaderValue::from_static("Bearer other"));
        assert_eq!(extract_key(&headers), Some("direct-key".to_string()));
    }
}
