use axum::{extract::FromRequestParts, http::request::Parts};
use subtle::ConstantTimeEq;

use crate::errors::ApiError;
use crate::middleware::auth::get_cookie;
use crate::services::metrics;

/// Double-submit guard: the readable `admin_csrf` cookie must be echoed
/// back in the `X-CSRF-Token` header. List this extractor before the
/// principal in state-changing handlers so the check runs first.
pub struct CsrfGuard;

/// Constant-time equality; a length mismatch short-circuits but leaks
/// nothing about the content.
pub fn tokens_match(cookie: &str, header: &str) -> bool {
    let (a, b) = (cookie.as_bytes(), header.as_bytes());
    if a.len() != b.len() {
        return false;
    }
    a.ct_eq(b).into()
}

impl<S> FromRequestParts<S> for CsrfGuard
where
    S: Send + Sync,
{
    type Rejection = ApiError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        let cookie = get_cookie(&parts.headers, "admin_csrf");
        let header = parts
            .headers
            .get("X-CSRF-Token")
            .and_then(|v| v.to_str().ok());

        match (cookie, header) {
            (Some(c), Some(h)) if tokens_match(&c, h) => Ok(CsrfGuard),
            _ => {
                metrics::CSRF_REJECTIONS.inc();
                Err(ApiError::CsrfRejected)
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn matching_tokens_pass() {
        assert!(tokens_match("abcdef123456", "abcdef123456"));
    }

    #[test]
    fn mismatched_tokens_fail() {
        assert!(!tokens_match("abcdef123456", "abcdef123457"));
        assert!(!tokens_match("abcdef123456", "ABCDEF123456"));
    }

    #[test]
    fn length_mismatch_fails() {
        assert!(!tokens_match("short", "a-much-longer-token"));
        assert!(!tokens_match("", "x"));
    }

    #[test]
    fn empty_pair_matches() {
        // Both empty is equal as strings; the extractor never gets here
        // because a missing cookie or header already rejects.
        assert!(tokens_match("", ""));
    }
}
