use axum::{
    extract::FromRequestParts,
    http::{header, request::Parts, HeaderMap},
};
use jsonwebtoken::{decode, Algorithm, DecodingKey, Validation};
use uuid::Uuid;

use crate::errors::ApiError;
use crate::models::auth::{AdminClaims, AdminPrincipal};
use crate::AppState;

/// Extract a named cookie value from request headers.
pub fn get_cookie(headers: &HeaderMap, name: &str) -> Option<String> {
    let prefix = format!("{name}=");
    headers
        .get(header::COOKIE)?
        .to_str()
        .ok()?
        .split(';')
        .find_map(|part| {
            let part = part.trim();
            if part.starts_with(&prefix) {
                Some(part[prefix.len()..].to_string())
            } else {
                None
            }
        })
}

pub fn decode_admin_token(token: &str, secret: &str) -> Result<AdminClaims, anyhow::Error> {
    let key = DecodingKey::from_secret(secret.as_bytes());
    let mut validation = Validation::new(Algorithm::HS256);
    validation.validate_exp = true;

    let data = decode::<AdminClaims>(token, &key, &validation)?;
    Ok(data.claims)
}

/// Verified-principal extractor. A signature check alone is not enough
/// to act: the current account flags, token version, and the persisted
/// session row are re-read from the store on every request, so a
/// revocation takes effect immediately instead of at token expiry.
impl FromRequestParts<AppState> for AdminPrincipal {
    type Rejection = ApiError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let token = get_cookie(&parts.headers, "admin_token").ok_or(ApiError::Unauthenticated)?;

        let claims = decode_admin_token(&token, &state.config.jwt_secret)
            .map_err(|_| ApiError::Unauthenticated)?;

        let user_id: Uuid = claims.sub.parse().map_err(|_| ApiError::Unauthenticated)?;
        let session_id: Uuid = claims.sid.parse().map_err(|_| ApiError::Unauthenticated)?;

        let row: Option<(String, Option<String>, Option<Vec<String>>, i32, bool, bool)> =
            sqlx::query_as(
                "SELECT email, admin_role, admin_permissions, token_version,
                        is_admin_active, is_active
                 FROM users WHERE id = $1 AND deleted_at IS NULL",
            )
            .bind(user_id)
            .fetch_optional(&state.db)
            .await?;

        let (email, admin_role, overrides, token_version, is_admin_active, is_active) =
            row.ok_or(ApiError::Unauthenticated)?;

        let session_active: Option<bool> = sqlx::query_scalar(
            "SELECT is_active FROM admin_sessions WHERE id = $1 AND expires_at > NOW()",
        )
        .bind(session_id)
        .fetch_optional(&state.db)
        .await?;
        if !session_active.unwrap_or(false) {
            return Err(ApiError::SessionRevoked);
        }

        if claims.tv != token_version || !is_admin_active || !is_active {
            return Err(ApiError::SessionRevoked);
        }

        // Authorization works off the role currently in the store, not
        // the one baked into the token at mint time.
        let role = admin_role
            .as_deref()
            .and_then(|r| r.parse().ok())
            .ok_or(ApiError::SessionRevoked)?;

        Ok(AdminPrincipal {
            user_id,
            email,
            role,
            overrides,
            session_id,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::http::HeaderValue;

    #[test]
    fn cookie_parsing() {
        let mut headers = HeaderMap::new();
        headers.insert(
            header::COOKIE,
            HeaderValue::from_static("foo=bar; admin_token=abc.def.ghi; admin_csrf=xyz"),
        );
        assert_eq!(
            get_cookie(&headers, "admin_token").as_deref(),
            Some("abc.def.ghi")
        );
        assert_eq!(get_cookie(&headers, "admin_csrf").as_deref(), Some("xyz"));
        assert_eq!(get_cookie(&headers, "missing"), None);
    }

    #[test]
    fn cookie_parsing_no_header() {
        let headers = HeaderMap::new();
        assert_eq!(get_cookie(&headers, "admin_token"), None);
    }

    #[test]
    fn garbage_token_rejected() {
        assert!(decode_admin_token("not-a-jwt", "secret").is_err());
    }
}
