use chrono::Utc;
use jsonwebtoken::{encode, Algorithm, EncodingKey, Header};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::ApiError;
use crate::models::auth::AdminClaims;
use crate::models::user::{AdminRole, User};
use crate::services::sessions::SessionService;

pub struct AdminAuthService;

impl AdminAuthService {
    /// Step-up authentication: password and PIN are both required and
    /// both bcrypt-verified. Any mismatch, missing role, or inactive
    /// account collapses into the same `InvalidCredentials` so the
    /// response never reveals which factor failed.
    ///
    /// On success a session row is persisted and a JWT minted carrying
    /// the current token version plus the session id.
    pub async fn authenticate(
        pool: &PgPool,
        email: &str,
        password: &str,
        pin: &str,
        jwt_secret: &str,
        ttl_seconds: u64,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
    ) -> Result<(User, String, Uuid), ApiError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users
             WHERE email = $1 AND is_active = TRUE AND deleted_at IS NULL",
        )
        .bind(email)
        .fetch_optional(pool)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

        let role: AdminRole = user
            .admin_role
            .as_deref()
            .and_then(|r| r.parse().ok())
            .ok_or(ApiError::InvalidCredentials)?;

        if !user.is_admin_active {
            return Err(ApiError::InvalidCredentials);
        }

        let pin_hash = user
            .admin_pin_hash
            .as_deref()
            .ok_or(ApiError::InvalidCredentials)?;

        let password_ok = bcrypt::verify(password, &user.password_hash)
            .map_err(|_| ApiError::InvalidCredentials)?;
        let pin_ok = bcrypt::verify(pin, pin_hash).map_err(|_| ApiError::InvalidCredentials)?;
        if !password_ok || !pin_ok {
            return Err(ApiError::InvalidCredentials);
        }

        let session_id =
            SessionService::create(pool, user.id, ip_address, user_agent, ttl_seconds).await?;

        let token = Self::generate_admin_token(
            user.id,
            role,
            user.token_version,
            session_id,
            jwt_secret,
            ttl_seconds,
        )?;

        sqlx::query("UPDATE users SET last_admin_login = NOW(), updated_at = NOW() WHERE id = $1")
            .bind(user.id)
            .execute(pool)
            .await?;

        Ok((user, token, session_id))
    }

    pub fn generate_admin_token(
        user_id: Uuid,
        role: AdminRole,
        token_version: i32,
        session_id: Uuid,
        secret: &str,
        ttl_seconds: u64,
    ) -> Result<String, ApiError> {
        let now = Utc::now().timestamp() as usize;
        let claims = AdminClaims {
            sub: user_id.to_string(),
            role,
            tv: token_version,
            sid: session_id.to_string(),
            iat: now,
            exp: now + ttl_seconds as usize,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .map_err(|e| ApiError::Internal(e.into()))?;
        Ok(token)
    }

    /// Change the caller's own password. The version bump rides in the
    /// same UPDATE as the hash so every outstanding token goes stale
    /// atomically; existing session rows are flipped inactive as well.
    pub async fn change_password(
        pool: &PgPool,
        user_id: Uuid,
        current_password: &str,
        new_password: &str,
    ) -> Result<(), ApiError> {
        if new_password.len() < 8 {
            return Err(ApiError::Validation(
                "New password must be at least 8 characters".into(),
            ));
        }

        let password_hash: String = sqlx::query_scalar(
            "SELECT password_hash FROM users
             WHERE id = $1 AND is_active = TRUE AND deleted_at IS NULL",
        )
        .bind(user_id)
        .fetch_optional(pool)
        .await?
        .ok_or(ApiError::InvalidCredentials)?;

        let valid = bcrypt::verify(current_password, &password_hash)
            .map_err(|_| ApiError::InvalidCredentials)?;
        if !valid {
            return Err(ApiError::InvalidCredentials);
        }

        let new_hash = bcrypt::hash(new_password, 12)?;
        sqlx::query(
            "UPDATE users
             SET password_hash = $1, force_password_reset = FALSE,
                 token_version = token_version + 1, updated_at = NOW()
             WHERE id = $2",
        )
        .bind(&new_hash)
        .bind(user_id)
        .execute(pool)
        .await?;

        SessionService::deactivate_all(pool, user_id, Some(user_id)).await?;

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use jsonwebtoken::{decode, DecodingKey, Validation};

    const SECRET: &str = "test-secret";

    fn decode_claims(token: &str, secret: &str) -> Result<AdminClaims, jsonwebtoken::errors::Error> {
        decode::<AdminClaims>(
            token,
            &DecodingKey::from_secret(secret.as_bytes()),
            &Validation::new(Algorithm::HS256),
        )
        .map(|d| d.claims)
    }

    #[test]
    fn token_roundtrip_carries_version_and_session() {
        let user_id = Uuid::new_v4();
        let session_id = Uuid::new_v4();
        let token = AdminAuthService::generate_admin_token(
            user_id,
            AdminRole::Moderator,
            7,
            session_id,
            SECRET,
            3600,
        )
        .unwrap();

        let claims = decode_claims(&token, SECRET).unwrap();
        assert_eq!(claims.sub, user_id.to_string());
        assert_eq!(claims.role, AdminRole::Moderator);
        assert_eq!(claims.tv, 7);
        assert_eq!(claims.sid, session_id.to_string());
        assert!(claims.exp > claims.iat);
    }

    #[test]
    fn token_rejected_with_wrong_secret() {
        let token = AdminAuthService::generate_admin_token(
            Uuid::new_v4(),
            AdminRole::Admin,
            0,
            Uuid::new_v4(),
            SECRET,
            3600,
        )
        .unwrap();
        assert!(decode_claims(&token, "other-secret").is_err());
    }

    #[test]
    fn expired_token_rejected() {
        let user_id = Uuid::new_v4();
        let now = Utc::now().timestamp() as usize;
        let claims = AdminClaims {
            sub: user_id.to_string(),
            role: AdminRole::Admin,
            tv: 0,
            sid: Uuid::new_v4().to_string(),
            iat: now - 7200,
            exp: now - 3600,
        };
        let token = encode(
            &Header::new(Algorithm::HS256),
            &claims,
            &EncodingKey::from_secret(SECRET.as_bytes()),
        )
        .unwrap();
        assert!(decode_claims(&token, SECRET).is_err());
    }
}
