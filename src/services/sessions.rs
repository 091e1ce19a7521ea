use chrono::Utc;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::ApiError;
use crate::models::session::AdminSessionDto;
use crate::services::metrics;

pub struct SessionService;

impl SessionService {
    /// Persist a session row for a fresh login, returning its id for
    /// embedding into the token.
    pub async fn create(
        pool: &PgPool,
        user_id: Uuid,
        ip_address: Option<&str>,
        user_agent: Option<&str>,
        ttl_seconds: u64,
    ) -> Result<Uuid, ApiError> {
        let expires_at = Utc::now() + chrono::Duration::seconds(ttl_seconds as i64);
        let session_id: Uuid = sqlx::query_scalar(
            "INSERT INTO admin_sessions (user_id, ip_address, user_agent, expires_at)
             VALUES ($1, $2, $3, $4)
             RETURNING id",
        )
        .bind(user_id)
        .bind(ip_address)
        .bind(user_agent)
        .bind(expires_at)
        .fetch_one(pool)
        .await?;
        Ok(session_id)
    }

    /// Invalidate every outstanding token and session for an account.
    /// The version bump is a single atomic statement, never a
    /// read-modify-write, so concurrent revocations cannot lose an
    /// increment. Idempotent: re-running just bumps again.
    pub async fn revoke_all(
        pool: &PgPool,
        user_id: Uuid,
        revoked_by: Option<Uuid>,
    ) -> Result<u64, ApiError> {
        sqlx::query(
            "UPDATE users SET token_version = token_version + 1, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(user_id)
        .execute(pool)
        .await?;

        let revoked = Self::deactivate_all(pool, user_id, revoked_by).await?;
        metrics::SESSION_REVOCATIONS.inc();
        Ok(revoked)
    }

    /// Flip all active session rows inactive without touching the
    /// version counter. Used by flows that already bumped it.
    pub async fn deactivate_all(
        pool: &PgPool,
        user_id: Uuid,
        revoked_by: Option<Uuid>,
    ) -> Result<u64, ApiError> {
        let result = sqlx::query(
            "UPDATE admin_sessions
             SET is_active = FALSE, revoked_at = NOW(), revoked_by = $2
             WHERE user_id = $1 AND is_active = TRUE",
        )
        .bind(user_id)
        .bind(revoked_by)
        .execute(pool)
        .await?;
        Ok(result.rows_affected())
    }

    /// Revoke one session by its id. Returns false when the session
    /// does not exist or is already inactive.
    pub async fn revoke_by_session(
        pool: &PgPool,
        session_id: Uuid,
        revoked_by: Option<Uuid>,
    ) -> Result<bool, ApiError> {
        let result = sqlx::query(
            "UPDATE admin_sessions
             SET is_active = FALSE, revoked_at = NOW(), revoked_by = $2
             WHERE id = $1 AND is_active = TRUE",
        )
        .bind(session_id)
        .bind(revoked_by)
        .execute(pool)
        .await?;
        let hit = result.rows_affected() > 0;
        if hit {
            metrics::SESSION_REVOCATIONS.inc();
        }
        Ok(hit)
    }

    /// Active, unexpired sessions joined with the owning account.
    pub async fn list_active(pool: &PgPool) -> Result<Vec<AdminSessionDto>, ApiError> {
        let sessions = sqlx::query_as::<_, AdminSessionDto>(
            "SELECT s.id, s.user_id, u.email, s.ip_address, s.user_agent,
                    s.expires_at, s.created_at
             FROM admin_sessions s
             JOIN users u ON u.id = s.user_id
             WHERE s.is_active = TRUE AND s.expires_at > NOW()
             ORDER BY s.created_at DESC",
        )
        .fetch_all(pool)
        .await?;
        Ok(sessions)
    }
}
