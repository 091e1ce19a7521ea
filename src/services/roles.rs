use std::sync::Arc;

use rand::Rng;
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::ApiError;
use crate::models::user::{AdminRole, User};
use crate::services::email::EmailService;
use crate::services::sessions::SessionService;

pub struct RoleService;

impl RoleService {
    /// Cryptographically random 6-digit PIN. The plaintext is emailed
    /// once and only the bcrypt hash is stored.
    pub fn generate_pin() -> String {
        let code: u32 = rand::thread_rng().gen_range(100000..=999999);
        format!("{code}")
    }

    /// Grant an admin role to an existing account identified by email.
    /// The fresh plaintext PIN has already been handed to the mail
    /// queue by the time this returns; only its hash is stored.
    pub async fn grant_role(
        pool: &PgPool,
        email_svc: Option<&Arc<EmailService>>,
        email: &str,
        role: AdminRole,
    ) -> Result<User, ApiError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE email = $1 AND deleted_at IS NULL",
        )
        .bind(email)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("No account with this email".into()))?;

        if user.admin_role.is_some() {
            return Err(ApiError::AlreadyPrivileged);
        }

        let pin = Self::generate_pin();
        let pin_hash = bcrypt::hash(&pin, 12)?;

        sqlx::query(
            "UPDATE users
             SET admin_role = $1, admin_pin_hash = $2, admin_permissions = NULL,
                 is_admin_active = TRUE, updated_at = NOW()
             WHERE id = $3",
        )
        .bind(role.to_string())
        .bind(&pin_hash)
        .bind(user.id)
        .execute(pool)
        .await?;

        Self::deliver_pin(email_svc, &user, role, pin);

        Ok(user)
    }

    /// Revoke the target's admin role. Self-revocation is refused so a
    /// platform cannot lock itself out of its last admin by accident.
    /// Returns the previous role for the audit trail.
    pub async fn revoke_role(
        pool: &PgPool,
        email_svc: Option<&Arc<EmailService>>,
        actor_id: Uuid,
        target_id: Uuid,
    ) -> Result<String, ApiError> {
        if actor_id == target_id {
            return Err(ApiError::SelfRevocationForbidden);
        }

        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(target_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

        let previous_role = user
            .admin_role
            .clone()
            .ok_or_else(|| ApiError::Conflict("User does not hold an admin role".into()))?;

        sqlx::query(
            "UPDATE users
             SET admin_role = NULL, admin_pin_hash = NULL, admin_permissions = NULL,
                 is_admin_active = FALSE, updated_at = NOW()
             WHERE id = $1",
        )
        .bind(target_id)
        .execute(pool)
        .await?;

        SessionService::revoke_all(pool, target_id, Some(actor_id)).await?;

        if let Some(svc) = email_svc {
            let svc = Arc::clone(svc);
            let to_email = user.email.clone();
            let to_name = format!("{} {}", user.first_name, user.last_name);
            let role = previous_role.clone();
            tokio::spawn(async move {
                if let Err(e) = svc.send_role_revoked_notice(&to_email, &to_name, &role).await {
                    tracing::warn!("role revocation notice to {to_email} failed: {e}");
                }
            });
        }

        Ok(previous_role)
    }

    /// Issue a fresh PIN for an account that already holds a role,
    /// invalidating the previous one.
    pub async fn rotate_pin(
        pool: &PgPool,
        email_svc: Option<&Arc<EmailService>>,
        target_id: Uuid,
    ) -> Result<User, ApiError> {
        let user = sqlx::query_as::<_, User>(
            "SELECT * FROM users WHERE id = $1 AND deleted_at IS NULL",
        )
        .bind(target_id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

        let role: AdminRole = user
            .admin_role
            .as_deref()
            .and_then(|r| r.parse().ok())
            .ok_or_else(|| ApiError::Conflict("User does not hold an admin role".into()))?;

        let pin = Self::generate_pin();
        let pin_hash = bcrypt::hash(&pin, 12)?;

        sqlx::query("UPDATE users SET admin_pin_hash = $1, updated_at = NOW() WHERE id = $2")
            .bind(&pin_hash)
            .bind(target_id)
            .execute(pool)
            .await?;

        Self::deliver_pin(email_svc, &user, role, pin);

        Ok(user)
    }

    fn deliver_pin(
        email_svc: Option<&Arc<EmailService>>,
        user: &User,
        role: AdminRole,
        pin: String,
    ) {
        match email_svc {
            Some(svc) => {
                let svc = Arc::clone(svc);
                let to_email = user.email.clone();
                let to_name = format!("{} {}", user.first_name, user.last_name);
                tokio::spawn(async move {
                    if let Err(e) = svc
                        .send_admin_pin(&to_email, &to_name, &role.to_string(), &pin)
                        .await
                    {
                        tracing::warn!("PIN delivery to {to_email} failed: {e}");
                    }
                });
            }
            None => {
                tracing::warn!(
                    "SMTP not configured, PIN for {} cannot be delivered",
                    user.email
                );
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn pin_is_six_digits() {
        for _ in 0..100 {
            let pin = RoleService::generate_pin();
            assert_eq!(pin.len(), 6);
            assert!(pin.chars().all(|c| c.is_ascii_digit()));
            let n: u32 = pin.parse().unwrap();
            assert!((100000..=999999).contains(&n));
        }
    }

    #[test]
    fn pin_hash_verifies() {
        let pin = RoleService::generate_pin();
        let hash = bcrypt::hash(&pin, 4).unwrap();
        assert!(bcrypt::verify(&pin, &hash).unwrap());
        assert!(!bcrypt::verify("000000", &hash).unwrap() || pin == "000000");
    }
}
