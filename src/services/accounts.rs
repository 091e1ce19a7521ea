use std::sync::Arc;

use sha2::{Digest, Sha256};
use sqlx::PgPool;
use uuid::Uuid;

use crate::errors::ApiError;
use crate::models::user::{DeleteMode, User};
use crate::services::email::EmailService;
use crate::services::sessions::SessionService;

/// Bcrypt can never verify against this, so an anonymized account has
/// no usable password.
const UNUSABLE_PASSWORD: &str = "!";

pub struct AccountService;

impl AccountService {
    /// Deterministic but unguessable replacement address, keyed by a
    /// server-side salt so the original email cannot be brute-forced
    /// back from the digest.
    pub fn synthetic_email(salt: &str, user_id: Uuid) -> String {
        let mut hasher = Sha256::new();
        hasher.update(salt.as_bytes());
        hasher.update(user_id.as_bytes());
        let digest = hex::encode(hasher.finalize());
        format!("removed-{}@anonymized.invalid", &digest[..16])
    }

    /// Remove an account in one of three modes. Destructive modes are
    /// refused while the target still owns an active business; the
    /// owner must transfer or close it first.
    pub async fn delete_account(
        pool: &PgPool,
        email_svc: Option<&Arc<EmailService>>,
        actor_id: Uuid,
        target_id: Uuid,
        mode: DeleteMode,
        anonymize_salt: &str,
    ) -> Result<User, ApiError> {
        let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
            .bind(target_id)
            .fetch_optional(pool)
            .await?
            .ok_or_else(|| ApiError::NotFound("User not found".into()))?;

        if matches!(mode, DeleteMode::Anonymize | DeleteMode::Hard) {
            let owns_active_business: bool = sqlx::query_scalar(
                "SELECT EXISTS(SELECT 1 FROM businesses WHERE owner_id = $1 AND is_active = TRUE)",
            )
            .bind(target_id)
            .fetch_one(pool)
            .await?;
            if owns_active_business {
                return Err(ApiError::Conflict(
                    "User owns an active business; transfer or close it first".into(),
                ));
            }
        }

        // Queue the notice before mutating: after a hard delete or
        // anonymization there is no address left to notify.
        if let Some(svc) = email_svc {
            let svc = Arc::clone(svc);
            let to_email = user.email.clone();
            let to_name = format!("{} {}", user.first_name, user.last_name);
            let mode_str = mode.to_string();
            tokio::spawn(async move {
                if let Err(e) = svc
                    .send_account_deletion_notice(&to_email, &to_name, &mode_str)
                    .await
                {
                    tracing::warn!("deletion notice to {to_email} failed: {e}");
                }
            });
        }

        match mode {
            DeleteMode::Soft => {
                sqlx::query(
                    "UPDATE users
                     SET is_active = FALSE, deleted_at = NOW(),
                         token_version = token_version + 1, updated_at = NOW()
                     WHERE id = $1",
                )
                .bind(target_id)
                .execute(pool)
                .await?;
                SessionService::deactivate_all(pool, target_id, Some(actor_id)).await?;
            }
            DeleteMode::Anonymize => {
                // visit_count and reservation rows stay untouched so
                // aggregate statistics keep their meaning.
                let replacement_email = Self::synthetic_email(anonymize_salt, target_id);
                sqlx::query(
                    "UPDATE users
                     SET email = $1, first_name = 'Deleted', last_name = 'User',
                         phone = NULL, birthdate = NULL, password_hash = $2,
                         admin_role = NULL, admin_pin_hash = NULL,
                         admin_permissions = NULL, is_admin_active = FALSE,
                         is_active = FALSE, deleted_at = NOW(),
                         token_version = token_version + 1, updated_at = NOW()
                     WHERE id = $3",
                )
                .bind(&replacement_email)
                .bind(UNUSABLE_PASSWORD)
                .bind(target_id)
                .execute(pool)
                .await?;
                SessionService::deactivate_all(pool, target_id, Some(actor_id)).await?;
            }
            DeleteMode::Hard => {
                // Sessions cascade; businesses and reservations keep
                // their rows and may dangle.
                sqlx::query("DELETE FROM users WHERE id = $1")
                    .bind(target_id)
                    .execute(pool)
                    .await?;
            }
        }

        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn synthetic_email_is_deterministic_per_id() {
        let id = Uuid::new_v4();
        let a = AccountService::synthetic_email("salt", id);
        let b = AccountService::synthetic_email("salt", id);
        assert_eq!(a, b);
    }

    #[test]
    fn synthetic_email_differs_across_ids_and_salts() {
        let id = Uuid::new_v4();
        let other = Uuid::new_v4();
        assert_ne!(
            AccountService::synthetic_email("salt", id),
            AccountService::synthetic_email("salt", other)
        );
        assert_ne!(
            AccountService::synthetic_email("salt", id),
            AccountService::synthetic_email("pepper", id)
        );
    }

    #[test]
    fn synthetic_email_shape() {
        let addr = AccountService::synthetic_email("salt", Uuid::new_v4());
        assert!(addr.starts_with("removed-"));
        assert!(addr.ends_with("@anonymized.invalid"));
        let local = addr.strip_suffix("@anonymized.invalid").unwrap();
        assert_eq!(local.len(), "removed-".len() + 16);
    }

    #[test]
    fn unusable_password_never_verifies() {
        assert!(bcrypt::verify("anything", UNUSABLE_PASSWORD).is_err());
    }
}
