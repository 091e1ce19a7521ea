use serde::{Deserialize, Serialize};
use uuid::Uuid;

use super::user::AdminRole;
use crate::errors::ApiError;
use crate::permissions::{self, Capability};

/// Claims embedded in the admin JWT
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AdminClaims {
    pub sub: String, // user UUID
    pub role: AdminRole,
    pub tv: i32,     // token_version snapshot at mint time
    pub sid: String, // admin_sessions row UUID
    pub exp: usize,
    pub iat: usize,
}

/// Verified principal, built by the extractor after the store re-check.
#[derive(Debug, Clone)]
pub struct AdminPrincipal {
    pub user_id: Uuid,
    pub email: String,
    pub role: AdminRole,
    pub overrides: Option<Vec<String>>,
    pub session_id: Uuid,
}

impl AdminPrincipal {
    /// Capability gate called at the top of every privileged handler.
    pub fn require(&self, capability: Capability) -> Result<(), ApiError> {
        if permissions::allows(self.role, self.overrides.as_deref(), capability) {
            Ok(())
        } else {
            crate::services::metrics::AUTHZ_DENIALS.inc();
            Err(ApiError::Forbidden)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn principal(role: AdminRole, overrides: Option<Vec<String>>) -> AdminPrincipal {
        AdminPrincipal {
            user_id: Uuid::new_v4(),
            email: "ops@example.com".into(),
            role,
            overrides,
            session_id: Uuid::new_v4(),
        }
    }

    #[test]
    fn admin_passes_every_gate() {
        let p = principal(AdminRole::Admin, None);
        assert!(p.require(Capability::UsersDelete).is_ok());
        assert!(p.require(Capability::RolesManage).is_ok());
    }

    #[test]
    fn moderator_blocked_from_role_management() {
        let p = principal(AdminRole::Moderator, None);
        assert!(p.require(Capability::UsersManage).is_ok());
        assert!(matches!(
            p.require(Capability::RolesManage),
            Err(ApiError::Forbidden)
        ));
    }

    #[test]
    fn override_widens_gate() {
        let p = principal(
            AdminRole::Developer,
            Some(vec!["USERS_MANAGE".to_string()]),
        );
        assert!(p.require(Capability::UsersManage).is_ok());
    }
}
