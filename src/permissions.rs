use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::models::user::AdminRole;

/// Capability tokens gating the privileged surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Capability {
    #[serde(rename = "USERS_VIEW")]
    UsersView,
    #[serde(rename = "USERS_MANAGE")]
    UsersManage,
    #[serde(rename = "USERS_DELETE")]
    UsersDelete,
    #[serde(rename = "ROLES_VIEW")]
    RolesView,
    #[serde(rename = "ROLES_MANAGE")]
    RolesManage,
    #[serde(rename = "SESSIONS_VIEW")]
    SessionsView,
    #[serde(rename = "AUDIT_VIEW")]
    AuditView,
    #[serde(rename = "FINANCE_VIEW")]
    FinanceView,
}

impl fmt::Display for Capability {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            Capability::UsersView => "USERS_VIEW",
            Capability::UsersManage => "USERS_MANAGE",
            Capability::UsersDelete => "USERS_DELETE",
            Capability::RolesView => "ROLES_VIEW",
            Capability::RolesManage => "ROLES_MANAGE",
            Capability::SessionsView => "SESSIONS_VIEW",
            Capability::AuditView => "AUDIT_VIEW",
            Capability::FinanceView => "FINANCE_VIEW",
        };
        write!(f, "{}", s)
    }
}

impl FromStr for Capability {
    type Err = ();

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "USERS_VIEW" => Ok(Capability::UsersView),
            "USERS_MANAGE" => Ok(Capability::UsersManage),
            "USERS_DELETE" => Ok(Capability::UsersDelete),
            "ROLES_VIEW" => Ok(Capability::RolesView),
            "ROLES_MANAGE" => Ok(Capability::RolesManage),
            "SESSIONS_VIEW" => Ok(Capability::SessionsView),
            "AUDIT_VIEW" => Ok(Capability::AuditView),
            "FINANCE_VIEW" => Ok(Capability::FinanceView),
            _ => Err(()),
        }
    }
}

const MODERATOR_CAPABILITIES: &[Capability] = &[
    Capability::UsersView,
    Capability::UsersManage,
    Capability::SessionsView,
    Capability::AuditView,
];

const DEVELOPER_CAPABILITIES: &[Capability] = &[
    Capability::UsersView,
    Capability::RolesView,
    Capability::SessionsView,
    Capability::AuditView,
    Capability::FinanceView,
];

/// Capability set granted by a role alone. `Admin` is handled in
/// [`allows`] as an explicit allow-all rather than an enumeration.
pub fn role_capabilities(role: AdminRole) -> &'static [Capability] {
    match role {
        AdminRole::Admin => &[],
        AdminRole::Moderator => MODERATOR_CAPABILITIES,
        AdminRole::Developer => DEVELOPER_CAPABILITIES,
    }
}

/// Whether `role`, optionally widened by a per-account override set,
/// grants `capability`. Overrides are a union with the role set, never
/// a replacement.
pub fn allows(role: AdminRole, overrides: Option<&[String]>, capability: Capability) -> bool {
    if role == AdminRole::Admin {
        return true;
    }
    if role_capabilities(role).contains(&capability) {
        return true;
    }
    match overrides {
        Some(extra) => extra
            .iter()
            .any(|s| s.parse::<Capability>() == Ok(capability)),
        None => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn admin_allows_everything() {
        for cap in [
            Capability::UsersView,
            Capability::UsersManage,
            Capability::UsersDelete,
            Capability::RolesView,
            Capability::RolesManage,
            Capability::SessionsView,
            Capability::AuditView,
            Capability::FinanceView,
        ] {
            assert!(allows(AdminRole::Admin, None, cap));
        }
    }

    #[test]
    fn moderator_set() {
        assert!(allows(AdminRole::Moderator, None, Capability::UsersView));
        assert!(allows(AdminRole::Moderator, None, Capability::UsersManage));
        assert!(allows(AdminRole::Moderator, None, Capability::SessionsView));
        assert!(allows(AdminRole::Moderator, None, Capability::AuditView));
        assert!(!allows(AdminRole::Moderator, None, Capability::UsersDelete));
        assert!(!allows(AdminRole::Moderator, None, Capability::RolesManage));
        assert!(!allows(AdminRole::Moderator, None, Capability::FinanceView));
    }

    #[test]
    fn developer_set() {
        assert!(allows(AdminRole::Developer, None, Capability::RolesView));
        assert!(allows(AdminRole::Developer, None, Capability::FinanceView));
        assert!(!allows(AdminRole::Developer, None, Capability::UsersManage));
        assert!(!allows(AdminRole::Developer, None, Capability::RolesManage));
    }

    #[test]
    fn overrides_union_with_role_set() {
        let extra = vec!["USERS_DELETE".to_string()];
        assert!(allows(
            AdminRole::Moderator,
            Some(&extra),
            Capability::UsersDelete
        ));
        // Role grants stay intact when an override set is present.
        assert!(allows(
            AdminRole::Moderator,
            Some(&extra),
            Capability::UsersView
        ));
        // Unknown strings in the override set are ignored.
        let junk = vec!["NOT_A_CAPABILITY".to_string()];
        assert!(!allows(
            AdminRole::Moderator,
            Some(&junk),
            Capability::UsersDelete
        ));
    }

    #[test]
    fn capability_roundtrip() {
        for cap in [
            Capability::UsersView,
            Capability::UsersManage,
            Capability::UsersDelete,
            Capability::RolesView,
            Capability::RolesManage,
            Capability::SessionsView,
            Capability::AuditView,
            Capability::FinanceView,
        ] {
            assert_eq!(cap.to_string().parse::<Capability>(), Ok(cap));
        }
    }
}
