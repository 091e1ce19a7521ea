use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "snake_case")]
pub enum AdminRole {
    Admin,
    Moderator,
    Developer,
}

impl std::fmt::Display for AdminRole {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            AdminRole::Admin => "admin",
            AdminRole::Moderator => "moderator",
            AdminRole::Developer => "developer",
        };
        write!(f, "{s}")
    }
}

impl std::str::FromStr for AdminRole {
    type Err = anyhow::Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "admin" => Ok(AdminRole::Admin),
            "moderator" => Ok(AdminRole::Moderator),
            "developer" => Ok(AdminRole::Developer),
            _ => Err(anyhow::anyhow!("Unknown role: {s}")),
        }
    }
}

/// DB row struct. Roles live as nullable TEXT so a plain account is
/// simply `admin_role IS NULL`.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct User {
    pub id: Uuid,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: Option<String>,
    pub birthdate: Option<NaiveDate>,
    pub admin_role: Option<String>,
    pub admin_permissions: Option<Vec<String>>,
    #[serde(skip_serializing)]
    pub admin_pin_hash: Option<String>,
    pub is_admin_active: bool,
    pub is_active: bool,
    pub token_version: i32,
    pub force_password_reset: bool,
    pub visit_count: i32,
    pub last_admin_login: Option<DateTime<Utc>>,
    pub deleted_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

// Request/Response DTOs
#[derive(Debug, Deserialize)]
pub struct AdminLoginRequest {
    pub email: String,
    pub password: String,
    pub pin: String,
}

#[derive(Debug, Serialize)]
pub struct UserProfile {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
    pub role: Option<AdminRole>,
    pub is_admin_active: bool,
    pub is_active: bool,
    pub force_password_reset: bool,
    pub last_admin_login: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserProfile {
    fn from(u: User) -> Self {
        Self {
            id: u.id,
            email: u.email,
            first_name: u.first_name,
            last_name: u.last_name,
            role: u.admin_role.as_deref().and_then(|r| r.parse().ok()),
            is_admin_active: u.is_admin_active,
            is_active: u.is_active,
            force_password_reset: u.force_password_reset,
            last_admin_login: u.last_admin_login,
            created_at: u.created_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct GrantRoleRequest {
    pub email: String,
    pub role: AdminRole,
}

#[derive(Debug, Deserialize)]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

/// Deletion strategy selected by the `type` query parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DeleteMode {
    Soft,
    Anonymize,
    Hard,
}

impl std::fmt::Display for DeleteMode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let s = match self {
            DeleteMode::Soft => "soft",
            DeleteMode::Anonymize => "anonymize",
            DeleteMode::Hard => "hard",
        };
        write!(f, "{s}")
    }
}

#[derive(Debug, Deserialize)]
pub struct DeleteUserQuery {
    #[serde(rename = "type")]
    pub mode: Option<DeleteMode>,
}

#[derive(Debug, Deserialize)]
pub struct ListUsersQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub search: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_roundtrip() {
        for role in [AdminRole::Admin, AdminRole::Moderator, AdminRole::Developer] {
            assert_eq!(role.to_string().parse::<AdminRole>().unwrap(), role);
        }
    }

    #[test]
    fn unknown_role_rejected() {
        assert!("super_admin".parse::<AdminRole>().is_err());
        assert!("".parse::<AdminRole>().is_err());
        assert!("Admin".parse::<AdminRole>().is_err());
    }

    #[test]
    fn delete_mode_from_query_string() {
        let q: DeleteUserQuery = serde_json::from_str(r#"{"type":"anonymize"}"#).unwrap();
        assert_eq!(q.mode, Some(DeleteMode::Anonymize));
        let q: DeleteUserQuery = serde_json::from_str(r#"{}"#).unwrap();
        assert_eq!(q.mode, None);
    }
}
