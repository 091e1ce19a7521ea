use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::FromRow;
use uuid::Uuid;

/// Persisted admin session row. One per successful step-up login;
/// revocation flips `is_active` instead of deleting the row.
#[derive(Debug, Clone, Serialize, Deserialize, FromRow)]
pub struct AdminSession {
    pub id: Uuid,
    pub user_id: Uuid,
    pub is_active: bool,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub revoked_at: Option<DateTime<Utc>>,
    pub revoked_by: Option<Uuid>,
    pub created_at: DateTime<Utc>,
}

/// Listing DTO joined with the owning account's email.
#[derive(Debug, Clone, Serialize, FromRow)]
pub struct AdminSessionDto {
    pub id: Uuid,
    pub user_id: Uuid,
    pub email: String,
    pub ip_address: Option<String>,
    pub user_agent: Option<String>,
    pub expires_at: DateTime<Utc>,
    pub created_at: DateTime<Utc>,
}
