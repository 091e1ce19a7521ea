use axum::{
    extract::{Query, State},
    Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    errors::ApiError, models::auth::AdminPrincipal, permissions::Capability, AppState,
};

#[derive(Deserialize)]
pub struct AuditQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
    pub action: Option<String>,
}

#[derive(Serialize, sqlx::FromRow)]
pub struct AuditLogRow {
    pub id: Uuid,
    pub actor_user_id: Option<Uuid>,
    pub actor_email: Option<String>,
    pub actor_role: Option<String>,
    pub action: String,
    pub target_type: Option<String>,
    pub target_id: Option<String>,
    pub details: Option<serde_json::Value>,
    pub origin_ip: Option<String>,
    pub origin_user_agent: Option<String>,
    pub created_at: DateTime<Utc>,
}

/// Paginated, newest-first audit trail with an optional action prefix
/// filter (`?action=role_` matches `role_granted` and `role_revoked`).
pub async fn list_audit_log(
    State(state): State<AppState>,
    principal: AdminPrincipal,
    Query(params): Query<AuditQuery>,
) -> Result<Json<Value>, ApiError> {
    principal.require(Capability::AuditView)?;

    let limit = params.limit.unwrap_or(50).min(200);
    let page = params.page.unwrap_or(1).max(1);
    let offset = (page - 1) * limit;

    let (entries, total) = if let Some(action_filter) = &params.action {
        let rows: Vec<AuditLogRow> = sqlx::query_as(
            "SELECT id, actor_user_id, actor_email, actor_role, action,
                    target_type, target_id, details, origin_ip, origin_user_agent, created_at
             FROM admin_audit_log
             WHERE action LIKE $1
             ORDER BY created_at DESC
             LIMIT $2 OFFSET $3",
        )
        .bind(format!("{action_filter}%"))
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.db)
        .await?;

        let total: i64 =
            sqlx::query_scalar("SELECT COUNT(*) FROM admin_audit_log WHERE action LIKE $1")
                .bind(format!("{action_filter}%"))
                .fetch_one(&state.db)
                .await?;

        (rows, total)
    } else {
        let rows: Vec<AuditLogRow> = sqlx::query_as(
            "SELECT id, actor_user_id, actor_email, actor_role, action,
                    target_type, target_id, details, origin_ip, origin_user_agent, created_at
             FROM admin_audit_log
             ORDER BY created_at DESC
             LIMIT $1 OFFSET $2",
        )
        .bind(limit)
        .bind(offset)
        .fetch_all(&state.db)
        .await?;

        let total: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM admin_audit_log")
            .fetch_one(&state.db)
            .await?;

        (rows, total)
    };

    Ok(Json(json!({
        "entries": entries,
        "total":   total,
        "page":    page,
        "limit":   limit,
    })))
}
