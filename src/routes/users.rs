use axum::{
    extract::{Path, Query, State},
    http::HeaderMap,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    errors::ApiError,
    middleware::csrf::CsrfGuard,
    models::{
        auth::AdminPrincipal,
        user::{DeleteMode, DeleteUserQuery, ListUsersQuery, User, UserProfile},
    },
    permissions::Capability,
    services::{
        accounts::AccountService,
        audit::{self, AuditEntry},
        sessions::SessionService,
    },
    AppState,
};

use super::{client_ip, user_agent};

/// Paginated user listing with an optional case-insensitive search over
/// email and name.
pub async fn list_users(
    State(state): State<AppState>,
    principal: AdminPrincipal,
    Query(query): Query<ListUsersQuery>,
) -> Result<Json<Value>, ApiError> {
    principal.require(Capability::UsersView)?;

    let limit = query.limit.unwrap_or(50).clamp(1, 200);
    let page = query.page.unwrap_or(1).max(1);
    let offset = (page - 1) * limit;
    let pattern = query
        .search
        .as_deref()
        .filter(|s| !s.trim().is_empty())
        .map(|s| format!("%{}%", s.trim()));

    let (users, total): (Vec<User>, i64) = match &pattern {
        Some(p) => {
            let users = sqlx::query_as::<_, User>(
                "SELECT * FROM users
                 WHERE deleted_at IS NULL
                   AND (email ILIKE $1 OR first_name ILIKE $1 OR last_name ILIKE $1)
                 ORDER BY created_at DESC
                 LIMIT $2 OFFSET $3",
            )
            .bind(p)
            .bind(limit)
            .bind(offset)
            .fetch_all(&state.db)
            .await?;
            let total = sqlx::query_scalar(
                "SELECT COUNT(*) FROM users
                 WHERE deleted_at IS NULL
                   AND (email ILIKE $1 OR first_name ILIKE $1 OR last_name ILIKE $1)",
            )
            .bind(p)
            .fetch_one(&state.db)
            .await?;
            (users, total)
        }
        None => {
            let users = sqlx::query_as::<_, User>(
                "SELECT * FROM users WHERE deleted_at IS NULL
                 ORDER BY created_at DESC
                 LIMIT $1 OFFSET $2",
            )
            .bind(limit)
            .bind(offset)
            .fetch_all(&state.db)
            .await?;
            let total = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE deleted_at IS NULL")
                .fetch_one(&state.db)
                .await?;
            (users, total)
        }
    };

    let profiles: Vec<UserProfile> = users.into_iter().map(UserProfile::from).collect();
    Ok(Json(json!({
        "users": profiles,
        "total": total,
        "page": page,
        "limit": limit,
    })))
}

pub async fn block_user(
    State(state): State<AppState>,
    _csrf: CsrfGuard,
    principal: AdminPrincipal,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    principal.require(Capability::UsersManage)?;

    let updated = sqlx::query(
        "UPDATE users SET is_active = FALSE, updated_at = NOW()
         WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(user_id)
    .execute(&state.db)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    // A blocked account must not keep a live admin session either.
    SessionService::revoke_all(&state.db, user_id, Some(principal.user_id)).await?;

    audit::log(
        state.db.clone(),
        AuditEntry {
            actor_user_id: Some(principal.user_id),
            actor_email: Some(principal.email.clone()),
            actor_role: Some(principal.role.to_string()),
            action: "user_blocked".to_string(),
            target_type: Some("user".to_string()),
            target_id: Some(user_id.to_string()),
            details: None,
            origin_ip: client_ip(&headers),
            origin_user_agent: user_agent(&headers),
        },
    );

    Ok(Json(json!({ "message": "User blocked" })))
}

pub async fn unblock_user(
    State(state): State<AppState>,
    _csrf: CsrfGuard,
    principal: AdminPrincipal,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    principal.require(Capability::UsersManage)?;

    let updated = sqlx::query(
        "UPDATE users SET is_active = TRUE, updated_at = NOW()
         WHERE id = $1 AND deleted_at IS NULL",
    )
    .bind(user_id)
    .execute(&state.db)
    .await?;
    if updated.rows_affected() == 0 {
        return Err(ApiError::NotFound("User not found".to_string()));
    }

    audit::log(
        state.db.clone(),
        AuditEntry {
            actor_user_id: Some(principal.user_id),
            actor_email: Some(principal.email.clone()),
            actor_role: Some(principal.role.to_string()),
            action: "user_unblocked".to_string(),
            target_type: Some("user".to_string()),
            target_id: Some(user_id.to_string()),
            details: None,
            origin_ip: client_ip(&headers),
            origin_user_agent: user_agent(&headers),
        },
    );

    Ok(Json(json!({ "message": "User unblocked" })))
}

pub async fn revoke_sessions(
    State(state): State<AppState>,
    _csrf: CsrfGuard,
    principal: AdminPrincipal,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    principal.require(Capability::UsersManage)?;

    let revoked = SessionService::revoke_all(&state.db, user_id, Some(principal.user_id)).await?;

    audit::log(
        state.db.clone(),
        AuditEntry {
            actor_user_id: Some(principal.user_id),
            actor_email: Some(principal.email.clone()),
            actor_role: Some(principal.role.to_string()),
            action: "sessions_revoked".to_string(),
            target_type: Some("user".to_string()),
            target_id: Some(user_id.to_string()),
            details: Some(json!({ "revoked_sessions": revoked })),
            origin_ip: client_ip(&headers),
            origin_user_agent: user_agent(&headers),
        },
    );

    Ok(Json(json!({ "message": "Sessions revoked", "revoked_sessions": revoked })))
}

pub async fn delete_user(
    State(state): State<AppState>,
    _csrf: CsrfGuard,
    principal: AdminPrincipal,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
    Query(query): Query<DeleteUserQuery>,
) -> Result<Json<Value>, ApiError> {
    principal.require(Capability::UsersDelete)?;

    let mode = query.mode.unwrap_or(DeleteMode::Soft);
    let user = AccountService::delete_account(
        &state.db,
        state.email.as_ref(),
        principal.user_id,
        user_id,
        mode,
        &state.config.anonymize_salt,
    )
    .await?;

    audit::log(
        state.db.clone(),
        AuditEntry {
            actor_user_id: Some(principal.user_id),
            actor_email: Some(principal.email.clone()),
            actor_role: Some(principal.role.to_string()),
            action: "account_deleted".to_string(),
            target_type: Some("user".to_string()),
            target_id: Some(user.id.to_string()),
            details: Some(json!({ "mode": mode.to_string(), "email": user.email })),
            origin_ip: client_ip(&headers),
            origin_user_agent: user_agent(&headers),
        },
    );

    Ok(Json(json!({ "message": format!("Account deleted ({mode})") })))
}
