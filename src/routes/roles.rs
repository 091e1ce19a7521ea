use axum::{
    extract::{Path, State},
    http::HeaderMap,
    Json,
};
use serde_json::{json, Value};
use uuid::Uuid;

use crate::{
    errors::ApiError,
    middleware::csrf::CsrfGuard,
    models::{auth::AdminPrincipal, user::GrantRoleRequest, user::UserProfile},
    permissions::Capability,
    services::{
        audit::{self, AuditEntry},
        roles::RoleService,
    },
    AppState,
};

use super::{client_ip, user_agent};

pub async fn grant_role(
    State(state): State<AppState>,
    _csrf: CsrfGuard,
    principal: AdminPrincipal,
    headers: HeaderMap,
    Json(body): Json<GrantRoleRequest>,
) -> Result<Json<Value>, ApiError> {
    principal.require(Capability::RolesManage)?;

    let user = RoleService::grant_role(&state.db, state.email.as_ref(), &body.email, body.role)
        .await?;

    audit::log(
        state.db.clone(),
        AuditEntry {
            actor_user_id: Some(principal.user_id),
            actor_email: Some(principal.email.clone()),
            actor_role: Some(principal.role.to_string()),
            action: "role_granted".to_string(),
            target_type: Some("user".to_string()),
            target_id: Some(user.id.to_string()),
            details: Some(json!({ "role": body.role.to_string() })),
            origin_ip: client_ip(&headers),
            origin_user_agent: user_agent(&headers),
        },
    );

    Ok(Json(json!({
        "message": "Role granted. The PIN is on its way by email.",
        "user": UserProfile::from(user),
    })))
}

pub async fn revoke_role(
    State(state): State<AppState>,
    _csrf: CsrfGuard,
    principal: AdminPrincipal,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    principal.require(Capability::RolesManage)?;

    let previous_role =
        RoleService::revoke_role(&state.db, state.email.as_ref(), principal.user_id, user_id)
            .await?;

    audit::log(
        state.db.clone(),
        AuditEntry {
            actor_user_id: Some(principal.user_id),
            actor_email: Some(principal.email.clone()),
            actor_role: Some(principal.role.to_string()),
            action: "role_revoked".to_string(),
            target_type: Some("user".to_string()),
            target_id: Some(user_id.to_string()),
            details: Some(json!({ "previous_role": previous_role })),
            origin_ip: client_ip(&headers),
            origin_user_agent: user_agent(&headers),
        },
    );

    Ok(Json(json!({ "message": "Role revoked and all sessions signed out." })))
}

pub async fn rotate_pin(
    State(state): State<AppState>,
    _csrf: CsrfGuard,
    principal: AdminPrincipal,
    headers: HeaderMap,
    Path(user_id): Path<Uuid>,
) -> Result<Json<Value>, ApiError> {
    principal.require(Capability::RolesManage)?;

    let user = RoleService::rotate_pin(&state.db, state.email.as_ref(), user_id).await?;

    audit::log(
        state.db.clone(),
        AuditEntry {
            actor_user_id: Some(principal.user_id),
            actor_email: Some(principal.email.clone()),
            actor_role: Some(principal.role.to_string()),
            action: "pin_rotated".to_string(),
            target_type: Some("user".to_string()),
            target_id: Some(user.id.to_string()),
            details: None,
            origin_ip: client_ip(&headers),
            origin_user_agent: user_agent(&headers),
        },
    );

    Ok(Json(json!({ "message": "A new PIN is on its way by email." })))
}
