use axum::{extract::State, Json};
use serde_json::{json, Value};

use crate::{
    errors::ApiError, models::auth::AdminPrincipal, permissions::Capability,
    services::sessions::SessionService, AppState,
};

/// Active admin sessions across all privileged accounts.
pub async fn list_sessions(
    State(state): State<AppState>,
    principal: AdminPrincipal,
) -> Result<Json<Value>, ApiError> {
    principal.require(Capability::SessionsView)?;

    let sessions = SessionService::list_active(&state.db).await?;
    Ok(Json(json!({ "sessions": sessions })))
}
