use axum::{
    body::Body,
    extract::State,
    http::{header, HeaderMap, StatusCode},
    response::Response,
    Json,
};
use rand::distributions::Alphanumeric;
use rand::Rng;
use serde_json::{json, Value};

use crate::{
    errors::ApiError,
    middleware::{csrf::CsrfGuard, rate_limit::check_rate_limit},
    models::{
        auth::AdminPrincipal,
        user::{AdminLoginRequest, ChangePasswordRequest, User, UserProfile},
    },
    services::{
        admin_auth::AdminAuthService,
        audit::{self, AuditEntry},
        metrics,
        sessions::SessionService,
    },
    AppState,
};

use super::{client_ip, user_agent};

/// Random value for the double-submit CSRF cookie.
fn generate_csrf_token() -> String {
    rand::thread_rng()
        .sample_iter(&Alphanumeric)
        .take(48)
        .map(char::from)
        .collect()
}

fn auth_cookies(token: &str, csrf: &str, max_age: u64) -> (String, String) {
    (
        format!("admin_token={token}; HttpOnly; Secure; SameSite=Strict; Path=/; Max-Age={max_age}"),
        // Readable by the frontend so it can echo the value in X-CSRF-Token.
        format!("admin_csrf={csrf}; Secure; SameSite=Strict; Path=/; Max-Age={max_age}"),
    )
}

fn json_response_with_cookies(body: &Value, cookies: (String, String)) -> Response {
    let body_str = serde_json::to_string(body).unwrap_or_default();
    Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .header(header::SET_COOKIE, cookies.0)
        .header(header::SET_COOKIE, cookies.1)
        .body(Body::from(body_str))
        .unwrap()
}

pub async fn login(
    State(state): State<AppState>,
    headers: HeaderMap,
    Json(body): Json<AdminLoginRequest>,
) -> Result<Response, ApiError> {
    // 5 attempts per 15 min per email
    let rate_key = format!("rate:admin_login:{}", body.email.to_lowercase());
    let mut redis = state.redis.clone();
    check_rate_limit(&mut redis, &rate_key, 5, 900).await?;

    let ip = client_ip(&headers);
    let ua = user_agent(&headers);

    let (user, token, _session_id) = match AdminAuthService::authenticate(
        &state.db,
        &body.email,
        &body.password,
        &body.pin,
        &state.config.jwt_secret,
        state.config.admin_session_ttl_seconds,
        ip.as_deref(),
        ua.as_deref(),
    )
    .await
    {
        Ok(outcome) => outcome,
        Err(e) => {
            if matches!(e, ApiError::InvalidCredentials) {
                metrics::ADMIN_LOGINS.with_label_values(&["failure"]).inc();
                audit::log(
                    state.db.clone(),
                    AuditEntry {
                        actor_user_id: None,
                        actor_email: Some(body.email.to_lowercase()),
                        actor_role: None,
                        action: "admin_login_failed".to_string(),
                        target_type: None,
                        target_id: None,
                        details: None,
                        origin_ip: ip,
                        origin_user_agent: ua,
                    },
                );
            }
            return Err(e);
        }
    };

    metrics::ADMIN_LOGINS.with_label_values(&["success"]).inc();
    audit::log(
        state.db.clone(),
        AuditEntry {
            actor_user_id: Some(user.id),
            actor_email: Some(user.email.clone()),
            actor_role: user.admin_role.clone(),
            action: "admin_login".to_string(),
            target_type: None,
            target_id: None,
            details: None,
            origin_ip: ip,
            origin_user_agent: ua,
        },
    );

    let csrf = generate_csrf_token();
    let cookies = auth_cookies(&token, &csrf, state.config.admin_session_ttl_seconds);
    let profile = UserProfile::from(user);
    Ok(json_response_with_cookies(
        &json!({ "user": profile, "csrf_token": csrf }),
        cookies,
    ))
}

pub async fn logout(
    State(state): State<AppState>,
    _csrf: CsrfGuard,
    principal: AdminPrincipal,
    headers: HeaderMap,
) -> Result<Response, ApiError> {
    SessionService::revoke_by_session(&state.db, principal.session_id, Some(principal.user_id))
        .await?;

    audit::log(
        state.db.clone(),
        AuditEntry {
            actor_user_id: Some(principal.user_id),
            actor_email: Some(principal.email.clone()),
            actor_role: Some(principal.role.to_string()),
            action: "admin_logout".to_string(),
            target_type: None,
            target_id: None,
            details: None,
            origin_ip: client_ip(&headers),
            origin_user_agent: user_agent(&headers),
        },
    );

    // Expire both cookies
    Ok(Response::builder()
        .status(StatusCode::OK)
        .header(header::CONTENT_TYPE, "application/json")
        .header(
            header::SET_COOKIE,
            "admin_token=; HttpOnly; Secure; SameSite=Strict; Path=/; Max-Age=0",
        )
        .header(
            header::SET_COOKIE,
            "admin_csrf=; Secure; SameSite=Strict; Path=/; Max-Age=0",
        )
        .body(Body::from(r#"{"message":"Logged out"}"#))
        .unwrap())
}

pub async fn me(
    State(state): State<AppState>,
    principal: AdminPrincipal,
) -> Result<Json<Value>, ApiError> {
    let user = sqlx::query_as::<_, User>("SELECT * FROM users WHERE id = $1")
        .bind(principal.user_id)
        .fetch_optional(&state.db)
        .await?
        .ok_or_else(|| ApiError::NotFound("User not found".to_string()))?;

    Ok(Json(serde_json::to_value(UserProfile::from(user)).unwrap_or_default()))
}

pub async fn change_password(
    State(state): State<AppState>,
    _csrf: CsrfGuard,
    principal: AdminPrincipal,
    headers: HeaderMap,
    Json(body): Json<ChangePasswordRequest>,
) -> Result<Json<Value>, ApiError> {
    AdminAuthService::change_password(
        &state.db,
        principal.user_id,
        &body.current_password,
        &body.new_password,
    )
    .await?;

    audit::log(
        state.db.clone(),
        AuditEntry {
            actor_user_id: Some(principal.user_id),
            actor_email: Some(principal.email.clone()),
            actor_role: Some(principal.role.to_string()),
            action: "admin_password_changed".to_string(),
            target_type: Some("user".to_string()),
            target_id: Some(principal.user_id.to_string()),
            details: None,
            origin_ip: client_ip(&headers),
            origin_user_agent: user_agent(&headers),
        },
    );

    Ok(Json(json!({
        "message": "Password changed. All other sessions have been signed out."
    })))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn csrf_token_is_url_safe() {
        let token = generate_csrf_token();
        assert_eq!(token.len(), 48);
        assert!(token.chars().all(|c| c.is_ascii_alphanumeric()));
    }

    #[test]
    fn session_cookie_is_http_only_but_csrf_is_not() {
        let (session, csrf) = auth_cookies("t0k3n", "c5rf", 43200);
        assert!(session.contains("HttpOnly"));
        assert!(session.contains("admin_token=t0k3n"));
        assert!(!csrf.contains("HttpOnly"));
        assert!(csrf.contains("admin_csrf=c5rf"));
        assert!(csrf.contains("Max-Age=43200"));
    }
}
