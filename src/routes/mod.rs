use axum::http::HeaderMap;

pub mod audit_log;
pub mod auth;
pub mod health;
pub mod metrics;
pub mod roles;
pub mod sessions;
pub mod users;

pub(crate) fn client_ip(h: &HeaderMap) -> Option<String> {
    h.get("x-real-ip")
        .and_then(|v| v.to_str().ok())
        .or_else(|| {
            h.get("x-forwarded-for")
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.split(',').next())
                .map(|s| s.trim())
        })
        .map(|s| s.to_string())
}

pub(crate) fn user_agent(h: &HeaderMap) -> Option<String> {
    h.get("user-agent")
        .and_then(|v| v.to_str().ok())
        .map(|s| s.to_string())
}
