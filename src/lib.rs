pub mod config;
pub mod db;
pub mod errors;
pub mod middleware;
pub mod models;
pub mod permissions;
pub mod routes;
pub mod services;

use std::sync::Arc;

use axum::{
    http::{header, HeaderValue, Method},
    routing::{delete, get, post},
    Router,
};
use sqlx::PgPool;
use tower_http::cors::{AllowHeaders, AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;

use config::Config;
use services::email::EmailService;

/// Application state shared across all handlers.
#[derive(Clone)]
pub struct AppState {
    pub db: PgPool,
    pub redis: redis::aio::MultiplexedConnection,
    pub config: Arc<Config>,
    pub email: Option<Arc<EmailService>>,
}

/// Full route table plus the tracing and CORS layers.
pub fn router(state: AppState) -> Router {
    let cors = cors_layer(&state.config.app_base_url);

    Router::new()
        .route("/health", get(routes::health::health_check))
        .route("/metrics", get(routes::metrics::metrics_handler))
        // Step-up auth
        .route("/admin/auth/login", post(routes::auth::login))
        .route("/admin/auth/logout", post(routes::auth::logout))
        .route("/admin/auth/me", get(routes::auth::me))
        .route("/admin/auth/change-password", post(routes::auth::change_password))
        // Role lifecycle
        .route("/admin/roles", post(routes::roles::grant_role))
        .route("/admin/roles/{user_id}", delete(routes::roles::revoke_role))
        .route("/admin/roles/{user_id}/rotate-pin", post(routes::roles::rotate_pin))
        // User administration
        .route("/admin/users", get(routes::users::list_users))
        .route("/admin/users/{id}", delete(routes::users::delete_user))
        .route("/admin/users/{id}/block", post(routes::users::block_user))
        .route("/admin/users/{id}/unblock", post(routes::users::unblock_user))
        .route("/admin/users/{id}/revoke-sessions", post(routes::users::revoke_sessions))
        // Observability of the privileged surface
        .route("/admin/sessions", get(routes::sessions::list_sessions))
        .route("/admin/audit-log", get(routes::audit_log::list_audit_log))
        .layer(TraceLayer::new_for_http())
        .layer(cors)
        .with_state(state)
}

/// Allow the configured frontend origin plus localhost during
/// development. Credentials are required because the session rides in
/// cookies.
fn cors_layer(app_base_url: &str) -> CorsLayer {
    let base = app_base_url.to_string();
    let origin = AllowOrigin::predicate(move |origin: &HeaderValue, _| {
        let o = match origin.to_str() {
            Ok(s) => s,
            Err(_) => return false,
        };
        if o.starts_with("http://localhost") || o.starts_with("http://127.0.0.1") {
            return true;
        }
        o == base
    });

    CorsLayer::new()
        .allow_methods([Method::GET, Method::POST, Method::DELETE, Method::OPTIONS])
        .allow_headers(AllowHeaders::list([
            header::CONTENT_TYPE,
            header::ACCEPT,
            header::HeaderName::from_static("x-csrf-token"),
        ]))
        .allow_credentials(true)
        .allow_origin(origin)
}
