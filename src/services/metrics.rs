use lazy_static::lazy_static;
use prometheus::{register_counter, register_counter_vec, register_gauge, Counter, CounterVec, Gauge};
use sqlx::PgPool;
use tracing::warn;

lazy_static! {
    // Event counters (increment on each event)
    pub static ref ADMIN_LOGINS: CounterVec = register_counter_vec!(
        "admin_logins_total",
        "Admin login attempts by status",
        &["status"]
    ).unwrap();

    pub static ref AUTHZ_DENIALS: Counter = register_counter!(
        "admin_authz_denials_total",
        "Requests rejected by the capability check"
    ).unwrap();

    pub static ref SESSION_REVOCATIONS: Counter = register_counter!(
        "admin_session_revocations_total",
        "Admin sessions revoked"
    ).unwrap();

    pub static ref CSRF_REJECTIONS: Counter = register_counter!(
        "admin_csrf_rejections_total",
        "Requests rejected by the CSRF guard"
    ).unwrap();

    // Business gauges, refreshed by the background collector
    pub static ref PRIVILEGED_ACCOUNTS: Gauge = register_gauge!(
        "admin_privileged_accounts_total",
        "Accounts currently holding an admin role"
    ).unwrap();

    pub static ref ACTIVE_SESSIONS: Gauge = register_gauge!(
        "admin_active_sessions_total",
        "Active unexpired admin sessions"
    ).unwrap();
}

/// Spawn the background metrics collector (refreshes every 5 minutes).
pub fn start(pool: PgPool) {
    tokio::spawn(async move {
        // Initial collection on startup
        if let Err(e) = collect(&pool).await {
            warn!("Metrics: initial collection failed: {}", e);
        }
        loop {
            tokio::time::sleep(tokio::time::Duration::from_secs(300)).await;
            if let Err(e) = collect(&pool).await {
                warn!("Metrics: collection failed: {}", e);
            }
        }
    });
}

async fn collect(pool: &PgPool) -> anyhow::Result<()> {
    let privileged: i64 = sqlx::query_scalar(
        "SELECT COUNT(*)::BIGINT FROM users
         WHERE admin_role IS NOT NULL AND deleted_at IS NULL",
    )
    .fetch_one(pool)
    .await?;
    PRIVILEGED_ACCOUNTS.set(privileged as f64);

    let sessions: i64 = sqlx::query_scalar(
        "SELECT COUNT(*)::BIGINT FROM admin_sessions
         WHERE is_active = TRUE AND expires_at > NOW()",
    )
    .fetch_one(pool)
    .await?;
    ACTIVE_SESSIONS.set(sessions as f64);

    Ok(())
}
