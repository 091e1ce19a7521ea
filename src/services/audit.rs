use sqlx::PgPool;
use uuid::Uuid;

/// An audit log entry to record.
pub struct AuditEntry {
    pub actor_user_id: Option<Uuid>,
    pub actor_email: Option<String>,
    pub actor_role: Option<String>,
    pub action: String,
    pub target_type: Option<String>,
    pub target_id: Option<String>,
    pub details: Option<serde_json::Value>,
    pub origin_ip: Option<String>,
    pub origin_user_agent: Option<String>,
}

/// Fire-and-forget audit log entry.
/// Spawns a background task so it never blocks the request handler and
/// never propagates errors (logs a warning on failure). Callers record
/// the entry only after the mutation it describes has succeeded.
pub fn log(pool: PgPool, entry: AuditEntry) {
    tokio::spawn(async move {
        let res = sqlx::query(
            "INSERT INTO admin_audit_log
                (actor_user_id, actor_email, actor_role, action,
                 target_type, target_id, details, origin_ip, origin_user_agent)
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9)",
        )
        .bind(entry.actor_user_id)
        .bind(entry.actor_email)
        .bind(entry.actor_role)
        .bind(&entry.action)
        .bind(entry.target_type)
        .bind(entry.target_id)
        .bind(entry.details)
        .bind(entry.origin_ip)
        .bind(entry.origin_user_agent)
        .execute(&pool)
        .await;

        if let Err(e) = res {
            tracing::warn!("audit log insert failed for action {}: {e}", entry.action);
        }
    });
}
