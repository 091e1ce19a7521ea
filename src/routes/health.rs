use axum::{extract::State, http::StatusCode, Json};
use serde_json::{json, Value};

use crate::AppState;

pub async fn health_check(State(state): State<AppState>) -> (StatusCode, Json<Value>) {
    let db = sqlx::query("SELECT 1").execute(&state.db).await;

    let mut redis = state.redis.clone();
    let ping: Result<String, _> = redis::cmd("PING").query_async(&mut redis).await;

    match (db, ping) {
        (Ok(_), Ok(_)) => (
            StatusCode::OK,
            Json(json!({ "status": "ok", "db": "connected", "redis": "connected" })),
        ),
        (db, ping) => (
            StatusCode::SERVICE_UNAVAILABLE,
            Json(json!({
                "status": "error",
                "db": db.err().map(|e| e.to_string()).unwrap_or_else(|| "connected".into()),
                "redis": ping.err().map(|e| e.to_string()).unwrap_or_else(|| "connected".into()),
            })),
        ),
    }
}
