use std::sync::Arc;

use redis::Client as RedisClient;
use tracing::info;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use reserva_api::config::Config;
use reserva_api::services::email::EmailService;
use reserva_api::services::metrics;
use reserva_api::{db, router, AppState};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::registry()
        .with(tracing_subscriber::EnvFilter::from_default_env())
        .with(tracing_subscriber::fmt::layer())
        .init();

    let config = Arc::new(Config::from_env()?);

    let pool = db::create_pool(&config.database_url).await?;
    db::run_migrations(&pool).await?;
    info!("Database connected and migrations applied");

    let redis_client = RedisClient::open(config.redis_url.as_str())?;
    let redis_conn = redis_client.get_multiplexed_async_connection().await?;
    info!("Redis connected");

    let email = EmailService::new(&config).map(Arc::new);
    if email.is_some() {
        info!("SMTP email service configured");
    } else {
        info!("SMTP not configured, PIN and notice emails disabled");
    }

    metrics::start(pool.clone());

    let state = AppState {
        db: pool,
        redis: redis_conn,
        config: config.clone(),
        email,
    };

    let app = router(state);

    let addr = format!("{}:{}", config.host, config.port);
    info!("reserva admin API listening on {}", addr);

    let listener = tokio::net::TcpListener::bind(&addr).await?;
    axum::serve(listener, app).await?;

    Ok(())
}
