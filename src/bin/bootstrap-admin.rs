/// Seed the first admin account so the platform has someone who can
/// sign in to the admin area and grant further roles.
///
/// Usage: bootstrap-admin --email ops@example.com --first-name Ada --last-name Ops
///   The generated PIN is printed to stdout exactly once; only its
///   bcrypt hash is stored.

use clap::Parser;
use sqlx::postgres::PgPoolOptions;
use uuid::Uuid;

use reserva_api::models::user::AdminRole;
use reserva_api::services::roles::RoleService;

#[derive(Parser)]
#[command(name = "bootstrap-admin", about = "Seed the first reserva admin account")]
struct Args {
    /// Email of the account to create or promote
    #[arg(long)]
    email: String,

    /// First name (used when the account does not exist yet)
    #[arg(long, default_value = "Platform")]
    first_name: String,

    /// Last name (used when the account does not exist yet)
    #[arg(long, default_value = "Admin")]
    last_name: String,

    /// Initial password (used when the account does not exist yet)
    #[arg(long)]
    password: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let _ = dotenvy::dotenv();

    tracing_subscriber::fmt()
        .with_max_level(tracing::Level::INFO)
        .init();

    let args = Args::parse();

    let database_url = std::env::var("DATABASE_URL")
        .map_err(|_| anyhow::anyhow!("DATABASE_URL environment variable not set"))?;

    let pool = PgPoolOptions::new()
        .max_connections(5)
        .connect(&database_url)
        .await?;

    let existing: Option<(Uuid, Option<String>)> =
        sqlx::query_as("SELECT id, admin_role FROM users WHERE email = $1 AND deleted_at IS NULL")
            .bind(&args.email)
            .fetch_optional(&pool)
            .await?;

    let user_id = match existing {
        Some((_, Some(role))) => {
            anyhow::bail!("{} already holds the {} role", args.email, role);
        }
        Some((id, None)) => {
            tracing::info!("Promoting existing account {}", args.email);
            id
        }
        None => {
            let password = args.password.as_deref().ok_or_else(|| {
                anyhow::anyhow!("--password is required when the account does not exist yet")
            })?;
            let password_hash = bcrypt::hash(password, 12)?;
            let id: Uuid = sqlx::query_scalar(
                "INSERT INTO users (email, password_hash, first_name, last_name)
                 VALUES ($1, $2, $3, $4)
                 RETURNING id",
            )
            .bind(&args.email)
            .bind(&password_hash)
            .bind(&args.first_name)
            .bind(&args.last_name)
            .fetch_one(&pool)
            .await?;
            tracing::info!("Created account {}", args.email);
            id
        }
    };

    let pin = RoleService::generate_pin();
    let pin_hash = bcrypt::hash(&pin, 12)?;

    sqlx::query(
        "UPDATE users
         SET admin_role = $1, admin_pin_hash = $2, admin_permissions = NULL,
             is_admin_active = TRUE, updated_at = NOW()
         WHERE id = $3",
    )
    .bind(AdminRole::Admin.to_string())
    .bind(&pin_hash)
    .bind(user_id)
    .execute(&pool)
    .await?;

    println!("Admin role granted to {}", args.email);
    println!("One-time PIN (not stored, write it down now): {pin}");

    Ok(())
}
