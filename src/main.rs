use std::net::TcpListener;

use anyhow::Context;

use sqlx::sqlite::SqlitePoolOptions;
use sqlx::SqlitePool;

use tavola::app;
use tavola::auth::hash_password;
use tavola::crypto::SigningKey;
use tavola::rate_limit::RateLimiter;
use tavola::repo::{NewUser, UsersRepo, MIGRATOR};
use tavola::settings::{AdminSettings, Settings};
use tavola::telemetry;

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let settings = Settings::load().context("Failed to load settings")?;

    let subscriber = telemetry::create_subscriber(settings.app.log_filter(), std::io::stdout);
    telemetry::set_subscriber(subscriber)?;

    let pool = SqlitePoolOptions::new()
        .max_connections(settings.database.max_connections())
        .connect_with(settings.database.connect_options())
        .await
        .context("Failed to open database")?;

    MIGRATOR
        .run(&pool)
        .await
        .context("Failed to run database migrations")?;

    if let Some(admin) = &settings.admin {
        bootstrap_admin(&pool, admin).await?;
    }

    let signing_key = SigningKey::new(settings.app.secret_key())?;
    let rate_limiter = RateLimiter::new(&settings.rate_limit);

    let listener = TcpListener::bind(settings.app.addr())?;
    tracing::info!(addr = ?listener.local_addr()?, "Listening");

    app::run(listener, pool, signing_key, settings.session, rate_limiter)?
        .await
        .context("Failed to run app")
}

/// Create the configured administrator when the database has no users yet
async fn bootstrap_admin(pool: &SqlitePool, admin: &AdminSettings) -> anyhow::Result<()> {
    if UsersRepo::count(pool).await? > 0 {
        return Ok(());
    }

    let new_user = NewUser {
        email: admin
            .email
            .parse()
            .map_err(|e: String| anyhow::anyhow!(e))
            .context("Invalid admin email")?,
        password_hash: hash_password(&admin.password)?,
    };
    let id = UsersRepo::insert(pool, &new_user).await?;

    tracing::info!(user_id = id, email = %admin.email, "Created administrator account");
    Ok(())
}
