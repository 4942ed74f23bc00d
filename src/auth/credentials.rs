use anyhow::Context;

use argon2::password_hash::SaltString;
use argon2::{Argon2, PasswordHash, PasswordHasher, PasswordVerifier};

use secrecy::{ExposeSecret, Secret};

use serde::Deserialize;

use sqlx::SqlitePool;

use crate::domain::EmailAddress;
use crate::error::{RestError, RestResult};
use crate::repo::UsersRepo;
use crate::telemetry::spawn_blocking_with_tracing;

/// Email and password submitted to the login endpoint
#[derive(Debug, Deserialize)]
pub struct Credentials {
    pub email: String,
    pub password: Secret<String>,
}

/// Check the credentials against the stored hash, returning the user id
#[tracing::instrument("Validate credentials", skip(credentials, pool))]
pub async fn validate_credentials(pool: &SqlitePool, credentials: &Credentials) -> RestResult<i64> {
    let email: EmailAddress = credentials
        .email
        .parse()
        .map_err(RestError::ParseError)?;
    let password = credentials.password.clone();

    let user = UsersRepo::fetch_credentials_by_email(pool, &email).await?;

    // Unknown emails still pay for a hash check so response times do not reveal accounts
    let (user_id, password_hash) = match user {
        Some(user) => (Some(user.id), user.password_hash),
        None => (None, Secret::new(FALLBACK_HASH.to_string())),
    };

    spawn_blocking_with_tracing(move || verify_password_hash(password, password_hash))
        .await
        .context("Failed to spawn blocking task")??;

    user_id
        .context("No user stored for email")
        .map_err(RestError::FailedToAuthenticate)
}

// Hash of an arbitrary password, only ever compared against
const FALLBACK_HASH: &str = "$argon2id$v=19$m=15000,t=2,p=1$\
    gZiV/M1gPc22ElAH/Jh1Hw$CWOrkoo7oJBQ/iyh7uJ0LO2aLEfrHwTWllSAxT0zRno";

#[tracing::instrument("Verify password hash", skip(password, password_hash))]
fn verify_password_hash(password: Secret<String>, password_hash: Secret<String>) -> RestResult<()> {
    let password_hash = PasswordHash::new(password_hash.expose_secret())
        .context("Failed to parse stored password hash")?;

    Argon2::default()
        .verify_password(password.expose_secret().as_bytes(), &password_hash)
        .context("Failed to verify password hash")
        .map_err(RestError::FailedToAuthenticate)?;

    Ok(())
}

/// Hash a password for storage in PHC string format
pub fn hash_password(password: &Secret<String>) -> anyhow::Result<String> {
    let salt = SaltString::generate(&mut rand::thread_rng());

    let hash = Argon2::default()
        .hash_password(password.expose_secret().as_bytes(), &salt)
        .map_err(|e| anyhow::anyhow!("Failed to hash password: {}", e))?;

    Ok(hash.to_string())
}
