use chrono::{DateTime, Utc};

use secrecy::Secret;

use serde::Serialize;

use sqlx::{Row, SqliteExecutor};

use crate::domain::EmailAddress;

#[derive(Debug)]
pub struct NewUser {
    pub email: EmailAddress,
    pub password_hash: String,
}

#[derive(Debug)]
pub struct UserCredentials {
    pub id: i64,
    pub password_hash: Secret<String>,
}

/// Public view of an administrator account
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct User {
    pub id: i64,
    pub email: String,
    pub created_at: DateTime<Utc>,
}

pub struct UsersRepo;

impl UsersRepo {
    #[tracing::instrument("Insert a new user record", skip(executor, new_user))]
    pub async fn insert<'conn>(
        executor: impl SqliteExecutor<'conn>,
        new_user: &NewUser,
    ) -> sqlx::Result<i64> {
        let row = sqlx::query(
            "insert into users(email, password_hash, created_at) values (?1, ?2, ?3) returning id",
        )
        .bind(new_user.email.as_ref())
        .bind(&new_user.password_hash)
        .bind(Utc::now())
        .fetch_one(executor)
        .await?;

        row.try_get("id")
    }

    #[tracing::instrument("Fetch user credentials", skip(executor))]
    pub async fn fetch_credentials_by_email<'conn>(
        executor: impl SqliteExecutor<'conn>,
        email: &EmailAddress,
    ) -> sqlx::Result<Option<UserCredentials>> {
        let row = sqlx::query_as::<_, (i64, String)>(
            "select id, password_hash from users where email = ?1",
        )
        .bind(email.as_ref())
        .fetch_optional(executor)
        .await?;

        Ok(row.map(|(id, password_hash)| UserCredentials {
            id,
            password_hash: Secret::new(password_hash),
        }))
    }

    pub async fn fetch_by_id<'conn>(
        executor: impl SqliteExecutor<'conn>,
        id: i64,
    ) -> sqlx::Result<Option<User>> {
        sqlx::query_as::<_, User>("select id, email, created_at from users where id = ?1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn count<'conn>(executor: impl SqliteExecutor<'conn>) -> sqlx::Result<i64> {
        sqlx::query_scalar::<_, i64>("select count(*) from users")
            .fetch_one(executor)
            .await
    }
}
