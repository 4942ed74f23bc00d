use chrono::{DateTime, Utc};

use serde::Serialize;

use sqlx::types::Json;
use sqlx::{SqliteConnection, SqliteExecutor};

use crate::domain::{ContentKey, ContentValue};

/// Versioned CMS document stored under a key
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct ContentBlock {
    pub key: String,
    /// Starts at 1 and increments on every write
    pub version: i64,
    pub data: Json<ContentValue>,
    pub updated_at: DateTime<Utc>,
}

/// Result of a versioned write
#[derive(Debug)]
pub enum ContentWrite {
    Written(ContentBlock),
    /// `expected_version` did not match; `current` is `None` when the key does not exist
    VersionConflict { current: Option<i64> },
}

pub struct ContentBlockRepo;

impl ContentBlockRepo {
    #[tracing::instrument(name = "Fetch content block", skip(executor, key), fields(key = key.as_ref()))]
    pub async fn fetch<'con>(
        executor: impl SqliteExecutor<'con>,
        key: &ContentKey,
    ) -> sqlx::Result<Option<ContentBlock>> {
        sqlx::query_as::<_, ContentBlock>("select * from content_blocks where key = ?1")
            .bind(key.as_ref())
            .fetch_optional(executor)
            .await
    }

    pub async fn fetch_all<'con>(
        executor: impl SqliteExecutor<'con>,
    ) -> sqlx::Result<Vec<ContentBlock>> {
        sqlx::query_as::<_, ContentBlock>("select * from content_blocks order by key")
            .fetch_all(executor)
            .await
    }

    /// Write a document. Without `expected_version` the write always wins; with it the
    /// write only applies when the stored version matches (`0` meaning "must not exist yet").
    #[tracing::instrument(name = "Write content block", skip(conn, key, data), fields(key = key.as_ref()))]
    pub async fn write(
        conn: &mut SqliteConnection,
        key: &ContentKey,
        data: &ContentValue,
        expected_version: Option<i64>,
    ) -> sqlx::Result<ContentWrite> {
        let now = Utc::now();
        let data = Json(data);

        let written = match expected_version {
            None => {
                sqlx::query_as::<_, ContentBlock>(
                    "insert into content_blocks(key, version, data, updated_at) \
                     values (?1, 1, ?2, ?3) \
                     on conflict(key) do update set version = version + 1, \
                     data = excluded.data, updated_at = excluded.updated_at \
                     returning *",
                )
                .bind(key.as_ref())
                .bind(data)
                .bind(now)
                .fetch_optional(&mut *conn)
                .await?
            }
            Some(0) => {
                sqlx::query_as::<_, ContentBlock>(
                    "insert into content_blocks(key, version, data, updated_at) \
                     values (?1, 1, ?2, ?3) \
                     on conflict(key) do nothing \
                     returning *",
                )
                .bind(key.as_ref())
                .bind(data)
                .bind(now)
                .fetch_optional(&mut *conn)
                .await?
            }
            Some(expected) => {
                sqlx::query_as::<_, ContentBlock>(
                    "update content_blocks set version = version + 1, data = ?2, updated_at = ?3 \
                     where key = ?1 and version = ?4 \
                     returning *",
                )
                .bind(key.as_ref())
                .bind(data)
                .bind(now)
                .bind(expected)
                .fetch_optional(&mut *conn)
                .await?
            }
        };

        match written {
            Some(block) => Ok(ContentWrite::Written(block)),
            None => {
                let current = Self::fetch(&mut *conn, key).await?.map(|block| block.version);
                Ok(ContentWrite::VersionConflict { current })
            }
        }
    }

    #[tracing::instrument(name = "Delete content block", skip(executor, key), fields(key = key.as_ref()))]
    pub async fn delete<'con>(
        executor: impl SqliteExecutor<'con>,
        key: &ContentKey,
    ) -> sqlx::Result<bool> {
        let result = sqlx::query("delete from content_blocks where key = ?1")
            .bind(key.as_ref())
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }
}
