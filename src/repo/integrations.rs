use chrono::{DateTime, Utc};

use serde::Serialize;

use sqlx::{Row, SqliteExecutor};

use crate::domain::{LocalizedFields, PublishStatus, Slug};
use crate::repo::bind_localized;

/// Stored partner integration (POS, delivery, payments); `title_*` is the display name
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Integration {
    pub id: i64,
    pub slug: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub text: LocalizedFields,
    pub category: String,
    pub logo_url: Option<String>,
    pub website_url: Option<String>,
    pub display_order: i64,
    pub status: PublishStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewIntegration {
    pub slug: Slug,
    pub text: LocalizedFields,
    pub category: String,
    pub logo_url: Option<String>,
    pub website_url: Option<String>,
    pub display_order: i64,
    pub status: PublishStatus,
}

pub struct IntegrationRepo;

impl IntegrationRepo {
    #[tracing::instrument(name = "Insert integration", skip(executor, integration), fields(slug = %integration.slug))]
    pub async fn insert<'con>(
        executor: impl SqliteExecutor<'con>,
        integration: &NewIntegration,
    ) -> sqlx::Result<i64> {
        let query = sqlx::query(
            "insert into integrations(slug, title_en, title_ar, title_es, title_pt, \
             content_en, content_ar, content_es, content_pt, category, logo_url, website_url, \
             display_order, status, published_at, created_at, updated_at) \
             values (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, \
             case when ?14 = 'published' then ?15 end, ?15, ?15) \
             returning id",
        )
        .bind(integration.slug.as_ref());

        let row = bind_localized(query, &integration.text)
            .bind(&integration.category)
            .bind(&integration.logo_url)
            .bind(&integration.website_url)
            .bind(integration.display_order)
            .bind(integration.status)
            .bind(Utc::now())
            .fetch_one(executor)
            .await?;

        row.try_get("id")
    }

    #[tracing::instrument(name = "Update integration", skip(executor, integration))]
    pub async fn update<'con>(
        executor: impl SqliteExecutor<'con>,
        id: i64,
        integration: &NewIntegration,
    ) -> sqlx::Result<bool> {
        let query = sqlx::query(
            "update integrations set slug = ?1, title_en = ?2, title_ar = ?3, title_es = ?4, \
             title_pt = ?5, content_en = ?6, content_ar = ?7, content_es = ?8, content_pt = ?9, \
             category = ?10, logo_url = ?11, website_url = ?12, display_order = ?13, \
             status = ?14, \
             published_at = case when ?14 = 'published' then coalesce(published_at, ?15) \
             else published_at end, \
             updated_at = ?15 \
             where id = ?16",
        )
        .bind(integration.slug.as_ref());

        let result = bind_localized(query, &integration.text)
            .bind(&integration.category)
            .bind(&integration.logo_url)
            .bind(&integration.website_url)
            .bind(integration.display_order)
            .bind(integration.status)
            .bind(Utc::now())
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(name = "Delete integration", skip(executor))]
    pub async fn delete<'con>(executor: impl SqliteExecutor<'con>, id: i64) -> sqlx::Result<bool> {
        let result = sqlx::query("delete from integrations where id = ?1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn fetch_by_id<'con>(
        executor: impl SqliteExecutor<'con>,
        id: i64,
    ) -> sqlx::Result<Option<Integration>> {
        sqlx::query_as::<_, Integration>("select * from integrations where id = ?1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn fetch_all<'con>(
        executor: impl SqliteExecutor<'con>,
    ) -> sqlx::Result<Vec<Integration>> {
        sqlx::query_as::<_, Integration>(
            "select * from integrations order by category, display_order, id",
        )
        .fetch_all(executor)
        .await
    }

    #[tracing::instrument(name = "Fetch published integrations", skip(executor))]
    pub async fn fetch_published<'con>(
        executor: impl SqliteExecutor<'con>,
        category: Option<&str>,
    ) -> sqlx::Result<Vec<Integration>> {
        sqlx::query_as::<_, Integration>(
            "select * from integrations \
             where status = 'published' and (?1 is null or category = ?1) \
             order by category, display_order, id",
        )
        .bind(category)
        .fetch_all(executor)
        .await
    }

    #[tracing::instrument(name = "Fetch published integration by slug", skip(executor))]
    pub async fn fetch_published_by_slug<'con>(
        executor: impl SqliteExecutor<'con>,
        slug: &str,
    ) -> sqlx::Result<Option<Integration>> {
        sqlx::query_as::<_, Integration>(
            "select * from integrations where slug = ?1 and status = 'published'",
        )
        .bind(slug)
        .fetch_optional(executor)
        .await
    }
}
