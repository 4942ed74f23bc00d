use chrono::{DateTime, Utc};

use serde::Serialize;

use sqlx::{Row, SqliteExecutor};

use crate::domain::{LocalizedFields, PublishStatus, Slug};
use crate::repo::bind_localized;

/// Stored legal/policy page (privacy, refunds, terms)
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct PolicyPage {
    pub id: i64,
    pub slug: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub text: LocalizedFields,
    pub status: PublishStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewPolicyPage {
    pub slug: Slug,
    pub text: LocalizedFields,
    pub status: PublishStatus,
}

pub struct PolicyPageRepo;

impl PolicyPageRepo {
    #[tracing::instrument(name = "Insert policy page", skip(executor, page), fields(slug = %page.slug))]
    pub async fn insert<'con>(
        executor: impl SqliteExecutor<'con>,
        page: &NewPolicyPage,
    ) -> sqlx::Result<i64> {
        let query = sqlx::query(
            "insert into policy_pages(slug, title_en, title_ar, title_es, title_pt, \
             content_en, content_ar, content_es, content_pt, status, published_at, \
             created_at, updated_at) \
             values (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, \
             case when ?10 = 'published' then ?11 end, ?11, ?11) \
             returning id",
        )
        .bind(page.slug.as_ref());

        let row = bind_localized(query, &page.text)
            .bind(page.status)
            .bind(Utc::now())
            .fetch_one(executor)
            .await?;

        row.try_get("id")
    }

    #[tracing::instrument(name = "Update policy page", skip(executor, page))]
    pub async fn update<'con>(
        executor: impl SqliteExecutor<'con>,
        id: i64,
        page: &NewPolicyPage,
    ) -> sqlx::Result<bool> {
        let query = sqlx::query(
            "update policy_pages set slug = ?1, title_en = ?2, title_ar = ?3, title_es = ?4, \
             title_pt = ?5, content_en = ?6, content_ar = ?7, content_es = ?8, content_pt = ?9, \
             status = ?10, \
             published_at = case when ?10 = 'published' then coalesce(published_at, ?11) \
             else published_at end, \
             updated_at = ?11 \
             where id = ?12",
        )
        .bind(page.slug.as_ref());

        let result = bind_localized(query, &page.text)
            .bind(page.status)
            .bind(Utc::now())
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(name = "Delete policy page", skip(executor))]
    pub async fn delete<'con>(executor: impl SqliteExecutor<'con>, id: i64) -> sqlx::Result<bool> {
        let result = sqlx::query("delete from policy_pages where id = ?1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn fetch_by_id<'con>(
        executor: impl SqliteExecutor<'con>,
        id: i64,
    ) -> sqlx::Result<Option<PolicyPage>> {
        sqlx::query_as::<_, PolicyPage>("select * from policy_pages where id = ?1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn fetch_all<'con>(
        executor: impl SqliteExecutor<'con>,
    ) -> sqlx::Result<Vec<PolicyPage>> {
        sqlx::query_as::<_, PolicyPage>("select * from policy_pages order by slug")
            .fetch_all(executor)
            .await
    }

    #[tracing::instrument(name = "Fetch published policy pages", skip(executor))]
    pub async fn fetch_published<'con>(
        executor: impl SqliteExecutor<'con>,
    ) -> sqlx::Result<Vec<PolicyPage>> {
        sqlx::query_as::<_, PolicyPage>(
            "select * from policy_pages where status = 'published' order by slug",
        )
        .fetch_all(executor)
        .await
    }

    #[tracing::instrument(name = "Fetch published policy page by slug", skip(executor))]
    pub async fn fetch_published_by_slug<'con>(
        executor: impl SqliteExecutor<'con>,
        slug: &str,
    ) -> sqlx::Result<Option<PolicyPage>> {
        sqlx::query_as::<_, PolicyPage>(
            "select * from policy_pages where slug = ?1 and status = 'published'",
        )
        .bind(slug)
        .fetch_optional(executor)
        .await
    }
}
