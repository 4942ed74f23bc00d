use chrono::{DateTime, Utc};

use serde::Serialize;

use sqlx::{Row, SqliteExecutor};

use crate::domain::{LocalizedFields, PublishStatus, Slug};
use crate::repo::bind_localized;

/// Stored job posting
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct CareerListing {
    pub id: i64,
    pub slug: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub text: LocalizedFields,
    pub department: String,
    pub location: String,
    pub employment_type: String,
    pub status: PublishStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewCareerListing {
    pub slug: Slug,
    pub text: LocalizedFields,
    pub department: String,
    pub location: String,
    pub employment_type: String,
    pub status: PublishStatus,
}

pub struct CareerListingRepo;

impl CareerListingRepo {
    #[tracing::instrument(name = "Insert career listing", skip(executor, listing), fields(slug = %listing.slug))]
    pub async fn insert<'con>(
        executor: impl SqliteExecutor<'con>,
        listing: &NewCareerListing,
    ) -> sqlx::Result<i64> {
        let query = sqlx::query(
            "insert into career_listings(slug, title_en, title_ar, title_es, title_pt, \
             content_en, content_ar, content_es, content_pt, department, location, \
             employment_type, status, published_at, created_at, updated_at) \
             values (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, \
             case when ?13 = 'published' then ?14 end, ?14, ?14) \
             returning id",
        )
        .bind(listing.slug.as_ref());

        let row = bind_localized(query, &listing.text)
            .bind(&listing.department)
            .bind(&listing.location)
            .bind(&listing.employment_type)
            .bind(listing.status)
            .bind(Utc::now())
            .fetch_one(executor)
            .await?;

        row.try_get("id")
    }

    #[tracing::instrument(name = "Update career listing", skip(executor, listing))]
    pub async fn update<'con>(
        executor: impl SqliteExecutor<'con>,
        id: i64,
        listing: &NewCareerListing,
    ) -> sqlx::Result<bool> {
        let query = sqlx::query(
            "update career_listings set slug = ?1, title_en = ?2, title_ar = ?3, title_es = ?4, \
             title_pt = ?5, content_en = ?6, content_ar = ?7, content_es = ?8, content_pt = ?9, \
             department = ?10, location = ?11, employment_type = ?12, status = ?13, \
             published_at = case when ?13 = 'published' then coalesce(published_at, ?14) \
             else published_at end, \
             updated_at = ?14 \
             where id = ?15",
        )
        .bind(listing.slug.as_ref());

        let result = bind_localized(query, &listing.text)
            .bind(&listing.department)
            .bind(&listing.location)
            .bind(&listing.employment_type)
            .bind(listing.status)
            .bind(Utc::now())
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(name = "Delete career listing", skip(executor))]
    pub async fn delete<'con>(executor: impl SqliteExecutor<'con>, id: i64) -> sqlx::Result<bool> {
        let result = sqlx::query("delete from career_listings where id = ?1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn fetch_by_id<'con>(
        executor: impl SqliteExecutor<'con>,
        id: i64,
    ) -> sqlx::Result<Option<CareerListing>> {
        sqlx::query_as::<_, CareerListing>("select * from career_listings where id = ?1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn fetch_all<'con>(
        executor: impl SqliteExecutor<'con>,
    ) -> sqlx::Result<Vec<CareerListing>> {
        sqlx::query_as::<_, CareerListing>(
            "select * from career_listings order by created_at desc, id desc",
        )
        .fetch_all(executor)
        .await
    }

    /// Open positions, optionally narrowed to one department
    #[tracing::instrument(name = "Fetch published career listings", skip(executor))]
    pub async fn fetch_published<'con>(
        executor: impl SqliteExecutor<'con>,
        department: Option<&str>,
    ) -> sqlx::Result<Vec<CareerListing>> {
        sqlx::query_as::<_, CareerListing>(
            "select * from career_listings \
             where status = 'published' and (?1 is null or department = ?1) \
             order by published_at desc, id desc",
        )
        .bind(department)
        .fetch_all(executor)
        .await
    }

    #[tracing::instrument(name = "Fetch published career listing by slug", skip(executor))]
    pub async fn fetch_published_by_slug<'con>(
        executor: impl SqliteExecutor<'con>,
        slug: &str,
    ) -> sqlx::Result<Option<CareerListing>> {
        sqlx::query_as::<_, CareerListing>(
            "select * from career_listings where slug = ?1 and status = 'published'",
        )
        .bind(slug)
        .fetch_optional(executor)
        .await
    }
}
