use chrono::{DateTime, Utc};

use serde::Serialize;

use sqlx::{Row, SqliteExecutor};

use crate::domain::{LocalizedFields, PublishStatus};
use crate::repo::bind_localized;

/// Stored customer testimonial; `title_*` is the headline and `content_*` the quote
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct Testimonial {
    pub id: i64,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub text: LocalizedFields,
    pub author_name: String,
    pub author_role: Option<String>,
    pub company: Option<String>,
    pub rating: i64,
    pub display_order: i64,
    pub status: PublishStatus,
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone)]
pub struct NewTestimonial {
    pub text: LocalizedFields,
    pub author_name: String,
    pub author_role: Option<String>,
    pub company: Option<String>,
    pub rating: i64,
    pub display_order: i64,
    pub status: PublishStatus,
}

pub struct TestimonialRepo;

impl TestimonialRepo {
    #[tracing::instrument(name = "Insert testimonial", skip(executor, testimonial))]
    pub async fn insert<'con>(
        executor: impl SqliteExecutor<'con>,
        testimonial: &NewTestimonial,
    ) -> sqlx::Result<i64> {
        let query = sqlx::query(
            "insert into testimonials(title_en, title_ar, title_es, title_pt, \
             content_en, content_ar, content_es, content_pt, author_name, author_role, \
             company, rating, display_order, status, published_at, created_at, updated_at) \
             values (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14, \
             case when ?14 = 'published' then ?15 end, ?15, ?15) \
             returning id",
        );

        let row = bind_localized(query, &testimonial.text)
            .bind(&testimonial.author_name)
            .bind(&testimonial.author_role)
            .bind(&testimonial.company)
            .bind(testimonial.rating)
            .bind(testimonial.display_order)
            .bind(testimonial.status)
            .bind(Utc::now())
            .fetch_one(executor)
            .await?;

        row.try_get("id")
    }

    #[tracing::instrument(name = "Update testimonial", skip(executor, testimonial))]
    pub async fn update<'con>(
        executor: impl SqliteExecutor<'con>,
        id: i64,
        testimonial: &NewTestimonial,
    ) -> sqlx::Result<bool> {
        let query = sqlx::query(
            "update testimonials set title_en = ?1, title_ar = ?2, title_es = ?3, title_pt = ?4, \
             content_en = ?5, content_ar = ?6, content_es = ?7, content_pt = ?8, \
             author_name = ?9, author_role = ?10, company = ?11, rating = ?12, \
             display_order = ?13, status = ?14, \
             published_at = case when ?14 = 'published' then coalesce(published_at, ?15) \
             else published_at end, \
             updated_at = ?15 \
             where id = ?16",
        );

        let result = bind_localized(query, &testimonial.text)
            .bind(&testimonial.author_name)
            .bind(&testimonial.author_role)
            .bind(&testimonial.company)
            .bind(testimonial.rating)
            .bind(testimonial.display_order)
            .bind(testimonial.status)
            .bind(Utc::now())
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(name = "Delete testimonial", skip(executor))]
    pub async fn delete<'con>(executor: impl SqliteExecutor<'con>, id: i64) -> sqlx::Result<bool> {
        let result = sqlx::query("delete from testimonials where id = ?1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    pub async fn fetch_by_id<'con>(
        executor: impl SqliteExecutor<'con>,
        id: i64,
    ) -> sqlx::Result<Option<Testimonial>> {
        sqlx::query_as::<_, Testimonial>("select * from testimonials where id = ?1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    pub async fn fetch_all<'con>(
        executor: impl SqliteExecutor<'con>,
    ) -> sqlx::Result<Vec<Testimonial>> {
        sqlx::query_as::<_, Testimonial>("select * from testimonials order by display_order, id")
            .fetch_all(executor)
            .await
    }

    #[tracing::instrument(name = "Fetch published testimonials", skip(executor))]
    pub async fn fetch_published<'con>(
        executor: impl SqliteExecutor<'con>,
    ) -> sqlx::Result<Vec<Testimonial>> {
        sqlx::query_as::<_, Testimonial>(
            "select * from testimonials where status = 'published' order by display_order, id",
        )
        .fetch_all(executor)
        .await
    }
}
