use chrono::{DateTime, Utc};

use serde::Serialize;

use sqlx::{Row, SqliteExecutor};

use crate::domain::{LocalizedFields, PublishStatus, Slug};
use crate::repo::{bind_localized, Pagination};

/// Stored blog post
#[derive(Debug, Clone, Serialize, sqlx::FromRow)]
pub struct BlogPost {
    pub id: i64,
    pub slug: String,
    #[sqlx(flatten)]
    #[serde(flatten)]
    pub text: LocalizedFields,
    pub author: String,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub status: PublishStatus,
    /// Stamped the first time the post is published, kept if it is unpublished later
    pub published_at: Option<DateTime<Utc>>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Validated blog post fields, used for both creation and full replacement
#[derive(Debug, Clone)]
pub struct NewBlogPost {
    pub slug: Slug,
    pub text: LocalizedFields,
    pub author: String,
    pub category: Option<String>,
    pub image_url: Option<String>,
    pub status: PublishStatus,
}

pub struct BlogPostRepo;

impl BlogPostRepo {
    #[tracing::instrument(name = "Insert blog post", skip(executor, post), fields(slug = %post.slug))]
    pub async fn insert<'con>(
        executor: impl SqliteExecutor<'con>,
        post: &NewBlogPost,
    ) -> sqlx::Result<i64> {
        let query = sqlx::query(
            "insert into blog_posts(slug, title_en, title_ar, title_es, title_pt, \
             content_en, content_ar, content_es, content_pt, author, category, image_url, \
             status, published_at, created_at, updated_at) \
             values (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, \
             case when ?13 = 'published' then ?14 end, ?14, ?14) \
             returning id",
        )
        .bind(post.slug.as_ref());

        let row = bind_localized(query, &post.text)
            .bind(&post.author)
            .bind(&post.category)
            .bind(&post.image_url)
            .bind(post.status)
            .bind(Utc::now())
            .fetch_one(executor)
            .await?;

        row.try_get("id")
    }

    /// Replace every editable column, returns `false` when no row has the id
    #[tracing::instrument(name = "Update blog post", skip(executor, post))]
    pub async fn update<'con>(
        executor: impl SqliteExecutor<'con>,
        id: i64,
        post: &NewBlogPost,
    ) -> sqlx::Result<bool> {
        let query = sqlx::query(
            "update blog_posts set slug = ?1, title_en = ?2, title_ar = ?3, title_es = ?4, \
             title_pt = ?5, content_en = ?6, content_ar = ?7, content_es = ?8, content_pt = ?9, \
             author = ?10, category = ?11, image_url = ?12, status = ?13, \
             published_at = case when ?13 = 'published' then coalesce(published_at, ?14) \
             else published_at end, \
             updated_at = ?14 \
             where id = ?15",
        )
        .bind(post.slug.as_ref());

        let result = bind_localized(query, &post.text)
            .bind(&post.author)
            .bind(&post.category)
            .bind(&post.image_url)
            .bind(post.status)
            .bind(Utc::now())
            .bind(id)
            .execute(executor)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(name = "Delete blog post", skip(executor))]
    pub async fn delete<'con>(executor: impl SqliteExecutor<'con>, id: i64) -> sqlx::Result<bool> {
        let result = sqlx::query("delete from blog_posts where id = ?1")
            .bind(id)
            .execute(executor)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    #[tracing::instrument(name = "Fetch blog post by id", skip(executor))]
    pub async fn fetch_by_id<'con>(
        executor: impl SqliteExecutor<'con>,
        id: i64,
    ) -> sqlx::Result<Option<BlogPost>> {
        sqlx::query_as::<_, BlogPost>("select * from blog_posts where id = ?1")
            .bind(id)
            .fetch_optional(executor)
            .await
    }

    #[tracing::instrument(name = "Fetch all blog posts", skip(executor))]
    pub async fn fetch_all<'con>(executor: impl SqliteExecutor<'con>) -> sqlx::Result<Vec<BlogPost>> {
        sqlx::query_as::<_, BlogPost>("select * from blog_posts order by created_at desc, id desc")
            .fetch_all(executor)
            .await
    }

    #[tracing::instrument(name = "Fetch published blog posts", skip(executor))]
    pub async fn fetch_published<'con>(
        executor: impl SqliteExecutor<'con>,
        category: Option<&str>,
        page: Pagination,
    ) -> sqlx::Result<Vec<BlogPost>> {
        sqlx::query_as::<_, BlogPost>(
            "select * from blog_posts \
             where status = 'published' and (?1 is null or category = ?1) \
             order by published_at desc, id desc \
             limit ?2 offset ?3",
        )
        .bind(category)
        .bind(page.limit())
        .bind(page.offset())
        .fetch_all(executor)
        .await
    }

    pub async fn count_published<'con>(
        executor: impl SqliteExecutor<'con>,
        category: Option<&str>,
    ) -> sqlx::Result<i64> {
        sqlx::query_scalar::<_, i64>(
            "select count(*) from blog_posts where status = 'published' and (?1 is null or category = ?1)",
        )
        .bind(category)
        .fetch_one(executor)
        .await
    }

    #[tracing::instrument(name = "Fetch published blog post by slug", skip(executor))]
    pub async fn fetch_published_by_slug<'con>(
        executor: impl SqliteExecutor<'con>,
        slug: &str,
    ) -> sqlx::Result<Option<BlogPost>> {
        sqlx::query_as::<_, BlogPost>("select * from blog_posts where slug = ?1 and status = 'published'")
            .bind(slug)
            .fetch_optional(executor)
            .await
    }
}
