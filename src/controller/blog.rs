use actix_web::dev::HttpServiceFactory;
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};

use chrono::{DateTime, Utc};

use serde::{Deserialize, Serialize};

use sqlx::SqlitePool;

use crate::auth::Administrator;
use crate::controller::{optional_text, required_text, ListQuery, Localized, Page};
use crate::domain::{Language, LanguageQuery, LocalizedFields, PublishStatus};
use crate::error::{RestError, RestResult};
use crate::repo::{BlogPost, BlogPostRepo, NewBlogPost};

#[derive(Debug, Deserialize)]
pub struct BlogPostForm {
    slug: String,
    #[serde(flatten)]
    text: LocalizedFields,
    author: String,
    #[serde(default)]
    category: Option<String>,
    #[serde(default)]
    image_url: Option<String>,
    #[serde(default)]
    status: PublishStatus,
}

impl TryFrom<BlogPostForm> for NewBlogPost {
    type Error = String;

    fn try_from(form: BlogPostForm) -> Result<Self, Self::Error> {
        let slug = form.slug.parse()?;
        form.text.validate()?;
        let author = required_text(&form.author, "Author", 200)?;

        Ok(Self {
            slug,
            text: form.text,
            author,
            category: optional_text(form.category),
            image_url: optional_text(form.image_url),
            status: form.status,
        })
    }
}

/// Public listing entry
#[derive(Debug, Serialize)]
struct BlogPostSummary {
    id: i64,
    slug: String,
    author: String,
    category: Option<String>,
    image_url: Option<String>,
    published_at: Option<DateTime<Utc>>,
}

fn localized(post: BlogPost, lang: Language) -> Localized<BlogPostSummary> {
    Localized::new(
        BlogPostSummary {
            id: post.id,
            slug: post.slug,
            author: post.author,
            category: post.category,
            image_url: post.image_url,
            published_at: post.published_at,
        },
        &post.text,
        lang,
    )
}

#[tracing::instrument(name = "List published blog posts", skip(pool))]
#[get("")]
async fn list(query: web::Query<ListQuery>, pool: web::Data<SqlitePool>) -> RestResult<impl Responder> {
    let pool = pool.get_ref();
    let lang = query.language();
    let pagination = query.pagination();

    let posts = BlogPostRepo::fetch_published(pool, query.category(), pagination).await?;
    let total = BlogPostRepo::count_published(pool, query.category()).await?;

    let items = posts.into_iter().map(|post| localized(post, lang)).collect();
    Ok(HttpResponse::Ok().json(Page::new(items, total, pagination)))
}

#[tracing::instrument(name = "Fetch a published blog post", skip(pool))]
#[get("/{slug}")]
async fn by_slug(
    slug: web::Path<String>,
    query: web::Query<LanguageQuery>,
    pool: web::Data<SqlitePool>,
) -> RestResult<impl Responder> {
    let post = BlogPostRepo::fetch_published_by_slug(pool.get_ref(), &slug)
        .await?
        .ok_or(RestError::NotFound("Blog post"))?;

    Ok(HttpResponse::Ok().json(localized(post, query.language())))
}

#[tracing::instrument(name = "List all blog posts", skip(pool))]
#[get("/admin")]
async fn admin_list(_admin: Administrator, pool: web::Data<SqlitePool>) -> RestResult<impl Responder> {
    let posts = BlogPostRepo::fetch_all(pool.get_ref()).await?;
    Ok(HttpResponse::Ok().json(posts))
}

#[tracing::instrument(name = "Fetch a blog post", skip(pool))]
#[get("/admin/{id}")]
async fn admin_get(
    _admin: Administrator,
    id: web::Path<i64>,
    pool: web::Data<SqlitePool>,
) -> RestResult<impl Responder> {
    let post = BlogPostRepo::fetch_by_id(pool.get_ref(), *id)
        .await?
        .ok_or(RestError::NotFound("Blog post"))?;
    Ok(HttpResponse::Ok().json(post))
}

#[tracing::instrument(name = "Create a blog post", skip(pool, body))]
#[post("/admin")]
async fn create(
    _admin: Administrator,
    body: web::Json<BlogPostForm>,
    pool: web::Data<SqlitePool>,
) -> RestResult<impl Responder> {
    let pool = pool.get_ref();
    let new_post: NewBlogPost = body.into_inner().try_into().map_err(RestError::ParseError)?;

    let id = BlogPostRepo::insert(pool, &new_post).await?;
    let post = BlogPostRepo::fetch_by_id(pool, id)
        .await?
        .ok_or(RestError::NotFound("Blog post"))?;

    Ok(HttpResponse::Created().json(post))
}

#[tracing::instrument(name = "Update a blog post", skip(pool, body))]
#[put("/admin/{id}")]
async fn update(
    _admin: Administrator,
    id: web::Path<i64>,
    body: web::Json<BlogPostForm>,
    pool: web::Data<SqlitePool>,
) -> RestResult<impl Responder> {
    let pool = pool.get_ref();
    let post: NewBlogPost = body.into_inner().try_into().map_err(RestError::ParseError)?;

    if !BlogPostRepo::update(pool, *id, &post).await? {
        return Err(RestError::NotFound("Blog post"));
    }
    let post = BlogPostRepo::fetch_by_id(pool, *id)
        .await?
        .ok_or(RestError::NotFound("Blog post"))?;

    Ok(HttpResponse::Ok().json(post))
}

#[tracing::instrument(name = "Delete a blog post", skip(pool))]
#[delete("/admin/{id}")]
async fn destroy(
    _admin: Administrator,
    id: web::Path<i64>,
    pool: web::Data<SqlitePool>,
) -> RestResult<impl Responder> {
    if !BlogPostRepo::delete(pool.get_ref(), *id).await? {
        return Err(RestError::NotFound("Blog post"));
    }
    Ok(HttpResponse::NoContent().finish())
}

/// Blog API endpoints. Admin routes are registered ahead of the `{slug}` catch-all.
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/api/blog")
        .service(admin_list)
        .service(admin_get)
        .service(create)
        .service(update)
        .service(destroy)
        .service(list)
        .service(by_slug)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn form(json: serde_json::Value) -> BlogPostForm {
        serde_json::from_value(json).expect("Failed to deserialize form")
    }

    #[test]
    fn valid_forms_convert() {
        let post: NewBlogPost = form(serde_json::json!({
            "slug": "Menu-Engineering",
            "title_en": "Menu engineering",
            "content_en": "Price anchors and decoys.",
            "title_pt": "Engenharia de cardápio",
            "author": "  Ana Souza ",
            "category": "",
            "status": "published",
        }))
        .try_into()
        .expect("Form should be valid");

        assert_eq!("menu-engineering", post.slug.as_ref());
        assert_eq!("Ana Souza", post.author);
        assert_eq!(None, post.category);
        assert_eq!(PublishStatus::Published, post.status);
    }

    #[test]
    fn missing_english_content_is_rejected() {
        let result: Result<NewBlogPost, _> = form(serde_json::json!({
            "slug": "menu-engineering",
            "title_en": "Menu engineering",
            "content_en": " ",
            "author": "Ana",
        }))
        .try_into();

        assert!(result.is_err());
    }

    #[test]
    fn malformed_slugs_are_rejected() {
        let result: Result<NewBlogPost, _> = form(serde_json::json!({
            "slug": "not a slug!",
            "title_en": "Menu engineering",
            "content_en": "Body",
            "author": "Ana",
        }))
        .try_into();

        assert!(result.is_err());
    }
}
