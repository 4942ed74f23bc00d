use actix_web::dev::HttpServiceFactory;
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};

use serde::{Deserialize, Serialize};

use sqlx::SqlitePool;

use url::Url;

use crate::auth::Administrator;
use crate::controller::{optional_text, required_text, ListQuery, Localized, Page};
use crate::domain::{Language, LanguageQuery, LocalizedFields, PublishStatus};
use crate::error::{RestError, RestResult};
use crate::repo::{Integration, IntegrationRepo, NewIntegration};

#[derive(Debug, Deserialize)]
pub struct IntegrationForm {
    slug: String,
    #[serde(flatten)]
    text: LocalizedFields,
    category: String,
    #[serde(default)]
    logo_url: Option<String>,
    #[serde(default)]
    website_url: Option<String>,
    #[serde(default)]
    display_order: i64,
    #[serde(default)]
    status: PublishStatus,
}

/// Only absolute http(s) links are stored
fn link(value: Option<String>, field: &str) -> Result<Option<String>, String> {
    match optional_text(value) {
        None => Ok(None),
        Some(value) => match Url::parse(&value) {
            Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(Some(value)),
            _ => Err(format!("{} must be an http(s) URL", field)),
        },
    }
}

impl TryFrom<IntegrationForm> for NewIntegration {
    type Error = String;

    fn try_from(form: IntegrationForm) -> Result<Self, Self::Error> {
        let slug = form.slug.parse()?;
        form.text.validate()?;

        Ok(Self {
            slug,
            category: required_text(&form.category, "Category", 100)?,
            logo_url: link(form.logo_url, "Logo URL")?,
            website_url: link(form.website_url, "Website URL")?,
            display_order: form.display_order,
            text: form.text,
            status: form.status,
        })
    }
}

#[derive(Debug, Serialize)]
struct IntegrationSummary {
    id: i64,
    slug: String,
    category: String,
    logo_url: Option<String>,
    website_url: Option<String>,
}

fn localized(integration: Integration, lang: Language) -> Localized<IntegrationSummary> {
    Localized::new(
        IntegrationSummary {
            id: integration.id,
            slug: integration.slug,
            category: integration.category,
            logo_url: integration.logo_url,
            website_url: integration.website_url,
        },
        &integration.text,
        lang,
    )
}

#[tracing::instrument(name = "List published integrations", skip(pool))]
#[get("")]
async fn list(query: web::Query<ListQuery>, pool: web::Data<SqlitePool>) -> RestResult<impl Responder> {
    let lang = query.language();
    let integrations = IntegrationRepo::fetch_published(pool.get_ref(), query.category()).await?;

    let items = integrations
        .into_iter()
        .map(|integration| localized(integration, lang))
        .collect();
    Ok(HttpResponse::Ok().json(Page::slice(items, query.pagination())))
}

#[tracing::instrument(name = "Fetch a published integration", skip(pool))]
#[get("/{slug}")]
async fn by_slug(
    slug: web::Path<String>,
    query: web::Query<LanguageQuery>,
    pool: web::Data<SqlitePool>,
) -> RestResult<impl Responder> {
    let integration = IntegrationRepo::fetch_published_by_slug(pool.get_ref(), &slug)
        .await?
        .ok_or(RestError::NotFound("Integration"))?;

    Ok(HttpResponse::Ok().json(localized(integration, query.language())))
}

#[tracing::instrument(name = "List all integrations", skip(pool))]
#[get("/admin")]
async fn admin_list(_admin: Administrator, pool: web::Data<SqlitePool>) -> RestResult<impl Responder> {
    Ok(HttpResponse::Ok().json(IntegrationRepo::fetch_all(pool.get_ref()).await?))
}

#[tracing::instrument(name = "Fetch an integration", skip(pool))]
#[get("/admin/{id}")]
async fn admin_get(
    _admin: Administrator,
    id: web::Path<i64>,
    pool: web::Data<SqlitePool>,
) -> RestResult<impl Responder> {
    let integration = IntegrationRepo::fetch_by_id(pool.get_ref(), *id)
        .await?
        .ok_or(RestError::NotFound("Integration"))?;
    Ok(HttpResponse::Ok().json(integration))
}

#[tracing::instrument(name = "Create an integration", skip(pool, body))]
#[post("/admin")]
async fn create(
    _admin: Administrator,
    body: web::Json<IntegrationForm>,
    pool: web::Data<SqlitePool>,
) -> RestResult<impl Responder> {
    let pool = pool.get_ref();
    let integration: NewIntegration = body.into_inner().try_into().map_err(RestError::ParseError)?;

    let id = IntegrationRepo::insert(pool, &integration).await?;
    let integration = IntegrationRepo::fetch_by_id(pool, id)
        .await?
        .ok_or(RestError::NotFound("Integration"))?;

    Ok(HttpResponse::Created().json(integration))
}

#[tracing::instrument(name = "Update an integration", skip(pool, body))]
#[put("/admin/{id}")]
async fn update(
    _admin: Administrator,
    id: web::Path<i64>,
    body: web::Json<IntegrationForm>,
    pool: web::Data<SqlitePool>,
) -> RestResult<impl Responder> {
    let pool = pool.get_ref();
    let integration: NewIntegration = body.into_inner().try_into().map_err(RestError::ParseError)?;

    if !IntegrationRepo::update(pool, *id, &integration).await? {
        return Err(RestError::NotFound("Integration"));
    }
    let integration = IntegrationRepo::fetch_by_id(pool, *id)
        .await?
        .ok_or(RestError::NotFound("Integration"))?;

    Ok(HttpResponse::Ok().json(integration))
}

#[tracing::instrument(name = "Delete an integration", skip(pool))]
#[delete("/admin/{id}")]
async fn destroy(
    _admin: Administrator,
    id: web::Path<i64>,
    pool: web::Data<SqlitePool>,
) -> RestResult<impl Responder> {
    if !IntegrationRepo::delete(pool.get_ref(), *id).await? {
        return Err(RestError::NotFound("Integration"));
    }
    Ok(HttpResponse::NoContent().finish())
}

/// Integrations API endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/api/integrations")
        .service(admin_list)
        .service(admin_get)
        .service(create)
        .service(update)
        .service(destroy)
        .service(list)
        .service(by_slug)
}
