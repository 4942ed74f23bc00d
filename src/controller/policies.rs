use actix_web::dev::HttpServiceFactory;
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};

use chrono::{DateTime, Utc};

use serde::{Deserialize, Serialize};

use sqlx::SqlitePool;

use crate::auth::Administrator;
use crate::controller::{ListQuery, Localized, Page};
use crate::domain::{Language, LanguageQuery, LocalizedFields, PublishStatus};
use crate::error::{RestError, RestResult};
use crate::repo::{NewPolicyPage, PolicyPage, PolicyPageRepo};

#[derive(Debug, Deserialize)]
pub struct PolicyPageForm {
    slug: String,
    #[serde(flatten)]
    text: LocalizedFields,
    #[serde(default)]
    status: PublishStatus,
}

impl TryFrom<PolicyPageForm> for NewPolicyPage {
    type Error = String;

    fn try_from(form: PolicyPageForm) -> Result<Self, Self::Error> {
        let slug = form.slug.parse()?;
        form.text.validate()?;

        Ok(Self {
            slug,
            text: form.text,
            status: form.status,
        })
    }
}

#[derive(Debug, Serialize)]
struct PolicySummary {
    slug: String,
    updated_at: DateTime<Utc>,
}

fn localized(page: PolicyPage, lang: Language) -> Localized<PolicySummary> {
    Localized::new(
        PolicySummary {
            slug: page.slug,
            updated_at: page.updated_at,
        },
        &page.text,
        lang,
    )
}

#[tracing::instrument(name = "List published policies", skip(pool))]
#[get("")]
async fn list(query: web::Query<ListQuery>, pool: web::Data<SqlitePool>) -> RestResult<impl Responder> {
    let lang = query.language();
    let pages = PolicyPageRepo::fetch_published(pool.get_ref()).await?;

    let items = pages.into_iter().map(|page| localized(page, lang)).collect();
    Ok(HttpResponse::Ok().json(Page::slice(items, query.pagination())))
}

#[tracing::instrument(name = "Fetch a published policy", skip(pool))]
#[get("/{slug}")]
async fn by_slug(
    slug: web::Path<String>,
    query: web::Query<LanguageQuery>,
    pool: web::Data<SqlitePool>,
) -> RestResult<impl Responder> {
    let page = PolicyPageRepo::fetch_published_by_slug(pool.get_ref(), &slug)
        .await?
        .ok_or(RestError::NotFound("Policy"))?;

    Ok(HttpResponse::Ok().json(localized(page, query.language())))
}

#[tracing::instrument(name = "List all policies", skip(pool))]
#[get("/admin")]
async fn admin_list(_admin: Administrator, pool: web::Data<SqlitePool>) -> RestResult<impl Responder> {
    Ok(HttpResponse::Ok().json(PolicyPageRepo::fetch_all(pool.get_ref()).await?))
}

#[tracing::instrument(name = "Fetch a policy", skip(pool))]
#[get("/admin/{id}")]
async fn admin_get(
    _admin: Administrator,
    id: web::Path<i64>,
    pool: web::Data<SqlitePool>,
) -> RestResult<impl Responder> {
    let page = PolicyPageRepo::fetch_by_id(pool.get_ref(), *id)
        .await?
        .ok_or(RestError::NotFound("Policy"))?;
    Ok(HttpResponse::Ok().json(page))
}

#[tracing::instrument(name = "Create a policy", skip(pool, body))]
#[post("/admin")]
async fn create(
    _admin: Administrator,
    body: web::Json<PolicyPageForm>,
    pool: web::Data<SqlitePool>,
) -> RestResult<impl Responder> {
    let pool = pool.get_ref();
    let page: NewPolicyPage = body.into_inner().try_into().map_err(RestError::ParseError)?;

    let id = PolicyPageRepo::insert(pool, &page).await?;
    let page = PolicyPageRepo::fetch_by_id(pool, id)
        .await?
        .ok_or(RestError::NotFound("Policy"))?;

    Ok(HttpResponse::Created().json(page))
}

#[tracing::instrument(name = "Update a policy", skip(pool, body))]
#[put("/admin/{id}")]
async fn update(
    _admin: Administrator,
    id: web::Path<i64>,
    body: web::Json<PolicyPageForm>,
    pool: web::Data<SqlitePool>,
) -> RestResult<impl Responder> {
    let pool = pool.get_ref();
    let page: NewPolicyPage = body.into_inner().try_into().map_err(RestError::ParseError)?;

    if !PolicyPageRepo::update(pool, *id, &page).await? {
        return Err(RestError::NotFound("Policy"));
    }
    let page = PolicyPageRepo::fetch_by_id(pool, *id)
        .await?
        .ok_or(RestError::NotFound("Policy"))?;

    Ok(HttpResponse::Ok().json(page))
}

#[tracing::instrument(name = "Delete a policy", skip(pool))]
#[delete("/admin/{id}")]
async fn destroy(
    _admin: Administrator,
    id: web::Path<i64>,
    pool: web::Data<SqlitePool>,
) -> RestResult<impl Responder> {
    if !PolicyPageRepo::delete(pool.get_ref(), *id).await? {
        return Err(RestError::NotFound("Policy"));
    }
    Ok(HttpResponse::NoContent().finish())
}

/// Policy page API endpoints (privacy, terms, refunds)
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/api/policies")
        .service(admin_list)
        .service(admin_get)
        .service(create)
        .service(update)
        .service(destroy)
        .service(list)
        .service(by_slug)
}
