use actix_web::dev::HttpServiceFactory;
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};

use chrono::{DateTime, Utc};

use serde::{Deserialize, Serialize};

use sqlx::SqlitePool;

use crate::auth::Administrator;
use crate::controller::{required_text, ListQuery, Localized, Page};
use crate::domain::{Language, LanguageQuery, LocalizedFields, PublishStatus};
use crate::error::{RestError, RestResult};
use crate::repo::{CareerListing, CareerListingRepo, NewCareerListing};

#[derive(Debug, Deserialize)]
pub struct CareerListingForm {
    slug: String,
    #[serde(flatten)]
    text: LocalizedFields,
    department: String,
    location: String,
    employment_type: String,
    #[serde(default)]
    status: PublishStatus,
}

impl TryFrom<CareerListingForm> for NewCareerListing {
    type Error = String;

    fn try_from(form: CareerListingForm) -> Result<Self, Self::Error> {
        let slug = form.slug.parse()?;
        form.text.validate()?;

        Ok(Self {
            slug,
            department: required_text(&form.department, "Department", 100)?,
            location: required_text(&form.location, "Location", 200)?,
            employment_type: required_text(&form.employment_type, "Employment type", 50)?,
            text: form.text,
            status: form.status,
        })
    }
}

#[derive(Debug, Serialize)]
struct CareerSummary {
    id: i64,
    slug: String,
    department: String,
    location: String,
    employment_type: String,
    published_at: Option<DateTime<Utc>>,
}

fn localized(listing: CareerListing, lang: Language) -> Localized<CareerSummary> {
    Localized::new(
        CareerSummary {
            id: listing.id,
            slug: listing.slug,
            department: listing.department,
            location: listing.location,
            employment_type: listing.employment_type,
            published_at: listing.published_at,
        },
        &listing.text,
        lang,
    )
}

#[tracing::instrument(name = "List open positions", skip(pool))]
#[get("")]
async fn list(query: web::Query<ListQuery>, pool: web::Data<SqlitePool>) -> RestResult<impl Responder> {
    let lang = query.language();
    let listings = CareerListingRepo::fetch_published(pool.get_ref(), query.department()).await?;

    let items = listings
        .into_iter()
        .map(|listing| localized(listing, lang))
        .collect();
    Ok(HttpResponse::Ok().json(Page::slice(items, query.pagination())))
}

#[tracing::instrument(name = "Fetch an open position", skip(pool))]
#[get("/{slug}")]
async fn by_slug(
    slug: web::Path<String>,
    query: web::Query<LanguageQuery>,
    pool: web::Data<SqlitePool>,
) -> RestResult<impl Responder> {
    let listing = CareerListingRepo::fetch_published_by_slug(pool.get_ref(), &slug)
        .await?
        .ok_or(RestError::NotFound("Career listing"))?;

    Ok(HttpResponse::Ok().json(localized(listing, query.language())))
}

#[tracing::instrument(name = "List all career listings", skip(pool))]
#[get("/admin")]
async fn admin_list(_admin: Administrator, pool: web::Data<SqlitePool>) -> RestResult<impl Responder> {
    Ok(HttpResponse::Ok().json(CareerListingRepo::fetch_all(pool.get_ref()).await?))
}

#[tracing::instrument(name = "Fetch a career listing", skip(pool))]
#[get("/admin/{id}")]
async fn admin_get(
    _admin: Administrator,
    id: web::Path<i64>,
    pool: web::Data<SqlitePool>,
) -> RestResult<impl Responder> {
    let listing = CareerListingRepo::fetch_by_id(pool.get_ref(), *id)
        .await?
        .ok_or(RestError::NotFound("Career listing"))?;
    Ok(HttpResponse::Ok().json(listing))
}

#[tracing::instrument(name = "Create a career listing", skip(pool, body))]
#[post("/admin")]
async fn create(
    _admin: Administrator,
    body: web::Json<CareerListingForm>,
    pool: web::Data<SqlitePool>,
) -> RestResult<impl Responder> {
    let pool = pool.get_ref();
    let listing: NewCareerListing = body.into_inner().try_into().map_err(RestError::ParseError)?;

    let id = CareerListingRepo::insert(pool, &listing).await?;
    let listing = CareerListingRepo::fetch_by_id(pool, id)
        .await?
        .ok_or(RestError::NotFound("Career listing"))?;

    Ok(HttpResponse::Created().json(listing))
}

#[tracing::instrument(name = "Update a career listing", skip(pool, body))]
#[put("/admin/{id}")]
async fn update(
    _admin: Administrator,
    id: web::Path<i64>,
    body: web::Json<CareerListingForm>,
    pool: web::Data<SqlitePool>,
) -> RestResult<impl Responder> {
    let pool = pool.get_ref();
    let listing: NewCareerListing = body.into_inner().try_into().map_err(RestError::ParseError)?;

    if !CareerListingRepo::update(pool, *id, &listing).await? {
        return Err(RestError::NotFound("Career listing"));
    }
    let listing = CareerListingRepo::fetch_by_id(pool, *id)
        .await?
        .ok_or(RestError::NotFound("Career listing"))?;

    Ok(HttpResponse::Ok().json(listing))
}

#[tracing::instrument(name = "Delete a career listing", skip(pool))]
#[delete("/admin/{id}")]
async fn destroy(
    _admin: Administrator,
    id: web::Path<i64>,
    pool: web::Data<SqlitePool>,
) -> RestResult<impl Responder> {
    if !CareerListingRepo::delete(pool.get_ref(), *id).await? {
        return Err(RestError::NotFound("Career listing"));
    }
    Ok(HttpResponse::NoContent().finish())
}

/// Careers API endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/api/careers")
        .service(admin_list)
        .service(admin_get)
        .service(create)
        .service(update)
        .service(destroy)
        .service(list)
        .service(by_slug)
}
