use actix_web::dev::HttpServiceFactory;
use actix_web::{delete, get, post, put, web, HttpResponse, Responder};

use serde::{Deserialize, Serialize};

use sqlx::SqlitePool;

use crate::auth::Administrator;
use crate::controller::{optional_text, required_text, ListQuery, Localized, Page};
use crate::domain::{Language, LocalizedFields, PublishStatus};
use crate::error::{RestError, RestResult};
use crate::repo::{NewTestimonial, Testimonial, TestimonialRepo};

#[derive(Debug, Deserialize)]
pub struct TestimonialForm {
    #[serde(flatten)]
    text: LocalizedFields,
    author_name: String,
    #[serde(default)]
    author_role: Option<String>,
    #[serde(default)]
    company: Option<String>,
    rating: i64,
    #[serde(default)]
    display_order: i64,
    #[serde(default)]
    status: PublishStatus,
}

impl TryFrom<TestimonialForm> for NewTestimonial {
    type Error = String;

    fn try_from(form: TestimonialForm) -> Result<Self, Self::Error> {
        form.text.validate()?;
        if !(1..=5).contains(&form.rating) {
            return Err("Rating must be between 1 and 5".into());
        }

        Ok(Self {
            author_name: required_text(&form.author_name, "Author name", 200)?,
            author_role: optional_text(form.author_role),
            company: optional_text(form.company),
            rating: form.rating,
            display_order: form.display_order,
            text: form.text,
            status: form.status,
        })
    }
}

#[derive(Debug, Serialize)]
struct TestimonialSummary {
    id: i64,
    author_name: String,
    author_role: Option<String>,
    company: Option<String>,
    rating: i64,
}

fn localized(testimonial: Testimonial, lang: Language) -> Localized<TestimonialSummary> {
    Localized::new(
        TestimonialSummary {
            id: testimonial.id,
            author_name: testimonial.author_name,
            author_role: testimonial.author_role,
            company: testimonial.company,
            rating: testimonial.rating,
        },
        &testimonial.text,
        lang,
    )
}

#[tracing::instrument(name = "List published testimonials", skip(pool))]
#[get("")]
async fn list(query: web::Query<ListQuery>, pool: web::Data<SqlitePool>) -> RestResult<impl Responder> {
    let lang = query.language();
    let testimonials = TestimonialRepo::fetch_published(pool.get_ref()).await?;

    let items = testimonials
        .into_iter()
        .map(|testimonial| localized(testimonial, lang))
        .collect();
    Ok(HttpResponse::Ok().json(Page::slice(items, query.pagination())))
}

#[tracing::instrument(name = "List all testimonials", skip(pool))]
#[get("/admin")]
async fn admin_list(_admin: Administrator, pool: web::Data<SqlitePool>) -> RestResult<impl Responder> {
    Ok(HttpResponse::Ok().json(TestimonialRepo::fetch_all(pool.get_ref()).await?))
}

#[tracing::instrument(name = "Fetch a testimonial", skip(pool))]
#[get("/admin/{id}")]
async fn admin_get(
    _admin: Administrator,
    id: web::Path<i64>,
    pool: web::Data<SqlitePool>,
) -> RestResult<impl Responder> {
    let testimonial = TestimonialRepo::fetch_by_id(pool.get_ref(), *id)
        .await?
        .ok_or(RestError::NotFound("Testimonial"))?;
    Ok(HttpResponse::Ok().json(testimonial))
}

#[tracing::instrument(name = "Create a testimonial", skip(pool, body))]
#[post("/admin")]
async fn create(
    _admin: Administrator,
    body: web::Json<TestimonialForm>,
    pool: web::Data<SqlitePool>,
) -> RestResult<impl Responder> {
    let pool = pool.get_ref();
    let testimonial: NewTestimonial = body.into_inner().try_into().map_err(RestError::ParseError)?;

    let id = TestimonialRepo::insert(pool, &testimonial).await?;
    let testimonial = TestimonialRepo::fetch_by_id(pool, id)
        .await?
        .ok_or(RestError::NotFound("Testimonial"))?;

    Ok(HttpResponse::Created().json(testimonial))
}

#[tracing::instrument(name = "Update a testimonial", skip(pool, body))]
#[put("/admin/{id}")]
async fn update(
    _admin: Administrator,
    id: web::Path<i64>,
    body: web::Json<TestimonialForm>,
    pool: web::Data<SqlitePool>,
) -> RestResult<impl Responder> {
    let pool = pool.get_ref();
    let testimonial: NewTestimonial = body.into_inner().try_into().map_err(RestError::ParseError)?;

    if !TestimonialRepo::update(pool, *id, &testimonial).await? {
        return Err(RestError::NotFound("Testimonial"));
    }
    let testimonial = TestimonialRepo::fetch_by_id(pool, *id)
        .await?
        .ok_or(RestError::NotFound("Testimonial"))?;

    Ok(HttpResponse::Ok().json(testimonial))
}

#[tracing::instrument(name = "Delete a testimonial", skip(pool))]
#[delete("/admin/{id}")]
async fn destroy(
    _admin: Administrator,
    id: web::Path<i64>,
    pool: web::Data<SqlitePool>,
) -> RestResult<impl Responder> {
    if !TestimonialRepo::delete(pool.get_ref(), *id).await? {
        return Err(RestError::NotFound("Testimonial"));
    }
    Ok(HttpResponse::NoContent().finish())
}

/// Testimonial API endpoints. Testimonials have no slug, so there is no public detail route.
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/api/testimonials")
        .service(admin_list)
        .service(admin_get)
        .service(create)
        .service(update)
        .service(destroy)
        .service(list)
}
