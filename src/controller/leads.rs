use actix_web::dev::HttpServiceFactory;
use actix_web::{delete, get, post, web, HttpRequest, HttpResponse, Responder};

use serde::Deserialize;

use sqlx::SqlitePool;

use crate::auth::Administrator;
use crate::controller::optional_text;
use crate::domain::Language;
use crate::error::{RestError, RestResult};
use crate::rate_limit::RateLimiter;
use crate::repo::{LeadRepo, NewLead};

const DEFAULT_SOURCE: &str = "website";

/// Contact/demo request submitted from the marketing site
#[derive(Debug, Deserialize)]
pub struct LeadForm {
    name: String,
    email: String,
    #[serde(default)]
    company: Option<String>,
    #[serde(default)]
    phone: Option<String>,
    #[serde(default)]
    message: Option<String>,
    #[serde(default)]
    source: Option<String>,
    #[serde(default)]
    lang: Option<String>,
}

impl TryFrom<LeadForm> for NewLead {
    type Error = String;

    fn try_from(form: LeadForm) -> Result<Self, Self::Error> {
        let name = form.name.parse()?;
        let email = form.email.parse()?;

        let message = optional_text(form.message);
        if message.as_ref().map_or(false, |m| m.chars().count() > 5000) {
            return Err("Message is too long".into());
        }

        Ok(Self {
            name,
            email,
            company: optional_text(form.company),
            phone: optional_text(form.phone),
            message,
            source: optional_text(form.source).unwrap_or_else(|| DEFAULT_SOURCE.into()),
            lang: Language::resolve(form.lang.as_deref()),
        })
    }
}

#[tracing::instrument(
    name = "Submit a lead",
    skip(req, body, pool, limiter),
    fields(lead_email = %body.email)
)]
#[post("")]
async fn submit(
    req: HttpRequest,
    body: web::Json<LeadForm>,
    pool: web::Data<SqlitePool>,
    limiter: web::Data<RateLimiter>,
) -> RestResult<impl Responder> {
    limiter.check_request(&req, "leads")?;

    let lead: NewLead = body.into_inner().try_into().map_err(RestError::ParseError)?;
    let id = LeadRepo::insert(pool.get_ref(), &lead).await?;

    tracing::info!(lead_id = id, source = %lead.source, "Lead recorded");
    Ok(HttpResponse::Created().json(serde_json::json!({ "id": id })))
}

#[tracing::instrument(name = "List leads", skip(pool))]
#[get("/admin")]
async fn admin_list(_admin: Administrator, pool: web::Data<SqlitePool>) -> RestResult<impl Responder> {
    Ok(HttpResponse::Ok().json(LeadRepo::fetch_all(pool.get_ref()).await?))
}

#[tracing::instrument(name = "Delete a lead", skip(pool))]
#[delete("/admin/{id}")]
async fn destroy(
    _admin: Administrator,
    id: web::Path<i64>,
    pool: web::Data<SqlitePool>,
) -> RestResult<impl Responder> {
    if !LeadRepo::delete(pool.get_ref(), *id).await? {
        return Err(RestError::NotFound("Lead"));
    }
    Ok(HttpResponse::NoContent().finish())
}

/// Lead capture endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/api/leads")
        .service(admin_list)
        .service(destroy)
        .service(submit)
}
