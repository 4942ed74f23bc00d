use actix_web::dev::HttpServiceFactory;
use actix_web::http::header;
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};

use anyhow::Context;

use chrono::{Duration, Utc};

use serde::{Deserialize, Serialize};

use sqlx::SqlitePool;

use uuid::Uuid;

use crate::auth::Administrator;
use crate::controller::optional_text;
use crate::domain::Language;
use crate::error::{RestError, RestResult};
use crate::repo::{AnalyticsRepo, NewEvent, NewPageview};

const MAX_PATH_LEN: usize = 2048;
const MAX_SESSION_ID_LEN: usize = 64;
const MAX_EVENT_NAME_LEN: usize = 100;
const MAX_USER_AGENT_LEN: usize = 512;

const DEFAULT_DASHBOARD_DAYS: i64 = 30;
const MAX_DASHBOARD_DAYS: i64 = 365;
/// Trailing window counted as "right now"
const REALTIME_WINDOW_SECONDS: i64 = 300;

#[derive(Debug, Deserialize)]
pub struct PageviewForm {
    #[serde(default)]
    session_id: Option<String>,
    path: String,
    #[serde(default)]
    referrer: Option<String>,
    #[serde(default)]
    lang: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct EventForm {
    #[serde(default)]
    session_id: Option<String>,
    name: String,
    #[serde(default)]
    path: Option<String>,
    #[serde(default)]
    properties: Option<serde_json::Value>,
}

#[derive(Debug, Serialize)]
struct Recorded {
    session_id: String,
}

/// Use the visitor's session id, or start a new session
fn session_id(value: Option<String>) -> Result<String, String> {
    match optional_text(value) {
        None => Ok(Uuid::new_v4().to_string()),
        Some(id)
            if id.len() <= MAX_SESSION_ID_LEN
                && id
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || matches!(c, '-' | '_')) =>
        {
            Ok(id)
        }
        Some(_) => Err("Invalid session id".into()),
    }
}

fn site_path(value: &str) -> Result<String, String> {
    let value = value.trim();
    if !value.starts_with('/') {
        return Err("Path must start with '/'".into());
    }
    if value.len() > MAX_PATH_LEN {
        return Err("Path is too long".into());
    }
    Ok(value.to_string())
}

fn event_name(value: &str) -> Result<String, String> {
    let value = value.trim();
    if value.is_empty() || value.chars().count() > MAX_EVENT_NAME_LEN {
        return Err(format!(
            "Event name must be between 1 and {} characters",
            MAX_EVENT_NAME_LEN
        ));
    }
    Ok(value.to_string())
}

impl TryFrom<PageviewForm> for NewPageview {
    type Error = String;

    fn try_from(form: PageviewForm) -> Result<Self, Self::Error> {
        let referrer = optional_text(form.referrer);
        if referrer.as_ref().map_or(false, |r| r.len() > MAX_PATH_LEN) {
            return Err("Referrer is too long".into());
        }

        Ok(Self {
            session_id: session_id(form.session_id)?,
            path: site_path(&form.path)?,
            referrer,
            lang: Language::resolve(form.lang.as_deref()),
            user_agent: None,
        })
    }
}

impl TryFrom<EventForm> for NewEvent {
    type Error = String;

    fn try_from(form: EventForm) -> Result<Self, Self::Error> {
        let path = match optional_text(form.path) {
            Some(path) => Some(site_path(&path)?),
            None => None,
        };
        let properties = match form.properties {
            None | Some(serde_json::Value::Null) => None,
            Some(value @ serde_json::Value::Object(_)) => Some(value),
            Some(_) => return Err("Event properties must be an object".into()),
        };

        Ok(Self {
            session_id: session_id(form.session_id)?,
            name: event_name(&form.name)?,
            path,
            properties,
            user_agent: None,
        })
    }
}

fn user_agent(req: &HttpRequest) -> Option<String> {
    req.headers()
        .get(header::USER_AGENT)
        .and_then(|value| value.to_str().ok())
        .map(|value| value.chars().take(MAX_USER_AGENT_LEN).collect())
}

#[tracing::instrument(name = "Ingest pageview", skip(req, body, pool))]
#[post("/pageview")]
async fn pageview(
    req: HttpRequest,
    body: web::Json<PageviewForm>,
    pool: web::Data<SqlitePool>,
) -> RestResult<impl Responder> {
    let mut pageview: NewPageview = body.into_inner().try_into().map_err(RestError::ParseError)?;
    pageview.user_agent = user_agent(&req);

    let mut tx = pool.begin().await.context("Failed to begin transaction")?;
    AnalyticsRepo::record_pageview(&mut tx, &pageview, Utc::now().timestamp()).await?;
    tx.commit().await.context("Failed to commit pageview")?;

    Ok(HttpResponse::Created().json(Recorded {
        session_id: pageview.session_id,
    }))
}

#[tracing::instrument(name = "Ingest event", skip(req, body, pool))]
#[post("/event")]
async fn event(
    req: HttpRequest,
    body: web::Json<EventForm>,
    pool: web::Data<SqlitePool>,
) -> RestResult<impl Responder> {
    let mut event: NewEvent = body.into_inner().try_into().map_err(RestError::ParseError)?;
    event.user_agent = user_agent(&req);

    let mut tx = pool.begin().await.context("Failed to begin transaction")?;
    AnalyticsRepo::record_event(&mut tx, &event, Utc::now().timestamp()).await?;
    tx.commit().await.context("Failed to commit event")?;

    Ok(HttpResponse::Created().json(Recorded {
        session_id: event.session_id,
    }))
}

#[derive(Debug, Deserialize)]
pub struct DashboardQuery {
    days: Option<i64>,
}

impl DashboardQuery {
    fn days(&self) -> i64 {
        self.days
            .unwrap_or(DEFAULT_DASHBOARD_DAYS)
            .clamp(1, MAX_DASHBOARD_DAYS)
    }
}

#[tracing::instrument(name = "Analytics dashboard", skip(pool))]
#[get("/admin/dashboard")]
async fn dashboard(
    _admin: Administrator,
    query: web::Query<DashboardQuery>,
    pool: web::Data<SqlitePool>,
) -> RestResult<impl Responder> {
    let now = Utc::now();
    let today_start = now
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .context("Failed to compute start of day")?
        .and_utc()
        .timestamp();
    let window_start = (now - Duration::days(query.days())).timestamp();

    let mut tx = pool.begin().await.context("Failed to begin transaction")?;
    let stats = AnalyticsRepo::dashboard(&mut tx, window_start, today_start).await?;
    tx.commit().await.context("Failed to commit dashboard snapshot")?;

    Ok(HttpResponse::Ok().json(stats))
}

#[tracing::instrument(name = "Realtime analytics", skip(pool))]
#[get("/admin/realtime")]
async fn realtime(_admin: Administrator, pool: web::Data<SqlitePool>) -> RestResult<impl Responder> {
    let window_start = Utc::now().timestamp() - REALTIME_WINDOW_SECONDS;

    let mut tx = pool.begin().await.context("Failed to begin transaction")?;
    let stats = AnalyticsRepo::realtime(&mut tx, window_start).await?;
    tx.commit().await.context("Failed to commit realtime snapshot")?;

    Ok(HttpResponse::Ok().json(stats))
}

/// First-party analytics ingestion and reporting
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/api/analytics")
        .service(dashboard)
        .service(realtime)
        .service(pageview)
        .service(event)
}
