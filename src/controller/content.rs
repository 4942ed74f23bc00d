use actix_web::dev::HttpServiceFactory;
use actix_web::{delete, get, put, web, HttpResponse, Responder};

use anyhow::Context;

use serde::Deserialize;

use sqlx::SqlitePool;

use crate::auth::Administrator;
use crate::domain::{ContentKey, ContentValue};
use crate::error::{RestError, RestResult};
use crate::repo::{ContentBlockRepo, ContentWrite};

/// Deepest document accepted for storage
const MAX_DEPTH: usize = 32;

#[derive(Debug, Deserialize)]
pub struct ContentForm {
    data: ContentValue,
    /// Version the editor last saw; `0` when creating a new key
    #[serde(default)]
    expected_version: Option<i64>,
}

fn parse_key(key: &str) -> RestResult<ContentKey> {
    key.parse().map_err(RestError::ParseError)
}

#[tracing::instrument(name = "Fetch content", skip(pool))]
#[get("/{key}")]
async fn by_key(key: web::Path<String>, pool: web::Data<SqlitePool>) -> RestResult<impl Responder> {
    let key = parse_key(&key)?;
    let block = ContentBlockRepo::fetch(pool.get_ref(), &key)
        .await?
        .ok_or(RestError::NotFound("Content"))?;
    Ok(HttpResponse::Ok().json(block))
}

#[tracing::instrument(name = "List content", skip(pool))]
#[get("/admin")]
async fn admin_list(_admin: Administrator, pool: web::Data<SqlitePool>) -> RestResult<impl Responder> {
    Ok(HttpResponse::Ok().json(ContentBlockRepo::fetch_all(pool.get_ref()).await?))
}

#[tracing::instrument(name = "Write content", skip(pool, body))]
#[put("/admin/{key}")]
async fn write(
    _admin: Administrator,
    key: web::Path<String>,
    body: web::Json<ContentForm>,
    pool: web::Data<SqlitePool>,
) -> RestResult<impl Responder> {
    let key = parse_key(&key)?;
    let form = body.into_inner();

    if form.data.depth() > MAX_DEPTH {
        return Err(RestError::ParseError(format!(
            "Content nests deeper than {} levels",
            MAX_DEPTH
        )));
    }
    if form.expected_version.map_or(false, |v| v < 0) {
        return Err(RestError::ParseError("expected_version cannot be negative".into()));
    }

    let mut conn = pool
        .acquire()
        .await
        .context("Failed to acquire a database connection")?;

    match ContentBlockRepo::write(&mut conn, &key, &form.data, form.expected_version).await? {
        ContentWrite::Written(block) => Ok(HttpResponse::Ok().json(block)),
        ContentWrite::VersionConflict { current } => {
            tracing::warn!(?current, expected = ?form.expected_version, "Stale content write");
            Err(RestError::Conflict(match current {
                Some(version) => format!("Content has changed, current version is {}", version),
                None => "Content does not exist".into(),
            }))
        }
    }
}

#[tracing::instrument(name = "Delete content", skip(pool))]
#[delete("/admin/{key}")]
async fn destroy(
    _admin: Administrator,
    key: web::Path<String>,
    pool: web::Data<SqlitePool>,
) -> RestResult<impl Responder> {
    let key = parse_key(&key)?;
    if !ContentBlockRepo::delete(pool.get_ref(), &key).await? {
        return Err(RestError::NotFound("Content"));
    }
    Ok(HttpResponse::NoContent().finish())
}

/// Versioned CMS content endpoints
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/api/content")
        .service(admin_list)
        .service(write)
        .service(destroy)
        .service(by_key)
}
