use actix_web::dev::HttpServiceFactory;
use actix_web::{get, post, web, HttpRequest, HttpResponse, Responder};

use anyhow::{anyhow, Context};

use sqlx::SqlitePool;

use crate::auth::{validate_credentials, Administrator, Credentials, SessionCookies, REFRESH_COOKIE};
use crate::crypto::{SessionClaims, SigningKey, Token, TokenKind};
use crate::error::{RestError, RestResult};
use crate::rate_limit::RateLimiter;
use crate::repo::{User, UsersRepo};
use crate::settings::SessionSettings;

async fn fetch_user(pool: &SqlitePool, id: i64) -> RestResult<User> {
    UsersRepo::fetch_by_id(pool, id)
        .await?
        .ok_or_else(|| RestError::FailedToAuthenticate(anyhow!("Session user no longer exists")))
}

#[tracing::instrument(
    name = "Log in",
    skip(req, body, pool, key, session, limiter),
    fields(email = %body.email, user_id = tracing::field::Empty)
)]
#[post("/login")]
async fn login(
    req: HttpRequest,
    body: web::Json<Credentials>,
    pool: web::Data<SqlitePool>,
    key: web::Data<SigningKey>,
    session: web::Data<SessionSettings>,
    limiter: web::Data<RateLimiter>,
) -> RestResult<impl Responder> {
    limiter.check_request(&req, "login")?;

    let user_id = validate_credentials(pool.get_ref(), &body).await?;
    tracing::Span::current().record("user_id", &user_id);

    let user = fetch_user(pool.get_ref(), user_id).await?;

    let mut res = HttpResponse::Ok();
    SessionCookies::new(&key, &session).start(&mut res, user_id)?;
    Ok(res.json(user))
}

#[tracing::instrument(name = "Refresh session", skip(req, pool, key, session))]
#[post("/refresh")]
async fn refresh(
    req: HttpRequest,
    pool: web::Data<SqlitePool>,
    key: web::Data<SigningKey>,
    session: web::Data<SessionSettings>,
) -> RestResult<impl Responder> {
    let token: Token = req
        .cookie(REFRESH_COOKIE)
        .context("Missing refresh cookie")
        .and_then(|cookie| cookie.value().parse().context("Malformed refresh cookie"))
        .map_err(RestError::FailedToAuthenticate)?;

    // An expired refresh token ends the session, it must not look refreshable
    let claims = SessionClaims::verify(&token, &key, TokenKind::Refresh)
        .map_err(|e| RestError::FailedToAuthenticate(e.into()))?;

    let user = fetch_user(pool.get_ref(), claims.sub).await?;

    let mut res = HttpResponse::Ok();
    SessionCookies::new(&key, &session).renew_access(&mut res, user.id)?;
    Ok(res.json(user))
}

#[tracing::instrument(name = "Log out", skip(key, session))]
#[post("/logout")]
async fn logout(
    key: web::Data<SigningKey>,
    session: web::Data<SessionSettings>,
) -> impl Responder {
    let mut res = HttpResponse::NoContent();
    SessionCookies::new(&key, &session).end(&mut res);
    res.finish()
}

#[tracing::instrument(name = "Current user", skip(pool))]
#[get("/me")]
async fn me(admin: Administrator, pool: web::Data<SqlitePool>) -> RestResult<impl Responder> {
    Ok(HttpResponse::Ok().json(fetch_user(pool.get_ref(), admin.user_id()).await?))
}

/// Session endpoints for the admin area
pub fn scope() -> impl HttpServiceFactory {
    web::scope("/api/auth")
        .service(login)
        .service(refresh)
        .service(logout)
        .service(me)
}
