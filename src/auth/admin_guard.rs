use std::future::{ready, Ready};

use actix_web::http::header::{self, HeaderMap};
use actix_web::{dev, web, FromRequest, HttpRequest};

use anyhow::Context;

use crate::auth::ACCESS_COOKIE;
use crate::crypto::{SessionClaims, SigningKey, Token, TokenKind};
use crate::error::{RestError, RestResult};

const BEARER_AUTH_PREFIX: &str = "Bearer ";

/// Guard for admin endpoints, holding the id of the signed-in user.
///
/// Accepts an access token from the `access_token` cookie or an `Authorization: Bearer`
/// header. An expired token is rejected with `TOKEN_EXPIRED` so clients know to refresh.
#[derive(Debug)]
pub struct Administrator(i64);

impl Administrator {
    pub fn user_id(&self) -> i64 {
        self.0
    }
}

impl FromRequest for Administrator {
    type Error = RestError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut dev::Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

fn authenticate(req: &HttpRequest) -> RestResult<Administrator> {
    // NOTE: Must be registered with the application at startup
    let key = req
        .app_data::<web::Data<SigningKey>>()
        .ok_or_else(|| RestError::InternalError("Signing key not registered".into()))?;

    let token = access_token(req).map_err(RestError::FailedToAuthenticate)?;
    let claims = SessionClaims::verify(&token, key, TokenKind::Access)?;

    Ok(Administrator(claims.sub))
}

/// Pull the access token from the session cookie, falling back to the bearer header
fn access_token(req: &HttpRequest) -> anyhow::Result<Token> {
    if let Some(cookie) = req.cookie(ACCESS_COOKIE) {
        return cookie
            .value()
            .parse()
            .context("Malformed access token cookie");
    }
    from_bearer(req.headers())
}

fn from_bearer(headers: &HeaderMap) -> anyhow::Result<Token> {
    headers
        .get(header::AUTHORIZATION)
        .context("Missing session cookie or authorization header")?
        .to_str()?
        .strip_prefix(BEARER_AUTH_PREFIX)
        .context("Authorization scheme not bearer")?
        .parse()
        .context("Malformed bearer token")
}
