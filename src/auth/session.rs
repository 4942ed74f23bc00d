use actix_web::cookie::{time, Cookie, SameSite};
use actix_web::HttpResponseBuilder;

use crate::crypto::{SessionClaims, SigningKey};
use crate::error::RestResult;
use crate::settings::SessionSettings;

pub const ACCESS_COOKIE: &str = "access_token";
pub const REFRESH_COOKIE: &str = "refresh_token";

/// Refresh tokens are only ever sent back to the auth endpoints
const REFRESH_COOKIE_PATH: &str = "/api/auth";

/// Issues and clears the httpOnly cookies carrying a session
#[derive(Debug, Clone)]
pub struct SessionCookies<'a> {
    key: &'a SigningKey,
    settings: &'a SessionSettings,
}

impl<'a> SessionCookies<'a> {
    pub fn new(key: &'a SigningKey, settings: &'a SessionSettings) -> Self {
        Self { key, settings }
    }

    /// Set fresh access and refresh cookies for `user_id`
    pub fn start(&self, res: &mut HttpResponseBuilder, user_id: i64) -> RestResult<()> {
        self.renew_access(res, user_id)?;

        let ttl = self.settings.refresh_token_ttl();
        let token = SessionClaims::refresh(user_id).issue(self.key, ttl)?;
        res.cookie(self.cookie(REFRESH_COOKIE, token.as_ref(), REFRESH_COOKIE_PATH, ttl));
        Ok(())
    }

    /// Set a new access cookie, leaving the refresh cookie alone
    pub fn renew_access(&self, res: &mut HttpResponseBuilder, user_id: i64) -> RestResult<()> {
        let token = SessionClaims::access(user_id).issue(self.key, self.settings.access_token_ttl())?;
        // The cookie outlives its token so an expired token still reaches the server
        // and gets answered with TOKEN_EXPIRED
        let lifetime = self.settings.refresh_token_ttl();
        res.cookie(self.cookie(ACCESS_COOKIE, token.as_ref(), "/", lifetime));
        Ok(())
    }

    /// Expire both cookies on the client
    pub fn end(&self, res: &mut HttpResponseBuilder) {
        for (name, path) in [(ACCESS_COOKIE, "/"), (REFRESH_COOKIE, REFRESH_COOKIE_PATH)] {
            let mut cookie = self.cookie(name, "", path, chrono::Duration::zero());
            cookie.make_removal();
            res.cookie(cookie);
        }
    }

    fn cookie(
        &self,
        name: &'static str,
        value: &str,
        path: &'static str,
        ttl: chrono::Duration,
    ) -> Cookie<'static> {
        Cookie::build(name, value.to_string())
            .path(path)
            .http_only(true)
            .secure(self.settings.secure_cookies())
            .same_site(SameSite::Lax)
            .max_age(time::Duration::seconds(ttl.num_seconds()))
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use actix_web::HttpResponse;

    use secrecy::Secret;

    use crate::crypto::{Token, TokenKind};

    use super::*;

    fn key() -> SigningKey {
        SigningKey::new(&Secret::new("cookie-test-key".into())).unwrap()
    }

    #[test]
    fn starting_a_session_sets_both_cookies() {
        let key = key();
        let settings = SessionSettings::new(900, 3600, true);

        let mut res = HttpResponse::Ok();
        SessionCookies::new(&key, &settings).start(&mut res, 42).unwrap();
        let res = res.finish();

        let cookies: Vec<_> = res.cookies().collect();
        assert_eq!(2, cookies.len());

        let access = cookies.iter().find(|c| c.name() == ACCESS_COOKIE).unwrap();
        assert_eq!(Some(true), access.http_only());
        assert_eq!(Some(true), access.secure());
        assert_eq!(Some("/"), access.path());

        let token: Token = access.value().parse().unwrap();
        let claims = SessionClaims::verify(&token, &key, TokenKind::Access).unwrap();
        assert_eq!(42, claims.sub);

        assert_eq!(Some(time::Duration::seconds(3600)), access.max_age());

        let refresh = cookies.iter().find(|c| c.name() == REFRESH_COOKIE).unwrap();
        assert_eq!(Some("/api/auth"), refresh.path());
    }

    #[test]
    fn ending_a_session_expires_the_cookies() {
        let key = key();
        let settings = SessionSettings::new(900, 3600, false);

        let mut res = HttpResponse::Ok();
        SessionCookies::new(&key, &settings).end(&mut res);
        let res = res.finish();

        for cookie in res.cookies() {
            assert_eq!("", cookie.value());
            assert_eq!(Some(time::Duration::ZERO), cookie.max_age());
        }
    }
}
