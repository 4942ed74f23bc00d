use std::time::Duration;

use actix_web::http::{header, StatusCode};
use actix_web::{HttpResponse, ResponseError};

use serde::Serialize;

use thiserror::Error;

use crate::crypto::TokenError;

pub type RestResult<T> = Result<T, RestError>;

/// Machine readable code sent with a 401 when the access token has expired.
/// Clients react to it by refreshing the session and replaying the request.
pub const TOKEN_EXPIRED_CODE: &str = "TOKEN_EXPIRED";

#[derive(Debug, Error)]
pub enum RestError {
    #[error("Parse Error: {0}")]
    ParseError(String),

    #[error("Failed to authenticate")]
    FailedToAuthenticate(#[source] anyhow::Error),

    #[error("Session token expired")]
    TokenExpired,

    #[error("{0} not found")]
    NotFound(&'static str),

    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Too many requests")]
    RateLimited { retry_after: Duration },

    #[error("Internal Server Error: {0}")]
    InternalError(String),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

impl RestError {
    fn code(&self) -> &'static str {
        match self {
            Self::ParseError(_) => "BAD_REQUEST",
            Self::FailedToAuthenticate(_) => "UNAUTHORIZED",
            Self::TokenExpired => TOKEN_EXPIRED_CODE,
            Self::NotFound(_) => "NOT_FOUND",
            Self::Conflict(_) => "CONFLICT",
            Self::RateLimited { .. } => "RATE_LIMITED",
            Self::InternalError(_) | Self::Other(_) => "INTERNAL_ERROR",
        }
    }

    /// Message safe to show to API consumers
    fn public_message(&self) -> String {
        match self {
            Self::InternalError(_) | Self::Other(_) => "Internal Server Error".into(),
            other => other.to_string(),
        }
    }
}

#[derive(Debug, Serialize)]
struct ErrorBody<'a> {
    error: String,
    code: &'a str,
}

impl From<sqlx::Error> for RestError {
    fn from(e: sqlx::Error) -> Self {
        match e {
            sqlx::Error::RowNotFound => Self::NotFound("Record"),
            sqlx::Error::Database(ref db_err) if db_err.is_unique_violation() => {
                Self::Conflict("A record with the same unique key already exists".into())
            }
            e => {
                tracing::error!(error.cause_chain = ?e, "Database error");
                Self::InternalError("Database error".into())
            }
        }
    }
}

impl From<TokenError> for RestError {
    fn from(e: TokenError) -> Self {
        match e {
            TokenError::Expired => Self::TokenExpired,
            e => Self::FailedToAuthenticate(e.into()),
        }
    }
}

impl ResponseError for RestError {
    fn status_code(&self) -> StatusCode {
        match self {
            Self::ParseError(_) => StatusCode::BAD_REQUEST,
            Self::FailedToAuthenticate(_) | Self::TokenExpired => StatusCode::UNAUTHORIZED,
            Self::NotFound(_) => StatusCode::NOT_FOUND,
            Self::Conflict(_) => StatusCode::CONFLICT,
            Self::RateLimited { .. } => StatusCode::TOO_MANY_REQUESTS,
            Self::InternalError(_) | Self::Other(_) => StatusCode::INTERNAL_SERVER_ERROR,
        }
    }

    fn error_response(&self) -> HttpResponse {
        if let Self::Other(e) = self {
            tracing::error!(error.cause_chain = ?e, "Unhandled error");
        }

        let mut res = HttpResponse::build(self.status_code());
        if let Self::RateLimited { retry_after } = self {
            res.insert_header((
                header::RETRY_AFTER,
                retry_after.as_secs().max(1).to_string(),
            ));
        }
        res.json(ErrorBody {
            error: self.public_message(),
            code: self.code(),
        })
    }
}
