use std::fmt;
use std::time::Duration;

use chrono::{DateTime, Utc};

use rand::Rng;

use reqwest::header::HeaderValue;
use reqwest::{Method, StatusCode};

use crate::error::TOKEN_EXPIRED_CODE;

/// Retry budget a request is entitled to, decided by its method
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RequestClass {
    /// Safe to repeat (`GET`, `HEAD`, `OPTIONS`)
    Read,
    /// Changes server state (`POST`, `PUT`, `PATCH`, `DELETE`)
    Mutation,
}

impl From<&Method> for RequestClass {
    fn from(method: &Method) -> Self {
        if method == Method::GET || method == Method::HEAD || method == Method::OPTIONS {
            Self::Read
        } else {
            Self::Mutation
        }
    }
}

/// Why no response was received
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransportCode {
    Timeout,
    Connect,
    Other,
}

impl fmt::Display for TransportCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::Timeout => "timeout",
            Self::Connect => "connect",
            Self::Other => "transport",
        })
    }
}

impl From<&reqwest::Error> for TransportCode {
    fn from(e: &reqwest::Error) -> Self {
        if e.is_timeout() {
            Self::Timeout
        } else if e.is_connect() {
            Self::Connect
        } else {
            Self::Other
        }
    }
}

/// A failed attempt, as seen by the retry policy
#[derive(Debug, Clone, PartialEq)]
pub enum FailureKind {
    /// The request never produced a response
    Transport(TransportCode),
    /// The server answered with a non-success status
    Status {
        status: StatusCode,
        /// Server advised wait, from the `Retry-After` header
        retry_after: Option<Duration>,
        /// Machine readable `code` from the JSON error body
        code: Option<String>,
    },
}

impl FailureKind {
    pub fn status(&self) -> Option<StatusCode> {
        match self {
            Self::Status { status, .. } => Some(*status),
            Self::Transport(_) => None,
        }
    }

    pub fn is_rate_limited(&self) -> bool {
        self.status() == Some(StatusCode::TOO_MANY_REQUESTS)
    }

    /// A 401 telling the client to refresh its session and replay the request
    pub fn is_token_expired(&self) -> bool {
        match self {
            Self::Status {
                status,
                code: Some(code),
                ..
            } => *status == StatusCode::UNAUTHORIZED && code == TOKEN_EXPIRED_CODE,
            _ => false,
        }
    }
}

/// Timeout, retry and backoff parameters.
///
/// [`RetryPolicy::should_retry`] and [`RetryPolicy::compute_delay`] are pure so they can be
/// exercised without a transport.
#[derive(Debug, Clone)]
pub struct RetryPolicy {
    /// Ceiling on a single attempt, including reading the response
    pub timeout: Duration,
    pub base_delay: Duration,
    pub max_delay: Duration,
    /// Upper bound (exclusive) of the random delay added to the exponential schedule
    pub jitter: Duration,
    /// Upper bound (exclusive) of the random delay added to a server advised wait
    pub rate_limit_jitter: Duration,
    pub max_read_retries: u32,
    pub max_mutation_retries: u32,
}

impl Default for RetryPolicy {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(30),
            base_delay: Duration::from_millis(1000),
            max_delay: Duration::from_millis(30_000),
            jitter: Duration::from_millis(500),
            rate_limit_jitter: Duration::from_millis(1000),
            max_read_retries: 3,
            max_mutation_retries: 1,
        }
    }
}

impl RetryPolicy {
    pub fn max_retries(&self, class: RequestClass) -> u32 {
        match class {
            RequestClass::Read => self.max_read_retries,
            RequestClass::Mutation => self.max_mutation_retries,
        }
    }

    /// Whether a request that has already been retried `attempt` times should go again.
    ///
    /// Reads retry transport failures, 5xx, 408 and 429. Mutations only retry transport
    /// failures and 5xx, so a rate limited write is reported rather than repeated.
    pub fn should_retry(&self, class: RequestClass, attempt: u32, failure: &FailureKind) -> bool {
        if attempt >= self.max_retries(class) {
            return false;
        }

        match (class, failure) {
            (_, FailureKind::Transport(_)) => true,
            (RequestClass::Read, FailureKind::Status { status, .. }) => {
                status.is_server_error()
                    || *status == StatusCode::REQUEST_TIMEOUT
                    || *status == StatusCode::TOO_MANY_REQUESTS
            }
            (RequestClass::Mutation, FailureKind::Status { status, .. }) => {
                status.is_server_error()
            }
        }
    }

    /// Wait before retry number `attempt + 1`.
    ///
    /// A 429 carrying `Retry-After` waits that long plus up to `rate_limit_jitter`; everything
    /// else follows `min(base * 2^attempt, max) + [0, jitter)`.
    pub fn compute_delay<R>(&self, attempt: u32, failure: &FailureKind, rng: &mut R) -> Duration
    where
        R: Rng + ?Sized,
    {
        if let FailureKind::Status {
            status,
            retry_after: Some(wait),
            ..
        } = failure
        {
            if *status == StatusCode::TOO_MANY_REQUESTS {
                return *wait + random_below(rng, self.rate_limit_jitter);
            }
        }

        self.backoff(attempt) + random_below(rng, self.jitter)
    }

    /// The exponential part of the schedule, without jitter
    pub fn backoff(&self, attempt: u32) -> Duration {
        2u32.checked_pow(attempt)
            .and_then(|factor| self.base_delay.checked_mul(factor))
            .map_or(self.max_delay, |delay| delay.min(self.max_delay))
    }
}

fn random_below<R>(rng: &mut R, bound: Duration) -> Duration
where
    R: Rng + ?Sized,
{
    let bound = u64::try_from(bound.as_millis()).unwrap_or(u64::MAX);
    if bound == 0 {
        return Duration::ZERO;
    }
    Duration::from_millis(rng.gen_range(0..bound))
}

/// Parse a `Retry-After` header given either as delta seconds or as an HTTP-date
pub fn parse_retry_after(value: &HeaderValue) -> Option<Duration> {
    retry_after_at(value.to_str().ok()?, Utc::now())
}

fn retry_after_at(value: &str, now: DateTime<Utc>) -> Option<Duration> {
    let value = value.trim();
    if let Ok(seconds) = value.parse::<u64>() {
        return Some(Duration::from_secs(seconds));
    }

    let at = DateTime::parse_from_rfc2822(value).ok()?;
    // A date in the past means "retry now"
    Some((at.with_timezone(&Utc) - now).to_std().unwrap_or(Duration::ZERO))
}
