use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::time::Duration;

use reqwest::header::{self, HeaderValue};
use reqwest::{Client, Method, Response, StatusCode};

use secrecy::{ExposeSecret, Secret};

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};

use url::Url;

use crate::client::{
    parse_retry_after, ClientError, ClientResult, FailureKind, RefreshCoordinator, RefreshError,
    RefreshResult, RequestClass, RetryPolicy, TransportCode,
};

pub const LOGIN_PATH: &str = "/api/auth/login";
pub const LOGOUT_PATH: &str = "/api/auth/logout";
pub const REFRESH_PATH: &str = "/api/auth/refresh";

/// Requests under this path segment belong to the signed-in area
const ADMIN_AREA: &str = "/admin";
const DEFAULT_LOGIN_URL: &str = "/admin/login";

/// Emitted once per rate limited call
#[derive(Debug, Clone)]
pub struct RateLimitNotice {
    pub wait: Duration,
    pub message: String,
    pub endpoint: String,
}

/// Emitted when a session could not be refreshed while working in the admin area
#[derive(Debug, Clone)]
pub struct SessionExpiredNotice {
    pub login_url: Url,
    pub endpoint: String,
    pub error: RefreshError,
}

type Hook<T> = Arc<dyn Fn(&T) + Send + Sync>;

/// The signed-in user, as reported by the login and refresh endpoints
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Identity {
    pub id: i64,
    pub email: String,
}

/// A request relative to the client's base URL. The body is kept serialized so the
/// request can be sent again on retry or after a session refresh.
#[derive(Debug, Clone)]
pub struct ApiRequest {
    method: Method,
    path: String,
    query: Vec<(String, String)>,
    body: Option<Vec<u8>>,
    invalid: Option<String>,
}

impl ApiRequest {
    pub fn new(method: Method, path: impl Into<String>) -> Self {
        Self {
            method,
            path: path.into(),
            query: Vec::new(),
            body: None,
            invalid: None,
        }
    }

    pub fn get(path: impl Into<String>) -> Self {
        Self::new(Method::GET, path)
    }

    pub fn post(path: impl Into<String>) -> Self {
        Self::new(Method::POST, path)
    }

    pub fn put(path: impl Into<String>) -> Self {
        Self::new(Method::PUT, path)
    }

    pub fn delete(path: impl Into<String>) -> Self {
        Self::new(Method::DELETE, path)
    }

    pub fn query(mut self, key: impl Into<String>, value: impl ToString) -> Self {
        self.query.push((key.into(), value.to_string()));
        self
    }

    /// Attach a JSON body; serialization errors surface when the request is executed
    pub fn json<T: Serialize + ?Sized>(mut self, body: &T) -> Self {
        match serde_json::to_vec(body) {
            Ok(bytes) => self.body = Some(bytes),
            Err(e) => self.invalid = Some(format!("Failed to serialize request body: {}", e)),
        }
        self
    }

    pub fn path(&self) -> &str {
        &self.path
    }

    pub fn method(&self) -> &Method {
        &self.method
    }

    fn class(&self) -> RequestClass {
        RequestClass::from(&self.method)
    }

    /// Whether a `TOKEN_EXPIRED` answer may trigger a refresh. The auth endpoints never do.
    fn may_refresh(&self) -> bool {
        !self.path.starts_with(REFRESH_PATH) && !self.path.starts_with(LOGIN_PATH)
    }
}

/// Builder for [`ApiClient`]
pub struct ApiClientBuilder {
    base_url: Url,
    policy: RetryPolicy,
    login_url: Option<Url>,
    on_rate_limit: Option<Hook<RateLimitNotice>>,
    on_session_expired: Option<Hook<SessionExpiredNotice>>,
}

impl ApiClientBuilder {
    pub fn policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    /// Where users are sent once their session cannot be refreshed
    pub fn login_url(mut self, login_url: Url) -> Self {
        self.login_url = Some(login_url);
        self
    }

    pub fn on_rate_limit<F>(mut self, hook: F) -> Self
    where
        F: Fn(&RateLimitNotice) + Send + Sync + 'static,
    {
        self.on_rate_limit = Some(Arc::new(hook));
        self
    }

    pub fn on_session_expired<F>(mut self, hook: F) -> Self
    where
        F: Fn(&SessionExpiredNotice) + Send + Sync + 'static,
    {
        self.on_session_expired = Some(Arc::new(hook));
        self
    }

    pub fn build(mut self) -> ClientResult<ApiClient> {
        // Request paths resolve below the base, so it must read as a directory
        if !self.base_url.path().ends_with('/') {
            let path = format!("{}/", self.base_url.path());
            self.base_url.set_path(&path);
        }

        let http = Client::builder()
            .timeout(self.policy.timeout)
            .cookie_store(true)
            .build()
            .map_err(ClientError::Build)?;

        let login_url = match self.login_url {
            Some(url) => url,
            None => self
                .base_url
                .join(DEFAULT_LOGIN_URL)
                .map_err(|e| ClientError::InvalidRequest(e.to_string()))?,
        };

        Ok(ApiClient {
            inner: Arc::new(Inner {
                http,
                base_url: self.base_url,
                login_url,
                policy: self.policy,
                refresh: RefreshCoordinator::new(),
                identity: Mutex::new(None),
                session_ended: AtomicBool::new(false),
                on_rate_limit: self.on_rate_limit,
                on_session_expired: self.on_session_expired,
            }),
        })
    }
}

/// HTTP client for the content API.
///
/// Every call gets a timeout, retries with exponential backoff according to its
/// [`RetryPolicy`], and transparently refreshes an expired session once before replaying.
/// Cloning is cheap and clones share cookies, identity and the refresh gate.
#[derive(Clone)]
pub struct ApiClient {
    inner: Arc<Inner>,
}

struct Inner {
    http: Client,
    base_url: Url,
    login_url: Url,
    policy: RetryPolicy,
    refresh: RefreshCoordinator,
    identity: Mutex<Option<Identity>>,
    /// Set by a failed refresh until one caller has reported the expiry
    session_ended: AtomicBool,
    on_rate_limit: Option<Hook<RateLimitNotice>>,
    on_session_expired: Option<Hook<SessionExpiredNotice>>,
}

impl fmt::Debug for ApiClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ApiClient")
            .field("base_url", &self.inner.base_url.as_str())
            .field("policy", &self.inner.policy)
            .finish()
    }
}

/// One failed attempt, with enough detail to build the terminal error
struct Failure {
    kind: FailureKind,
    message: Option<String>,
    source: Option<reqwest::Error>,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    error: Option<String>,
    code: Option<String>,
}

#[derive(Serialize)]
struct LoginBody<'a> {
    email: &'a str,
    password: &'a str,
}

impl ApiClient {
    pub fn new(base_url: Url, policy: RetryPolicy) -> ClientResult<Self> {
        Self::builder(base_url).policy(policy).build()
    }

    pub fn builder(base_url: Url) -> ApiClientBuilder {
        ApiClientBuilder {
            base_url,
            policy: RetryPolicy::default(),
            login_url: None,
            on_rate_limit: None,
            on_session_expired: None,
        }
    }

    pub fn policy(&self) -> &RetryPolicy {
        &self.inner.policy
    }

    /// The identity cached by the last login or refresh
    pub fn identity(&self) -> Option<Identity> {
        self.identity_slot().clone()
    }

    /// Execute a request, returning the first successful response or the final failure
    #[tracing::instrument(name = "API request", skip(self, request), fields(method = %request.method, path = %request.path))]
    pub async fn execute(&self, request: ApiRequest) -> ClientResult<Response> {
        if let Some(reason) = &request.invalid {
            return Err(ClientError::InvalidRequest(reason.clone()));
        }

        let url = self.url(&request.path)?;
        match self.send_with_retry(&url, &request).await {
            Err(failure) if failure.kind.is_token_expired() && request.may_refresh() => {
                tracing::info!("Access token expired, refreshing session");
                self.refresh_session(&request.path).await?;
                // Replayed exactly once
                self.send_with_retry(&url, &request)
                    .await
                    .map_err(|failure| self.terminal_error(&request.path, failure))
            }
            result => result.map_err(|failure| self.terminal_error(&request.path, failure)),
        }
    }

    pub async fn get_json<T: DeserializeOwned>(&self, request: ApiRequest) -> ClientResult<T> {
        let endpoint = request.path.clone();
        let response = self.execute(request).await?;
        decode(&endpoint, response).await
    }

    /// Send `body` as JSON and decode the JSON answer
    pub async fn send_json<B, T>(&self, method: Method, path: &str, body: &B) -> ClientResult<T>
    where
        B: Serialize + ?Sized,
        T: DeserializeOwned,
    {
        self.get_json(ApiRequest::new(method, path).json(body)).await
    }

    /// Sign in, storing the session cookies and caching the identity
    pub async fn login(&self, email: &str, password: &Secret<String>) -> ClientResult<Identity> {
        let body = LoginBody {
            email,
            password: password.expose_secret(),
        };
        let identity: Identity = self
            .get_json(ApiRequest::post(LOGIN_PATH).json(&body))
            .await?;

        *self.identity_slot() = Some(identity.clone());
        Ok(identity)
    }

    /// Sign out. The cached identity is dropped even if the server cannot be reached.
    pub async fn logout(&self) -> ClientResult<()> {
        let result = self.execute(ApiRequest::post(LOGOUT_PATH)).await;
        *self.identity_slot() = None;
        result.map(|_| ())
    }

    /// Send with retries. Failures are returned raw so the caller can decide on a refresh.
    async fn send_with_retry(&self, url: &Url, request: &ApiRequest) -> Result<Response, Failure> {
        let policy = &self.inner.policy;
        let class = request.class();
        let mut attempt = 0;
        let mut rate_limit_reported = false;

        loop {
            let failure = match self.send_once(url, request).await {
                Ok(response) if !is_failure(response.status()) => return Ok(response),
                Ok(response) => Failure::from_response(response).await,
                Err(e) => Failure::from_transport(e),
            };

            if failure.kind.is_rate_limited() && !rate_limit_reported {
                rate_limit_reported = true;
                self.report_rate_limit(request, &failure, attempt);
            }

            if !policy.should_retry(class, attempt, &failure.kind) {
                return Err(failure);
            }

            let delay = policy.compute_delay(attempt, &failure.kind, &mut rand::thread_rng());
            attempt += 1;
            tracing::warn!(
                attempt,
                delay_ms = delay.as_millis() as u64,
                failure = ?failure.kind,
                "Retrying request"
            );
            tokio::time::sleep(delay).await;
        }
    }

    async fn send_once(&self, url: &Url, request: &ApiRequest) -> reqwest::Result<Response> {
        let mut builder = self.inner.http.request(request.method.clone(), url.clone());
        if !request.query.is_empty() {
            builder = builder.query(&request.query);
        }
        if let Some(body) = &request.body {
            builder = builder
                .header(header::CONTENT_TYPE, HeaderValue::from_static("application/json"))
                .body(body.clone());
        }
        builder.send().await
    }

    /// Resolve `path` below the base URL. A query string in `path` is kept.
    fn url(&self, path: &str) -> ClientResult<Url> {
        self.inner
            .base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| ClientError::InvalidRequest(format!("Invalid path {}: {}", path, e)))
    }

    fn report_rate_limit(&self, request: &ApiRequest, failure: &Failure, attempt: u32) {
        let wait = match &failure.kind {
            FailureKind::Status {
                retry_after: Some(wait),
                ..
            } => *wait,
            _ => self.inner.policy.backoff(attempt),
        };
        tracing::warn!(endpoint = %request.path, wait_s = wait.as_secs(), "Rate limited");

        if let Some(hook) = &self.inner.on_rate_limit {
            hook(&RateLimitNotice {
                wait,
                message: format!(
                    "Too many requests. Please wait {} seconds and try again.",
                    wait.as_secs().max(1)
                ),
                endpoint: request.path.clone(),
            });
        }
    }

    /// Refresh the session through the single-flight gate. The caller that runs the refresh
    /// tears the session down when it fails; every caller then checks whether it should
    /// send the user to the login page.
    async fn refresh_session(&self, endpoint: &str) -> ClientResult<()> {
        let result = self
            .inner
            .refresh
            .run(|| async {
                self.inner.session_ended.store(false, Ordering::SeqCst);
                let result = self.post_refresh().await;
                if let Err(error) = &result {
                    self.end_session(error);
                }
                result
            })
            .await;

        if let Err(error) = &result {
            self.notify_session_expired(endpoint, error);
        }
        result.map_err(ClientError::Refresh)
    }

    async fn post_refresh(&self) -> RefreshResult {
        let url = self
            .url(REFRESH_PATH)
            .map_err(|e| RefreshError::Failed(e.to_string()))?;
        let response = self
            .send_with_retry(&url, &ApiRequest::post(REFRESH_PATH))
            .await
            .map_err(|failure| match failure.kind {
                FailureKind::Status { status, .. } => RefreshError::Rejected { status },
                FailureKind::Transport(code) => RefreshError::Failed(code.to_string()),
            })?;

        // Older servers answer without a body; the identity is then left as is
        if let Ok(identity) = response.json::<Identity>().await {
            *self.identity_slot() = Some(identity);
        }
        tracing::info!("Session refreshed");
        Ok(())
    }

    fn end_session(&self, error: &RefreshError) {
        tracing::warn!(error = %error, "Session refresh failed, clearing identity");
        *self.identity_slot() = None;
        self.inner.session_ended.store(true, Ordering::SeqCst);
    }

    /// Fires the session-expired hook once per ended session, for the first caller
    /// working in the admin area
    fn notify_session_expired(&self, endpoint: &str, error: &RefreshError) {
        if !endpoint.contains(ADMIN_AREA) {
            return;
        }
        if !self.inner.session_ended.swap(false, Ordering::SeqCst) {
            return;
        }
        if let Some(hook) = &self.inner.on_session_expired {
            hook(&SessionExpiredNotice {
                login_url: self.inner.login_url.clone(),
                endpoint: endpoint.to_string(),
                error: error.clone(),
            });
        }
    }

    fn terminal_error(&self, endpoint: &str, failure: Failure) -> ClientError {
        let endpoint = endpoint.to_string();
        match (failure.kind, failure.source) {
            (FailureKind::Transport(code), Some(source)) => ClientError::Transport {
                endpoint,
                code,
                source,
            },
            (FailureKind::Status {
                status,
                retry_after,
                code,
            }, _) => ClientError::Status {
                endpoint,
                status,
                code,
                message: failure.message,
                retry_after,
            },
            (FailureKind::Transport(code), None) => {
                ClientError::InvalidRequest(format!("{} failure without an error", code))
            }
        }
    }

    fn identity_slot(&self) -> MutexGuard<'_, Option<Identity>> {
        self.inner
            .identity
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }
}

fn is_failure(status: StatusCode) -> bool {
    status.is_client_error() || status.is_server_error()
}

async fn decode<T: DeserializeOwned>(endpoint: &str, response: Response) -> ClientResult<T> {
    response.json().await.map_err(|source| ClientError::Decode {
        endpoint: endpoint.to_string(),
        source,
    })
}

impl Failure {
    fn from_transport(e: reqwest::Error) -> Self {
        Self {
            kind: FailureKind::Transport(TransportCode::from(&e)),
            message: None,
            source: Some(e),
        }
    }

    async fn from_response(response: Response) -> Self {
        let status = response.status();
        let retry_after = response
            .headers()
            .get(header::RETRY_AFTER)
            .and_then(parse_retry_after);
        // Error bodies are optional; anything unparseable is treated as absent
        let body = response.json::<ErrorBody>().await.ok();
        let (message, code) = match body {
            Some(body) => (body.error, body.code),
            None => (None, None),
        };

        Self {
            kind: FailureKind::Status {
                status,
                retry_after,
                code,
            },
            message,
            source: None,
        }
    }
}
