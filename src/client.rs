mod api_client;
mod error;
mod policy;
mod refresh;

pub use api_client::{
    ApiClient, ApiClientBuilder, ApiRequest, Identity, RateLimitNotice, SessionExpiredNotice,
    LOGIN_PATH, LOGOUT_PATH, REFRESH_PATH,
};
pub use error::{ClientError, ClientResult};
pub use policy::{parse_retry_after, FailureKind, RequestClass, RetryPolicy, TransportCode};
pub use refresh::{RefreshCoordinator, RefreshError, RefreshResult};
