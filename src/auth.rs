mod admin_guard;
mod credentials;
mod session;

pub use admin_guard::Administrator;
pub use credentials::{hash_password, validate_credentials, Credentials};
pub use session::{SessionCookies, ACCESS_COOKIE, REFRESH_COOKIE};
