use std::env;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::Context;

use config::builder::DefaultState;
use config::{Config, ConfigBuilder, Environment, File};

use secrecy::Secret;

use serde::Deserialize;
use serde_aux::prelude::*;

use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode};

/// Runtime environment, either `Dev` for local development, or `Prod` for release
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Runtime {
    Dev,
    Prod,
}

impl Runtime {
    pub fn as_str(&self) -> &str {
        match self {
            Runtime::Dev => "dev",
            Runtime::Prod => "prod",
        }
    }
}

impl TryFrom<String> for Runtime {
    type Error = anyhow::Error;

    fn try_from(s: String) -> anyhow::Result<Self> {
        match s.to_lowercase().as_str() {
            "dev" => Ok(Self::Dev),
            "prod" => Ok(Self::Prod),
            other => anyhow::bail!("{} is not a valid runtime environment", other),
        }
    }
}

/// Application settings wrapper
#[derive(Debug, Deserialize)]
pub struct Settings {
    pub app: ApplicationSettings,
    pub database: DatabaseSettings,
    pub session: SessionSettings,
    pub rate_limit: RateLimitSettings,
    /// Administrator account created on startup when no users exist yet
    #[serde(default)]
    pub admin: Option<AdminSettings>,
}

impl Settings {
    /// Load application settings from the settings directory
    pub fn load() -> anyhow::Result<Self> {
        let path = env::current_dir()?.join("settings");
        // Get the current environment based on the `APP_ENV` environment variable, default to `Dev`
        let runtime: Runtime = env::var("APP_ENV")
            .unwrap_or_else(|_| "dev".into())
            .try_into()?;

        Self::load_from(runtime, &path)
    }

    /// Load application settings from a specified path and runtime
    pub fn load_from(runtime: Runtime, base_path: &Path) -> anyhow::Result<Self> {
        Self::sources(runtime, base_path)
            .build()?
            .try_deserialize()
            .context("Failed to load/deserialize settings")
    }

    fn sources(runtime: Runtime, base_path: &Path) -> ConfigBuilder<DefaultState> {
        Config::builder()
            .add_source(File::from(base_path.join("base")).required(true))
            .add_source(File::from(base_path.join(runtime.as_str())).required(true))
            // NOTE: Should be used for any prod secrets. Takes the form `APP_<settings category>__<setting name>`.
            // The signing key has no default outside `dev`, so a release without one fails here.
            .add_source(
                Environment::with_prefix("app")
                    .prefix_separator("_")
                    .separator("__"),
            )
    }
}

#[derive(Debug, Deserialize)]
pub struct ApplicationSettings {
    host: String,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    port: u16,

    secret_key: Secret<String>,
    /// Tracing filter directive, overridden by `RUST_LOG` when set
    #[serde(default = "default_log_filter")]
    log_filter: String,
}

fn default_log_filter() -> String {
    "info".into()
}

impl ApplicationSettings {
    /// The application address to bind to
    pub fn addr(&self) -> (&str, u16) {
        (&self.host, self.port)
    }

    /// The key session tokens are signed with
    pub fn secret_key(&self) -> &Secret<String> {
        &self.secret_key
    }

    pub fn log_filter(&self) -> String {
        env::var("RUST_LOG").unwrap_or_else(|_| self.log_filter.clone())
    }
}

#[derive(Debug, Deserialize)]
pub struct DatabaseSettings {
    path: PathBuf,
    #[serde(default = "default_true")]
    create_if_missing: bool,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    max_connections: u32,
}

fn default_true() -> bool {
    true
}

impl DatabaseSettings {
    /// The SQLite connection options for the configured database file
    pub fn connect_options(&self) -> SqliteConnectOptions {
        SqliteConnectOptions::new()
            .filename(&self.path)
            .create_if_missing(self.create_if_missing)
            .journal_mode(SqliteJournalMode::Wal)
            .foreign_keys(true)
    }

    pub fn max_connections(&self) -> u32 {
        self.max_connections
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct SessionSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    access_token_ttl_seconds: i64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    refresh_token_ttl_seconds: i64,
    /// Mark session cookies `Secure`; disable only for plain-http local development
    secure_cookies: bool,
}

impl SessionSettings {
    pub fn new(access_token_ttl_seconds: i64, refresh_token_ttl_seconds: i64, secure_cookies: bool) -> Self {
        Self {
            access_token_ttl_seconds,
            refresh_token_ttl_seconds,
            secure_cookies,
        }
    }

    pub fn access_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.access_token_ttl_seconds)
    }

    pub fn refresh_token_ttl(&self) -> chrono::Duration {
        chrono::Duration::seconds(self.refresh_token_ttl_seconds)
    }

    pub fn secure_cookies(&self) -> bool {
        self.secure_cookies
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RateLimitSettings {
    #[serde(deserialize_with = "deserialize_number_from_string")]
    window_seconds: u64,
    #[serde(deserialize_with = "deserialize_number_from_string")]
    max_requests: u32,
    /// Key clients by `Forwarded`/`X-Forwarded-For`. Only safe behind a proxy that sets them.
    #[serde(default)]
    trust_forwarded_headers: bool,
}

impl RateLimitSettings {
    pub fn new(window_seconds: u64, max_requests: u32) -> Self {
        Self {
            window_seconds,
            max_requests,
            trust_forwarded_headers: false,
        }
    }

    pub fn behind_proxy(mut self) -> Self {
        self.trust_forwarded_headers = true;
        self
    }

    pub fn window(&self) -> Duration {
        Duration::from_secs(self.window_seconds)
    }

    pub fn max_requests(&self) -> u32 {
        self.max_requests
    }

    pub fn trust_forwarded_headers(&self) -> bool {
        self.trust_forwarded_headers
    }
}

#[derive(Debug, Deserialize)]
pub struct AdminSettings {
    pub email: String,
    pub password: Secret<String>,
}
