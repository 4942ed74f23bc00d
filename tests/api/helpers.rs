use std::net::TcpListener;

use fake::faker::internet::en::SafeEmail;
use fake::Fake;

use reqwest::{Client, Method, RequestBuilder, Response};

use secrecy::Secret;

use serde::Serialize;

use sqlx::SqlitePool;

use url::Url;

use uuid::Uuid;

use tavola::app;
use tavola::auth::hash_password;
use tavola::crypto::SigningKey;
use tavola::rate_limit::RateLimiter;
use tavola::repo::{NewUser, UsersRepo};
use tavola::settings::{RateLimitSettings, SessionSettings};

pub struct TestApp {
    pub addr: String,
    pub client: Client,
}

impl TestApp {
    /// Spawn with roomy limits and plain-http cookies
    pub async fn spawn(pool: &SqlitePool) -> Self {
        Self::spawn_with(
            pool,
            SessionSettings::new(900, 3600, false),
            RateLimitSettings::new(60, 1000),
        )
        .await
    }

    pub async fn spawn_with(
        pool: &SqlitePool,
        session: SessionSettings,
        rate_limit: RateLimitSettings,
    ) -> Self {
        let listener = TcpListener::bind("127.0.0.1:0").expect("Failed to listen on random port");
        let port = listener.local_addr().unwrap().port();

        let addr = format!("http://127.0.0.1:{}", port);

        let signing_key = SigningKey::new(&Secret::new(Uuid::new_v4().to_string()))
            .expect("Failed to create crypto signing key");

        let server = app::run(
            listener,
            pool.clone(),
            signing_key,
            session,
            RateLimiter::new(&rate_limit),
        )
        .expect("Failed to spawn app instance");
        let _ = tokio::spawn(server);

        let client = Client::builder()
            .cookie_store(true)
            .build()
            .expect("Failed to build test client");

        Self { addr, client }
    }

    pub fn base_url(&self) -> Url {
        Url::parse(&self.addr).expect("Failed to parse app address")
    }

    pub fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.client.request(method, format!("{}{}", &self.addr, path))
    }

    pub async fn get(&self, path: &str) -> Response {
        self.request(Method::GET, path)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn send_json<T: Serialize + ?Sized>(
        &self,
        method: Method,
        path: &str,
        body: &T,
    ) -> Response {
        self.request(method, path)
            .json(body)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn delete(&self, path: &str) -> Response {
        self.request(Method::DELETE, path)
            .send()
            .await
            .expect("Failed to execute request")
    }

    pub async fn health_check(&self) -> reqwest::Result<Response> {
        self.request(Method::GET, "/health_check").send().await
    }

    pub async fn login(&self, email: &str, password: &str) -> Response {
        self.send_json(
            Method::POST,
            "/api/auth/login",
            &serde_json::json!({ "email": email, "password": password }),
        )
        .await
    }

    /// Register a fresh administrator and sign this app's client in as them
    pub async fn login_admin(&self, pool: &SqlitePool) -> TestUser {
        let user = TestUser::register(pool).await;
        let res = self.login(&user.email, &user.password).await;
        assert!(res.status().is_success(), "Admin login failed: {}", res.status());
        user
    }
}

/// Read a JSON body, failing the test on malformed output
pub async fn json_body(res: Response) -> serde_json::Value {
    res.json().await.expect("Failed to decode response body")
}

#[derive(Debug, Clone)]
pub struct TestUser {
    pub id: i64,
    pub email: String,
    pub password: String,
}

impl TestUser {
    pub async fn register(pool: &SqlitePool) -> Self {
        let email: String = SafeEmail().fake();
        let password = Uuid::new_v4().to_string();

        let new_user = NewUser {
            email: email.parse().expect("Failed to parse email address"),
            password_hash: hash_password(&Secret::new(password.clone()))
                .expect("Failed to hash user password"),
        };

        let id = UsersRepo::insert(pool, &new_user)
            .await
            .expect("Failed to insert test user");

        Self {
            id,
            email: new_user.email.as_ref().to_string(),
            password,
        }
    }
}
