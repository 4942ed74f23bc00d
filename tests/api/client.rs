use std::sync::{Arc, Mutex};
use std::time::Duration;

use claims::{assert_matches, assert_ok};

use reqwest::Method;

use secrecy::Secret;

use sqlx::SqlitePool;

use tavola::client::{ApiClient, ApiRequest, ClientError, RefreshError, RetryPolicy};
use tavola::settings::{RateLimitSettings, SessionSettings};

use crate::helpers::{TestApp, TestUser};

fn fast_policy() -> RetryPolicy {
    RetryPolicy {
        timeout: Duration::from_secs(5),
        base_delay: Duration::from_millis(10),
        max_delay: Duration::from_millis(50),
        jitter: Duration::from_millis(5),
        rate_limit_jitter: Duration::from_millis(5),
        ..RetryPolicy::default()
    }
}

async fn short_lived_sessions(pool: &SqlitePool) -> TestApp {
    TestApp::spawn_with(
        pool,
        SessionSettings::new(1, 3600, false),
        RateLimitSettings::new(60, 1000),
    )
    .await
}

#[sqlx::test]
async fn expired_sessions_refresh_transparently(pool: SqlitePool) -> sqlx::Result<()> {
    let app = short_lived_sessions(&pool).await;
    let user = TestUser::register(&pool).await;

    let client = ApiClient::new(app.base_url(), fast_policy()).expect("Failed to build client");
    let identity = assert_ok!(client.login(&user.email, &Secret::new(user.password.clone())).await);
    assert_eq!(user.id, identity.id);

    tokio::time::sleep(Duration::from_millis(2100)).await;

    let posts: serde_json::Value = assert_ok!(client.get_json(ApiRequest::get("/api/blog/admin")).await);
    assert_eq!(Some(0), posts.as_array().map(Vec::len));

    let created: serde_json::Value = assert_ok!(
        client
            .send_json(
                Method::PUT,
                "/api/content/admin/home",
                &serde_json::json!({ "data": { "hero": "Welcome" } }),
            )
            .await
    );
    assert_eq!(1, created["version"]);

    Ok(())
}

#[sqlx::test]
async fn concurrent_calls_share_one_refresh(pool: SqlitePool) -> sqlx::Result<()> {
    let app = short_lived_sessions(&pool).await;
    let user = TestUser::register(&pool).await;

    let client = ApiClient::new(app.base_url(), fast_policy()).expect("Failed to build client");
    assert_ok!(client.login(&user.email, &Secret::new(user.password.clone())).await);

    tokio::time::sleep(Duration::from_millis(2100)).await;

    let (blog, leads, me) = tokio::join!(
        client.execute(ApiRequest::get("/api/blog/admin")),
        client.execute(ApiRequest::get("/api/leads/admin")),
        client.execute(ApiRequest::get("/api/auth/me")),
    );
    assert_ok!(blog);
    assert_ok!(leads);
    assert_ok!(me);

    Ok(())
}

#[sqlx::test]
async fn ended_sessions_send_admins_to_login(pool: SqlitePool) -> sqlx::Result<()> {
    let app = short_lived_sessions(&pool).await;
    let user = TestUser::register(&pool).await;

    let notices = Arc::new(Mutex::new(Vec::new()));
    let client = {
        let notices = notices.clone();
        ApiClient::builder(app.base_url())
            .policy(fast_policy())
            .on_session_expired(move |notice| {
                notices.lock().unwrap().push(notice.login_url.path().to_string())
            })
            .build()
            .expect("Failed to build client")
    };
    assert_ok!(client.login(&user.email, &Secret::new(user.password.clone())).await);

    // The refresh cookie is still valid but no longer names an account
    sqlx::query("delete from users where id = ?1")
        .bind(user.id)
        .execute(&pool)
        .await?;

    tokio::time::sleep(Duration::from_millis(2100)).await;

    let err = client
        .execute(ApiRequest::get("/api/blog/admin"))
        .await
        .expect_err("Request should fail once the session is gone");

    assert_matches!(err, ClientError::Refresh(RefreshError::Rejected { .. }));
    assert_eq!(None, client.identity());
    assert_eq!(vec!["/admin/login".to_string()], *notices.lock().unwrap());

    Ok(())
}
