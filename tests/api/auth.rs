use std::time::Duration;

use reqwest::header::{RETRY_AFTER, SET_COOKIE};
use reqwest::{Method, StatusCode};

use sqlx::SqlitePool;

use tavola::settings::{RateLimitSettings, SessionSettings};

use crate::helpers::{json_body, TestApp, TestUser};

#[sqlx::test]
async fn login_sets_http_only_session_cookies(pool: SqlitePool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let user = TestUser::register(&pool).await;

    let res = app.login(&user.email, &user.password).await;
    assert_eq!(StatusCode::OK, res.status());

    let cookies: Vec<String> = res
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .filter_map(|value| value.to_str().ok().map(str::to_string))
        .collect();
    assert!(cookies.iter().any(|c| c.starts_with("access_token=") && c.contains("HttpOnly")));
    assert!(cookies.iter().any(|c| c.starts_with("refresh_token=") && c.contains("Path=/api/auth")));

    let body = json_body(res).await;
    assert_eq!(user.id, body["id"]);
    assert_eq!(user.email, body["email"]);

    let me = json_body(app.get("/api/auth/me").await).await;
    assert_eq!(user.id, me["id"]);

    Ok(())
}

#[sqlx::test]
async fn bad_credentials_are_rejected(pool: SqlitePool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let user = TestUser::register(&pool).await;

    let test_cases = vec![
        ("wrong password", user.email.clone(), "not-the-password".to_string()),
        ("unknown user", "nobody@example.com".to_string(), user.password.clone()),
    ];

    for (case, email, password) in test_cases {
        let res = app.login(&email, &password).await;
        assert_eq!(StatusCode::UNAUTHORIZED, res.status(), "case: {}", case);
        assert_eq!("UNAUTHORIZED", json_body(res).await["code"], "case: {}", case);
    }

    let res = app.get("/api/auth/me").await;
    assert_eq!(StatusCode::UNAUTHORIZED, res.status());

    Ok(())
}

#[sqlx::test]
async fn repeated_logins_are_rate_limited(pool: SqlitePool) -> sqlx::Result<()> {
    let app = TestApp::spawn_with(
        &pool,
        SessionSettings::new(900, 3600, false),
        RateLimitSettings::new(60, 3),
    )
    .await;

    for _ in 0..3 {
        let res = app.login("someone@example.com", "guess").await;
        assert_eq!(StatusCode::UNAUTHORIZED, res.status());
    }

    let res = app.login("someone@example.com", "guess").await;
    assert_eq!(StatusCode::TOO_MANY_REQUESTS, res.status());

    let retry_after: u64 = res
        .headers()
        .get(RETRY_AFTER)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.parse().ok())
        .expect("Missing Retry-After header");
    assert!((1..=60).contains(&retry_after));
    assert_eq!("RATE_LIMITED", json_body(res).await["code"]);

    Ok(())
}

#[sqlx::test]
async fn expired_access_tokens_are_refreshable(pool: SqlitePool) -> sqlx::Result<()> {
    let app = TestApp::spawn_with(
        &pool,
        SessionSettings::new(1, 3600, false),
        RateLimitSettings::new(60, 1000),
    )
    .await;
    let user = app.login_admin(&pool).await;

    tokio::time::sleep(Duration::from_millis(2100)).await;

    let res = app.get("/api/blog/admin").await;
    assert_eq!(StatusCode::UNAUTHORIZED, res.status());
    assert_eq!("TOKEN_EXPIRED", json_body(res).await["code"]);

    let res = app.request(Method::POST, "/api/auth/refresh").send().await.unwrap();
    assert_eq!(StatusCode::OK, res.status());
    assert_eq!(user.id, json_body(res).await["id"]);

    let res = app.get("/api/blog/admin").await;
    assert_eq!(StatusCode::OK, res.status());

    Ok(())
}

#[sqlx::test]
async fn refresh_without_a_session_is_unauthorized(pool: SqlitePool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    let res = app.request(Method::POST, "/api/auth/refresh").send().await.unwrap();
    assert_eq!(StatusCode::UNAUTHORIZED, res.status());
    assert_eq!("UNAUTHORIZED", json_body(res).await["code"]);

    Ok(())
}

#[sqlx::test]
async fn logout_ends_the_session(pool: SqlitePool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    app.login_admin(&pool).await;

    let res = app.request(Method::POST, "/api/auth/logout").send().await.unwrap();
    assert_eq!(StatusCode::NO_CONTENT, res.status());

    let res = app.get("/api/auth/me").await;
    assert_eq!(StatusCode::UNAUTHORIZED, res.status());

    let res = app.request(Method::POST, "/api/auth/refresh").send().await.unwrap();
    assert_eq!(StatusCode::UNAUTHORIZED, res.status());

    Ok(())
}
