use fake::faker::internet::en::SafeEmail;
use fake::faker::name::en::Name;
use fake::Fake;

use reqwest::{Method, StatusCode};

use sqlx::SqlitePool;

use tavola::settings::{RateLimitSettings, SessionSettings};

use crate::helpers::{json_body, TestApp};

fn lead() -> serde_json::Value {
    let name: String = Name().fake();
    let email: String = SafeEmail().fake();
    serde_json::json!({
        "name": name,
        "email": email,
        "company": "Casa Verde",
        "message": "Interested in a demo for two locations.",
        "source": "demo-form",
        "lang": "es",
    })
}

#[sqlx::test]
async fn leads_are_captured_and_listed(pool: SqlitePool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    let body = lead();

    let res = app.send_json(Method::POST, "/api/leads", &body).await;
    assert_eq!(StatusCode::CREATED, res.status());
    let id = json_body(res).await["id"].as_i64().expect("Missing id");

    app.login_admin(&pool).await;
    let leads = json_body(app.get("/api/leads/admin").await).await;
    let stored = &leads[0];
    assert_eq!(id, stored["id"]);
    assert_eq!("demo-form", stored["source"]);
    assert_eq!("es", stored["lang"]);
    assert_eq!(
        body["email"].as_str().map(str::to_lowercase),
        stored["email"].as_str().map(str::to_string)
    );

    let res = app.delete(&format!("/api/leads/admin/{}", id)).await;
    assert_eq!(StatusCode::NO_CONTENT, res.status());

    Ok(())
}

#[sqlx::test]
async fn invalid_leads_are_rejected(pool: SqlitePool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    let test_cases = vec![
        ("missing email", serde_json::json!({ "name": "Ana" })),
        ("bad email", serde_json::json!({ "name": "Ana", "email": "ana-at-example" })),
        ("blank name", serde_json::json!({ "name": " ", "email": "ana@example.com" })),
        ("markup in name", serde_json::json!({ "name": "<b>Ana</b>", "email": "ana@example.com" })),
    ];

    for (case, body) in test_cases {
        let res = app.send_json(Method::POST, "/api/leads", &body).await;
        assert_eq!(StatusCode::BAD_REQUEST, res.status(), "case: {}", case);
    }

    Ok(())
}

#[sqlx::test]
async fn lead_submissions_are_rate_limited(pool: SqlitePool) -> sqlx::Result<()> {
    let app = TestApp::spawn_with(
        &pool,
        SessionSettings::new(900, 3600, false),
        RateLimitSettings::new(60, 2),
    )
    .await;

    for _ in 0..2 {
        let res = app.send_json(Method::POST, "/api/leads", &lead()).await;
        assert_eq!(StatusCode::CREATED, res.status());
    }

    let res = app.send_json(Method::POST, "/api/leads", &lead()).await;
    assert_eq!(StatusCode::TOO_MANY_REQUESTS, res.status());
    assert!(res.headers().contains_key("retry-after"));

    Ok(())
}

#[sqlx::test]
async fn leads_are_private(pool: SqlitePool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    let res = app.get("/api/leads/admin").await;
    assert_eq!(StatusCode::UNAUTHORIZED, res.status());

    Ok(())
}
