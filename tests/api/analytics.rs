use reqwest::{Method, StatusCode};

use sqlx::SqlitePool;

use crate::helpers::{json_body, TestApp};

async fn pageview(app: &TestApp, body: serde_json::Value) -> String {
    let res = app
        .send_json(Method::POST, "/api/analytics/pageview", &body)
        .await;
    assert_eq!(StatusCode::CREATED, res.status());
    json_body(res).await["session_id"]
        .as_str()
        .expect("Missing session id")
        .to_string()
}

#[sqlx::test]
async fn dashboard_reflects_ingested_traffic(pool: SqlitePool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    let first = pageview(&app, serde_json::json!({ "path": "/", "lang": "pt" })).await;
    pageview(
        &app,
        serde_json::json!({ "session_id": first, "path": "/pricing", "referrer": "https://search.example.com" }),
    )
    .await;
    let second = pageview(&app, serde_json::json!({ "path": "/pricing" })).await;
    assert_ne!(first, second);

    let res = app
        .send_json(
            Method::POST,
            "/api/analytics/event",
            &serde_json::json!({
                "session_id": second,
                "name": "demo_requested",
                "path": "/pricing",
                "properties": { "plan": "pro" },
            }),
        )
        .await;
    assert_eq!(StatusCode::CREATED, res.status());

    app.login_admin(&pool).await;
    let stats = json_body(app.get("/api/analytics/admin/dashboard?days=7").await).await;

    assert_eq!(3, stats["total_pageviews"]);
    assert_eq!(2, stats["unique_sessions"]);
    assert_eq!(1, stats["total_events"]);
    assert_eq!(3, stats["pageviews_today"]);
    assert_eq!(1.5, stats["avg_pages_per_session"]);
    assert_eq!("/pricing", stats["top_pages"][0]["name"]);
    assert_eq!(2, stats["top_pages"][0]["count"]);
    assert_eq!("demo_requested", stats["top_events"][0]["name"]);
    assert_eq!(1, stats["pageviews_by_day"].as_array().map(Vec::len).unwrap_or_default());

    let realtime = json_body(app.get("/api/analytics/admin/realtime").await).await;
    assert_eq!(2, realtime["active_sessions"]);
    assert_eq!(3, realtime["pageviews"]);
    assert_eq!("demo_requested", realtime["recent_events"][0]["name"]);

    Ok(())
}

#[sqlx::test]
async fn malformed_ingestion_is_rejected(pool: SqlitePool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    let test_cases = vec![
        ("/api/analytics/pageview", serde_json::json!({ "path": "pricing" })),
        ("/api/analytics/pageview", serde_json::json!({ "path": "/", "session_id": "bad id!" })),
        ("/api/analytics/event", serde_json::json!({ "name": "" })),
        ("/api/analytics/event", serde_json::json!({ "name": "x".repeat(101) })),
    ];

    for (path, body) in test_cases {
        let res = app.send_json(Method::POST, path, &body).await;
        assert_eq!(StatusCode::BAD_REQUEST, res.status(), "body: {}", body);
    }

    Ok(())
}

#[sqlx::test]
async fn reports_are_private(pool: SqlitePool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    for path in ["/api/analytics/admin/dashboard", "/api/analytics/admin/realtime"] {
        let res = app.get(path).await;
        assert_eq!(StatusCode::UNAUTHORIZED, res.status(), "path: {}", path);
    }

    Ok(())
}
