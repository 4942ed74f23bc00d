use reqwest::{Method, StatusCode};

use sqlx::SqlitePool;

use crate::helpers::{json_body, TestApp};

fn pricing(price: u32) -> serde_json::Value {
    serde_json::json!({
        "plans": [
            { "name": "Starter", "price": price, "features": ["POS", "Reports"] },
            { "name": "Pro", "price": price * 2, "highlight": true, "badge": null }
        ]
    })
}

#[sqlx::test]
async fn writes_increment_the_version(pool: SqlitePool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    app.login_admin(&pool).await;

    let res = app
        .send_json(
            Method::PUT,
            "/api/content/admin/pricing",
            &serde_json::json!({ "data": pricing(49) }),
        )
        .await;
    assert_eq!(StatusCode::OK, res.status());
    assert_eq!(1, json_body(res).await["version"]);

    let res = app
        .send_json(
            Method::PUT,
            "/api/content/admin/pricing",
            &serde_json::json!({ "data": pricing(59), "expected_version": 1 }),
        )
        .await;
    assert_eq!(StatusCode::OK, res.status());
    assert_eq!(2, json_body(res).await["version"]);

    let body = json_body(app.get("/api/content/pricing").await).await;
    assert_eq!(2, body["version"]);
    assert_eq!(Some(59.0), body["data"]["plans"][0]["price"].as_f64());
    assert_eq!(Some(118.0), body["data"]["plans"][1]["price"].as_f64());
    assert!(body["data"]["plans"][1]["badge"].is_null());

    Ok(())
}

#[sqlx::test]
async fn stale_writes_conflict(pool: SqlitePool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    app.login_admin(&pool).await;

    let res = app
        .send_json(
            Method::PUT,
            "/api/content/admin/home",
            &serde_json::json!({ "data": { "hero": "Hello" }, "expected_version": 0 }),
        )
        .await;
    assert_eq!(StatusCode::OK, res.status());

    for expected_version in [0, 5] {
        let res = app
            .send_json(
                Method::PUT,
                "/api/content/admin/home",
                &serde_json::json!({ "data": { "hero": "Hi" }, "expected_version": expected_version }),
            )
            .await;
        assert_eq!(StatusCode::CONFLICT, res.status(), "expected {}", expected_version);
        assert_eq!("CONFLICT", json_body(res).await["code"]);
    }

    let body = json_body(app.get("/api/content/home").await).await;
    assert_eq!("Hello", body["data"]["hero"]);

    Ok(())
}

#[sqlx::test]
async fn deeply_nested_documents_are_rejected(pool: SqlitePool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    app.login_admin(&pool).await;

    let mut data = serde_json::json!("leaf");
    for _ in 0..40 {
        data = serde_json::json!([data]);
    }

    let res = app
        .send_json(
            Method::PUT,
            "/api/content/admin/nested",
            &serde_json::json!({ "data": data }),
        )
        .await;
    assert_eq!(StatusCode::BAD_REQUEST, res.status());

    Ok(())
}

#[sqlx::test]
async fn content_can_be_listed_and_deleted(pool: SqlitePool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    app.login_admin(&pool).await;

    for key in ["home", "pricing"] {
        app.send_json(
            Method::PUT,
            &format!("/api/content/admin/{}", key),
            &serde_json::json!({ "data": {} }),
        )
        .await;
    }

    let list = json_body(app.get("/api/content/admin").await).await;
    assert_eq!(2, list.as_array().map(Vec::len).unwrap_or_default());

    let res = app.delete("/api/content/admin/home").await;
    assert_eq!(StatusCode::NO_CONTENT, res.status());

    let res = app.get("/api/content/home").await;
    assert_eq!(StatusCode::NOT_FOUND, res.status());

    let res = app.delete("/api/content/admin/home").await;
    assert_eq!(StatusCode::NOT_FOUND, res.status());

    Ok(())
}
