use reqwest::{Method, StatusCode};

use sqlx::SqlitePool;

use crate::helpers::{json_body, TestApp};

fn post(slug: &str, status: &str) -> serde_json::Value {
    serde_json::json!({
        "slug": slug,
        "title_en": "Cutting food cost",
        "content_en": "Track waste daily.",
        "title_es": "Reducir el costo de alimentos",
        "content_es": "Registra el desperdicio a diario.",
        "author": "Ana Souza",
        "category": "operations",
        "status": status,
    })
}

#[sqlx::test]
async fn admin_routes_require_a_session(pool: SqlitePool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    let res = app.get("/api/blog/admin").await;
    assert_eq!(StatusCode::UNAUTHORIZED, res.status());
    assert_eq!("UNAUTHORIZED", json_body(res).await["code"]);

    let res = app
        .send_json(Method::POST, "/api/blog/admin", &post("food-cost", "published"))
        .await;
    assert_eq!(StatusCode::UNAUTHORIZED, res.status());

    Ok(())
}

#[sqlx::test]
async fn admins_manage_posts(pool: SqlitePool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    app.login_admin(&pool).await;

    let res = app
        .send_json(Method::POST, "/api/blog/admin", &post("food-cost", "draft"))
        .await;
    assert_eq!(StatusCode::CREATED, res.status());
    let created = json_body(res).await;
    let id = created["id"].as_i64().expect("Missing id");
    assert_eq!("draft", created["status"]);

    let res = app
        .send_json(
            Method::PUT,
            &format!("/api/blog/admin/{}", id),
            &post("food-cost", "published"),
        )
        .await;
    assert_eq!(StatusCode::OK, res.status());
    let updated = json_body(res).await;
    assert_eq!("published", updated["status"]);
    assert!(!updated["published_at"].is_null());

    let res = app.delete(&format!("/api/blog/admin/{}", id)).await;
    assert_eq!(StatusCode::NO_CONTENT, res.status());

    let res = app.get(&format!("/api/blog/admin/{}", id)).await;
    assert_eq!(StatusCode::NOT_FOUND, res.status());

    Ok(())
}

#[sqlx::test]
async fn duplicate_slugs_conflict(pool: SqlitePool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    app.login_admin(&pool).await;

    let res = app
        .send_json(Method::POST, "/api/blog/admin", &post("food-cost", "draft"))
        .await;
    assert_eq!(StatusCode::CREATED, res.status());

    let res = app
        .send_json(Method::POST, "/api/blog/admin", &post("food-cost", "draft"))
        .await;
    assert_eq!(StatusCode::CONFLICT, res.status());
    assert_eq!("CONFLICT", json_body(res).await["code"]);

    Ok(())
}

#[sqlx::test]
async fn invalid_posts_are_rejected(pool: SqlitePool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    app.login_admin(&pool).await;

    let test_cases = vec![
        ("bad slug", post("no spaces allowed", "draft")),
        ("missing author", {
            let mut body = post("food-cost", "draft");
            body["author"] = serde_json::json!("  ");
            body
        }),
        ("unknown status", post("food-cost", "archived")),
        ("not an object", serde_json::json!([1, 2])),
    ];

    for (case, body) in test_cases {
        let res = app.send_json(Method::POST, "/api/blog/admin", &body).await;
        assert_eq!(StatusCode::BAD_REQUEST, res.status(), "case: {}", case);
        assert_eq!("BAD_REQUEST", json_body(res).await["code"], "case: {}", case);
    }

    Ok(())
}

#[sqlx::test]
async fn public_listing_hides_drafts_and_localizes(pool: SqlitePool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    app.login_admin(&pool).await;

    for (slug, status) in [("food-cost", "published"), ("upcoming", "draft")] {
        let res = app
            .send_json(Method::POST, "/api/blog/admin", &post(slug, status))
            .await;
        assert_eq!(StatusCode::CREATED, res.status());
    }

    let page = json_body(app.get("/api/blog?lang=es").await).await;
    assert_eq!(1, page["total"]);
    let items = page["items"].as_array().expect("Missing items");
    assert_eq!(1, items.len());
    assert_eq!("food-cost", items[0]["slug"]);
    assert_eq!("Reducir el costo de alimentos", items[0]["title"]);
    assert_eq!("es", items[0]["lang"]);

    let res = app.get("/api/blog/upcoming").await;
    assert_eq!(StatusCode::NOT_FOUND, res.status());

    Ok(())
}

#[sqlx::test]
async fn missing_translations_fall_back_to_english(pool: SqlitePool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    app.login_admin(&pool).await;

    app.send_json(Method::POST, "/api/blog/admin", &post("food-cost", "published"))
        .await;

    for lang in ["ar", "pt", "xx", "%3Cscript%3E"] {
        let body = json_body(app.get(&format!("/api/blog/food-cost?lang={}", lang)).await).await;
        assert_eq!("Cutting food cost", body["title"], "lang: {}", lang);
        assert_eq!("Track waste daily.", body["content"], "lang: {}", lang);
    }

    let body = json_body(app.get("/api/blog/food-cost?lang=es").await).await;
    assert_eq!("Registra el desperdicio a diario.", body["content"]);

    Ok(())
}

#[sqlx::test]
async fn listing_paginates(pool: SqlitePool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    app.login_admin(&pool).await;

    for i in 0..5 {
        let res = app
            .send_json(
                Method::POST,
                "/api/blog/admin",
                &post(&format!("post-{}", i), "published"),
            )
            .await;
        assert_eq!(StatusCode::CREATED, res.status());
    }

    let page = json_body(app.get("/api/blog?page=2&limit=2").await).await;
    assert_eq!(5, page["total"]);
    assert_eq!(2, page["page"]);
    assert_eq!(2, page["items"].as_array().map(Vec::len).unwrap_or_default());

    let page = json_body(app.get("/api/blog?category=recipes").await).await;
    assert_eq!(0, page["total"]);

    Ok(())
}
