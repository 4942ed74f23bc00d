use reqwest::{Method, StatusCode};

use sqlx::SqlitePool;

use crate::helpers::{json_body, TestApp};

async fn create(app: &TestApp, entity: &str, body: serde_json::Value) -> serde_json::Value {
    let res = app
        .send_json(Method::POST, &format!("/api/{}/admin", entity), &body)
        .await;
    assert_eq!(StatusCode::CREATED, res.status(), "creating {}", entity);
    json_body(res).await
}

#[sqlx::test]
async fn careers_filter_by_department(pool: SqlitePool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    app.login_admin(&pool).await;

    for (slug, department) in [("line-cook", "Kitchen"), ("host", "Front of house")] {
        create(
            &app,
            "careers",
            serde_json::json!({
                "slug": slug,
                "title_en": slug,
                "content_en": "Join us.",
                "department": department,
                "location": "Lisbon",
                "employment_type": "full-time",
                "status": "published",
            }),
        )
        .await;
    }

    let page = json_body(app.get("/api/careers?department=Kitchen").await).await;
    assert_eq!(1, page["total"]);
    assert_eq!("line-cook", page["items"][0]["slug"]);

    let page = json_body(app.get("/api/careers").await).await;
    assert_eq!(2, page["total"]);

    let res = app.get("/api/careers/host?lang=pt").await;
    assert_eq!(StatusCode::OK, res.status());
    assert_eq!("Lisbon", json_body(res).await["location"]);

    Ok(())
}

#[sqlx::test]
async fn integrations_filter_by_category_in_display_order(pool: SqlitePool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    app.login_admin(&pool).await;

    for (slug, category, order) in [("stripe", "payments", 2), ("adyen", "payments", 1), ("xero", "accounting", 0)] {
        create(
            &app,
            "integrations",
            serde_json::json!({
                "slug": slug,
                "title_en": slug,
                "content_en": "Connects in minutes.",
                "category": category,
                "website_url": format!("https://{}.example.com", slug),
                "display_order": order,
                "status": "published",
            }),
        )
        .await;
    }

    let page = json_body(app.get("/api/integrations?category=payments").await).await;
    let slugs: Vec<_> = page["items"]
        .as_array()
        .expect("Missing items")
        .iter()
        .map(|item| item["slug"].as_str().unwrap_or_default().to_string())
        .collect();
    assert_eq!(vec!["adyen", "stripe"], slugs);

    let res = app
        .send_json(
            Method::POST,
            "/api/integrations/admin",
            &serde_json::json!({
                "slug": "sketchy",
                "title_en": "Sketchy",
                "content_en": "Body",
                "category": "payments",
                "logo_url": "ftp://files.example.com/logo.png",
            }),
        )
        .await;
    assert_eq!(StatusCode::BAD_REQUEST, res.status());

    Ok(())
}

#[sqlx::test]
async fn policies_are_served_by_slug(pool: SqlitePool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    app.login_admin(&pool).await;

    let created = create(
        &app,
        "policies",
        serde_json::json!({
            "slug": "privacy",
            "title_en": "Privacy policy",
            "content_en": "We collect as little as possible.",
            "title_ar": "سياسة الخصوصية",
            "status": "published",
        }),
    )
    .await;

    let body = json_body(app.get("/api/policies/privacy?lang=ar").await).await;
    assert_eq!("سياسة الخصوصية", body["title"]);
    // Arabic content is missing and falls back to English
    assert_eq!("We collect as little as possible.", body["content"]);

    let id = created["id"].as_i64().expect("Missing id");
    let res = app.delete(&format!("/api/policies/admin/{}", id)).await;
    assert_eq!(StatusCode::NO_CONTENT, res.status());

    let res = app.get("/api/policies/privacy").await;
    assert_eq!(StatusCode::NOT_FOUND, res.status());

    Ok(())
}

#[sqlx::test]
async fn testimonials_list_published_in_display_order(pool: SqlitePool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    app.login_admin(&pool).await;

    for (author, order, status) in [("Marta", 2, "published"), ("Omar", 1, "published"), ("Lena", 0, "draft")] {
        create(
            &app,
            "testimonials",
            serde_json::json!({
                "title_en": "Great",
                "content_en": "Our tables turn faster.",
                "author_name": author,
                "rating": 5,
                "display_order": order,
                "status": status,
            }),
        )
        .await;
    }

    let page = json_body(app.get("/api/testimonials").await).await;
    assert_eq!(2, page["total"]);
    assert_eq!("Omar", page["items"][0]["author_name"]);
    assert_eq!("Marta", page["items"][1]["author_name"]);

    let res = app
        .send_json(
            Method::POST,
            "/api/testimonials/admin",
            &serde_json::json!({
                "title_en": "Great",
                "content_en": "Body",
                "author_name": "Zed",
                "rating": 9,
            }),
        )
        .await;
    assert_eq!(StatusCode::BAD_REQUEST, res.status());

    Ok(())
}

#[sqlx::test]
async fn updating_missing_rows_is_not_found(pool: SqlitePool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;
    app.login_admin(&pool).await;

    let res = app
        .send_json(
            Method::PUT,
            "/api/policies/admin/999",
            &serde_json::json!({
                "slug": "terms",
                "title_en": "Terms",
                "content_en": "Be nice.",
            }),
        )
        .await;
    assert_eq!(StatusCode::NOT_FOUND, res.status());

    let res = app.delete("/api/careers/admin/999").await;
    assert_eq!(StatusCode::NOT_FOUND, res.status());

    Ok(())
}
