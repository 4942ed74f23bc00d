use sqlx::SqlitePool;

use crate::helpers::TestApp;

#[sqlx::test]
async fn is_present(pool: SqlitePool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    let res = app.health_check().await.expect("Failed to execute request");

    assert!(res.status().is_success());

    Ok(())
}

#[sqlx::test]
async fn unknown_routes_use_the_error_shape(pool: SqlitePool) -> sqlx::Result<()> {
    let app = TestApp::spawn(&pool).await;

    let res = app.get("/api/nothing-here").await;

    assert_eq!(404, res.status().as_u16());
    let body: serde_json::Value = res.json().await.expect("Failed to decode body");
    assert_eq!("NOT_FOUND", body["code"]);

    Ok(())
}
