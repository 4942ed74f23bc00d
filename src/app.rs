use std::net::TcpListener;

use actix_web::dev::Server;
use actix_web::{get, HttpResponse, Responder};
use actix_web::{web, App, HttpServer};

use sqlx::SqlitePool;

use tracing_actix_web::TracingLogger;

use crate::controller::{
    analytics, auth, blog, careers, content, integrations, leads, policies, testimonials,
};
use crate::crypto::SigningKey;
use crate::error::RestError;
use crate::rate_limit::RateLimiter;
use crate::settings::SessionSettings;

/// Simple health-check endpoint
#[tracing::instrument(name = "Health check")]
#[get("/health_check")]
async fn health_check() -> impl Responder {
    HttpResponse::Ok().body("I am alive")
}

/// Report malformed request bodies, queries and paths with the JSON error shape
fn parse_error(e: impl std::fmt::Display) -> actix_web::Error {
    RestError::ParseError(e.to_string()).into()
}

/// Run the application on a specified TCP listener
pub fn run(
    listener: TcpListener,
    pool: SqlitePool,
    signing_key: SigningKey,
    session: SessionSettings,
    rate_limiter: RateLimiter,
) -> anyhow::Result<Server> {
    // Wrap application data
    let pool = web::Data::new(pool);
    let signing_key = web::Data::new(signing_key);
    let session = web::Data::new(session);
    let rate_limiter = web::Data::new(rate_limiter);

    // Start the server
    let server = HttpServer::new(move || {
        App::new()
            .wrap(TracingLogger::default())
            .app_data(web::JsonConfig::default().error_handler(|e, _| parse_error(e)))
            .app_data(web::QueryConfig::default().error_handler(|e, _| parse_error(e)))
            .app_data(web::PathConfig::default().error_handler(|e, _| parse_error(e)))
            .app_data(pool.clone())
            .app_data(signing_key.clone())
            .app_data(session.clone())
            .app_data(rate_limiter.clone())
            .service(health_check)
            .service(auth::scope())
            .service(blog::scope())
            .service(testimonials::scope())
            .service(careers::scope())
            .service(integrations::scope())
            .service(policies::scope())
            .service(leads::scope())
            .service(content::scope())
            .service(analytics::scope())
            .default_service(web::to(|| async {
                Err::<HttpResponse, _>(RestError::NotFound("Route"))
            }))
    })
    .listen(listener)?
    .run();

    Ok(server)
}
