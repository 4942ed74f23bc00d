/// Basic application code
pub mod app;
/// Application authorization
pub mod auth;
/// Resilient REST client for the content API
pub mod client;
/// Controllers for REST endpoints
pub mod controller;
/// Cryptography-related objects
pub mod crypto;
/// Domain objects
pub mod domain;
/// Error enums
pub mod error;
/// Per-client request throttling
pub mod rate_limit;
/// Repositories
pub mod repo;
/// Application settings
pub mod settings;
/// Application telemetry for tracing and logging
pub mod telemetry;
