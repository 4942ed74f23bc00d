mod analytics;
mod auth;
mod blog;
mod client;
mod content;
mod health_check;
mod helpers;
mod leads;
mod listings;
