//! HTTP route modules
//!
//! This module contains all HTTP route handlers organized by functionality.

pub mod documents;
pub mod health;
pub mod requests;

use actix_web::web;

/// Register every route of the gateway
pub fn configure_routes(cfg: &mut web::ServiceConfig) {
    health::configure_routes(cfg);
    documents::configure_routes(cfg);
    requests::configure_routes(cfg);
}
