//! HTTP route handlers for storefront.
//!
//! # Route Structure
//!
//! ```text
//! GET  /health                          - Liveness check
//! GET  /health/ready                    - Readiness check (database ping)
//!
//! # Catalog (cached, JSON envelope)
//! GET  /api/products/trending?limit=    - Best sellers
//! GET  /api/products/featured?limit=    - Featured products
//! GET  /api/products/search?q=&...      - Search with listing filter
//! GET  /api/products/{id}               - Product detail
//! GET  /api/products/{id}/related       - Products from the same category
//! GET  /api/categories/{slug}/products  - Category listing with filter
//! GET  /api/statistics                  - Store-wide aggregates
//! ```

pub mod catalog;
pub mod health;

use axum::{Router, routing::get};

use crate::state::AppState;

/// Create the catalog API router.
pub fn api_routes() -> Router<AppState> {
    Router::new()
        .route("/api/products/trending", get(catalog::trending))
        .route("/api/products/featured", get(catalog::featured))
        .route("/api/products/search", get(catalog::search))
        .route("/api/products/{id}", get(catalog::product))
        .route("/api/products/{id}/related", get(catalog::related))
        .route(
            "/api/categories/{slug}/products",
            get(catalog::category_products),
        )
        .route("/api/statistics", get(catalog::statistics))
}

/// Create the full application router (health and catalog API).
pub fn routes() -> Router<AppState> {
    Router::new()
        .route("/health", get(health::health))
        .route("/health/ready", get(health::readiness))
        .merge(api_routes())
}
