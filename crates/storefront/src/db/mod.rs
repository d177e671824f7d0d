//! Database access for the storefront `PostgreSQL` catalog.
//!
//! # Database: `vivias`
//!
//! The catalog lives in the `catalog` schema and is written by the admin
//! back-office. The storefront only reads it:
//!
//! ## Tables
//!
//! - `catalog.categories` - Category tree (flattened, one level is used here)
//! - `catalog.products` - Products with price, sale price, stock and sales count
//! - `catalog.reviews` - Product ratings used for average rating
//!
//! Queries are built at runtime with `sqlx::query_as`, so building the crate
//! does not require a live database.

pub mod catalog;

use std::time::Duration;

use secrecy::ExposeSecret;
use sqlx::PgPool;
use sqlx::postgres::PgPoolOptions;
use thiserror::Error;

/// Errors from repository queries.
#[derive(Debug, Error)]
pub enum RepositoryError {
    /// Query or connection failure.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),

    /// The requested row does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// A row violated an invariant the schema does not enforce.
    #[error("data corruption: {0}")]
    DataCorruption(String),
}

/// Create a `PostgreSQL` connection pool with sensible defaults.
///
/// # Errors
///
/// Returns `sqlx::Error` if the connection cannot be established.
pub async fn create_pool(database_url: &secrecy::SecretString) -> Result<PgPool, sqlx::Error> {
    PgPoolOptions::new()
        .max_connections(10)
        .min_connections(2)
        .acquire_timeout(Duration::from_secs(10))
        .connect(database_url.expose_secret())
        .await
}
