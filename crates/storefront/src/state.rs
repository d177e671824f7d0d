//! Application state shared across handlers.

use std::sync::Arc;

use sqlx::PgPool;

use crate::cache::QueryCache;
use crate::config::StorefrontConfig;
use crate::db::catalog::{CatalogStore, PgCatalogStore};
use crate::services::CatalogRepository;

/// Application state shared across all handlers.
///
/// This struct is cheaply cloneable via `Arc` and provides access to
/// shared resources like database connections and configuration.
#[derive(Clone)]
pub struct AppState {
    inner: Arc<AppStateInner>,
}

struct AppStateInner {
    config: StorefrontConfig,
    pool: PgPool,
    catalog: CatalogRepository,
}

impl AppState {
    /// Create a new application state backed by the `PostgreSQL` catalog.
    #[must_use]
    pub fn new(config: StorefrontConfig, pool: PgPool) -> Self {
        let store = Arc::new(PgCatalogStore::new(pool.clone()));
        Self::with_store(config, pool, store)
    }

    /// Create application state over an arbitrary catalog store.
    ///
    /// The pool is still used by the readiness check.
    #[must_use]
    pub fn with_store(
        config: StorefrontConfig,
        pool: PgPool,
        store: Arc<dyn CatalogStore>,
    ) -> Self {
        let cache = QueryCache::new(config.cache_capacity);
        let catalog = CatalogRepository::new(store, cache);

        Self {
            inner: Arc::new(AppStateInner {
                config,
                pool,
                catalog,
            }),
        }
    }

    /// Get a reference to the storefront configuration.
    #[must_use]
    pub fn config(&self) -> &StorefrontConfig {
        &self.inner.config
    }

    /// Get a reference to the database connection pool.
    #[must_use]
    pub fn pool(&self) -> &PgPool {
        &self.inner.pool
    }

    /// Get a reference to the cached catalog repository.
    #[must_use]
    pub fn catalog(&self) -> &CatalogRepository {
        &self.inner.catalog
    }
}
