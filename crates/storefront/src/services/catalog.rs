//! Cached catalog reads.
//!
//! Every read is keyed by its operation and parameters, served from the
//! [`QueryCache`] while fresh and computed from the [`CatalogStore`] otherwise.

use std::sync::Arc;

use serde::Serialize;
use thiserror::Error;
use tracing::instrument;

use vivias_core::{
    CatalogStatistics, CategoryListing, Product, ProductFilter, ProductId, ProductPage,
};

use crate::cache::{CacheError, CacheKey, CacheOperation, QueryCache};
use crate::db::RepositoryError;
use crate::db::catalog::CatalogStore;

/// Default number of products in trending, featured and related lists.
pub const DEFAULT_LIST_LIMIT: u32 = 8;

/// Upper bound on list limits accepted from callers.
pub const MAX_LIST_LIMIT: u32 = 50;

/// Errors from cached catalog reads.
#[derive(Debug, Error)]
pub enum CatalogError {
    #[error("not found: {0}")]
    NotFound(String),

    #[error("invalid query: {0}")]
    InvalidQuery(String),

    /// The store query failed, or its result could not go through the cache.
    #[error("catalog query failed: {0}")]
    Query(Arc<CacheError<RepositoryError>>),

    #[error("failed to build cache key: {0}")]
    Key(#[from] serde_json::Error),
}

impl From<Arc<CacheError<RepositoryError>>> for CatalogError {
    fn from(err: Arc<CacheError<RepositoryError>>) -> Self {
        match err.compute_error() {
            Some(RepositoryError::NotFound(what)) => Self::NotFound(what.clone()),
            _ => Self::Query(err),
        }
    }
}

#[derive(Serialize)]
struct ListParams {
    limit: u32,
}

#[derive(Serialize)]
struct CategoryParams<'a> {
    slug: &'a str,
    filter: ProductFilter,
}

#[derive(Serialize)]
struct SearchParams<'a> {
    query: &'a str,
    filter: ProductFilter,
}

#[derive(Serialize)]
struct ProductParams {
    id: ProductId,
}

#[derive(Serialize)]
struct RelatedParams {
    id: ProductId,
    limit: u32,
}

/// Read-through repository over the catalog store.
#[derive(Clone)]
pub struct CatalogRepository {
    store: Arc<dyn CatalogStore>,
    cache: QueryCache,
}

impl CatalogRepository {
    #[must_use]
    pub fn new(store: Arc<dyn CatalogStore>, cache: QueryCache) -> Self {
        Self { store, cache }
    }

    /// The underlying cache, for explicit invalidation.
    #[must_use]
    pub const fn cache(&self) -> &QueryCache {
        &self.cache
    }

    /// Best-selling in-stock products.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Query` if the store query fails.
    #[instrument(skip(self))]
    pub async fn trending(&self, limit: u32) -> Result<Vec<Product>, CatalogError> {
        let limit = clamp_limit(limit);
        let op = CacheOperation::Trending;
        let key = CacheKey::new(op, &ListParams { limit })?;
        let store = Arc::clone(&self.store);

        let products = self
            .cache
            .get_or_compute(&key, op.ttl(), || async move { store.trending(limit).await })
            .await?;
        Ok(products)
    }

    /// Featured products, newest first.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Query` if the store query fails.
    #[instrument(skip(self))]
    pub async fn featured(&self, limit: u32) -> Result<Vec<Product>, CatalogError> {
        let limit = clamp_limit(limit);
        let op = CacheOperation::Featured;
        let key = CacheKey::new(op, &ListParams { limit })?;
        let store = Arc::clone(&self.store);

        let products = self
            .cache
            .get_or_compute(&key, op.ttl(), || async move { store.featured(limit).await })
            .await?;
        Ok(products)
    }

    /// A category and one page of its products.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` for an unknown slug.
    #[instrument(skip(self, filter))]
    pub async fn by_category(
        &self,
        slug: &str,
        filter: &ProductFilter,
    ) -> Result<CategoryListing, CatalogError> {
        let slug = slug.trim();
        if slug.is_empty() {
            return Err(CatalogError::InvalidQuery("category slug is empty".to_string()));
        }

        let filter = filter.normalized();
        let op = CacheOperation::ByCategory;
        let key = CacheKey::new(
            op,
            &CategoryParams {
                slug,
                filter: filter.clone(),
            },
        )?;
        let store = Arc::clone(&self.store);

        let listing = self
            .cache
            .get_or_compute(&key, op.ttl(), || async move {
                let category = store
                    .category_by_slug(slug)
                    .await?
                    .ok_or_else(|| RepositoryError::NotFound(format!("category '{slug}'")))?;
                let products = store.products_in_category(category.id, &filter).await?;
                Ok::<_, RepositoryError>(CategoryListing { category, products })
            })
            .await?;
        Ok(listing)
    }

    /// Products matching a free-text query.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::InvalidQuery` for a blank query.
    #[instrument(skip(self, filter))]
    pub async fn search(
        &self,
        query: &str,
        filter: &ProductFilter,
    ) -> Result<ProductPage, CatalogError> {
        let query = query.trim();
        if query.is_empty() {
            return Err(CatalogError::InvalidQuery("search query is empty".to_string()));
        }

        let filter = filter.normalized();
        let op = CacheOperation::Search;
        let key = CacheKey::new(
            op,
            &SearchParams {
                query,
                filter: filter.clone(),
            },
        )?;
        let store = Arc::clone(&self.store);

        let page = self
            .cache
            .get_or_compute(&key, op.ttl(), || async move {
                store.search(query, &filter).await
            })
            .await?;
        Ok(page)
    }

    /// Store-wide aggregates.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Query` if the store query fails.
    #[instrument(skip(self))]
    pub async fn statistics(&self) -> Result<CatalogStatistics, CatalogError> {
        let op = CacheOperation::Statistics;
        let key = CacheKey::new(op, &())?;
        let store = Arc::clone(&self.store);

        let statistics = self
            .cache
            .get_or_compute(&key, op.ttl(), || async move { store.statistics().await })
            .await?;
        Ok(statistics)
    }

    /// A single product.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::NotFound` if the product does not exist or is
    /// inactive.
    #[instrument(skip(self))]
    pub async fn product(&self, id: ProductId) -> Result<Product, CatalogError> {
        if !id.is_valid() {
            return Err(CatalogError::NotFound(format!("product {id}")));
        }

        let op = CacheOperation::ProductDetail;
        let key = CacheKey::new(op, &ProductParams { id })?;
        let store = Arc::clone(&self.store);

        let product = self
            .cache
            .get_or_compute(&key, op.ttl(), || async move {
                store
                    .product(id)
                    .await?
                    .ok_or_else(|| RepositoryError::NotFound(format!("product {id}")))
            })
            .await?;
        Ok(product)
    }

    /// Products related to `id`.
    ///
    /// # Errors
    ///
    /// Returns `CatalogError::Query` if the store query fails.
    #[instrument(skip(self))]
    pub async fn related(&self, id: ProductId, limit: u32) -> Result<Vec<Product>, CatalogError> {
        let limit = clamp_limit(limit);
        let op = CacheOperation::Related;
        let key = CacheKey::new(op, &RelatedParams { id, limit })?;
        let store = Arc::clone(&self.store);

        let products = self
            .cache
            .get_or_compute(&key, op.ttl(), || async move {
                store.related(id, limit).await
            })
            .await?;
        Ok(products)
    }
}

impl std::fmt::Debug for CatalogRepository {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CatalogRepository")
            .field("cache", &self.cache)
            .finish_non_exhaustive()
    }
}

fn clamp_limit(limit: u32) -> u32 {
    limit.clamp(1, MAX_LIST_LIMIT)
}
