//! Catalog API handlers.
//!
//! Every handler answers with the `{success, data, message}` envelope.

use axum::{
    Json,
    extract::{Path, Query, State, rejection::QueryRejection},
};
use rust_decimal::Decimal;
use serde::Deserialize;
use tracing::instrument;
use vivias_core::{
    ApiResponse, CatalogStatistics, CategoryListing, Product, ProductFilter, ProductId,
    ProductPage, ProductSort,
};

use crate::error::{AppError, Result};
use crate::services::catalog::DEFAULT_LIST_LIMIT;
use crate::state::AppState;

/// `?limit=` for list endpoints.
#[derive(Debug, Default, Deserialize)]
pub struct LimitQuery {
    pub limit: Option<u32>,
}

impl LimitQuery {
    fn limit(&self) -> u32 {
        self.limit.unwrap_or(DEFAULT_LIST_LIMIT)
    }
}

/// Query extraction that lets the handler answer rejections with the envelope.
type QueryResult<T> = std::result::Result<Query<T>, QueryRejection>;

/// Search query string: `q` plus the listing filter.
#[derive(Debug, Default, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub q: String,
    pub page: Option<u32>,
    pub per_page: Option<u32>,
    pub min_price: Option<Decimal>,
    pub max_price: Option<Decimal>,
    pub sort: Option<ProductSort>,
    pub in_stock: Option<bool>,
}

impl SearchQuery {
    fn filter(&self) -> ProductFilter {
        ProductFilter {
            page: self.page,
            per_page: self.per_page,
            min_price: self.min_price,
            max_price: self.max_price,
            sort: self.sort,
            in_stock: self.in_stock,
        }
    }
}

/// Parse a product ID path segment.
fn parse_product_id(raw: &str) -> Result<ProductId> {
    raw.parse::<ProductId>()
        .ok()
        .filter(ProductId::is_valid)
        .ok_or_else(|| AppError::BadRequest(format!("invalid product id '{raw}'")))
}

/// `GET /api/products/trending`
#[instrument(skip(state))]
pub async fn trending(
    State(state): State<AppState>,
    query: QueryResult<LimitQuery>,
) -> Result<Json<ApiResponse<Vec<Product>>>> {
    let Query(query) = query?;
    let products = state.catalog().trending(query.limit()).await?;
    Ok(Json(ApiResponse::ok(products)))
}

/// `GET /api/products/featured`
#[instrument(skip(state))]
pub async fn featured(
    State(state): State<AppState>,
    query: QueryResult<LimitQuery>,
) -> Result<Json<ApiResponse<Vec<Product>>>> {
    let Query(query) = query?;
    let products = state.catalog().featured(query.limit()).await?;
    Ok(Json(ApiResponse::ok(products)))
}

/// `GET /api/products/search`
#[instrument(skip(state))]
pub async fn search(
    State(state): State<AppState>,
    query: QueryResult<SearchQuery>,
) -> Result<Json<ApiResponse<ProductPage>>> {
    let Query(query) = query?;
    let page = state.catalog().search(&query.q, &query.filter()).await?;
    Ok(Json(ApiResponse::ok(page)))
}

/// `GET /api/products/{id}`
#[instrument(skip(state))]
pub async fn product(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<ApiResponse<Product>>> {
    let id = parse_product_id(&id)?;
    let product = state.catalog().product(id).await?;
    Ok(Json(ApiResponse::ok(product)))
}

/// `GET /api/products/{id}/related`
#[instrument(skip(state))]
pub async fn related(
    State(state): State<AppState>,
    Path(id): Path<String>,
    query: QueryResult<LimitQuery>,
) -> Result<Json<ApiResponse<Vec<Product>>>> {
    let id = parse_product_id(&id)?;
    let Query(query) = query?;
    let products = state.catalog().related(id, query.limit()).await?;
    Ok(Json(ApiResponse::ok(products)))
}

/// `GET /api/categories/{slug}/products`
#[instrument(skip(state))]
pub async fn category_products(
    State(state): State<AppState>,
    Path(slug): Path<String>,
    filter: QueryResult<ProductFilter>,
) -> Result<Json<ApiResponse<CategoryListing>>> {
    let Query(filter) = filter?;
    let listing = state.catalog().by_category(&slug, &filter).await?;
    Ok(Json(ApiResponse::ok(listing)))
}

/// `GET /api/statistics`
#[instrument(skip(state))]
pub async fn statistics(
    State(state): State<AppState>,
) -> Result<Json<ApiResponse<CatalogStatistics>>> {
    let statistics = state.catalog().statistics().await?;
    Ok(Json(ApiResponse::ok(statistics)))
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::sync::Arc;

    use axum::body::Body;
    use axum::http::{Request, StatusCode};
    use chrono::Utc;
    use mockall::predicate::eq;
    use secrecy::SecretString;
    use sqlx::postgres::PgPoolOptions;
    use tower::ServiceExt;
    use vivias_core::{CategoryId, Money};

    use super::*;
    use crate::config::{LogFormat, StorefrontConfig};
    use crate::db::catalog::MockCatalogStore;

    fn test_state(store: MockCatalogStore) -> AppState {
        let config = StorefrontConfig {
            database_url: SecretString::from("postgres://localhost/vivias_test"),
            host: "127.0.0.1".parse().unwrap(),
            port: 0,
            cache_capacity: 100,
            log_format: LogFormat::Pretty,
            sentry_dsn: None,
            sentry_environment: None,
            sentry_sample_rate: 1.0,
            sentry_traces_sample_rate: 0.0,
        };
        let pool = PgPoolOptions::new()
            .connect_lazy("postgres://localhost/vivias_test")
            .unwrap();
        AppState::with_store(config, pool, Arc::new(store))
    }

    fn product(id: i32) -> Product {
        Product {
            id: ProductId::new(id),
            category_id: Some(CategoryId::new(1)),
            name: format!("Blouse {id}"),
            slug: format!("blouse-{id}"),
            description: Some("Katun".to_string()),
            price: Money::from_whole(125_000),
            sale_price: Some(Money::from_whole(99_000)),
            stock: 3,
            image_url: None,
            average_rating: None,
            sold_count: 40,
            is_featured: true,
            created_at: Utc::now(),
        }
    }

    async fn get(state: AppState, uri: &str) -> (StatusCode, serde_json::Value) {
        let response = crate::routes::api_routes()
            .with_state(state)
            .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
            .await
            .unwrap();
        let status = response.status();
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        (status, serde_json::from_slice(&bytes).unwrap())
    }

    #[tokio::test]
    async fn test_trending_uses_default_limit() {
        let mut store = MockCatalogStore::new();
        store
            .expect_trending()
            .with(eq(DEFAULT_LIST_LIMIT))
            .returning(|_| Ok(vec![product(1), product(2)]));

        let (status, body) = get(test_state(store), "/api/products/trending").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["success"], true);
        assert_eq!(body["data"].as_array().unwrap().len(), 2);
        assert_eq!(body["data"][0]["price"], "125000");
    }

    #[tokio::test]
    async fn test_product_detail() {
        let mut store = MockCatalogStore::new();
        store
            .expect_product()
            .with(eq(ProductId::new(42)))
            .returning(|id| Ok(Some(product(id.as_i32()))));

        let (status, body) = get(test_state(store), "/api/products/42").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["slug"], "blouse-42");
    }

    #[tokio::test]
    async fn test_product_not_found() {
        let mut store = MockCatalogStore::new();
        store.expect_product().returning(|_| Ok(None));

        let (status, body) = get(test_state(store), "/api/products/7").await;

        assert_eq!(status, StatusCode::NOT_FOUND);
        assert_eq!(body["success"], false);
        assert_eq!(body["message"], "Not found: product 7");
    }

    #[tokio::test]
    async fn test_invalid_product_id_is_bad_request() {
        let (status, body) = get(test_state(MockCatalogStore::new()), "/api/products/abc").await;

        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_search_passes_filter() {
        let mut store = MockCatalogStore::new();
        store
            .expect_search()
            .withf(|query, filter| {
                query == "batik"
                    && filter.sort == Some(ProductSort::PriceAsc)
                    && filter.in_stock == Some(true)
                    && filter.per_page == Some(20)
            })
            .returning(|_, filter| {
                Ok(ProductPage {
                    items: vec![product(5)],
                    page: filter.page.unwrap_or(1),
                    per_page: filter.per_page.unwrap_or(12),
                    total: 1,
                })
            });

        let (status, body) = get(
            test_state(store),
            "/api/products/search?q=batik&sort=price_asc&in_stock=true&per_page=20",
        )
        .await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total"], 1);
        assert_eq!(body["data"]["per_page"], 20);
    }

    #[tokio::test]
    async fn test_malformed_query_is_enveloped() {
        let state = test_state(MockCatalogStore::new());

        let (status, body) = get(state.clone(), "/api/products/trending?limit=abc").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
        assert!(body["message"].as_str().unwrap().starts_with("Bad request"));

        let (status, body) = get(state, "/api/categories/dress/products?sort=bogus").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
        assert_eq!(body["success"], false);
    }

    #[tokio::test]
    async fn test_blank_search_is_bad_request() {
        let (status, _) = get(test_state(MockCatalogStore::new()), "/api/products/search?q=").await;
        assert_eq!(status, StatusCode::BAD_REQUEST);
    }

    #[tokio::test]
    async fn test_statistics() {
        let mut store = MockCatalogStore::new();
        store.expect_statistics().times(1).returning(|| {
            Ok(CatalogStatistics {
                total_products: 120,
                total_categories: 8,
                in_stock_products: 97,
                average_price: Money::from_whole(185_000),
                total_reviews: 430,
            })
        });
        let state = test_state(store);

        let (status, body) = get(state.clone(), "/api/statistics").await;
        let (_, cached) = get(state, "/api/statistics").await;

        assert_eq!(status, StatusCode::OK);
        assert_eq!(body["data"]["total_products"], 120);
        assert_eq!(body, cached);
    }
}
