//! In-memory catalog for driving the real storefront router.

use std::collections::BTreeMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::time::Duration;

use async_trait::async_trait;
use chrono::{TimeZone, Utc};
use secrecy::SecretString;
use sqlx::postgres::PgPoolOptions;

use vivias_core::{
    CatalogStatistics, Category, CategoryId, Money, Product, ProductFilter, ProductId, ProductPage,
};
use vivias_storefront::app;
use vivias_storefront::config::{LogFormat, StorefrontConfig};
use vivias_storefront::db::RepositoryError;
use vivias_storefront::db::catalog::CatalogStore;
use vivias_storefront::state::AppState;

use crate::{BoxError, TestServer};

/// Catalog store over a fixed product list, counting every query.
#[derive(Debug)]
pub struct InMemoryCatalog {
    products: Vec<Product>,
    categories: BTreeMap<String, Category>,
    queries: AtomicUsize,
    latency: Duration,
    failing: AtomicBool,
}

impl InMemoryCatalog {
    /// Four products in two categories.
    #[must_use]
    pub fn seeded() -> Self {
        let kebaya = Category {
            id: CategoryId::new(1),
            name: "Kebaya".to_string(),
            slug: "kebaya".to_string(),
            product_count: 2,
        };
        let aksesoris = Category {
            id: CategoryId::new(2),
            name: "Aksesoris".to_string(),
            slug: "aksesoris".to_string(),
            product_count: 2,
        };

        let products = vec![
            product(42, 1, "Kebaya Encim", 250_000, None, 10, 120),
            product(43, 1, "Kebaya Kartini", 320_000, Some(280_000), 3, 45),
            product(7, 2, "Selendang Batik", 150_000, None, 5, 80),
            product(9, 2, "Tas Anyaman", 400_000, None, 0, 200),
        ];

        Self {
            products,
            categories: BTreeMap::from([
                (kebaya.slug.clone(), kebaya),
                (aksesoris.slug.clone(), aksesoris),
            ]),
            queries: AtomicUsize::new(0),
            latency: Duration::ZERO,
            failing: AtomicBool::new(false),
        }
    }

    /// Delay every query, to widen race windows.
    #[must_use]
    pub const fn with_latency(mut self, latency: Duration) -> Self {
        self.latency = latency;
        self
    }

    /// Make every query fail until reset.
    pub fn set_failing(&self, failing: bool) {
        self.failing.store(failing, Ordering::SeqCst);
    }

    /// Number of queries that reached the store.
    pub fn queries(&self) -> usize {
        self.queries.load(Ordering::SeqCst)
    }

    async fn begin_query(&self) -> Result<(), RepositoryError> {
        self.queries.fetch_add(1, Ordering::SeqCst);
        if !self.latency.is_zero() {
            tokio::time::sleep(self.latency).await;
        }
        if self.failing.load(Ordering::SeqCst) {
            return Err(RepositoryError::DataCorruption(
                "injected failure".to_string(),
            ));
        }
        Ok(())
    }

    fn page(&self, matching: Vec<Product>, filter: &ProductFilter) -> ProductPage {
        let filter = filter.normalized();
        let per_page = filter.per_page.unwrap_or(ProductFilter::DEFAULT_PER_PAGE);
        let total = i64::try_from(matching.len()).unwrap_or(i64::MAX);
        let offset = usize::try_from(filter.offset()).unwrap_or(usize::MAX);

        ProductPage {
            items: matching
                .into_iter()
                .skip(offset)
                .take(per_page as usize)
                .collect(),
            page: filter.page.unwrap_or(1),
            per_page,
            total,
        }
    }

    fn filtered<'a>(
        &'a self,
        filter: &'a ProductFilter,
    ) -> impl Iterator<Item = &'a Product> + 'a {
        self.products.iter().filter(move |p| {
            let price = p.effective_price().amount();
            filter.min_price.is_none_or(|min| price >= min)
                && filter.max_price.is_none_or(|max| price <= max)
                && (filter.in_stock != Some(true) || p.in_stock())
        })
    }
}

#[async_trait]
impl CatalogStore for InMemoryCatalog {
    async fn trending(&self, limit: u32) -> Result<Vec<Product>, RepositoryError> {
        self.begin_query().await?;
        let mut products: Vec<Product> =
            self.products.iter().filter(|p| p.in_stock()).cloned().collect();
        products.sort_by(|a, b| b.sold_count.cmp(&a.sold_count));
        products.truncate(limit as usize);
        Ok(products)
    }

    async fn featured(&self, limit: u32) -> Result<Vec<Product>, RepositoryError> {
        self.begin_query().await?;
        Ok(self
            .products
            .iter()
            .filter(|p| p.is_featured)
            .take(limit as usize)
            .cloned()
            .collect())
    }

    async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>, RepositoryError> {
        self.begin_query().await?;
        Ok(self.categories.get(slug).cloned())
    }

    async fn products_in_category(
        &self,
        category: CategoryId,
        filter: &ProductFilter,
    ) -> Result<ProductPage, RepositoryError> {
        self.begin_query().await?;
        let matching = self
            .filtered(filter)
            .filter(|p| p.category_id == Some(category))
            .cloned()
            .collect();
        Ok(self.page(matching, filter))
    }

    async fn search(
        &self,
        query: &str,
        filter: &ProductFilter,
    ) -> Result<ProductPage, RepositoryError> {
        self.begin_query().await?;
        let needle = query.to_lowercase();
        let matching = self
            .filtered(filter)
            .filter(|p| p.name.to_lowercase().contains(&needle))
            .cloned()
            .collect();
        Ok(self.page(matching, filter))
    }

    async fn statistics(&self) -> Result<CatalogStatistics, RepositoryError> {
        self.begin_query().await?;
        Ok(CatalogStatistics {
            total_products: 4,
            total_categories: 2,
            in_stock_products: 3,
            average_price: Money::from_whole(280_000),
            total_reviews: 12,
        })
    }

    async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        self.begin_query().await?;
        Ok(self.products.iter().find(|p| p.id == id).cloned())
    }

    async fn related(&self, id: ProductId, limit: u32) -> Result<Vec<Product>, RepositoryError> {
        self.begin_query().await?;
        let category = self
            .products
            .iter()
            .find(|p| p.id == id)
            .and_then(|p| p.category_id);
        Ok(self
            .products
            .iter()
            .filter(|p| p.id != id && p.category_id.is_some() && p.category_id == category)
            .take(limit as usize)
            .cloned()
            .collect())
    }
}

fn product(
    id: i32,
    category: i32,
    name: &str,
    price: i64,
    sale_price: Option<i64>,
    stock: i32,
    sold_count: i64,
) -> Product {
    Product {
        id: ProductId::new(id),
        category_id: Some(CategoryId::new(category)),
        name: name.to_string(),
        slug: name.to_lowercase().replace(' ', "-"),
        description: None,
        price: Money::from_whole(price),
        sale_price: sale_price.map(Money::from_whole),
        stock,
        image_url: None,
        average_rating: None,
        sold_count,
        is_featured: id == 42,
        created_at: Utc
            .with_ymd_and_hms(2026, 1, 1, 0, 0, 0)
            .single()
            .unwrap_or_default(),
    }
}

/// Serve the storefront router over `store` on an ephemeral port.
///
/// The pool is lazy and never connects; only the readiness check would use
/// it.
///
/// # Errors
///
/// Returns an error if the port cannot be bound.
pub async fn start_storefront(store: Arc<dyn CatalogStore>) -> Result<TestServer, BoxError> {
    let config = StorefrontConfig {
        database_url: SecretString::from("postgres://vivias@127.0.0.1:1/vivias"),
        host: [127, 0, 0, 1].into(),
        port: 0,
        cache_capacity: 1_000,
        log_format: LogFormat::Pretty,
        sentry_dsn: None,
        sentry_environment: None,
        sentry_sample_rate: 0.0,
        sentry_traces_sample_rate: 0.0,
    };
    let pool = PgPoolOptions::new()
        .acquire_timeout(Duration::from_millis(200))
        .connect_lazy("postgres://vivias@127.0.0.1:1/vivias")?;

    TestServer::start(app(AppState::with_store(config, pool, store))).await
}
