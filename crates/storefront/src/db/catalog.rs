//! Catalog queries against `PostgreSQL`.
//!
//! [`CatalogStore`] is the persistence seam the cached catalog service sits
//! on; [`PgCatalogStore`] is the production implementation.

use async_trait::async_trait;
use sqlx::{PgPool, Postgres, QueryBuilder};
use tracing::instrument;

#[cfg(test)]
use mockall::automock;

use vivias_core::{
    CatalogStatistics, Category, CategoryId, Product, ProductFilter, ProductId, ProductPage,
};

use super::RepositoryError;

/// Columns selected for every product query, aliased to [`Product`] fields.
const PRODUCT_COLUMNS: &str = r"
    p.id, p.category_id, p.name, p.slug, p.description,
    p.price, p.sale_price, p.stock, p.image_url,
    (SELECT ROUND(AVG(r.rating)::numeric, 1)
       FROM catalog.reviews r
      WHERE r.product_id = p.id) AS average_rating,
    p.sold_count, p.is_featured, p.created_at
";

/// Read access to the product catalog.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait CatalogStore: Send + Sync {
    /// Best-selling in-stock products.
    async fn trending(&self, limit: u32) -> Result<Vec<Product>, RepositoryError>;

    /// Products flagged as featured, newest first.
    async fn featured(&self, limit: u32) -> Result<Vec<Product>, RepositoryError>;

    /// Look up a category by slug.
    async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>, RepositoryError>;

    /// One page of a category's products.
    async fn products_in_category(
        &self,
        category: CategoryId,
        filter: &ProductFilter,
    ) -> Result<ProductPage, RepositoryError>;

    /// One page of products whose name or description matches `query`.
    async fn search(
        &self,
        query: &str,
        filter: &ProductFilter,
    ) -> Result<ProductPage, RepositoryError>;

    /// Store-wide aggregates.
    async fn statistics(&self) -> Result<CatalogStatistics, RepositoryError>;

    /// A single active product.
    async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError>;

    /// Other products from the same category.
    async fn related(&self, id: ProductId, limit: u32) -> Result<Vec<Product>, RepositoryError>;
}

/// `PostgreSQL`-backed catalog store.
#[derive(Debug, Clone)]
pub struct PgCatalogStore {
    pool: PgPool,
}

impl PgCatalogStore {
    #[must_use]
    pub const fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    /// Run a filtered listing: one count query and one page query sharing the
    /// same `WHERE` clause.
    async fn listing(
        &self,
        scope: ListingScope<'_>,
        filter: &ProductFilter,
    ) -> Result<ProductPage, RepositoryError> {
        let filter = filter.normalized();
        let per_page = filter.per_page.unwrap_or(ProductFilter::DEFAULT_PER_PAGE);

        let mut count = QueryBuilder::<Postgres>::new("SELECT COUNT(*) FROM catalog.products p");
        push_conditions(&mut count, scope, &filter);
        let total: i64 = count.build_query_scalar().fetch_one(&self.pool).await?;

        let mut page = QueryBuilder::<Postgres>::new("SELECT ");
        page.push(PRODUCT_COLUMNS);
        page.push(" FROM catalog.products p");
        push_conditions(&mut page, scope, &filter);
        page.push(" ORDER BY ");
        page.push(filter.sort.unwrap_or_default().order_by());
        page.push(" LIMIT ");
        page.push_bind(i64::from(per_page));
        page.push(" OFFSET ");
        page.push_bind(filter.offset());

        let items = page
            .build_query_as::<Product>()
            .fetch_all(&self.pool)
            .await?;

        Ok(ProductPage {
            items,
            page: filter.page.unwrap_or(1),
            per_page,
            total,
        })
    }
}

#[derive(Debug, Clone, Copy)]
enum ListingScope<'a> {
    Category(CategoryId),
    Search(&'a str),
}

/// Append the `WHERE` clause for a listing.
fn push_conditions(
    builder: &mut QueryBuilder<'_, Postgres>,
    scope: ListingScope<'_>,
    filter: &ProductFilter,
) {
    builder.push(" WHERE p.is_active");

    match scope {
        ListingScope::Category(id) => {
            builder.push(" AND p.category_id = ");
            builder.push_bind(id);
        }
        ListingScope::Search(query) => {
            let pattern = format!("%{}%", escape_like(query));
            builder.push(" AND (p.name ILIKE ");
            builder.push_bind(pattern.clone());
            builder.push(" OR p.description ILIKE ");
            builder.push_bind(pattern);
            builder.push(")");
        }
    }

    if let Some(min) = filter.min_price {
        builder.push(" AND COALESCE(p.sale_price, p.price) >= ");
        builder.push_bind(min);
    }
    if let Some(max) = filter.max_price {
        builder.push(" AND COALESCE(p.sale_price, p.price) <= ");
        builder.push_bind(max);
    }
    if filter.in_stock == Some(true) {
        builder.push(" AND p.stock > 0");
    }
}

/// Escape `LIKE` wildcards so user input matches literally.
fn escape_like(input: &str) -> String {
    let mut escaped = String::with_capacity(input.len());
    for ch in input.chars() {
        if matches!(ch, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(ch);
    }
    escaped
}

#[async_trait]
impl CatalogStore for PgCatalogStore {
    #[instrument(skip(self))]
    async fn trending(&self, limit: u32) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM catalog.products p
              WHERE p.is_active AND p.stock > 0
              ORDER BY p.sold_count DESC, p.created_at DESC
              LIMIT $1"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    #[instrument(skip(self))]
    async fn featured(&self, limit: u32) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM catalog.products p
              WHERE p.is_active AND p.is_featured
              ORDER BY p.created_at DESC
              LIMIT $1"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }

    #[instrument(skip(self))]
    async fn category_by_slug(&self, slug: &str) -> Result<Option<Category>, RepositoryError> {
        let category = sqlx::query_as::<_, Category>(
            r"
            SELECT c.id, c.name, c.slug,
                   (SELECT COUNT(*) FROM catalog.products p
                     WHERE p.category_id = c.id AND p.is_active) AS product_count
              FROM catalog.categories c
             WHERE c.slug = $1
            ",
        )
        .bind(slug)
        .fetch_optional(&self.pool)
        .await?;
        Ok(category)
    }

    #[instrument(skip(self, filter))]
    async fn products_in_category(
        &self,
        category: CategoryId,
        filter: &ProductFilter,
    ) -> Result<ProductPage, RepositoryError> {
        self.listing(ListingScope::Category(category), filter).await
    }

    #[instrument(skip(self, filter))]
    async fn search(
        &self,
        query: &str,
        filter: &ProductFilter,
    ) -> Result<ProductPage, RepositoryError> {
        self.listing(ListingScope::Search(query), filter).await
    }

    #[instrument(skip(self))]
    async fn statistics(&self) -> Result<CatalogStatistics, RepositoryError> {
        let statistics = sqlx::query_as::<_, CatalogStatistics>(
            r"
            SELECT
                (SELECT COUNT(*) FROM catalog.products WHERE is_active) AS total_products,
                (SELECT COUNT(*) FROM catalog.categories) AS total_categories,
                (SELECT COUNT(*) FROM catalog.products
                  WHERE is_active AND stock > 0) AS in_stock_products,
                (SELECT COALESCE(AVG(price), 0)::numeric
                   FROM catalog.products WHERE is_active) AS average_price,
                (SELECT COUNT(*) FROM catalog.reviews) AS total_reviews
            ",
        )
        .fetch_one(&self.pool)
        .await?;
        Ok(statistics)
    }

    #[instrument(skip(self))]
    async fn product(&self, id: ProductId) -> Result<Option<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM catalog.products p
              WHERE p.id = $1 AND p.is_active"
        );
        let product = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .fetch_optional(&self.pool)
            .await?;
        Ok(product)
    }

    #[instrument(skip(self))]
    async fn related(&self, id: ProductId, limit: u32) -> Result<Vec<Product>, RepositoryError> {
        let sql = format!(
            "SELECT {PRODUCT_COLUMNS} FROM catalog.products p
              WHERE p.is_active
                AND p.id <> $1
                AND p.category_id = (SELECT category_id FROM catalog.products WHERE id = $1)
              ORDER BY p.sold_count DESC, p.id DESC
              LIMIT $2"
        );
        let products = sqlx::query_as::<_, Product>(&sql)
            .bind(id)
            .bind(i64::from(limit))
            .fetch_all(&self.pool)
            .await?;
        Ok(products)
    }
}
