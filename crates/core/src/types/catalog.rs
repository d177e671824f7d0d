//! Catalog read models.
//!
//! These are the payloads of the cached catalog endpoints. With the
//! `postgres` feature they also map directly from query rows.

use chrono::{DateTime, Utc};
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};

use super::id::{CategoryId, ProductId};
use super::money::Money;

/// A product as listed in the catalog.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Product {
    pub id: ProductId,
    pub category_id: Option<CategoryId>,
    pub name: String,
    pub slug: String,
    pub description: Option<String>,
    pub price: Money,
    pub sale_price: Option<Money>,
    pub stock: i32,
    pub image_url: Option<String>,
    pub average_rating: Option<Decimal>,
    pub sold_count: i64,
    pub is_featured: bool,
    pub created_at: DateTime<Utc>,
}

impl Product {
    /// The price a shopper pays right now.
    #[must_use]
    pub fn effective_price(&self) -> Money {
        self.sale_price
            .filter(|sale| *sale < self.price)
            .unwrap_or(self.price)
    }

    #[must_use]
    pub const fn in_stock(&self) -> bool {
        self.stock > 0
    }
}

/// A catalog category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct Category {
    pub id: CategoryId,
    pub name: String,
    pub slug: String,
    pub product_count: i64,
}

/// Store-wide aggregates shown on the landing page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[cfg_attr(feature = "postgres", derive(sqlx::FromRow))]
pub struct CatalogStatistics {
    pub total_products: i64,
    pub total_categories: i64,
    pub in_stock_products: i64,
    pub average_price: Money,
    pub total_reviews: i64,
}

/// One page of products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductPage {
    pub items: Vec<Product>,
    pub page: u32,
    pub per_page: u32,
    pub total: i64,
}

impl ProductPage {
    /// Number of pages needed for `total` items.
    #[must_use]
    pub fn page_count(&self) -> u32 {
        if self.per_page == 0 || self.total <= 0 {
            return 0;
        }
        let per_page = i64::from(self.per_page);
        u32::try_from((self.total + per_page - 1) / per_page).unwrap_or(u32::MAX)
    }
}

/// A category together with one page of its products.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryListing {
    pub category: Category,
    pub products: ProductPage,
}

/// Sort order for product listings.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum ProductSort {
    #[default]
    Newest,
    PriceAsc,
    PriceDesc,
    Popular,
}

impl ProductSort {
    /// SQL `ORDER BY` clause for this sort. Static strings only.
    #[must_use]
    pub const fn order_by(self) -> &'static str {
        match self {
            Self::Newest => "p.created_at DESC, p.id DESC",
            Self::PriceAsc => "COALESCE(p.sale_price, p.price) ASC, p.id ASC",
            Self::PriceDesc => "COALESCE(p.sale_price, p.price) DESC, p.id DESC",
            Self::Popular => "p.sold_count DESC, p.id DESC",
        }
    }
}

/// Listing filter shared by category and search queries.
///
/// Absent fields mean "no constraint"; [`ProductFilter::normalized`] fills in
/// paging defaults so that equivalent filters encode identically.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ProductFilter {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub per_page: Option<u32>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub min_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub max_price: Option<Decimal>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub sort: Option<ProductSort>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub in_stock: Option<bool>,
}

impl ProductFilter {
    pub const DEFAULT_PER_PAGE: u32 = 12;
    pub const MAX_PER_PAGE: u32 = 100;

    /// Fill paging and sort defaults, clamp `per_page` to `1..=100` and strip
    /// trailing zeros from price bounds.
    #[must_use]
    pub fn normalized(&self) -> Self {
        Self {
            page: Some(self.page.unwrap_or(1).max(1)),
            per_page: Some(
                self.per_page
                    .unwrap_or(Self::DEFAULT_PER_PAGE)
                    .clamp(1, Self::MAX_PER_PAGE),
            ),
            min_price: self.min_price.map(|p| p.normalize()),
            max_price: self.max_price.map(|p| p.normalize()),
            sort: Some(self.sort.unwrap_or_default()),
            in_stock: self.in_stock,
        }
    }

    /// Row offset of the requested page.
    #[must_use]
    pub fn offset(&self) -> i64 {
        let normalized = self.normalized();
        let page = i64::from(normalized.page.unwrap_or(1));
        let per_page = i64::from(normalized.per_page.unwrap_or(Self::DEFAULT_PER_PAGE));
        (page - 1) * per_page
    }
}
