//! `vivias catalog ...`
//!
//! Catalog reads go straight to the API; there is no client-side store for
//! them.

use std::sync::Arc;

use vivias_client::{StoreError, StorefrontApi, accepted};
use vivias_core::{ApiResponse, ProductFilter, ProductId};

use super::CommandError;
use crate::output;

pub async fn trending(api: &Arc<dyn StorefrontApi>, limit: u32) -> Result<String, CommandError> {
    let products = data(api.trending_products(limit).await)?;
    Ok(output::products(&products.unwrap_or_default()))
}

pub async fn search(
    api: &Arc<dyn StorefrontApi>,
    query: &str,
    filter: &ProductFilter,
) -> Result<String, CommandError> {
    let page = data(api.search_products(query, filter).await)?
        .ok_or_else(|| StoreError::NotFound(format!("results for {query}")))?;
    Ok(output::page(&page))
}

pub async fn category(
    api: &Arc<dyn StorefrontApi>,
    slug: &str,
    filter: &ProductFilter,
) -> Result<String, CommandError> {
    let listing = data(api.category_products(slug, filter).await)?
        .ok_or_else(|| StoreError::NotFound(format!("category {slug}")))?;
    Ok(format!(
        "{} ({} products)\n{}",
        listing.category.name,
        listing.category.product_count,
        output::page(&listing.products)
    ))
}

pub async fn statistics(api: &Arc<dyn StorefrontApi>) -> Result<String, CommandError> {
    let statistics = data(api.catalog_statistics().await)?
        .ok_or_else(|| StoreError::NotFound("catalog statistics".to_string()))?;
    Ok(output::statistics(&statistics))
}

pub async fn product(api: &Arc<dyn StorefrontApi>, id: i32) -> Result<String, CommandError> {
    let product = data(api.product(ProductId::new(id)).await)?
        .ok_or_else(|| StoreError::NotFound(format!("product {id}")))?;
    Ok(output::product_detail(&product))
}

fn data<T, E>(result: Result<ApiResponse<T>, E>) -> Result<Option<T>, CommandError>
where
    StoreError: From<E>,
{
    let response = accepted(result.map_err(StoreError::from)?)?;
    Ok(response.data)
}
