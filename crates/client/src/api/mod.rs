//! The backend API surface the stores consume.
//!
//! [`StorefrontApi`] is the seam between stores and the network: stores only
//! ever talk to this trait, [`HttpApiClient`] implements it over HTTP, and
//! tests substitute a mock.

mod http;

pub use http::HttpApiClient;

use async_trait::async_trait;
use secrecy::SecretString;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use thiserror::Error;

#[cfg(test)]
use mockall::automock;

use vivias_core::{
    ApiResponse, AuthPayload, CartLineId, CartSnapshot, CatalogStatistics, CategoryListing,
    LoginCredentials, Product, ProductFilter, ProductId, ProductPage, Quantity, RegistrationData,
    User, VariantOptions, WishlistSnapshot,
};

/// Errors talking to the backend.
///
/// Business failures are not errors: they arrive as an [`ApiResponse`] with
/// `success: false`.
#[derive(Debug, Error)]
pub enum ApiError {
    /// Connection, TLS or timeout failure.
    #[error("request failed: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("invalid request URL: {0}")]
    Url(#[from] url::ParseError),

    /// The backend answered with a status and a body that is not an envelope.
    #[error("HTTP {status}: {body}")]
    Status { status: u16, body: String },

    #[error("not found: {0}")]
    NotFound(String),

    #[error("failed to decode response: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("rate limited, retry after {0}s")]
    RateLimited(u64),
}

/// Body of `POST /api/cart/items`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddToCartRequest {
    pub product_id: ProductId,
    pub quantity: Quantity,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub options: Option<VariantOptions>,
}

/// Body of `PATCH /api/cart/items/{id}`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct UpdateCartItemRequest {
    pub quantity: Quantity,
}

/// Body of `POST /api/cart/coupon`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ApplyCouponRequest {
    pub code: String,
}

/// Body of `POST /api/wishlist/items`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct AddToWishlistRequest {
    pub product_id: ProductId,
}

/// Result type of backend calls.
pub type ApiResult<T> = Result<ApiResponse<T>, ApiError>;

/// Request/response operations of the VIVIAS SHOP backend.
///
/// Mutations answer with an untyped payload: stores never read it, they
/// resync instead, but callers may show its message.
#[cfg_attr(test, automock)]
#[async_trait]
pub trait StorefrontApi: Send + Sync {
    /// Use `token` as the bearer token for subsequent calls.
    fn set_auth_token(&self, token: Option<SecretString>);

    // Cart
    async fn get_cart(&self) -> ApiResult<CartSnapshot>;
    async fn add_to_cart(&self, request: &AddToCartRequest) -> ApiResult<Value>;
    async fn update_cart_item(
        &self,
        line: CartLineId,
        request: &UpdateCartItemRequest,
    ) -> ApiResult<Value>;
    async fn remove_from_cart(&self, line: CartLineId) -> ApiResult<Value>;
    async fn clear_cart(&self) -> ApiResult<Value>;
    async fn apply_coupon(&self, request: &ApplyCouponRequest) -> ApiResult<Value>;
    async fn remove_coupon(&self) -> ApiResult<Value>;

    // Wishlist
    async fn get_wishlist(&self) -> ApiResult<WishlistSnapshot>;
    async fn add_to_wishlist(&self, request: &AddToWishlistRequest) -> ApiResult<Value>;
    async fn remove_from_wishlist(&self, product: ProductId) -> ApiResult<Value>;
    async fn clear_wishlist(&self) -> ApiResult<Value>;
    /// Server-side atomic move from wishlist into the cart.
    async fn move_wishlist_to_cart(&self, product: ProductId) -> ApiResult<Value>;

    // Auth
    async fn login(&self, credentials: &LoginCredentials) -> ApiResult<AuthPayload>;
    async fn register(&self, data: &RegistrationData) -> ApiResult<AuthPayload>;
    async fn logout(&self) -> ApiResult<Value>;
    async fn get_current_user(&self) -> ApiResult<User>;

    // Catalog
    async fn trending_products(&self, limit: u32) -> ApiResult<Vec<Product>>;
    async fn search_products(&self, query: &str, filter: &ProductFilter)
    -> ApiResult<ProductPage>;
    async fn category_products(
        &self,
        slug: &str,
        filter: &ProductFilter,
    ) -> ApiResult<CategoryListing>;
    async fn catalog_statistics(&self) -> ApiResult<CatalogStatistics>;
    async fn product(&self, id: ProductId) -> ApiResult<Product>;
}
