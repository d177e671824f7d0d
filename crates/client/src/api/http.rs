//! HTTP implementation of [`StorefrontApi`] using `reqwest`.

use std::sync::{PoisonError, RwLock};
use std::time::Duration;

use async_trait::async_trait;
use reqwest::{Method, StatusCode};
use secrecy::{ExposeSecret, SecretString};
use serde::Serialize;
use serde::de::DeserializeOwned;
use serde_json::Value;
use tracing::{debug, instrument, warn};
use url::Url;

use vivias_core::{
    ApiResponse, AuthPayload, CartLineId, CartSnapshot, CatalogStatistics, CategoryListing,
    LoginCredentials, Product, ProductFilter, ProductId, ProductPage, RegistrationData, User,
    WishlistSnapshot,
};

use super::{
    AddToCartRequest, AddToWishlistRequest, ApiError, ApiResult, ApplyCouponRequest,
    StorefrontApi, UpdateCartItemRequest,
};

/// Characters of a response body kept in logs and errors.
const BODY_PREVIEW_CHARS: usize = 500;

/// Backend client speaking the `{success, data, message}` JSON envelope.
///
/// Business failures (HTTP 200 or 4xx with `success: false`) are returned as
/// envelopes. Only transport problems, 404, 429, 5xx and undecodable bodies
/// become [`ApiError`]s.
pub struct HttpApiClient {
    client: reqwest::Client,
    base_url: Url,
    token: RwLock<Option<SecretString>>,
}

impl HttpApiClient {
    /// Create a client for the backend at `base_url`.
    ///
    /// # Errors
    ///
    /// Returns `ApiError::Transport` if the HTTP client cannot be built.
    pub fn new(base_url: &Url, timeout: Duration) -> Result<Self, ApiError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent(concat!("vivias-client/", env!("CARGO_PKG_VERSION")))
            .build()?;

        Ok(Self {
            client,
            base_url: with_trailing_slash(base_url),
            token: RwLock::new(None),
        })
    }

    /// The normalized base URL requests are resolved against.
    #[must_use]
    pub const fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn url(&self, path: &str) -> Result<Url, ApiError> {
        Ok(self.base_url.join(path.trim_start_matches('/'))?)
    }

    fn bearer(&self) -> Option<String> {
        self.token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .as_ref()
            .map(|token| token.expose_secret().to_owned())
    }

    async fn get<T: DeserializeOwned>(&self, url: Url) -> ApiResult<T> {
        self.execute(Method::GET, url, None).await
    }

    async fn send<T, B>(&self, method: Method, path: &str, body: &B) -> ApiResult<T>
    where
        T: DeserializeOwned,
        B: Serialize + Sync,
    {
        let body = serde_json::to_value(body)?;
        self.execute(method, self.url(path)?, Some(body)).await
    }

    async fn call<T: DeserializeOwned>(&self, method: Method, path: &str) -> ApiResult<T> {
        self.execute(method, self.url(path)?, None).await
    }

    /// Send a request and decode the envelope.
    async fn execute<T: DeserializeOwned>(
        &self,
        method: Method,
        url: Url,
        body: Option<Value>,
    ) -> ApiResult<T> {
        let path = url.path().to_owned();
        let mut request = self
            .client
            .request(method.clone(), url)
            .header(reqwest::header::ACCEPT, "application/json");
        if let Some(token) = self.bearer() {
            request = request.bearer_auth(token);
        }
        if let Some(body) = body {
            request = request.json(&body);
        }

        let response = request.send().await?;
        let status = response.status();
        debug!(%method, path = %path, status = status.as_u16(), "Backend responded");

        if status == StatusCode::TOO_MANY_REQUESTS {
            let retry_after = response
                .headers()
                .get(reqwest::header::RETRY_AFTER)
                .and_then(|v| v.to_str().ok())
                .and_then(|s| s.parse::<u64>().ok())
                .unwrap_or(1);
            return Err(ApiError::RateLimited(retry_after));
        }

        // Get response body as text first for better error diagnostics
        let text = response.text().await?;
        decode_envelope(status, &path, &text)
    }
}

impl std::fmt::Debug for HttpApiClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let authenticated = self
            .token
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .is_some();
        f.debug_struct("HttpApiClient")
            .field("base_url", &self.base_url.as_str())
            .field("authenticated", &authenticated)
            .finish_non_exhaustive()
    }
}

fn with_trailing_slash(url: &Url) -> Url {
    let mut url = url.clone();
    if !url.path().ends_with('/') {
        let path = format!("{}/", url.path());
        url.set_path(&path);
    }
    url
}

fn preview(text: &str) -> String {
    text.chars().take(BODY_PREVIEW_CHARS).collect()
}

/// Map a status and body to an envelope or an [`ApiError`].
fn decode_envelope<T: DeserializeOwned>(
    status: StatusCode,
    path: &str,
    text: &str,
) -> ApiResult<T> {
    if status == StatusCode::NOT_FOUND {
        let message = serde_json::from_str::<ApiResponse<Value>>(text)
            .ok()
            .and_then(|envelope| envelope.message)
            .unwrap_or_else(|| path.to_owned());
        return Err(ApiError::NotFound(message));
    }

    if status.is_server_error() {
        warn!(status = status.as_u16(), path = %path, body = %preview(text), "Backend error");
        return Err(ApiError::Status {
            status: status.as_u16(),
            body: preview(text),
        });
    }

    match serde_json::from_str::<ApiResponse<T>>(text) {
        Ok(envelope) => Ok(envelope),
        Err(err) if status.is_success() => {
            warn!(error = %err, path = %path, body = %preview(text), "Failed to parse envelope");
            Err(ApiError::Decode(err))
        }
        Err(_) => Err(ApiError::Status {
            status: status.as_u16(),
            body: preview(text),
        }),
    }
}

/// Query pairs for a listing filter.
fn filter_pairs(filter: &ProductFilter) -> Vec<(&'static str, String)> {
    let mut pairs = Vec::new();
    if let Some(page) = filter.page {
        pairs.push(("page", page.to_string()));
    }
    if let Some(per_page) = filter.per_page {
        pairs.push(("per_page", per_page.to_string()));
    }
    if let Some(min) = filter.min_price {
        pairs.push(("min_price", min.to_string()));
    }
    if let Some(max) = filter.max_price {
        pairs.push(("max_price", max.to_string()));
    }
    if let Some(sort) = filter
        .sort
        .and_then(|sort| serde_json::to_value(sort).ok())
        .and_then(|value| value.as_str().map(str::to_owned))
    {
        pairs.push(("sort", sort));
    }
    if let Some(in_stock) = filter.in_stock {
        pairs.push(("in_stock", in_stock.to_string()));
    }
    pairs
}

#[async_trait]
impl StorefrontApi for HttpApiClient {
    fn set_auth_token(&self, token: Option<SecretString>) {
        *self.token.write().unwrap_or_else(PoisonError::into_inner) = token;
    }

    #[instrument(skip(self))]
    async fn get_cart(&self) -> ApiResult<CartSnapshot> {
        self.call(Method::GET, "api/cart").await
    }

    #[instrument(skip(self))]
    async fn add_to_cart(&self, request: &AddToCartRequest) -> ApiResult<Value> {
        self.send(Method::POST, "api/cart/items", request).await
    }

    #[instrument(skip(self))]
    async fn update_cart_item(
        &self,
        line: CartLineId,
        request: &UpdateCartItemRequest,
    ) -> ApiResult<Value> {
        self.send(Method::PATCH, &format!("api/cart/items/{line}"), request)
            .await
    }

    #[instrument(skip(self))]
    async fn remove_from_cart(&self, line: CartLineId) -> ApiResult<Value> {
        self.call(Method::DELETE, &format!("api/cart/items/{line}"))
            .await
    }

    #[instrument(skip(self))]
    async fn clear_cart(&self) -> ApiResult<Value> {
        self.call(Method::DELETE, "api/cart").await
    }

    #[instrument(skip(self))]
    async fn apply_coupon(&self, request: &ApplyCouponRequest) -> ApiResult<Value> {
        self.send(Method::POST, "api/cart/coupon", request).await
    }

    #[instrument(skip(self))]
    async fn remove_coupon(&self) -> ApiResult<Value> {
        self.call(Method::DELETE, "api/cart/coupon").await
    }

    #[instrument(skip(self))]
    async fn get_wishlist(&self) -> ApiResult<WishlistSnapshot> {
        self.call(Method::GET, "api/wishlist").await
    }

    #[instrument(skip(self))]
    async fn add_to_wishlist(&self, request: &AddToWishlistRequest) -> ApiResult<Value> {
        self.send(Method::POST, "api/wishlist/items", request).await
    }

    #[instrument(skip(self))]
    async fn remove_from_wishlist(&self, product: ProductId) -> ApiResult<Value> {
        self.call(Method::DELETE, &format!("api/wishlist/items/{product}"))
            .await
    }

    #[instrument(skip(self))]
    async fn clear_wishlist(&self) -> ApiResult<Value> {
        self.call(Method::DELETE, "api/wishlist").await
    }

    #[instrument(skip(self))]
    async fn move_wishlist_to_cart(&self, product: ProductId) -> ApiResult<Value> {
        self.call(
            Method::POST,
            &format!("api/wishlist/items/{product}/move-to-cart"),
        )
        .await
    }

    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    async fn login(&self, credentials: &LoginCredentials) -> ApiResult<AuthPayload> {
        self.send(Method::POST, "api/auth/login", credentials).await
    }

    #[instrument(skip(self, data), fields(email = %data.email))]
    async fn register(&self, data: &RegistrationData) -> ApiResult<AuthPayload> {
        self.send(Method::POST, "api/auth/register", data).await
    }

    #[instrument(skip(self))]
    async fn logout(&self) -> ApiResult<Value> {
        self.call(Method::POST, "api/auth/logout").await
    }

    #[instrument(skip(self))]
    async fn get_current_user(&self) -> ApiResult<User> {
        self.call(Method::GET, "api/auth/me").await
    }

    #[instrument(skip(self))]
    async fn trending_products(&self, limit: u32) -> ApiResult<Vec<Product>> {
        let mut url = self.url("api/products/trending")?;
        url.query_pairs_mut()
            .append_pair("limit", &limit.to_string());
        self.get(url).await
    }

    #[instrument(skip(self))]
    async fn search_products(
        &self,
        query: &str,
        filter: &ProductFilter,
    ) -> ApiResult<ProductPage> {
        let mut url = self.url("api/products/search")?;
        {
            let mut pairs = url.query_pairs_mut();
            pairs.append_pair("q", query);
            for (key, value) in filter_pairs(filter) {
                pairs.append_pair(key, &value);
            }
        }
        self.get(url).await
    }

    #[instrument(skip(self))]
    async fn category_products(
        &self,
        slug: &str,
        filter: &ProductFilter,
    ) -> ApiResult<CategoryListing> {
        let mut url = self.url("api/categories/")?;
        url.path_segments_mut()
            .map_err(|()| ApiError::Url(url::ParseError::RelativeUrlWithCannotBeABaseBase))?
            .pop_if_empty()
            .push(slug)
            .push("products");
        {
            let mut pairs = url.query_pairs_mut();
            for (key, value) in filter_pairs(filter) {
                pairs.append_pair(key, &value);
            }
        }
        self.get(url).await
    }

    #[instrument(skip(self))]
    async fn catalog_statistics(&self) -> ApiResult<CatalogStatistics> {
        self.call(Method::GET, "api/statistics").await
    }

    #[instrument(skip(self))]
    async fn product(&self, id: ProductId) -> ApiResult<Product> {
        self.call(Method::GET, &format!("api/products/{id}")).await
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use rust_decimal::Decimal;
    use vivias_core::ProductSort;

    use super::*;

    fn client(base: &str) -> HttpApiClient {
        HttpApiClient::new(&Url::parse(base).unwrap(), Duration::from_secs(5)).unwrap()
    }

    #[test]
    fn test_base_url_gets_trailing_slash() {
        let client = client("https://vivias.id/shop");
        assert_eq!(client.base_url().as_str(), "https://vivias.id/shop/");
        assert_eq!(
            client.url("/api/cart").unwrap().as_str(),
            "https://vivias.id/shop/api/cart"
        );
    }

    #[test]
    fn test_token_is_not_in_debug_output() {
        let client = client("http://localhost:3000");
        client.set_auth_token(Some(SecretString::from("tok_abc123")));

        let debug_output = format!("{client:?}");
        assert!(debug_output.contains("authenticated: true"));
        assert!(!debug_output.contains("tok_abc123"));
        assert_eq!(client.bearer().as_deref(), Some("tok_abc123"));

        client.set_auth_token(None);
        assert!(client.bearer().is_none());
    }

    #[test]
    fn test_business_failure_is_envelope() {
        let body = r#"{"success":false,"message":"Stok tidak mencukupi","errors":{"quantity":["max 3"]}}"#;
        let response: ApiResponse<Value> =
            decode_envelope(StatusCode::UNPROCESSABLE_ENTITY, "/api/cart/items", body).unwrap();

        assert!(!response.success);
        assert_eq!(response.error_message(), "Stok tidak mencukupi");
        assert_eq!(response.errors["quantity"], vec!["max 3".to_string()]);
    }

    #[test]
    fn test_not_found_uses_envelope_message() {
        let body = r#"{"success":false,"message":"Not found: product 9"}"#;
        let err =
            decode_envelope::<Product>(StatusCode::NOT_FOUND, "/api/products/9", body).unwrap_err();
        assert!(matches!(err, ApiError::NotFound(message) if message == "Not found: product 9"));

        let err = decode_envelope::<Product>(StatusCode::NOT_FOUND, "/api/products/9", "<html>")
            .unwrap_err();
        assert!(matches!(err, ApiError::NotFound(message) if message == "/api/products/9"));
    }

    #[test]
    fn test_server_error_is_status() {
        let err = decode_envelope::<Value>(StatusCode::BAD_GATEWAY, "/api/cart", "upstream down")
            .unwrap_err();
        assert!(matches!(err, ApiError::Status { status: 502, .. }));
    }

    #[test]
    fn test_garbage_success_body_is_decode_error() {
        let err = decode_envelope::<CartSnapshot>(StatusCode::OK, "/api/cart", "not json")
            .unwrap_err();
        assert!(matches!(err, ApiError::Decode(_)));
    }

    #[test]
    fn test_merged_cart_line_above_request_limit_decodes() {
        let body = r#"{"success":true,"data":{
            "items":[{"id":3,"product":{"id":42,"name":"Kebaya Encim"},
                      "quantity":120,"unit_price":"2500","line_total":"300000"}],
            "count":120,"subtotal":"300000","shipping":"1000","discount":"0","total":"301000"}}"#;

        let response =
            decode_envelope::<CartSnapshot>(StatusCode::OK, "/api/cart", body).unwrap();
        let snapshot = response.data.unwrap();

        assert_eq!(snapshot.item_count, 120);
        assert_eq!(
            snapshot.items.first().map(|line| line.quantity.get()),
            Some(120)
        );
    }

    #[test]
    fn test_filter_pairs() {
        let filter = ProductFilter {
            page: Some(2),
            min_price: Some(Decimal::from(50_000)),
            sort: Some(ProductSort::PriceDesc),
            in_stock: Some(true),
            ..ProductFilter::default()
        };

        assert_eq!(
            filter_pairs(&filter),
            vec![
                ("page", "2".to_string()),
                ("min_price", "50000".to_string()),
                ("sort", "price_desc".to_string()),
                ("in_stock", "true".to_string()),
            ]
        );
    }
}
