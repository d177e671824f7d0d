//! Per-session wiring of the stores.

use std::sync::Arc;

use thiserror::Error;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::api::{ApiError, HttpApiClient, StorefrontApi};
use crate::auth::AuthSession;
use crate::cart::CartStore;
use crate::config::ClientConfig;
use crate::events::EventBus;
use crate::storage::{FileStorage, SessionStorage, StorageError};
use crate::wishlist::WishlistStore;

#[derive(Debug, Error)]
pub enum ContextError {
    #[error("failed to build API client: {0}")]
    Api(#[from] ApiError),

    #[error("failed to open session storage: {0}")]
    Storage(#[from] StorageError),
}

/// One application session: the API client, storage, event bus and the
/// stores sharing them.
///
/// Must be created inside a Tokio runtime. The cart's event listener runs
/// until the context is dropped.
pub struct StorefrontContext {
    api: Arc<dyn StorefrontApi>,
    events: EventBus,
    cart: CartStore,
    wishlist: WishlistStore,
    auth: AuthSession,
    cart_listener: JoinHandle<()>,
}

impl StorefrontContext {
    /// Build a context talking HTTP to the configured backend and persisting
    /// to the configured file.
    ///
    /// # Errors
    ///
    /// Returns `ContextError` if the HTTP client cannot be built or the
    /// storage file cannot be read.
    pub fn new(config: &ClientConfig) -> Result<Self, ContextError> {
        let api = HttpApiClient::new(&config.api_url, config.http_timeout)?;
        let storage = FileStorage::open(&config.storage_path)?;
        debug!(api_url = %config.api_url, storage = %storage.path().display(), "Session context created");

        Ok(Self::with_parts(Arc::new(api), Arc::new(storage)))
    }

    /// Build a context from an existing API implementation and storage.
    #[must_use]
    pub fn with_parts(api: Arc<dyn StorefrontApi>, storage: Arc<dyn SessionStorage>) -> Self {
        let events = EventBus::new();
        let cart = CartStore::new(api.clone(), storage.clone());
        let wishlist = WishlistStore::new(api.clone(), storage.clone(), events.clone());
        let auth = AuthSession::new(
            api.clone(),
            storage,
            events.clone(),
            cart.clone(),
            wishlist.clone(),
        );
        let cart_listener = cart.spawn_event_listener(&events);

        Self {
            api,
            events,
            cart,
            wishlist,
            auth,
            cart_listener,
        }
    }

    /// Sync cart and wishlist concurrently. Failures are logged only.
    pub async fn prefetch(&self) {
        let (cart, wishlist) = tokio::join!(self.cart.sync(), self.wishlist.sync());
        if let Err(err) = cart {
            warn!(error = %err, "Cart prefetch failed");
        }
        if let Err(err) = wishlist {
            warn!(error = %err, "Wishlist prefetch failed");
        }
    }

    #[must_use]
    pub fn api(&self) -> &Arc<dyn StorefrontApi> {
        &self.api
    }

    #[must_use]
    pub const fn events(&self) -> &EventBus {
        &self.events
    }

    #[must_use]
    pub const fn cart(&self) -> &CartStore {
        &self.cart
    }

    #[must_use]
    pub const fn wishlist(&self) -> &WishlistStore {
        &self.wishlist
    }

    #[must_use]
    pub const fn auth(&self) -> &AuthSession {
        &self.auth
    }
}

impl Drop for StorefrontContext {
    fn drop(&mut self) {
        self.cart_listener.abort();
    }
}

impl std::fmt::Debug for StorefrontContext {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StorefrontContext")
            .field("cart", &self.cart)
            .field("wishlist", &self.wishlist)
            .field("auth", &self.auth)
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use serde_json::json;

    use super::*;
    use crate::api::MockStorefrontApi;
    use crate::storage::MemoryStorage;
    use vivias_core::{ApiResponse, CartSnapshot, ProductId, WishlistSnapshot};

    #[tokio::test]
    async fn test_prefetch_is_best_effort() {
        let mut api = MockStorefrontApi::new();
        api.expect_get_cart().times(1).returning(|| {
            Err(ApiError::Status {
                status: 503,
                body: String::new(),
            })
        });
        api.expect_get_wishlist().times(1).returning(|| {
            Ok(ApiResponse::ok(
                serde_json::from_value::<WishlistSnapshot>(json!({
                    "items": [{"product_id": 3, "name": "Selendang"}],
                    "count": 1
                }))
                .unwrap(),
            ))
        });
        let context = StorefrontContext::with_parts(Arc::new(api), Arc::new(MemoryStorage::new()));

        context.prefetch().await;

        assert!(context.cart().snapshot().is_empty());
        assert!(context.wishlist().contains(ProductId::new(3)));
        assert!(!context.cart().is_loading());
    }

    #[tokio::test]
    async fn test_move_to_cart_resyncs_cart_through_context() {
        let mut api = MockStorefrontApi::new();
        api.expect_move_wishlist_to_cart()
            .times(1)
            .returning(|_| Ok(ApiResponse::ok(json!({}))));
        api.expect_get_wishlist()
            .returning(|| Ok(ApiResponse::ok(WishlistSnapshot::empty())));
        api.expect_get_cart().times(1).returning(|| {
            Ok(ApiResponse::ok(CartSnapshot {
                item_count: 1,
                ..CartSnapshot::default()
            }))
        });
        let context = StorefrontContext::with_parts(Arc::new(api), Arc::new(MemoryStorage::new()));
        let mut cart_changes = context.cart().subscribe();

        context
            .wishlist()
            .move_to_cart(ProductId::new(3))
            .await
            .unwrap();

        tokio::time::timeout(
            Duration::from_secs(2),
            cart_changes.wait_for(|state| state.snapshot.item_count == 1),
        )
        .await
        .unwrap()
        .unwrap();
    }
}
