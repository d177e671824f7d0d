//! Cart synchronization store.
//!
//! The store holds the cart exactly as the backend computed it. Mutations go
//! to the backend and, when accepted, are followed by a full [`CartStore::sync`]
//! so prices, coupons and shipping always come from the server. The store
//! never patches lines or recomputes totals.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::{broadcast, watch};
use tokio::task::JoinHandle;
use tracing::{debug, instrument, warn};

use vivias_core::{ApiResponse, CartLineId, CartSnapshot, Money, ProductId, Quantity, VariantOptions};

use crate::api::{AddToCartRequest, ApplyCouponRequest, StorefrontApi, UpdateCartItemRequest};
use crate::error::StoreError;
use crate::events::{EventBus, StoreEvent};
use crate::storage::{CART_KEY, SessionStorage};
use crate::sync::{SyncCell, SyncedState};

pub type CartState = SyncedState<CartSnapshot>;

/// Client-side cart store. Clones share state.
#[derive(Clone)]
pub struct CartStore {
    inner: Arc<CartInner>,
}

struct CartInner {
    api: Arc<dyn StorefrontApi>,
    cell: SyncCell<CartSnapshot>,
}

impl CartStore {
    #[must_use]
    pub fn new(api: Arc<dyn StorefrontApi>, storage: Arc<dyn SessionStorage>) -> Self {
        Self {
            inner: Arc::new(CartInner {
                api,
                cell: SyncCell::new(storage, CART_KEY),
            }),
        }
    }

    /// Fetch the cart and replace the snapshot.
    ///
    /// On failure the previous snapshot is kept.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Api` on transport failure and
    /// `StoreError::Rejected` if the backend refuses the request.
    #[instrument(skip(self))]
    pub async fn sync(&self) -> Result<CartSnapshot, StoreError> {
        let cell = &self.inner.cell;
        let _loading = cell.begin();
        let ticket = cell.ticket();

        let response = self.inner.api.get_cart().await?;
        if !response.success {
            return Err(StoreError::rejected(&response));
        }

        let snapshot = response.data.unwrap_or_default();
        if !cell.apply(ticket, snapshot.clone()) {
            debug!(ticket, "Discarded stale cart snapshot");
        }
        Ok(snapshot)
    }

    /// Add a product to the cart.
    ///
    /// Returns the backend's response, including business failures such as
    /// insufficient stock, so the UI can show its message.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidProduct` or `StoreError::InvalidQuantity`
    /// before any network call, and `StoreError::Api` on transport failure.
    #[instrument(skip(self, options))]
    pub async fn add_item(
        &self,
        product_id: ProductId,
        quantity: u32,
        options: Option<VariantOptions>,
    ) -> Result<ApiResponse<Value>, StoreError> {
        if !product_id.is_valid() {
            return Err(StoreError::InvalidProduct(product_id));
        }
        let quantity = Quantity::new(quantity)?;
        let request = AddToCartRequest {
            product_id,
            quantity,
            options: options.filter(|o| !o.is_empty()),
        };

        let _loading = self.inner.cell.begin();
        let response = self.inner.api.add_to_cart(&request).await?;
        self.resync_if_accepted(&response).await;
        Ok(response)
    }

    /// Change the quantity of a cart line.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidLine` or `StoreError::InvalidQuantity`
    /// before any network call, and `StoreError::Api` on transport failure.
    #[instrument(skip(self))]
    pub async fn update_item(
        &self,
        line_id: CartLineId,
        quantity: u32,
    ) -> Result<ApiResponse<Value>, StoreError> {
        if !line_id.is_valid() {
            return Err(StoreError::InvalidLine(line_id));
        }
        let request = UpdateCartItemRequest {
            quantity: Quantity::new(quantity)?,
        };

        let _loading = self.inner.cell.begin();
        let response = self.inner.api.update_cart_item(line_id, &request).await?;
        self.resync_if_accepted(&response).await;
        Ok(response)
    }

    /// Remove a cart line.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidLine` before any network call, and
    /// `StoreError::Api` on transport failure.
    #[instrument(skip(self))]
    pub async fn remove_item(&self, line_id: CartLineId) -> Result<ApiResponse<Value>, StoreError> {
        if !line_id.is_valid() {
            return Err(StoreError::InvalidLine(line_id));
        }

        let _loading = self.inner.cell.begin();
        let response = self.inner.api.remove_from_cart(line_id).await?;
        self.resync_if_accepted(&response).await;
        Ok(response)
    }

    /// Empty the cart.
    ///
    /// The resulting state is known, so an accepted clear sets an empty
    /// snapshot without a resync round-trip.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Api` on transport failure.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<ApiResponse<Value>, StoreError> {
        let cell = &self.inner.cell;
        let _loading = cell.begin();
        let ticket = cell.ticket();

        let response = self.inner.api.clear_cart().await?;
        if response.success {
            cell.apply(ticket, CartSnapshot::empty());
        }
        Ok(response)
    }

    /// Apply a coupon code.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidCoupon` for a blank code before any
    /// network call, and `StoreError::Api` on transport failure.
    #[instrument(skip(self))]
    pub async fn apply_coupon(&self, code: &str) -> Result<ApiResponse<Value>, StoreError> {
        let code = code.trim();
        if code.is_empty() {
            return Err(StoreError::InvalidCoupon);
        }
        let request = ApplyCouponRequest {
            code: code.to_uppercase(),
        };

        let _loading = self.inner.cell.begin();
        let response = self.inner.api.apply_coupon(&request).await?;
        self.resync_if_accepted(&response).await;
        Ok(response)
    }

    /// Remove the applied coupon.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Api` on transport failure.
    #[instrument(skip(self))]
    pub async fn remove_coupon(&self) -> Result<ApiResponse<Value>, StoreError> {
        let _loading = self.inner.cell.begin();
        let response = self.inner.api.remove_coupon().await?;
        self.resync_if_accepted(&response).await;
        Ok(response)
    }

    /// Forget the cart locally. No network call.
    ///
    /// A sync that is still in flight will not bring the old cart back.
    pub fn reset_store(&self) {
        self.inner.cell.reset();
        debug!("Cart store reset");
    }

    /// Resync after an accepted mutation. A failed resync keeps the previous
    /// snapshot; the mutation itself already succeeded.
    async fn resync_if_accepted<T>(&self, response: &ApiResponse<T>) {
        if !response.success {
            return;
        }
        if let Err(err) = self.sync().await {
            warn!(error = %err, "Cart resync after mutation failed");
        }
    }

    /// Resync whenever a wishlist item moves into the cart.
    ///
    /// The task ends when the bus is dropped.
    pub fn spawn_event_listener(&self, events: &EventBus) -> JoinHandle<()> {
        let store = self.clone();
        let mut receiver = events.subscribe();

        tokio::spawn(async move {
            loop {
                match receiver.recv().await {
                    Ok(StoreEvent::WishlistMovedToCart { product_id }) => {
                        debug!(%product_id, "Wishlist item moved, resyncing cart");
                        if let Err(err) = store.sync().await {
                            warn!(error = %err, "Cart resync after wishlist move failed");
                        }
                    }
                    Ok(_) => {}
                    Err(broadcast::error::RecvError::Lagged(skipped)) => {
                        warn!(skipped, "Cart listener lagged, resyncing");
                        if let Err(err) = store.sync().await {
                            warn!(error = %err, "Cart resync after lag failed");
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                }
            }
        })
    }

    /// The current snapshot.
    #[must_use]
    pub fn snapshot(&self) -> CartSnapshot {
        self.inner.cell.read(|state| state.snapshot.clone())
    }

    /// The full store state.
    #[must_use]
    pub fn state(&self) -> CartState {
        self.inner.cell.current()
    }

    /// Watch the store state.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<CartState> {
        self.inner.cell.subscribe()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.cell.read(CartState::is_loading)
    }

    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.inner.cell.read(|state| state.snapshot.item_count)
    }

    /// Total as computed by the backend.
    #[must_use]
    pub fn total(&self) -> Money {
        self.inner.cell.read(|state| state.snapshot.total)
    }

    #[must_use]
    pub fn last_synced_at(&self) -> Option<DateTime<Utc>> {
        self.inner.cell.read(|state| state.last_synced_at)
    }
}

impl std::fmt::Debug for CartStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("CartStore")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use std::time::Duration;

    use mockall::Sequence;
    use serde_json::json;

    use super::*;
    use crate::api::{ApiError, MockStorefrontApi};
    use crate::storage::MemoryStorage;

    fn cart(count: u32, subtotal: i64, shipping: i64, discount: i64, coupon: Option<&str>) -> CartSnapshot {
        serde_json::from_value(json!({
            "items": [],
            "count": count,
            "subtotal": subtotal,
            "shipping": shipping,
            "discount": discount,
            "total": subtotal - discount + shipping,
            "coupon": coupon.map(|code| json!({
                "code": code,
                "discount": {"type": "percentage", "rate": "10"}
            })),
        }))
        .unwrap()
    }

    fn store(api: MockStorefrontApi) -> (CartStore, Arc<MemoryStorage>) {
        let storage = Arc::new(MemoryStorage::new());
        (CartStore::new(Arc::new(api), storage.clone()), storage)
    }

    fn accepted() -> Result<ApiResponse<Value>, ApiError> {
        Ok(ApiResponse::ok(json!({})))
    }

    fn unavailable<T>() -> Result<ApiResponse<T>, ApiError> {
        Err(ApiError::Status {
            status: 503,
            body: "maintenance".to_string(),
        })
    }

    #[tokio::test]
    async fn test_add_item_resyncs_from_server() {
        let mut api = MockStorefrontApi::new();
        let mut seq = Sequence::new();
        api.expect_add_to_cart()
            .withf(|request| {
                request.product_id == ProductId::new(42) && request.quantity.get() == 2
            })
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| accepted());
        api.expect_get_cart()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(ApiResponse::ok(cart(2, 5000, 1000, 0, None))));
        let (store, storage) = store(api);

        let response = store.add_item(ProductId::new(42), 2, None).await.unwrap();

        assert!(response.success);
        assert_eq!(store.item_count(), 2);
        assert_eq!(store.total(), Money::from_whole(6000));
        assert!(!store.is_loading());
        assert!(store.last_synced_at().is_some());
        assert!(storage.get(CART_KEY).unwrap().is_some());
    }

    #[tokio::test]
    async fn test_quantity_boundaries_checked_before_network() {
        let mut api = MockStorefrontApi::new();
        api.expect_add_to_cart().times(2).returning(|_| accepted());
        api.expect_get_cart()
            .returning(|| Ok(ApiResponse::ok(cart(1, 1000, 0, 0, None))));
        let (store, _) = store(api);

        for rejected in [0, 101] {
            let err = store
                .add_item(ProductId::new(1), rejected, None)
                .await
                .unwrap_err();
            assert!(matches!(err, StoreError::InvalidQuantity(_)));
        }
        for valid in [1, 100] {
            assert!(store.add_item(ProductId::new(1), valid, None).await.is_ok());
        }
    }

    #[tokio::test]
    async fn test_invalid_ids_are_rejected_locally() {
        let (store, _) = store(MockStorefrontApi::new());

        assert!(matches!(
            store.add_item(ProductId::new(0), 1, None).await,
            Err(StoreError::InvalidProduct(_))
        ));
        assert!(matches!(
            store.update_item(CartLineId::new(-1), 1).await,
            Err(StoreError::InvalidLine(_))
        ));
        assert!(matches!(
            store.update_item(CartLineId::new(3), 101).await,
            Err(StoreError::InvalidQuantity(_))
        ));
        assert!(matches!(
            store.apply_coupon("  ").await,
            Err(StoreError::InvalidCoupon)
        ));
    }

    #[tokio::test]
    async fn test_business_failure_is_returned_without_resync() {
        let mut api = MockStorefrontApi::new();
        api.expect_add_to_cart()
            .returning(|_| Ok(ApiResponse::failure("Stok tidak mencukupi")));
        api.expect_get_cart().never();
        let (store, _) = store(api);

        let response = store.add_item(ProductId::new(5), 3, None).await.unwrap();

        assert!(!response.success);
        assert_eq!(response.error_message(), "Stok tidak mencukupi");
        assert!(store.snapshot().is_empty());
        assert!(!store.is_loading());
    }

    #[tokio::test]
    async fn test_transport_failure_keeps_snapshot() {
        let mut api = MockStorefrontApi::new();
        let mut seq = Sequence::new();
        api.expect_get_cart()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(ApiResponse::ok(cart(1, 2000, 1000, 0, None))));
        api.expect_get_cart()
            .times(1)
            .in_sequence(&mut seq)
            .returning(unavailable);
        api.expect_remove_from_cart().returning(|_| unavailable());
        let (store, _) = store(api);

        store.sync().await.unwrap();
        let before = store.state();

        assert!(store.sync().await.is_err());
        assert!(store.remove_item(CartLineId::new(1)).await.is_err());

        let after = store.state();
        assert_eq!(after.snapshot, before.snapshot);
        assert_eq!(after.last_synced_at, before.last_synced_at);
        assert!(!after.is_loading());
    }

    #[tokio::test]
    async fn test_coupon_apply_and_remove() {
        let mut api = MockStorefrontApi::new();
        let mut seq = Sequence::new();
        api.expect_apply_coupon()
            .withf(|request| request.code == "SAVE10")
            .times(1)
            .in_sequence(&mut seq)
            .returning(|_| accepted());
        api.expect_get_cart()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(ApiResponse::ok(cart(2, 5000, 1000, 500, Some("SAVE10")))));
        api.expect_remove_coupon()
            .times(1)
            .in_sequence(&mut seq)
            .returning(accepted);
        api.expect_get_cart()
            .times(1)
            .in_sequence(&mut seq)
            .returning(|| Ok(ApiResponse::ok(cart(2, 5000, 1000, 0, None))));
        let (store, _) = store(api);

        store.apply_coupon("save10").await.unwrap();
        let discounted = store.snapshot();
        assert_eq!(discounted.discount, Money::from_whole(500));
        assert_eq!(discounted.total, Money::from_whole(5500));
        assert_eq!(discounted.coupon.unwrap().code, "SAVE10");

        store.remove_coupon().await.unwrap();
        let restored = store.snapshot();
        assert!(restored.discount.is_zero());
        assert!(restored.coupon.is_none());
        assert_eq!(restored.total, Money::from_whole(6000));
    }

    #[tokio::test]
    async fn test_clear_sets_empty_snapshot_without_resync() {
        let mut api = MockStorefrontApi::new();
        api.expect_get_cart()
            .times(1)
            .returning(|| Ok(ApiResponse::ok(cart(3, 9000, 1000, 0, None))));
        api.expect_clear_cart().times(1).returning(accepted);
        let (store, _) = store(api);

        store.sync().await.unwrap();
        store.clear().await.unwrap();

        assert!(store.snapshot().is_empty());
        assert_eq!(store.item_count(), 0);
        assert!(store.last_synced_at().is_some());
    }

    #[tokio::test]
    async fn test_reset_store_is_local() {
        let mut api = MockStorefrontApi::new();
        api.expect_get_cart()
            .times(1)
            .returning(|| Ok(ApiResponse::ok(cart(2, 5000, 1000, 0, None))));
        let (store, _) = store(api);
        store.sync().await.unwrap();

        store.reset_store();

        let state = store.state();
        assert!(state.snapshot.is_empty());
        assert_eq!(state.snapshot.total, Money::ZERO);
        assert!(state.last_synced_at.is_none());
    }

    #[tokio::test]
    async fn test_reset_wins_over_in_flight_sync() {
        let mut api = MockStorefrontApi::new();
        api.expect_get_cart().returning(|| Ok(ApiResponse::ok(cart(4, 8000, 0, 0, None))));
        let (store, _) = store(api);

        let ticket = store.inner.cell.ticket();
        store.reset_store();
        assert!(!store.inner.cell.apply(ticket, cart(4, 8000, 0, 0, None)));
        assert!(store.snapshot().is_empty());

        // A sync issued after the reset still applies.
        store.sync().await.unwrap();
        assert_eq!(store.item_count(), 4);
    }

    #[tokio::test]
    async fn test_listener_resyncs_on_wishlist_move() {
        let mut api = MockStorefrontApi::new();
        api.expect_get_cart()
            .times(1)
            .returning(|| Ok(ApiResponse::ok(cart(1, 3000, 1000, 0, None))));
        let (store, _) = store(api);
        let events = EventBus::new();
        let mut changes = store.subscribe();
        let listener = store.spawn_event_listener(&events);

        events.publish(StoreEvent::WishlistMovedToCart {
            product_id: ProductId::new(8),
        });

        tokio::time::timeout(
            Duration::from_secs(2),
            changes.wait_for(|state| state.snapshot.item_count == 1),
        )
        .await
        .unwrap()
        .unwrap();
        listener.abort();
    }
}
