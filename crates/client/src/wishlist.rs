//! Wishlist synchronization store.
//!
//! Same contract as the cart store: the snapshot is replaced wholesale from
//! the server and every accepted mutation is followed by a resync.

use std::sync::Arc;

use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::sync::watch;
use tracing::{debug, instrument, warn};

use vivias_core::{ApiResponse, ProductId, WishlistSnapshot};

use crate::api::{AddToWishlistRequest, StorefrontApi};
use crate::error::StoreError;
use crate::events::{EventBus, StoreEvent};
use crate::storage::{SessionStorage, WISHLIST_KEY};
use crate::sync::{SyncCell, SyncedState};

pub type WishlistState = SyncedState<WishlistSnapshot>;

/// Client-side wishlist store. Clones share state.
#[derive(Clone)]
pub struct WishlistStore {
    inner: Arc<WishlistInner>,
}

struct WishlistInner {
    api: Arc<dyn StorefrontApi>,
    events: EventBus,
    cell: SyncCell<WishlistSnapshot>,
}

impl WishlistStore {
    #[must_use]
    pub fn new(
        api: Arc<dyn StorefrontApi>,
        storage: Arc<dyn SessionStorage>,
        events: EventBus,
    ) -> Self {
        Self {
            inner: Arc::new(WishlistInner {
                api,
                events,
                cell: SyncCell::new(storage, WISHLIST_KEY),
            }),
        }
    }

    /// Fetch the wishlist and replace the snapshot.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Api` on transport failure and
    /// `StoreError::Rejected` if the backend refuses the request.
    #[instrument(skip(self))]
    pub async fn sync(&self) -> Result<WishlistSnapshot, StoreError> {
        let cell = &self.inner.cell;
        let _loading = cell.begin();
        let ticket = cell.ticket();

        let response = self.inner.api.get_wishlist().await?;
        if !response.success {
            return Err(StoreError::rejected(&response));
        }

        let snapshot = response.data.unwrap_or_default();
        if !cell.apply(ticket, snapshot.clone()) {
            debug!(ticket, "Discarded stale wishlist snapshot");
        }
        Ok(snapshot)
    }

    /// Save a product to the wishlist.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidProduct` before any network call, and
    /// `StoreError::Api` on transport failure.
    #[instrument(skip(self))]
    pub async fn add_item(&self, product_id: ProductId) -> Result<ApiResponse<Value>, StoreError> {
        if !product_id.is_valid() {
            return Err(StoreError::InvalidProduct(product_id));
        }

        let _loading = self.inner.cell.begin();
        let response = self
            .inner
            .api
            .add_to_wishlist(&AddToWishlistRequest { product_id })
            .await?;
        self.resync_if_accepted(&response).await;
        Ok(response)
    }

    /// # Errors
    ///
    /// Returns `StoreError::InvalidProduct` before any network call, and
    /// `StoreError::Api` on transport failure.
    #[instrument(skip(self))]
    pub async fn remove_item(
        &self,
        product_id: ProductId,
    ) -> Result<ApiResponse<Value>, StoreError> {
        if !product_id.is_valid() {
            return Err(StoreError::InvalidProduct(product_id));
        }

        let _loading = self.inner.cell.begin();
        let response = self.inner.api.remove_from_wishlist(product_id).await?;
        self.resync_if_accepted(&response).await;
        Ok(response)
    }

    /// Empty the wishlist. An accepted clear sets an empty snapshot directly.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Api` on transport failure.
    #[instrument(skip(self))]
    pub async fn clear(&self) -> Result<ApiResponse<Value>, StoreError> {
        let cell = &self.inner.cell;
        let _loading = cell.begin();
        let ticket = cell.ticket();

        let response = self.inner.api.clear_wishlist().await?;
        if response.success {
            cell.apply(ticket, WishlistSnapshot::empty());
        }
        Ok(response)
    }

    /// Move a saved product into the cart.
    ///
    /// The server performs the move. On success the cart is told through the
    /// event bus and the wishlist resyncs.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::InvalidProduct` before any network call, and
    /// `StoreError::Api` on transport failure.
    #[instrument(skip(self))]
    pub async fn move_to_cart(
        &self,
        product_id: ProductId,
    ) -> Result<ApiResponse<Value>, StoreError> {
        if !product_id.is_valid() {
            return Err(StoreError::InvalidProduct(product_id));
        }

        let _loading = self.inner.cell.begin();
        let response = self.inner.api.move_wishlist_to_cart(product_id).await?;
        if response.success {
            self.inner
                .events
                .publish(StoreEvent::WishlistMovedToCart { product_id });
        }
        self.resync_if_accepted(&response).await;
        Ok(response)
    }

    /// Forget the wishlist locally. No network call.
    pub fn reset_store(&self) {
        self.inner.cell.reset();
        debug!("Wishlist store reset");
    }

    async fn resync_if_accepted<T>(&self, response: &ApiResponse<T>) {
        if !response.success {
            return;
        }
        if let Err(err) = self.sync().await {
            warn!(error = %err, "Wishlist resync after mutation failed");
        }
    }

    #[must_use]
    pub fn snapshot(&self) -> WishlistSnapshot {
        self.inner.cell.read(|state| state.snapshot.clone())
    }

    #[must_use]
    pub fn state(&self) -> WishlistState {
        self.inner.cell.current()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<WishlistState> {
        self.inner.cell.subscribe()
    }

    #[must_use]
    pub fn is_loading(&self) -> bool {
        self.inner.cell.read(WishlistState::is_loading)
    }

    #[must_use]
    pub fn item_count(&self) -> u32 {
        self.inner.cell.read(|state| state.snapshot.count)
    }

    /// Whether the last snapshot holds `product_id`.
    #[must_use]
    pub fn contains(&self, product_id: ProductId) -> bool {
        self.inner
            .cell
            .read(|state| state.snapshot.contains(product_id))
    }

    #[must_use]
    pub fn last_synced_at(&self) -> Option<DateTime<Utc>> {
        self.inner.cell.read(|state| state.last_synced_at)
    }
}

impl std::fmt::Debug for WishlistStore {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("WishlistStore")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}
