//! Cross-store event bus.
//!
//! Stores never call each other. A store that changes state another store
//! depends on publishes a [`StoreEvent`]; interested stores subscribe.
//! Navigation and reload requests for the UI travel the same way.

use tokio::sync::broadcast;
use tracing::debug;

use vivias_core::ProductId;

/// Buffered events per subscriber before the slowest one starts lagging.
const EVENT_CAPACITY: usize = 64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    /// A wishlist item was moved into the cart on the server.
    WishlistMovedToCart { product_id: ProductId },
    /// The session identity changed; the UI should reload everything.
    ReloadRequested,
    /// The UI should navigate to `path`.
    Navigate { path: String },
    /// Local session state was cleared.
    LoggedOut,
}

/// Broadcast channel shared by all stores of one context.
#[derive(Debug, Clone)]
pub struct EventBus {
    sender: broadcast::Sender<StoreEvent>,
}

impl Default for EventBus {
    fn default() -> Self {
        Self::new()
    }
}

impl EventBus {
    #[must_use]
    pub fn new() -> Self {
        let (sender, _) = broadcast::channel(EVENT_CAPACITY);
        Self { sender }
    }

    /// Publish an event. Having no subscribers is fine.
    pub fn publish(&self, event: StoreEvent) {
        match self.sender.send(event) {
            Ok(receivers) => debug!(receivers, "Published store event"),
            Err(broadcast::error::SendError(event)) => {
                debug!(?event, "Store event had no subscribers");
            }
        }
    }

    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<StoreEvent> {
        self.sender.subscribe()
    }
}
