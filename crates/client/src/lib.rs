//! VIVIAS SHOP client synchronization layer.
//!
//! Client-side stores that mirror server state:
//!
//! - [`CartStore`] holds the server-computed cart and resyncs after every
//!   mutation instead of patching locally.
//! - [`WishlistStore`] does the same for saved products.
//! - [`AuthSession`] tracks the signed-in user and the token lifecycle, and
//!   resets the shopping stores on logout.
//!
//! Stores are cheap `Clone` handles. Their state lives in a
//! `tokio::sync::watch` channel so a UI can re-render whenever it changes.
//! [`StorefrontContext`] wires one of each together for an application
//! session.

#![cfg_attr(not(test), forbid(unsafe_code))]

pub mod api;
pub mod auth;
pub mod cart;
pub mod config;
pub mod context;
pub mod error;
pub mod events;
pub mod storage;
pub mod sync;
pub mod wishlist;

pub use api::{ApiError, HttpApiClient, StorefrontApi};
pub use auth::{AuthSession, AuthState};
pub use cart::{CartState, CartStore};
pub use config::{ClientConfig, ConfigError};
pub use context::{ContextError, StorefrontContext};
pub use error::{StoreError, accepted};
pub use events::{EventBus, StoreEvent};
pub use storage::{FileStorage, MemoryStorage, SessionStorage, StorageError};
pub use sync::SyncedState;
pub use wishlist::{WishlistState, WishlistStore};
