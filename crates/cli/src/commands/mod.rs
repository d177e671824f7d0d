//! Command implementations.
//!
//! Every command returns the text to print. Business failures reported by the
//! backend become [`CommandError::Store`] so the process exits non-zero with
//! the backend's message.

pub mod account;
pub mod cart;
pub mod catalog;
pub mod wishlist;

use thiserror::Error;
use tracing::debug;

use vivias_client::{ClientConfig, ConfigError, ContextError, StoreError, StorefrontContext};
use vivias_core::EmailError;

#[derive(Debug, Error)]
pub enum CommandError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error(transparent)]
    Context(#[from] ContextError),

    #[error(transparent)]
    Store(#[from] StoreError),

    #[error("Invalid email: {0}")]
    Email(#[from] EmailError),
}

/// A context with the session already resolved.
pub struct Session {
    context: StorefrontContext,
}

impl Session {
    /// Load configuration, build the context and verify any stored token.
    pub async fn start() -> Result<Self, CommandError> {
        let config = ClientConfig::from_env()?;
        let context = StorefrontContext::new(&config)?;
        let state = context.auth().initialize().await;
        debug!(?state, "Session initialized");

        Ok(Self { context })
    }

    pub const fn context(&self) -> &StorefrontContext {
        &self.context
    }
}
