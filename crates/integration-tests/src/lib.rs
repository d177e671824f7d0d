//! Integration test support for VIVIAS SHOP.
//!
//! Everything runs in-process on ephemeral ports; no database or external
//! backend is needed.
//!
//! - [`shop`] - A fake shop backend (cart, wishlist, auth) the client stores
//!   talk to over real HTTP
//! - [`catalog`] - An in-memory catalog store mounted in the real storefront
//!   router, for exercising the query cache end to end
//!
//! # Running Tests
//!
//! ```bash
//! cargo test -p vivias-integration-tests
//! ```

pub mod catalog;
pub mod shop;

use std::net::SocketAddr;
use std::time::Duration;

use axum::Router;
use tokio::net::TcpListener;
use tokio::task::JoinHandle;
use url::Url;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Request timeout for clients in tests.
pub const CLIENT_TIMEOUT: Duration = Duration::from_secs(5);

/// A router served on `127.0.0.1` with an ephemeral port. Stops on drop.
pub struct TestServer {
    pub addr: SocketAddr,
    pub url: Url,
    handle: JoinHandle<()>,
}

impl TestServer {
    /// Bind an ephemeral port and serve `router` in the background.
    ///
    /// # Errors
    ///
    /// Returns an error if the port cannot be bound.
    pub async fn start(router: Router) -> Result<Self, BoxError> {
        let listener = TcpListener::bind("127.0.0.1:0").await?;
        let addr = listener.local_addr()?;
        let url = Url::parse(&format!("http://{addr}/"))?;

        let handle = tokio::spawn(async move {
            let _ = axum::serve(listener, router).await;
        });

        Ok(Self { addr, url, handle })
    }
}

impl Drop for TestServer {
    fn drop(&mut self) {
        self.handle.abort();
    }
}
