//! Session and token lifecycle.
//!
//! [`AuthSession`] owns the bearer token. It verifies a stored token on
//! startup, stores a new one on login or registration, and on logout resets
//! the shopping stores before anything else so no cart data outlives the
//! session.

use std::sync::Arc;

use secrecy::SecretString;
use tokio::sync::watch;
use tracing::{debug, info, instrument, warn};

use vivias_core::{ApiResponse, AuthPayload, FieldErrors, LoginCredentials, RegistrationData, User};

use crate::api::StorefrontApi;
use crate::cart::CartStore;
use crate::error::StoreError;
use crate::events::{EventBus, StoreEvent};
use crate::storage::{AUTH_TOKEN_KEY, CART_KEY, SessionStorage, WISHLIST_KEY};
use crate::wishlist::WishlistStore;

/// Where the session stands.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub enum AuthState {
    /// Not initialized yet.
    #[default]
    Unknown,
    /// Verifying a stored token.
    Checking,
    Authenticated(User),
    Anonymous,
}

impl AuthState {
    /// Whether the session is still being resolved.
    #[must_use]
    pub const fn is_loading(&self) -> bool {
        matches!(self, Self::Unknown | Self::Checking)
    }

    #[must_use]
    pub const fn user(&self) -> Option<&User> {
        match self {
            Self::Authenticated(user) => Some(user),
            _ => None,
        }
    }

    #[must_use]
    pub const fn is_authenticated(&self) -> bool {
        matches!(self, Self::Authenticated(_))
    }
}

/// Client-side session. Clones share state.
#[derive(Clone)]
pub struct AuthSession {
    inner: Arc<AuthInner>,
}

struct AuthInner {
    api: Arc<dyn StorefrontApi>,
    storage: Arc<dyn SessionStorage>,
    events: EventBus,
    cart: CartStore,
    wishlist: WishlistStore,
    state: watch::Sender<AuthState>,
}

impl AuthSession {
    #[must_use]
    pub fn new(
        api: Arc<dyn StorefrontApi>,
        storage: Arc<dyn SessionStorage>,
        events: EventBus,
        cart: CartStore,
        wishlist: WishlistStore,
    ) -> Self {
        let (state, _) = watch::channel(AuthState::Unknown);
        Self {
            inner: Arc::new(AuthInner {
                api,
                storage,
                events,
                cart,
                wishlist,
                state,
            }),
        }
    }

    /// Resolve the session from the stored token.
    ///
    /// A token the backend does not accept, or cannot be checked, is
    /// discarded and the session becomes anonymous.
    #[instrument(skip(self))]
    pub async fn initialize(&self) -> AuthState {
        let token = match self.inner.storage.get(AUTH_TOKEN_KEY) {
            Ok(token) => token.filter(|t| !t.trim().is_empty()),
            Err(err) => {
                warn!(error = %err, "Failed to read stored auth token");
                None
            }
        };

        let Some(token) = token else {
            self.set_state(AuthState::Anonymous);
            return self.state();
        };

        self.inner.api.set_auth_token(Some(SecretString::from(token)));
        self.set_state(AuthState::Checking);

        match self.inner.api.get_current_user().await {
            Ok(ApiResponse {
                success: true,
                data: Some(user),
                ..
            }) => {
                debug!(user_id = %user.id, "Stored token verified");
                self.set_state(AuthState::Authenticated(user));
            }
            Ok(response) => {
                info!(message = %response.error_message(), "Stored token rejected");
                self.forget_token();
            }
            Err(err) => {
                warn!(error = %err, "Could not verify stored token");
                self.forget_token();
            }
        }
        self.state()
    }

    /// Sign in.
    ///
    /// A business failure such as wrong credentials is returned as the
    /// response, not as an error.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Api` on transport failure.
    #[instrument(skip(self, credentials), fields(email = %credentials.email))]
    pub async fn login(
        &self,
        credentials: &LoginCredentials,
    ) -> Result<ApiResponse<User>, StoreError> {
        let response = self.inner.api.login(credentials).await?;
        self.establish(response)
    }

    /// Create an account and sign in.
    ///
    /// # Errors
    ///
    /// Returns `StoreError::Validation` when the name is blank or the
    /// password confirmation does not match, before any network call, and
    /// `StoreError::Api` on transport failure.
    #[instrument(skip(self, data), fields(email = %data.email))]
    pub async fn register(
        &self,
        data: &RegistrationData,
    ) -> Result<ApiResponse<User>, StoreError> {
        let errors = validate_registration(data);
        if !errors.is_empty() {
            return Err(StoreError::Validation(errors));
        }

        let response = self.inner.api.register(data).await?;
        self.establish(response)
    }

    /// Sign out.
    ///
    /// Local state is cleared first and unconditionally. The backend call is
    /// best-effort.
    #[instrument(skip(self))]
    pub async fn logout(&self) {
        self.inner.cart.reset_store();
        self.inner.wishlist.reset_store();
        for key in [CART_KEY, WISHLIST_KEY, AUTH_TOKEN_KEY] {
            if let Err(err) = self.inner.storage.remove(key) {
                warn!(error = %err, key, "Failed to clear stored session data");
            }
        }
        self.set_state(AuthState::Anonymous);

        match self.inner.api.logout().await {
            Ok(response) if !response.success => {
                warn!(message = %response.error_message(), "Server logout rejected");
            }
            Ok(_) => debug!("Server session closed"),
            Err(err) => warn!(error = %err, "Server logout failed"),
        }
        self.inner.api.set_auth_token(None);

        self.inner.events.publish(StoreEvent::LoggedOut);
        self.inner.events.publish(StoreEvent::Navigate {
            path: "/".to_string(),
        });
    }

    fn establish(
        &self,
        response: ApiResponse<AuthPayload>,
    ) -> Result<ApiResponse<User>, StoreError> {
        let ApiResponse {
            success,
            data,
            message,
            errors,
        } = response;

        let payload = match data {
            Some(payload) if success => payload,
            _ if !success => {
                self.set_state(AuthState::Anonymous);
                return Ok(ApiResponse {
                    success,
                    data: None,
                    message,
                    errors,
                });
            }
            _ => {
                return Err(StoreError::Rejected {
                    message: "authentication response carried no session".to_string(),
                    errors,
                });
            }
        };

        if let Err(err) = self.inner.storage.set(AUTH_TOKEN_KEY, &payload.token) {
            warn!(error = %err, "Failed to persist auth token");
        }
        self.inner
            .api
            .set_auth_token(Some(SecretString::from(payload.token)));

        info!(user_id = %payload.user.id, "Signed in");
        self.set_state(AuthState::Authenticated(payload.user.clone()));
        // A full reload lets the backend merge the guest cart into the account.
        self.inner.events.publish(StoreEvent::ReloadRequested);

        Ok(ApiResponse {
            success,
            data: Some(payload.user),
            message,
            errors,
        })
    }

    fn forget_token(&self) {
        if let Err(err) = self.inner.storage.remove(AUTH_TOKEN_KEY) {
            warn!(error = %err, "Failed to remove stored auth token");
        }
        self.inner.api.set_auth_token(None);
        self.set_state(AuthState::Anonymous);
    }

    fn set_state(&self, state: AuthState) {
        self.inner.state.send_replace(state);
    }

    #[must_use]
    pub fn state(&self) -> AuthState {
        self.inner.state.borrow().clone()
    }

    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.inner.state.subscribe()
    }

    #[must_use]
    pub fn user(&self) -> Option<User> {
        self.inner.state.borrow().user().cloned()
    }
}

impl std::fmt::Debug for AuthSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AuthSession")
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

fn validate_registration(data: &RegistrationData) -> FieldErrors {
    let mut errors = FieldErrors::new();
    if data.name.trim().is_empty() {
        errors
            .entry("name".to_string())
            .or_default()
            .push("is required".to_string());
    }
    if data.password.is_empty() {
        errors
            .entry("password".to_string())
            .or_default()
            .push("is required".to_string());
    }
    if data.password != data.password_confirmation {
        errors
            .entry("password_confirmation".to_string())
            .or_default()
            .push("does not match".to_string());
    }
    errors
}

#[cfg(test)]
#[allow(clippy::unwrap_used)]
mod tests {
    use secrecy::ExposeSecret;
    use serde_json::json;

    use super::*;
    use crate::api::{ApiError, MockStorefrontApi};
    use crate::storage::MemoryStorage;
    use vivias_core::{CartSnapshot, Email};

    fn user() -> User {
        serde_json::from_value(json!({"id": 5, "name": "Ana", "email": "ana@vivias.id"})).unwrap()
    }

    fn session(api: MockStorefrontApi, storage: Arc<MemoryStorage>) -> (AuthSession, CartStore, EventBus) {
        let api: Arc<dyn StorefrontApi> = Arc::new(api);
        let events = EventBus::new();
        let cart = CartStore::new(api.clone(), storage.clone());
        let wishlist = WishlistStore::new(api.clone(), storage.clone(), events.clone());
        let session = AuthSession::new(api, storage, events.clone(), cart.clone(), wishlist);
        (session, cart, events)
    }

    fn credentials() -> LoginCredentials {
        LoginCredentials {
            email: Email::parse("ana@vivias.id").unwrap(),
            password: "rahasia123".to_string(),
            remember: false,
        }
    }

    #[tokio::test]
    async fn test_initialize_without_token_is_anonymous() {
        let (session, _, _) = session(MockStorefrontApi::new(), Arc::new(MemoryStorage::new()));

        assert!(session.state().is_loading());
        assert_eq!(session.initialize().await, AuthState::Anonymous);
    }

    #[tokio::test]
    async fn test_initialize_verifies_stored_token() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(AUTH_TOKEN_KEY, "tok_valid").unwrap();

        let mut api = MockStorefrontApi::new();
        api.expect_set_auth_token()
            .withf(|token| token.as_ref().is_some_and(|t| t.expose_secret() == "tok_valid"))
            .times(1)
            .return_const(());
        api.expect_get_current_user()
            .returning(|| Ok(ApiResponse::ok(user())));
        let (session, _, _) = session(api, storage);

        let state = session.initialize().await;

        assert!(state.is_authenticated());
        assert_eq!(session.user().unwrap().name, "Ana");
    }

    #[tokio::test]
    async fn test_invalid_token_is_cleared() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(AUTH_TOKEN_KEY, "tok_expired").unwrap();

        let mut api = MockStorefrontApi::new();
        api.expect_set_auth_token().times(2).return_const(());
        api.expect_get_current_user()
            .returning(|| Err(ApiError::Status { status: 401, body: "Unauthenticated".to_string() }));
        let (session, _, _) = session(api, storage.clone());

        assert_eq!(session.initialize().await, AuthState::Anonymous);
        assert_eq!(storage.get(AUTH_TOKEN_KEY).unwrap(), None);
    }

    #[tokio::test]
    async fn test_login_stores_token_and_requests_reload() {
        let storage = Arc::new(MemoryStorage::new());
        let mut api = MockStorefrontApi::new();
        api.expect_login().returning(|_| {
            Ok(ApiResponse::ok(AuthPayload {
                token: "tok_new".to_string(),
                user: user(),
            }))
        });
        api.expect_set_auth_token().times(1).return_const(());
        let (session, _, events) = session(api, storage.clone());
        let mut receiver = events.subscribe();

        let response = session.login(&credentials()).await.unwrap();

        assert!(response.success);
        assert_eq!(response.data.unwrap().id, user().id);
        assert!(session.state().is_authenticated());
        assert_eq!(storage.get(AUTH_TOKEN_KEY).unwrap().as_deref(), Some("tok_new"));
        assert_eq!(receiver.recv().await.unwrap(), StoreEvent::ReloadRequested);
    }

    #[tokio::test]
    async fn test_wrong_password_is_a_response() {
        let mut api = MockStorefrontApi::new();
        api.expect_login()
            .returning(|_| Ok(ApiResponse::failure("Email atau password salah")));
        api.expect_set_auth_token().never();
        let (session, _, _) = session(api, Arc::new(MemoryStorage::new()));

        let response = session.login(&credentials()).await.unwrap();

        assert!(!response.success);
        assert_eq!(response.error_message(), "Email atau password salah");
        assert_eq!(session.state(), AuthState::Anonymous);
    }

    #[tokio::test]
    async fn test_register_validates_locally() {
        let (session, _, _) = session(MockStorefrontApi::new(), Arc::new(MemoryStorage::new()));
        let data = RegistrationData {
            name: "  ".to_string(),
            email: Email::parse("ana@vivias.id").unwrap(),
            password: "rahasia123".to_string(),
            password_confirmation: "rahasia124".to_string(),
            phone: None,
        };

        let err = session.register(&data).await.unwrap_err();

        let StoreError::Validation(errors) = err else {
            panic!("expected validation error, got {err:?}");
        };
        assert!(errors.contains_key("name"));
        assert!(errors.contains_key("password_confirmation"));
        assert!(!errors.contains_key("password"));
    }

    #[tokio::test]
    async fn test_logout_clears_local_state_when_server_fails() {
        let storage = Arc::new(MemoryStorage::new());
        storage.set(AUTH_TOKEN_KEY, "tok_valid").unwrap();

        let mut api = MockStorefrontApi::new();
        api.expect_set_auth_token().return_const(());
        api.expect_get_current_user()
            .returning(|| Ok(ApiResponse::ok(user())));
        api.expect_get_cart().times(1).returning(|| {
            Ok(ApiResponse::ok(CartSnapshot {
                item_count: 2,
                ..CartSnapshot::default()
            }))
        });
        api.expect_logout()
            .times(1)
            .returning(|| Err(ApiError::Status { status: 500, body: String::new() }));
        let (session, cart, events) = session(api, storage.clone());
        let mut receiver = events.subscribe();

        session.initialize().await;
        cart.sync().await.unwrap();
        assert!(storage.get(CART_KEY).unwrap().is_some());

        session.logout().await;

        assert!(cart.snapshot().is_empty());
        assert!(cart.last_synced_at().is_none());
        assert_eq!(storage.get(CART_KEY).unwrap(), None);
        assert_eq!(storage.get(AUTH_TOKEN_KEY).unwrap(), None);
        assert_eq!(session.state(), AuthState::Anonymous);
        assert_eq!(receiver.recv().await.unwrap(), StoreEvent::LoggedOut);
        assert_eq!(
            receiver.recv().await.unwrap(),
            StoreEvent::Navigate {
                path: "/".to_string()
            }
        );
    }
}
