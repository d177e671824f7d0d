//! Session lifecycle over HTTP with file-backed storage.

use std::path::Path;

use vivias_client::storage::{AUTH_TOKEN_KEY, CART_KEY};
use vivias_client::{
    AuthState, ClientConfig, FileStorage, SessionStorage, StoreError, StoreEvent,
    StorefrontContext,
};
use vivias_core::{Email, LoginCredentials, ProductId, RegistrationData};
use vivias_integration_tests::shop::{FakeShop, SHOPPER_EMAIL, SHOPPER_PASSWORD};
use vivias_integration_tests::{CLIENT_TIMEOUT, TestServer};

fn config(server: &TestServer, dir: &Path) -> ClientConfig {
    ClientConfig {
        api_url: server.url.clone(),
        storage_path: dir.join("session.json"),
        http_timeout: CLIENT_TIMEOUT,
    }
}

fn credentials(password: &str) -> LoginCredentials {
    LoginCredentials {
        email: Email::parse(SHOPPER_EMAIL).unwrap(),
        password: password.to_string(),
        remember: false,
    }
}

fn stored(config: &ClientConfig, key: &str) -> Option<String> {
    FileStorage::open(&config.storage_path)
        .unwrap()
        .get(key)
        .unwrap()
}

#[tokio::test]
async fn test_fresh_session_is_anonymous() {
    let shop = FakeShop::new();
    let server = TestServer::start(shop.router()).await.unwrap();
    let dir = tempfile::tempdir().unwrap();

    let context = StorefrontContext::new(&config(&server, dir.path())).unwrap();

    assert_eq!(context.auth().state(), AuthState::Unknown);
    assert_eq!(context.auth().initialize().await, AuthState::Anonymous);
}

#[tokio::test]
async fn test_login_persists_token_across_restarts() {
    let shop = FakeShop::new();
    let server = TestServer::start(shop.router()).await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let config = config(&server, dir.path());

    {
        let context = StorefrontContext::new(&config).unwrap();
        let mut events = context.events().subscribe();

        let response = context
            .auth()
            .login(&credentials(SHOPPER_PASSWORD))
            .await
            .unwrap();

        assert!(response.success);
        assert_eq!(response.data.map(|u| u.name), Some("Ana".to_string()));
        assert!(context.auth().state().is_authenticated());
        assert_eq!(events.recv().await.unwrap(), StoreEvent::ReloadRequested);
    }

    assert!(stored(&config, AUTH_TOKEN_KEY).is_some());

    let restarted = StorefrontContext::new(&config).unwrap();
    let state = restarted.auth().initialize().await;
    assert_eq!(
        state.user().map(|u| u.email.as_str().to_string()),
        Some(SHOPPER_EMAIL.to_string())
    );
}

#[tokio::test]
async fn test_wrong_password_is_a_response() {
    let shop = FakeShop::new();
    let server = TestServer::start(shop.router()).await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let config = config(&server, dir.path());
    let context = StorefrontContext::new(&config).unwrap();

    let response = context
        .auth()
        .login(&credentials("salah"))
        .await
        .unwrap();

    assert!(!response.success);
    assert_eq!(response.error_message(), "Email atau password salah");
    assert_eq!(context.auth().state(), AuthState::Anonymous);
    assert!(stored(&config, AUTH_TOKEN_KEY).is_none());
    assert_eq!(shop.session_count(), 0);
}

#[tokio::test]
async fn test_revoked_token_is_discarded() {
    let shop = FakeShop::new();
    let server = TestServer::start(shop.router()).await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let config = config(&server, dir.path());
    FileStorage::open(&config.storage_path)
        .unwrap()
        .set(AUTH_TOKEN_KEY, "tok-expired")
        .unwrap();

    let context = StorefrontContext::new(&config).unwrap();

    assert_eq!(context.auth().initialize().await, AuthState::Anonymous);
    assert!(stored(&config, AUTH_TOKEN_KEY).is_none());
}

#[tokio::test]
async fn test_register_then_duplicate() {
    let shop = FakeShop::new();
    let server = TestServer::start(shop.router()).await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let context = StorefrontContext::new(&config(&server, dir.path())).unwrap();
    let form = RegistrationData {
        name: "Sari".to_string(),
        email: Email::parse("sari@vivias.id").unwrap(),
        password: "kebaya2026".to_string(),
        password_confirmation: "kebaya2026".to_string(),
        phone: Some("08123456789".to_string()),
    };

    let response = context.auth().register(&form).await.unwrap();
    assert!(response.success);
    assert_eq!(
        context.auth().user().and_then(|u| u.phone),
        Some("08123456789".to_string())
    );

    let again = context.auth().register(&form).await.unwrap();
    assert!(!again.success);
    assert!(again.errors.contains_key("email"));
    assert_eq!(context.auth().state(), AuthState::Anonymous);
}

#[tokio::test]
async fn test_mismatched_confirmation_never_reaches_server() {
    let shop = FakeShop::new();
    let server = TestServer::start(shop.router()).await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let context = StorefrontContext::new(&config(&server, dir.path())).unwrap();
    let form = RegistrationData {
        name: "Sari".to_string(),
        email: Email::parse("sari@vivias.id").unwrap(),
        password: "kebaya2026".to_string(),
        password_confirmation: "kebaya2025".to_string(),
        phone: None,
    };

    let err = context.auth().register(&form).await.unwrap_err();

    assert!(matches!(err, StoreError::Validation(errors) if errors.contains_key("password_confirmation")));
    assert_eq!(shop.session_count(), 0);
}

#[tokio::test]
async fn test_logout_clears_local_state_even_if_server_fails() {
    let shop = FakeShop::new();
    let server = TestServer::start(shop.router()).await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let config = config(&server, dir.path());
    let context = StorefrontContext::new(&config).unwrap();
    context
        .auth()
        .login(&credentials(SHOPPER_PASSWORD))
        .await
        .unwrap();
    context
        .cart()
        .add_item(ProductId::new(42), 1, None)
        .await
        .unwrap();
    assert!(stored(&config, CART_KEY).is_some());
    shop.fail_logout(true);
    let mut events = context.events().subscribe();

    context.auth().logout().await;

    assert_eq!(context.auth().state(), AuthState::Anonymous);
    assert!(context.cart().snapshot().is_empty());
    assert!(context.cart().last_synced_at().is_none());
    assert!(stored(&config, AUTH_TOKEN_KEY).is_none());
    assert!(stored(&config, CART_KEY).is_none());
    assert_eq!(events.recv().await.unwrap(), StoreEvent::LoggedOut);
    assert_eq!(
        events.recv().await.unwrap(),
        StoreEvent::Navigate {
            path: "/".to_string()
        }
    );
    // The server never saw the logout, so its session is still open.
    assert_eq!(shop.session_count(), 1);
}

#[tokio::test]
async fn test_logout_closes_server_session() {
    let shop = FakeShop::new();
    let server = TestServer::start(shop.router()).await.unwrap();
    let dir = tempfile::tempdir().unwrap();
    let context = StorefrontContext::new(&config(&server, dir.path())).unwrap();
    context
        .auth()
        .login(&credentials(SHOPPER_PASSWORD))
        .await
        .unwrap();
    assert_eq!(shop.session_count(), 1);

    context.auth().logout().await;

    assert_eq!(shop.session_count(), 0);
    assert_eq!(context.auth().initialize().await, AuthState::Anonymous);
}
