//! Session lifecycle: login, restore, logout and account operations.

use std::sync::Arc;

use paperchat_core::{
    ApiClient, ApiError, AuthManager, FileTokenStore, MemoryTokenStore, ProfileUpdate, Registration,
    TokenStore,
};
use serde_json::json;
use wiremock::matchers::{body_json, header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn user_body() -> serde_json::Value {
    json!({"id": 1, "username": "ada", "email": "ada@example.com", "first_name": "Ada", "last_name": "Lovelace"})
}

#[tokio::test]
async fn test_login_stores_token_and_fetches_user() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/user"))
        .and(header("Authorization", "Bearer fresh-token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_body()))
        .expect(1)
        .mount(&server)
        .await;

    let dir = tempfile::TempDir::new().unwrap();
    let token_path = dir.path().join("session.json");
    let tokens: Arc<dyn TokenStore> = Arc::new(FileTokenStore::open(&token_path));
    let api = ApiClient::new(&server.uri(), tokens.clone());
    let manager = AuthManager::new(&api);
    assert!(!manager.is_authenticated());

    manager.login("fresh-token").await.unwrap();

    let session = manager.session();
    assert_eq!(session.token.as_deref(), Some("fresh-token"));
    assert_eq!(session.user.unwrap().display_name(), "Ada Lovelace");

    // Survives a restart.
    let reopened = FileTokenStore::open(&token_path);
    assert_eq!(reopened.get().as_deref(), Some("fresh-token"));
}

#[tokio::test]
async fn test_failed_user_fetch_keeps_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/user"))
        .respond_with(ResponseTemplate::new(500).set_body_json(json!({"error": "db down"})))
        .mount(&server)
        .await;

    let tokens = Arc::new(MemoryTokenStore::new());
    let api = ApiClient::new(&server.uri(), tokens.clone());
    let manager = AuthManager::new(&api);

    manager.login("tok").await.unwrap();

    let session = manager.session();
    assert!(session.is_authenticated());
    assert!(session.user.is_none());
    assert_eq!(tokens.get().as_deref(), Some("tok"));
}

#[tokio::test]
async fn test_restore_reconciles_stored_token() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/auth/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(user_body()))
        .expect(1)
        .mount(&server)
        .await;

    let api = ApiClient::new(&server.uri(), Arc::new(MemoryTokenStore::with_token("old")));
    let manager = AuthManager::new(&api);
    let handle = manager.handle();
    let mut changes = handle.on_change();

    assert!(handle.get_session().is_authenticated());
    assert!(handle.get_session().user.is_none());

    manager.restore().await;

    changes.changed().await.unwrap();
    assert_eq!(handle.get_session().user.unwrap().username, "ada");
}

#[tokio::test]
async fn test_restore_without_token_makes_no_request() {
    let server = MockServer::start().await;
    Mock::given(wiremock::matchers::any())
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let api = ApiClient::new(&server.uri(), Arc::new(MemoryTokenStore::new()));
    let manager = AuthManager::new(&api);
    let session = manager.restore().await;
    assert!(!session.is_authenticated());
}

#[tokio::test]
async fn test_sign_in_then_logout() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/login"))
        .and(body_json(json!({"email": "ada@example.com", "password": "Secret#123"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "user": user_body(),
            "access_token": "issued",
            "refresh_token": "refresh"
        })))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/user"))
        .respond_with(ResponseTemplate::new(503))
        .mount(&server)
        .await;

    let tokens = Arc::new(MemoryTokenStore::new());
    let api = ApiClient::new(&server.uri(), tokens.clone());
    let manager = AuthManager::new(&api);

    let session = manager.sign_in("ada@example.com", "Secret#123").await.unwrap();
    assert_eq!(session.token.as_deref(), Some("issued"));
    // User from the login response fills in for the failed fetch.
    assert_eq!(session.user.unwrap().username, "ada");

    manager.logout();
    assert!(!manager.is_authenticated());
    assert!(manager.session().user.is_none());
    assert_eq!(tokens.get(), None);
}

#[tokio::test]
async fn test_register_validates_locally() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/register"))
        .respond_with(ResponseTemplate::new(201).set_body_json(json!({"message": "User registered successfully"})))
        .expect(1)
        .mount(&server)
        .await;

    let api = ApiClient::new(&server.uri(), Arc::new(MemoryTokenStore::new()));
    let manager = AuthManager::new(&api);

    let mut form = Registration {
        username: "ada".into(),
        first_name: "Ada".into(),
        last_name: "Lovelace".into(),
        email: "ada@example.com".into(),
        password: "Secret#123".into(),
        confirm_password: "mismatch".into(),
    };
    let err = manager.register(&form).await.unwrap_err();
    assert!(matches!(err, ApiError::Invalid(_)));

    form.confirm_password = form.password.clone();
    let message = manager.register(&form).await.unwrap();
    assert_eq!(message, "User registered successfully");
    assert!(!manager.is_authenticated());
}

#[tokio::test]
async fn test_update_profile_refreshes_user() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/auth/user"))
        .and(body_json(json!({"first_name": "Augusta"})))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "User updated"})))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/auth/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "id": 1, "username": "ada", "email": "ada@example.com", "first_name": "Augusta", "last_name": "Lovelace"
        })))
        .mount(&server)
        .await;

    let api = ApiClient::new(&server.uri(), Arc::new(MemoryTokenStore::with_token("tok")));
    let manager = AuthManager::new(&api);
    let update = ProfileUpdate {
        first_name: Some("Augusta".into()),
        ..Default::default()
    };

    let message = manager.update_profile(&update).await.unwrap();
    assert_eq!(message, "User updated");
    assert_eq!(manager.session().user.unwrap().display_name(), "Augusta Lovelace");
}

#[tokio::test]
async fn test_delete_account_logs_out() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/auth/user"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"message": "User deleted"})))
        .expect(1)
        .mount(&server)
        .await;

    let tokens = Arc::new(MemoryTokenStore::with_token("tok"));
    let api = ApiClient::new(&server.uri(), tokens.clone());
    let manager = AuthManager::new(&api);

    manager.delete_account().await.unwrap();
    assert!(!manager.is_authenticated());
    assert_eq!(tokens.get(), None);
}
