use std::sync::Arc;
use std::time::Duration;

use reqwest::Client;
use rocal_auth::{Auth, AuthChangeEvent, AuthError, AuthOptions};
use serde_json::json;
use wiremock::matchers::{header, method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn session_json(access_token: &str, refresh_token: &str) -> serde_json::Value {
    json!({
        "access_token": access_token,
        "token_type": "bearer",
        "expires_in": 3600,
        "refresh_token": refresh_token,
        "user": {
            "id": "test_user_id",
            "email": "test@example.com",
            "role": "authenticated"
        }
    })
}

#[tokio::test]
async fn test_sign_in_then_refresh() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(session_json("test_access_token", "r1")),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(session_json("new_access_token", "r2")),
        )
        .mount(&mock_server)
        .await;

    let auth = Auth::new(
        &mock_server.uri(),
        "test_anon_key",
        Client::new(),
        AuthOptions::default(),
    );
    let mut changes = auth.on_auth_state_change();

    let session = auth
        .sign_in_with_password("test@example.com", "password123")
        .await
        .unwrap();
    assert_eq!(session.user.id, "test_user_id");
    assert_eq!(session.user.email.as_deref(), Some("test@example.com"));

    let refreshed = auth.refresh_session().await.unwrap();
    assert_eq!(refreshed.access_token, "new_access_token");
    assert_eq!(refreshed.refresh_token, "r2");

    assert_eq!(changes.recv().await.unwrap().event, AuthChangeEvent::SignedIn);
    assert_eq!(
        changes.recv().await.unwrap().event,
        AuthChangeEvent::TokenRefreshed
    );
}

#[tokio::test]
async fn test_refresh_without_session() {
    let auth = Auth::new(
        "http://localhost:54321",
        "test_anon_key",
        Client::new(),
        AuthOptions::default(),
    );

    assert!(matches!(
        auth.refresh_session().await,
        Err(AuthError::MissingSession)
    ));
}

#[tokio::test]
async fn test_sign_out_revokes_token() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(session_json("test_access_token", "r1")),
        )
        .mount(&mock_server)
        .await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .and(header("Authorization", "Bearer test_access_token"))
        .respond_with(ResponseTemplate::new(204))
        .expect(1)
        .mount(&mock_server)
        .await;

    let auth = Auth::new(
        &mock_server.uri(),
        "test_anon_key",
        Client::new(),
        AuthOptions::default(),
    );
    auth.sign_in_with_password("test@example.com", "password123")
        .await
        .unwrap();

    let mut changes = auth.on_auth_state_change();
    auth.sign_out().await.unwrap();

    assert!(auth.get_session().is_none());
    let change = changes.recv().await.unwrap();
    assert_eq!(change.event, AuthChangeEvent::SignedOut);
    assert!(change.session.is_none());
}

#[tokio::test]
async fn test_sign_out_without_session_is_local_only() {
    let mock_server = MockServer::start().await;

    Mock::given(method("POST"))
        .and(path("/auth/v1/logout"))
        .respond_with(ResponseTemplate::new(204))
        .expect(0)
        .mount(&mock_server)
        .await;

    let auth = Auth::new(
        &mock_server.uri(),
        "test_anon_key",
        Client::new(),
        AuthOptions::default(),
    );

    assert!(auth.sign_out().await.is_ok());
}

async fn refresh_requests(server: &MockServer) -> usize {
    server
        .received_requests()
        .await
        .unwrap_or_default()
        .iter()
        .filter(|r| r.url.query() == Some("grant_type=refresh_token"))
        .count()
}

async fn sign_in_short_lived(server: &MockServer, expires_in: i64) -> Arc<Auth> {
    let mut body = session_json("opaque-token", "r1");
    body["expires_in"] = json!(expires_in);
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "password"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(server)
        .await;

    let auth = Arc::new(Auth::new(
        &server.uri(),
        "test_anon_key",
        Client::new(),
        AuthOptions::default().with_persist_session(false),
    ));
    auth.sign_in_with_password("test@example.com", "password123")
        .await
        .unwrap();
    auth
}

#[tokio::test]
async fn test_auto_refresh_of_short_lived_token_is_paced() {
    let mock_server = MockServer::start().await;
    let mut body = session_json("opaque-token-2", "r2");
    body["expires_in"] = json!(30);
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .respond_with(ResponseTemplate::new(200).set_body_json(body))
        .mount(&mock_server)
        .await;

    let auth = sign_in_short_lived(&mock_server, 30).await;
    let refresher = auth.start_auto_refresh().unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    refresher.abort();

    assert!(refresh_requests(&mock_server).await <= 1);
    assert!(auth.get_session().is_some());
}

#[tokio::test]
async fn test_rate_limited_refresh_keeps_session() {
    let mock_server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/auth/v1/token"))
        .and(query_param("grant_type", "refresh_token"))
        .respond_with(ResponseTemplate::new(429).set_body_json(json!({
            "msg": "Request rate limit reached"
        })))
        .mount(&mock_server)
        .await;

    // Already due for refresh
    let auth = sign_in_short_lived(&mock_server, 0).await;
    let refresher = auth.start_auto_refresh().unwrap();
    tokio::time::sleep(Duration::from_millis(500)).await;
    refresher.abort();

    assert_eq!(refresh_requests(&mock_server).await, 1);
    assert_eq!(
        auth.get_session().map(|s| s.access_token),
        Some("opaque-token".to_string())
    );

    let err = auth.refresh_session().await.unwrap_err();
    assert!(matches!(err, AuthError::ServerError(429, _)));
    assert_eq!(err.user_message(), "Request rate limit reached");
}
