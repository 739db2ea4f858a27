//! Session lifecycle: login, logout and unrecoverable sessions.

use crate::helpers::{
    OLD_ACCESS, REFRESH_ROUTE, client_with_store, failure, signed_in_store,
    store_without_refresh_token, stored_access, stored_refresh, success, token_expired, tokens,
};

use api_client::{LOGIN_PATH, MemoryCredentialStore, SessionEndReason, SessionEvent};

use common::HttpStatusCode;

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};
use tokio::sync::broadcast;
use tokio::time::timeout;
use wiremock::matchers::{method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

#[derive(Debug, Deserialize)]
struct LoginValue {
    user: User,
}

#[derive(Debug, Deserialize)]
struct User {
    email: String,
}

async fn next_event(events: &mut broadcast::Receiver<SessionEvent>) -> SessionEvent {
    timeout(Duration::from_secs(2), events.recv())
        .await
        .expect("No session event within timeout")
        .expect("Session event channel closed")
}

#[tokio::test]
async fn given_valid_login_when_authenticating_then_tokens_are_stored_and_value_returned() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Welcome back",
            "value": {
                "user": {"id": 4, "email": "nurse@example.com"},
                "tokens": tokens("access-1", "refresh-1")
            }
        })))
        .mount(&server)
        .await;
    let store = Arc::new(MemoryCredentialStore::new());
    let client = client_with_store(&server, store.clone());
    assert!(!client.is_authenticated().unwrap());

    let login: LoginValue = client
        .authenticate(
            LOGIN_PATH,
            &json!({"email": "nurse@example.com", "password": "correct horse"}),
        )
        .await
        .unwrap();

    assert_eq!(login.user.email, "nurse@example.com");
    assert_eq!(stored_access(&store).as_deref(), Some("access-1"));
    assert_eq!(stored_refresh(&store).as_deref(), Some("refresh-1"));
    assert!(client.is_authenticated().unwrap());
}

#[tokio::test]
async fn given_login_response_without_tokens_when_authenticating_then_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(success(json!({"user": {"email": "x"}}))),
        )
        .mount(&server)
        .await;
    let store = Arc::new(MemoryCredentialStore::new());
    let client = client_with_store(&server, store.clone());

    let err = client
        .authenticate::<_, Value>(LOGIN_PATH, &json!({"email": "x", "password": "y"}))
        .await
        .unwrap_err();

    assert_eq!(err.code(), Some("INVALID_RESPONSE"));
    assert!(stored_access(&store).is_none());
}

#[tokio::test]
async fn given_signed_in_client_when_logging_out_then_credentials_are_cleared() {
    let server = MockServer::start().await;
    let store = signed_in_store();
    let client = client_with_store(&server, store.clone());

    client.logout().unwrap();
    client.logout().unwrap();

    assert!(stored_access(&store).is_none());
    assert!(stored_refresh(&store).is_none());
    assert!(!client.is_authenticated().unwrap());
}

/// **VALUE**: Without a refresh token the session ends and the original 401 is returned.
///
/// **WHY THIS MATTERS**: The host redirects to login on this event. No refresh call
/// may be made, since there is nothing to send.
///
/// **BUG THIS CATCHES**: Would catch a refresh being dispatched with an empty token,
/// stale credentials being left behind, or the 401 being replaced by another error.
#[tokio::test]
async fn given_no_refresh_token_when_401_then_session_ends_and_original_error_returned() {
    // GIVEN: An access token whose refresh token has already lapsed
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/patients"))
        .respond_with(ResponseTemplate::new(401).set_body_json(token_expired()))
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(REFRESH_ROUTE))
        .respond_with(ResponseTemplate::new(200))
        .expect(0)
        .mount(&server)
        .await;

    let store = store_without_refresh_token();
    assert_eq!(stored_access(&store).as_deref(), Some(OLD_ACCESS));
    let client = client_with_store(&server, store.clone());
    let mut events = client.subscribe_session_events();

    // WHEN: The call is rejected
    let err = client.get::<Value>("patients").await.unwrap_err();

    // THEN: The original 401 comes back, the store is empty and the session ended
    assert_eq!(err.http_status(), HttpStatusCode::UNAUTHORIZED);
    assert_eq!(err.code(), Some("TOKEN_EXPIRED"));
    assert!(stored_access(&store).is_none());
    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::Ended {
            reason: SessionEndReason::NoRefreshToken
        }
    );
    server.verify().await;
}

/// **VALUE**: A failed refresh rejects every waiting call with the refresh error.
///
/// **BUG THIS CATCHES**: Would catch queued callers hanging forever, or callers getting
/// their own stale 401 instead of the reason the session ended.
#[tokio::test]
async fn given_refresh_rejected_when_calls_waiting_then_all_fail_and_session_ends() {
    // GIVEN: Two calls that will 401 and a refresh endpoint that refuses the token
    let server = MockServer::start().await;
    for route in ["/api/patients", "/api/users"] {
        Mock::given(method("GET"))
            .and(path(route))
            .respond_with(ResponseTemplate::new(401).set_body_json(token_expired()))
            .expect(1)
            .mount(&server)
            .await;
    }
    Mock::given(method("POST"))
        .and(path(REFRESH_ROUTE))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(failure(401, "Refresh Token Revoked", "REFRESH_REVOKED"))
                .set_delay(Duration::from_millis(200)),
        )
        .expect(1)
        .mount(&server)
        .await;

    let store = signed_in_store();
    let client = client_with_store(&server, store.clone());
    let mut events = client.subscribe_session_events();

    // WHEN: Both calls run together
    let (patients, users) = tokio::join!(
        client.get::<Value>("patients"),
        client.get::<Value>("users"),
    );

    // THEN: Both carry the refresh failure, and the session is over
    for err in [patients.unwrap_err(), users.unwrap_err()] {
        assert_eq!(err.title(), "Refresh Token Revoked");
        assert_eq!(err.code(), Some("REFRESH_REVOKED"));
    }
    assert!(stored_access(&store).is_none());
    assert!(stored_refresh(&store).is_none());
    assert_eq!(
        next_event(&mut events).await,
        SessionEvent::Ended {
            reason: SessionEndReason::RefreshFailed {
                message: "Refresh Token Revoked".to_string()
            }
        }
    );
    server.verify().await;
}

#[tokio::test]
async fn given_refresh_gateway_error_when_401_then_request_failed_ends_session() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/patients"))
        .respond_with(ResponseTemplate::new(401).set_body_json(token_expired()))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(REFRESH_ROUTE))
        .respond_with(ResponseTemplate::new(503).set_body_string("upstream unavailable"))
        .expect(1)
        .mount(&server)
        .await;

    let store = signed_in_store();
    let client = client_with_store(&server, store.clone());
    let mut events = client.subscribe_session_events();

    let err = client.get::<Value>("patients").await.unwrap_err();

    assert_eq!(err.http_status(), HttpStatusCode(503));
    assert!(stored_refresh(&store).is_none());
    assert!(matches!(
        next_event(&mut events).await,
        SessionEvent::Ended {
            reason: SessionEndReason::RefreshFailed { .. }
        }
    ));
}
