//! Single-flight refresh: concurrent 401s share one refresh call.

use crate::helpers::{
    NEW_ACCESS, NEW_REFRESH, OLD_ACCESS, OLD_REFRESH, REFRESH_ROUTE, bearer, client_with_store,
    refreshed_tokens, signed_in_store, stored_access, stored_refresh, success, token_expired,
};

use common::HttpStatusCode;

use std::time::Duration;

use futures_util::future::join_all;
use serde_json::{Value, json};
use wiremock::matchers::{body_json, header, method, path, path_regex};
use wiremock::{Mock, MockServer, ResponseTemplate};

async fn mount_expired_then_ok(server: &MockServer, route: &str, value: Value) {
    Mock::given(method("GET"))
        .and(path(route))
        .and(header("authorization", bearer(OLD_ACCESS).as_str()))
        .respond_with(ResponseTemplate::new(401).set_body_json(token_expired()))
        .mount(server)
        .await;
    Mock::given(method("GET"))
        .and(path(route))
        .and(header("authorization", bearer(NEW_ACCESS).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(success(value)))
        .expect(1)
        .mount(server)
        .await;
}

async fn mount_refresh(server: &MockServer, delay: Duration, expected_calls: u64) {
    Mock::given(method("POST"))
        .and(path(REFRESH_ROUTE))
        .and(body_json(json!({ "refresh_token": OLD_REFRESH })))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(refreshed_tokens())
                .set_delay(delay),
        )
        .expect(expected_calls)
        .mount(server)
        .await;
}

/// **VALUE**: Two calls rejected with the same expired token trigger exactly one refresh
/// and both complete with their own payloads.
///
/// **WHY THIS MATTERS**: Refresh tokens rotate. A second refresh would send the
/// already-spent token and log the user out.
///
/// **BUG THIS CATCHES**: Would catch each 401 starting its own refresh, or a queued
/// caller being dropped instead of retried.
#[tokio::test]
async fn given_two_concurrent_401s_when_refresh_succeeds_then_one_refresh_and_both_retried() {
    // GIVEN: /patients and /users reject the old token and accept the new one
    let server = MockServer::start().await;
    mount_expired_then_ok(&server, "/api/patients", json!([{"id": 1}])).await;
    mount_expired_then_ok(&server, "/api/users", json!([{"id": 2}])).await;
    mount_refresh(&server, Duration::from_millis(200), 1).await;

    let store = signed_in_store();
    let client = client_with_store(&server, store.clone());

    // WHEN: Both calls are in flight together
    let (patients, users) = tokio::join!(
        client.get::<Value>("patients"),
        client.get::<Value>("users"),
    );

    // THEN: Each gets its own payload, the new pair is stored, one refresh was made
    assert_eq!(patients.unwrap(), json!([{"id": 1}]));
    assert_eq!(users.unwrap(), json!([{"id": 2}]));
    assert_eq!(stored_access(&store).as_deref(), Some(NEW_ACCESS));
    assert_eq!(stored_refresh(&store).as_deref(), Some(NEW_REFRESH));
    server.verify().await;
}

#[tokio::test]
async fn given_five_concurrent_401s_when_refresh_succeeds_then_single_refresh_serves_all() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/items/\d+$"))
        .and(header("authorization", bearer(OLD_ACCESS).as_str()))
        .respond_with(ResponseTemplate::new(401).set_body_json(token_expired()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path_regex(r"^/api/items/\d+$"))
        .and(header("authorization", bearer(NEW_ACCESS).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(success(json!("item"))))
        .expect(5)
        .mount(&server)
        .await;
    mount_refresh(&server, Duration::from_millis(200), 1).await;

    let client = client_with_store(&server, signed_in_store());

    let calls = (0..5).map(|i| {
        let client = client.clone();
        async move { client.get::<String>(&format!("items/{i}")).await }
    });
    let results = join_all(calls).await;

    assert_eq!(results.len(), 5);
    for result in results {
        assert_eq!(result.unwrap(), "item");
    }
    server.verify().await;
}

/// **VALUE**: A 401 that arrives after the refresh already finished retries with the
/// new token instead of refreshing again.
///
/// **BUG THIS CATCHES**: Would catch a slow response sent with the old token
/// spending the rotated refresh token a second time.
#[tokio::test]
async fn given_late_401_after_refresh_settled_when_retrying_then_no_second_refresh() {
    // GIVEN: /fast fails at once, /slow fails well after the refresh completes
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/fast"))
        .and(header("authorization", bearer(OLD_ACCESS).as_str()))
        .respond_with(ResponseTemplate::new(401).set_body_json(token_expired()))
        .mount(&server)
        .await;
    Mock::given(method("GET"))
        .and(path("/api/slow"))
        .and(header("authorization", bearer(OLD_ACCESS).as_str()))
        .respond_with(
            ResponseTemplate::new(401)
                .set_body_json(token_expired())
                .set_delay(Duration::from_millis(400)),
        )
        .mount(&server)
        .await;
    for route in ["/api/fast", "/api/slow"] {
        Mock::given(method("GET"))
            .and(path(route))
            .and(header("authorization", bearer(NEW_ACCESS).as_str()))
            .respond_with(ResponseTemplate::new(200).set_body_json(success(json!(route))))
            .expect(1)
            .mount(&server)
            .await;
    }
    mount_refresh(&server, Duration::from_millis(20), 1).await;

    let client = client_with_store(&server, signed_in_store());

    // WHEN: Both run together
    let (fast, slow) = tokio::join!(client.get::<String>("fast"), client.get::<String>("slow"));

    // THEN: Both succeed and only one refresh was made
    assert_eq!(fast.unwrap(), "/api/fast");
    assert_eq!(slow.unwrap(), "/api/slow");
    server.verify().await;
}

#[tokio::test]
async fn given_retried_call_rejected_again_when_completing_then_401_returned_without_second_refresh()
{
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/billing"))
        .respond_with(ResponseTemplate::new(401).set_body_json(token_expired()))
        .expect(2)
        .mount(&server)
        .await;
    mount_refresh(&server, Duration::ZERO, 1).await;

    let client = client_with_store(&server, signed_in_store());

    let err = client.get::<Value>("billing").await.unwrap_err();

    assert_eq!(err.http_status(), HttpStatusCode::UNAUTHORIZED);
    assert_eq!(err.code(), Some("TOKEN_EXPIRED"));
    server.verify().await;
}

/// **VALUE**: Login opts out of refresh, so a wrong password is reported immediately.
#[tokio::test]
async fn given_login_rejected_with_401_when_authenticating_then_no_refresh_is_attempted() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(401).set_body_json(json!({
            "success": false,
            "message": "Email or password is incorrect",
            "error": {"title": "Invalid Credentials", "code": "INVALID_CREDENTIALS", "status": 401}
        })))
        .expect(1)
        .mount(&server)
        .await;
    mount_refresh(&server, Duration::ZERO, 0).await;

    let store = signed_in_store();
    let client = client_with_store(&server, store.clone());

    let err = client
        .authenticate::<_, Value>(
            api_client::LOGIN_PATH,
            &json!({"email": "nurse@example.com", "password": "wrong"}),
        )
        .await
        .unwrap_err();

    assert_eq!(err.http_status(), HttpStatusCode::UNAUTHORIZED);
    assert_eq!(err.display_message(), "Email or password is incorrect");
    assert_eq!(stored_access(&store).as_deref(), Some(OLD_ACCESS));
    server.verify().await;
}

#[tokio::test]
async fn given_call_to_refresh_path_rejected_when_completing_then_never_refreshes_itself() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path(REFRESH_ROUTE))
        .respond_with(ResponseTemplate::new(401).set_body_json(token_expired()))
        .expect(1)
        .mount(&server)
        .await;

    let client = client_with_store(&server, signed_in_store());

    let err = client
        .post::<_, Value>("/auth/refresh", &json!({"refresh_token": "manual"}))
        .await
        .unwrap_err();

    assert!(err.is_unauthorized());
    server.verify().await;
}
