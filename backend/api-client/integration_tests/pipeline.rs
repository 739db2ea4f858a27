//! Envelope unwrapping, bearer attachment and failure normalization.

use crate::helpers::{
    OLD_ACCESS, REFRESH_ROUTE, api_base, bearer, client_with_store, failure, signed_in_store,
    success,
};

use api_client::normalizer::{NETWORK_ERROR_CODE, REQUEST_FAILED_CODE};
use api_client::{ApiClient, ApiRequest, MemoryCredentialStore, RequestOptions};

use common::HttpStatusCode;

use std::sync::Arc;
use std::time::Duration;

use serde::Deserialize;
use serde_json::{Value, json};
use wiremock::matchers::{body_json, header, method, path, query_param};
use wiremock::{Mock, MockServer, Request, ResponseTemplate};

#[derive(Debug, Deserialize, PartialEq)]
struct Patient {
    id: u32,
    name: String,
}

#[tokio::test]
async fn given_stored_access_token_when_calling_then_bearer_header_is_attached() {
    // GIVEN: A signed-in client
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/patients/7"))
        .and(header("authorization", bearer(OLD_ACCESS).as_str()))
        .respond_with(
            ResponseTemplate::new(200).set_body_json(success(json!({"id": 7, "name": "Ada"}))),
        )
        .expect(1)
        .mount(&server)
        .await;
    let client = client_with_store(&server, signed_in_store());

    // WHEN: Fetching a patient
    let patient: Patient = client.get("patients/7").await.unwrap();

    // THEN: The envelope value is returned decoded
    assert_eq!(
        patient,
        Patient {
            id: 7,
            name: "Ada".to_string()
        }
    );
    server.verify().await;
}

#[tokio::test]
async fn given_empty_store_when_calling_then_no_authorization_header_is_sent() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/health"))
        .and(|request: &Request| !request.headers.contains_key("authorization"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success(json!("ok"))))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_with_store(&server, Arc::new(MemoryCredentialStore::new()));

    let status: String = client.get("/health").await.unwrap();

    assert_eq!(status, "ok");
    server.verify().await;
}

#[tokio::test]
async fn given_body_and_query_when_calling_then_both_reach_backend() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/appointments"))
        .and(query_param("notify", "true"))
        .and(body_json(json!({"patient_id": 7, "slot": "09:30"})))
        .respond_with(ResponseTemplate::new(201).set_body_json(success(json!({"id": 99}))))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_with_store(&server, signed_in_store());

    let created: Value = client
        .post_with(
            "appointments",
            &json!({"patient_id": 7, "slot": "09:30"}),
            RequestOptions::default().with_query("notify", true),
        )
        .await
        .unwrap();

    assert_eq!(created, json!({"id": 99}));
    server.verify().await;
}

#[tokio::test]
async fn given_success_with_message_when_send_enveloped_then_message_is_kept() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/patients/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "message": "Patient archived"
        })))
        .mount(&server)
        .await;
    let client = client_with_store(&server, signed_in_store());

    let response = client
        .send_enveloped::<Option<Value>>(ApiRequest::delete("patients/7"))
        .await
        .unwrap();

    assert_eq!(response.value, None);
    assert_eq!(response.message.as_deref(), Some("Patient archived"));
}

// ============================================
// PAGINATION
// ============================================

#[tokio::test]
async fn given_list_with_pagination_when_get_paginated_then_metadata_is_returned() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/patients"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "value": [{"id": 3, "name": "Grace"}],
            "pagination": {"page": 2, "page_size": 1, "total": 5, "total_pages": 5}
        })))
        .mount(&server)
        .await;
    let client = client_with_store(&server, signed_in_store());

    let page = client
        .get_paginated::<Patient>("patients", RequestOptions::default().with_query("page", 2))
        .await
        .unwrap();

    assert_eq!(page.items.len(), 1);
    assert_eq!(page.pagination.page, 2);
    assert_eq!(page.pagination.total, 5);
    assert_eq!(page.pagination.total_pages, 5);
}

/// **VALUE**: A list endpoint that omits metadata still yields a usable page.
///
/// **BUG THIS CATCHES**: Would catch a missing `pagination` block or missing `value`
/// being reported as a decode failure.
#[tokio::test]
async fn given_list_without_pagination_when_get_paginated_then_defaults_apply() {
    // GIVEN: A success envelope with neither value nor pagination
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/patients"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"success": true})))
        .mount(&server)
        .await;
    let client = client_with_store(&server, signed_in_store());

    // WHEN: Requesting a page
    let page = client
        .get_paginated::<Patient>("patients", RequestOptions::default())
        .await
        .unwrap();

    // THEN: Empty items, page 1, zero totals
    assert!(page.items.is_empty());
    assert_eq!(page.pagination.page, 1);
    assert_eq!(page.pagination.page_size, 0);
    assert_eq!(page.pagination.total, 0);
    assert_eq!(page.pagination.total_pages, 0);
}

// ============================================
// FAILURES
// ============================================

#[tokio::test]
async fn given_validation_failure_when_calling_then_field_errors_are_preserved() {
    let server = MockServer::start().await;
    Mock::given(method("PUT"))
        .and(path("/api/patients/7"))
        .respond_with(ResponseTemplate::new(422).set_body_json(json!({
            "success": false,
            "message": "Please correct the form",
            "error": {
                "title": "Validation Failed",
                "code": "VALIDATION_ERROR",
                "status": 422,
                "details": ["1 field is invalid"],
                "field_errors": {"email": ["is required", "must be valid"]}
            }
        })))
        .mount(&server)
        .await;
    let client = client_with_store(&server, signed_in_store());

    let err = client
        .put::<_, Value>("patients/7", &json!({"email": ""}))
        .await
        .unwrap_err();

    assert_eq!(err.http_status(), HttpStatusCode(422));
    assert_eq!(err.code(), Some("VALIDATION_ERROR"));
    assert_eq!(err.display_message(), "Please correct the form");
    assert_eq!(
        err.field_error("email").unwrap(),
        ["is required".to_string(), "must be valid".to_string()]
    );
}

#[tokio::test]
async fn given_gateway_html_error_when_calling_then_request_failed_with_real_status() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/reports"))
        .respond_with(
            ResponseTemplate::new(502).set_body_string("<html><h1>502 Bad Gateway</h1></html>"),
        )
        .mount(&server)
        .await;
    let client = client_with_store(&server, signed_in_store());

    let err = client.get::<Value>("reports").await.unwrap_err();

    assert_eq!(err.code(), Some(REQUEST_FAILED_CODE));
    assert_eq!(err.http_status(), HttpStatusCode(502));
    assert_eq!(
        err.details(),
        ["Request failed with status code 502".to_string()]
    );
}

#[tokio::test]
async fn given_forbidden_envelope_when_calling_then_no_refresh_and_error_returned() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/admin/users"))
        .respond_with(ResponseTemplate::new(403).set_body_json(failure(
            403,
            "Forbidden",
            "INSUFFICIENT_ROLE",
        )))
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path("/api/auth/refresh"))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;
    let client = client_with_store(&server, signed_in_store());

    let err = client.get::<Value>("admin/users").await.unwrap_err();

    assert_eq!(err.title(), "Forbidden");
    assert_eq!(err.http_status(), HttpStatusCode(403));
    server.verify().await;
}

/// **VALUE**: No reachable server still produces a normalized error.
///
/// **WHY THIS MATTERS**: The UI shows "check your connection" based on status 0 and
/// `NETWORK_ERROR`, not on reqwest's error text.
#[tokio::test]
async fn given_unreachable_backend_when_calling_then_network_error_with_status_zero() {
    // GIVEN: A port nothing listens on
    let listener = std::net::TcpListener::bind("127.0.0.1:0").unwrap();
    let port = listener.local_addr().unwrap().port();
    drop(listener);

    let client = ApiClient::new(
        &format!("http://127.0.0.1:{port}/api/"),
        Duration::from_secs(2),
        api_client::REFRESH_PATH,
        Arc::new(MemoryCredentialStore::new()),
    )
    .unwrap();

    // WHEN: Calling
    let err = client.get::<Value>("patients").await.unwrap_err();

    // THEN: Network error, status 0
    assert_eq!(err.http_status(), HttpStatusCode(0));
    assert_eq!(err.code(), Some(NETWORK_ERROR_CODE));
    assert!(err.is_network_error());
    assert_eq!(err.title(), "Network Error");
}

#[tokio::test]
async fn given_success_envelope_with_wrong_value_shape_when_decoding_then_invalid_response() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/patients/7"))
        .respond_with(ResponseTemplate::new(200).set_body_json(success(json!("not a patient"))))
        .mount(&server)
        .await;
    let client = client_with_store(&server, signed_in_store());

    let err = client.get::<Patient>("patients/7").await.unwrap_err();

    assert_eq!(err.code(), Some("INVALID_RESPONSE"));
    assert_eq!(err.http_status(), HttpStatusCode(200));
}

/// **VALUE**: A response slower than the client timeout is reported as no response.
///
/// **WHY THIS MATTERS**: A hung backend must look the same to the UI as an unreachable
/// one, and must not be mistaken for an expired session.
///
/// **BUG THIS CATCHES**: Would catch timeouts leaking through as a different error
/// shape, or the client waiting for the full response.
#[tokio::test]
async fn given_response_slower_than_timeout_when_calling_then_network_error_without_refresh() {
    // GIVEN: A 1s client timeout and a backend that answers after 2s
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/reports/monthly"))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(success(json!([])))
                .set_delay(Duration::from_secs(2)),
        )
        .expect(1)
        .mount(&server)
        .await;
    Mock::given(method("POST"))
        .and(path(REFRESH_ROUTE))
        .respond_with(ResponseTemplate::new(500))
        .expect(0)
        .mount(&server)
        .await;

    let client = ApiClient::new(
        &api_base(&server),
        Duration::from_secs(1),
        api_client::REFRESH_PATH,
        signed_in_store(),
    )
    .unwrap();

    // WHEN: Calling
    let err = client.get::<Value>("reports/monthly").await.unwrap_err();

    // THEN: Network error, status 0, and no refresh attempted
    assert!(err.is_network_error());
    assert_eq!(err.http_status(), HttpStatusCode::NO_RESPONSE);
    assert_eq!(err.code(), Some(NETWORK_ERROR_CODE));
    server.verify().await;
}

#[tokio::test]
async fn given_patch_when_calling_then_method_body_and_bearer_reach_backend() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/patients/7"))
        .and(header("authorization", bearer(OLD_ACCESS).as_str()))
        .and(body_json(json!({"name": "Ada Lovelace"})))
        .respond_with(
            ResponseTemplate::new(200)
                .set_body_json(success(json!({"id": 7, "name": "Ada Lovelace"}))),
        )
        .expect(1)
        .mount(&server)
        .await;
    let client = client_with_store(&server, signed_in_store());

    let patient: Patient = client
        .patch("patients/7", &json!({"name": "Ada Lovelace"}))
        .await
        .unwrap();

    assert_eq!(patient.name, "Ada Lovelace");
    server.verify().await;
}

#[tokio::test]
async fn given_patch_with_query_when_calling_then_query_reaches_backend() {
    let server = MockServer::start().await;
    Mock::given(method("PATCH"))
        .and(path("/api/appointments/12"))
        .and(query_param("notify", "false"))
        .and(header("authorization", bearer(OLD_ACCESS).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(success(json!({"id": 12}))))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_with_store(&server, signed_in_store());

    let updated: Value = client
        .patch_with(
            "appointments/12",
            &json!({"slot": "10:00"}),
            RequestOptions::default().with_query("notify", false),
        )
        .await
        .unwrap();

    assert_eq!(updated, json!({"id": 12}));
    server.verify().await;
}

#[tokio::test]
async fn given_delete_when_calling_then_method_and_bearer_reach_backend() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/appointments/12"))
        .and(header("authorization", bearer(OLD_ACCESS).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(success(json!({"deleted": true}))))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_with_store(&server, signed_in_store());

    let deleted: Value = client.delete("appointments/12").await.unwrap();

    assert_eq!(deleted, json!({"deleted": true}));
    server.verify().await;
}

#[tokio::test]
async fn given_delete_with_query_when_calling_then_query_reaches_backend() {
    let server = MockServer::start().await;
    Mock::given(method("DELETE"))
        .and(path("/api/patients/7/notes"))
        .and(query_param("before", "2026-01-01"))
        .and(header("authorization", bearer(OLD_ACCESS).as_str()))
        .respond_with(ResponseTemplate::new(200).set_body_json(success(json!({"removed": 3}))))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_with_store(&server, signed_in_store());

    let removed: Value = client
        .delete_with(
            "patients/7/notes",
            RequestOptions::default().with_query("before", "2026-01-01"),
        )
        .await
        .unwrap();

    assert_eq!(removed, json!({"removed": 3}));
    server.verify().await;
}
