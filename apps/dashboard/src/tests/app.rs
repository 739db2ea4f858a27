use crate::app::{execute, render};
use crate::cli::Command;

use api_client::{ApiClient, MemoryCredentialStore, REFRESH_PATH};

use std::sync::Arc;
use std::time::Duration;

use serde_json::json;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn client_for(server: &MockServer) -> ApiClient {
    ApiClient::new(
        &format!("{}/api/", server.uri()),
        Duration::from_secs(5),
        REFRESH_PATH,
        Arc::new(MemoryCredentialStore::new()),
    )
    .unwrap()
}

#[tokio::test]
async fn given_get_command_with_query_when_executed_then_backend_receives_query() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/patients"))
        .and(query_param("page", "2"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "value": [{"id": 1}]
        })))
        .expect(1)
        .mount(&server)
        .await;
    let client = client_for(&server);

    let result = execute(
        &client,
        Command::Get {
            path: "patients".to_string(),
            query: vec![("page".to_string(), "2".to_string())],
        },
    )
    .await;

    assert!(result.is_ok());
    server.verify().await;
}

#[tokio::test]
async fn given_login_then_logout_when_executed_then_status_follows() {
    let server = MockServer::start().await;
    Mock::given(method("POST"))
        .and(path("/api/auth/login"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "success": true,
            "value": {
                "user": {"email": "nurse@example.com"},
                "tokens": {
                    "access_token": {"token": "a", "expires_at": "2999-01-01T00:00:00Z"},
                    "refresh_token": {"token": "r"}
                }
            }
        })))
        .mount(&server)
        .await;
    let client = client_for(&server);

    execute(
        &client,
        Command::Login {
            email: "nurse@example.com".to_string(),
            password: "pw".to_string(),
        },
    )
    .await
    .unwrap();
    assert!(client.is_authenticated().unwrap());

    execute(&client, Command::Logout).await.unwrap();
    assert!(!client.is_authenticated().unwrap());
}

#[tokio::test]
async fn given_backend_failure_when_executed_then_api_error_carries_full_message() {
    let server = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/api/patients/404"))
        .respond_with(ResponseTemplate::new(404).set_body_json(json!({
            "success": false,
            "error": {
                "title": "Not Found",
                "status": 404,
                "details": ["Patient 404 does not exist"]
            }
        })))
        .mount(&server)
        .await;
    let client = client_for(&server);

    let err = execute(
        &client,
        Command::Get {
            path: "patients/404".to_string(),
            query: Vec::new(),
        },
    )
    .await
    .unwrap_err();

    assert_eq!(err.user_message(), "Not Found\nPatient 404 does not exist");
}

#[test]
fn given_json_value_when_rendered_then_is_pretty_printed() {
    let rendered = render(&json!({"id": 1})).unwrap();

    assert_eq!(rendered, "{\n  \"id\": 1\n}");
}
