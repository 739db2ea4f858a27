//! Test helpers for API client integration tests.
//!
//! - Mock backend startup
//! - Envelope bodies in the backend's wire format
//! - Clients wired to a memory credential store

use api_client::{ApiClient, CredentialStore, MemoryCredentialStore, REFRESH_PATH};

use common::RedactedToken;

use std::sync::Arc;
use std::time::Duration;

use chrono::{TimeDelta, Utc};
use serde_json::{Value, json};
use wiremock::MockServer;

pub const OLD_ACCESS: &str = "access-old";
pub const OLD_REFRESH: &str = "refresh-old";
pub const NEW_ACCESS: &str = "access-new";
pub const NEW_REFRESH: &str = "refresh-new";

pub const REFRESH_ROUTE: &str = "/api/auth/refresh";

pub fn bearer(token: &str) -> String {
    format!("Bearer {token}")
}

pub fn api_base(server: &MockServer) -> String {
    format!("{}/api/", server.uri())
}

/// Client against `server` with the given store and a short timeout.
pub fn client_with_store(server: &MockServer, store: Arc<MemoryCredentialStore>) -> ApiClient {
    ApiClient::new(
        &api_base(server),
        Duration::from_secs(5),
        REFRESH_PATH,
        store,
    )
    .expect("Failed to build client")
}

/// Memory store already holding the old pair, access token still valid.
pub fn signed_in_store() -> Arc<MemoryCredentialStore> {
    let store = Arc::new(MemoryCredentialStore::new());
    store
        .set(
            &RedactedToken::new(OLD_ACCESS),
            &RedactedToken::new(OLD_REFRESH),
            Utc::now() + TimeDelta::minutes(15),
        )
        .expect("Failed to seed credentials");
    store
}

/// Memory store holding an access token whose refresh token has already expired.
pub fn store_without_refresh_token() -> Arc<MemoryCredentialStore> {
    let store = Arc::new(MemoryCredentialStore::with_refresh_lifetime(
        TimeDelta::zero(),
    ));
    store
        .set(
            &RedactedToken::new(OLD_ACCESS),
            &RedactedToken::new(OLD_REFRESH),
            Utc::now() + TimeDelta::minutes(15),
        )
        .expect("Failed to seed credentials");
    store
}

pub fn success(value: Value) -> Value {
    json!({ "success": true, "value": value })
}

pub fn failure(status: u16, title: &str, code: &str) -> Value {
    json!({
        "success": false,
        "error": { "title": title, "code": code, "status": status }
    })
}

pub fn token_expired() -> Value {
    failure(401, "Unauthorized", "TOKEN_EXPIRED")
}

pub fn tokens(access: &str, refresh: &str) -> Value {
    json!({
        "access_token": {
            "token": access,
            "expires_at": (Utc::now() + TimeDelta::minutes(15)).to_rfc3339(),
        },
        "refresh_token": { "token": refresh },
    })
}

pub fn refreshed_tokens() -> Value {
    success(json!({ "tokens": tokens(NEW_ACCESS, NEW_REFRESH) }))
}

pub fn stored_access(store: &MemoryCredentialStore) -> Option<String> {
    store
        .get_access()
        .expect("Failed to read access token")
        .map(|token| token.expose().to_string())
}

pub fn stored_refresh(store: &MemoryCredentialStore) -> Option<String> {
    store
        .get_refresh()
        .expect("Failed to read refresh token")
        .map(|token| token.expose().to_string())
}
