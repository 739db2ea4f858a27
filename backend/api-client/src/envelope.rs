//! Wire types for the backend's uniform response envelope.

use common::RedactedToken;

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// `{ success, message?, value?, error?, pagination? }` as sent by the backend.
#[derive(Debug, Clone, Deserialize)]
pub struct Envelope<T = Value> {
    pub success: bool,
    #[serde(default)]
    pub message: Option<String>,
    #[serde(default = "Option::default")]
    pub value: Option<T>,
    #[serde(default)]
    pub error: Option<ErrorBody>,
    #[serde(default)]
    pub pagination: Option<Pagination>,
}

/// Error object inside a failed envelope.
#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct ErrorBody {
    pub title: String,
    #[serde(default)]
    pub code: Option<String>,
    pub status: u16,
    #[serde(default, deserialize_with = "null_as_default")]
    pub details: Vec<String>,
    #[serde(default, deserialize_with = "null_as_default")]
    pub field_errors: BTreeMap<String, Vec<String>>,
}

/// Treat an explicit `null` like a missing key.
fn null_as_default<'de, D, T>(deserializer: D) -> Result<T, D::Error>
where
    D: Deserializer<'de>,
    T: Default + Deserialize<'de>,
{
    Ok(Option::<T>::deserialize(deserializer)?.unwrap_or_default())
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize, PartialEq, Eq)]
pub struct Pagination {
    pub page: u32,
    pub page_size: u32,
    pub total: u64,
    pub total_pages: u32,
}

impl Default for Pagination {
    /// Used when the backend omits pagination metadata.
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 0,
            total: 0,
            total_pages: 0,
        }
    }
}

/// One page of a list endpoint.
#[derive(Debug, Clone, PartialEq)]
pub struct Paginated<T> {
    pub items: Vec<T>,
    pub pagination: Pagination,
}

/// Unwrapped value together with the backend's human message.
#[derive(Debug, Clone, PartialEq)]
pub struct ApiResponse<T> {
    pub value: T,
    pub message: Option<String>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AccessToken {
    pub token: RedactedToken,
    pub expires_at: DateTime<Utc>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RefreshToken {
    pub token: RedactedToken,
}

/// Token pair issued by login and refresh.
#[derive(Debug, Clone, Deserialize)]
pub struct AuthTokens {
    pub access_token: AccessToken,
    pub refresh_token: RefreshToken,
}

/// `value` of a login or refresh envelope. Other fields (the user profile on
/// login) are ignored here and decoded separately by the caller.
#[derive(Debug, Clone, Deserialize)]
pub struct TokenPayload {
    pub tokens: AuthTokens,
}

#[derive(Debug, Serialize)]
pub(crate) struct RefreshRequest<'a> {
    pub refresh_token: &'a str,
}
