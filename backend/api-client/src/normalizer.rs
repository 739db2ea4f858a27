//! Converts every failure shape into one [`ApiError`].
//!
//! A response is first classified into a [`Failure`] variant
//! ([`classify_response`]), then [`normalize`] maps the variant onto the
//! normalized error. Both functions are pure and total.

use crate::envelope::{Envelope, ErrorBody};
use crate::error::ApiError;
use crate::error::CredentialStoreError;

use common::{ErrorLocation, HttpStatusCode};

use std::panic::Location;

use serde_json::Value;

pub const NETWORK_ERROR_TITLE: &str = "Network Error";
pub const NETWORK_ERROR_CODE: &str = "NETWORK_ERROR";
pub const NETWORK_ERROR_DETAIL: &str =
    "Unable to reach the server. Check your internet connection and try again.";

pub const REQUEST_FAILED_TITLE: &str = "Request Failed";
pub const REQUEST_FAILED_CODE: &str = "REQUEST_FAILED";

pub const INVALID_REQUEST_CODE: &str = "INVALID_REQUEST";
pub const INVALID_RESPONSE_CODE: &str = "INVALID_RESPONSE";
pub const CREDENTIAL_STORE_CODE: &str = "CREDENTIAL_STORE_ERROR";
pub const REFRESH_UNAVAILABLE_CODE: &str = "REFRESH_UNAVAILABLE";

/// What went wrong with a call, before normalization.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Failure {
    /// The backend answered with its own error envelope.
    Envelope {
        error: ErrorBody,
        message: Option<String>,
    },

    /// No response was received (connect failure, timeout, dropped body).
    Transport { message: String },

    /// An HTTP failure the backend did not format (proxy error, bare 5xx).
    Unformatted {
        status: HttpStatusCode,
        message: String,
    },
}

/// Split a raw response into a success envelope or a [`Failure`].
pub fn classify_response(status: HttpStatusCode, body: &[u8]) -> Result<Envelope<Value>, Failure> {
    match serde_json::from_slice::<Envelope<Value>>(body) {
        Ok(envelope) if envelope.success && status.is_success() => Ok(envelope),
        Ok(Envelope {
            error: Some(error),
            message,
            ..
        }) => Err(Failure::Envelope { error, message }),
        Ok(envelope) => Err(Failure::Unformatted {
            status,
            message: envelope
                .message
                .unwrap_or_else(|| unformatted_message(status)),
        }),
        Err(_) if status.is_success() => Err(Failure::Unformatted {
            status,
            message: String::from("Response from server was not a valid envelope"),
        }),
        Err(_) => Err(Failure::Unformatted {
            status,
            message: unformatted_message(status),
        }),
    }
}

fn unformatted_message(status: HttpStatusCode) -> String {
    format!("Request failed with status code {status}")
}

/// Normalize a classified failure. Never panics.
#[track_caller]
pub fn normalize(failure: Failure) -> ApiError {
    let location = ErrorLocation::from(Location::caller());

    match failure {
        Failure::Envelope { error, message } => {
            ApiError::new(error.title, HttpStatusCode(error.status), location)
                .with_optional_code(error.code)
                .with_details(error.details)
                .with_field_errors(error.field_errors)
                .with_backend_message(message)
        }
        Failure::Transport { .. } => {
            ApiError::new(NETWORK_ERROR_TITLE, HttpStatusCode::NO_RESPONSE, location)
                .with_code(NETWORK_ERROR_CODE)
                .with_details(vec![NETWORK_ERROR_DETAIL.to_string()])
        }
        Failure::Unformatted { status, message } => {
            ApiError::new(REQUEST_FAILED_TITLE, status, location)
                .with_code(REQUEST_FAILED_CODE)
                .with_details(vec![message])
        }
    }
}

/// The request body could not be serialized.
#[track_caller]
pub fn invalid_request(reason: impl Into<String>) -> ApiError {
    ApiError::new(
        "Invalid Request",
        HttpStatusCode::NO_RESPONSE,
        ErrorLocation::from(Location::caller()),
    )
    .with_code(INVALID_REQUEST_CODE)
    .with_details(vec![reason.into()])
}

/// A success envelope carried a value of the wrong shape.
#[track_caller]
pub fn invalid_response(status: HttpStatusCode, reason: impl Into<String>) -> ApiError {
    ApiError::new(
        "Invalid Response",
        status,
        ErrorLocation::from(Location::caller()),
    )
    .with_code(INVALID_RESPONSE_CODE)
    .with_details(vec![reason.into()])
}

#[track_caller]
pub fn credential_store(error: &CredentialStoreError) -> ApiError {
    ApiError::new(
        "Credential Storage Error",
        HttpStatusCode::NO_RESPONSE,
        ErrorLocation::from(Location::caller()),
    )
    .with_code(CREDENTIAL_STORE_CODE)
    .with_details(vec![error.to_string()])
}

#[track_caller]
pub fn refresh_unavailable(reason: impl Into<String>) -> ApiError {
    ApiError::new(
        "Session Refresh Unavailable",
        HttpStatusCode::NO_RESPONSE,
        ErrorLocation::from(Location::caller()),
    )
    .with_code(REFRESH_UNAVAILABLE_CODE)
    .with_details(vec![reason.into()])
}
