//! The single error shape every failed call converges to.
//!
//! Built by [`crate::normalizer`] and never mutated afterwards. Cloned when one
//! refresh failure has to be delivered to several queued callers.

use common::{ErrorLocation, HttpStatusCode};

use std::collections::BTreeMap;

use thiserror::Error as ThisError;

/// Normalized API error.
///
/// `http_status` is `0` when no response was received.
#[derive(Debug, Clone, ThisError)]
#[error("{title} (HTTP {http_status}) {location}")]
pub struct ApiError {
    title: String,
    code: Option<String>,
    http_status: HttpStatusCode,
    details: Vec<String>,
    field_errors: BTreeMap<String, Vec<String>>,
    backend_message: Option<String>,
    location: ErrorLocation,
}

impl ApiError {
    pub(crate) fn new(
        title: impl Into<String>,
        http_status: HttpStatusCode,
        location: ErrorLocation,
    ) -> Self {
        Self {
            title: title.into(),
            code: None,
            http_status,
            details: Vec::new(),
            field_errors: BTreeMap::new(),
            backend_message: None,
            location,
        }
    }

    pub(crate) fn with_code(mut self, code: impl Into<String>) -> Self {
        self.code = Some(code.into());
        self
    }

    pub(crate) fn with_optional_code(mut self, code: Option<String>) -> Self {
        self.code = code;
        self
    }

    pub(crate) fn with_details(mut self, details: Vec<String>) -> Self {
        self.details = details;
        self
    }

    pub(crate) fn with_field_errors(mut self, field_errors: BTreeMap<String, Vec<String>>) -> Self {
        self.field_errors = field_errors;
        self
    }

    pub(crate) fn with_backend_message(mut self, message: Option<String>) -> Self {
        self.backend_message = message;
        self
    }

    pub fn title(&self) -> &str {
        &self.title
    }

    /// Machine-readable code, e.g. `"TOKEN_EXPIRED"` or `"NETWORK_ERROR"`.
    pub fn code(&self) -> Option<&str> {
        self.code.as_deref()
    }

    pub fn http_status(&self) -> HttpStatusCode {
        self.http_status
    }

    pub fn details(&self) -> &[String] {
        &self.details
    }

    pub fn field_errors(&self) -> &BTreeMap<String, Vec<String>> {
        &self.field_errors
    }

    pub fn backend_message(&self) -> Option<&str> {
        self.backend_message.as_deref()
    }

    pub fn location(&self) -> ErrorLocation {
        self.location
    }

    /// Message to show to a user: the backend's human message when it sent
    /// one, otherwise the error title.
    pub fn display_message(&self) -> &str {
        self.backend_message.as_deref().unwrap_or(&self.title)
    }

    /// Title, details and `field: message` pairs, one per line.
    pub fn full_message(&self) -> String {
        let mut lines = Vec::with_capacity(1 + self.details.len() + self.field_errors.len());
        lines.push(self.title.clone());
        lines.extend(self.details.iter().cloned());

        for (field, messages) in &self.field_errors {
            for message in messages {
                lines.push(format!("{field}: {message}"));
            }
        }

        lines.join("\n")
    }

    /// Validation messages for one form field, in backend order.
    pub fn field_error(&self, field: &str) -> Option<&[String]> {
        self.field_errors.get(field).map(Vec::as_slice)
    }

    pub fn has_field_errors(&self) -> bool {
        !self.field_errors.is_empty()
    }

    pub fn is_unauthorized(&self) -> bool {
        self.http_status.is_unauthorized()
    }

    pub fn is_network_error(&self) -> bool {
        self.http_status.is_no_response()
    }
}
