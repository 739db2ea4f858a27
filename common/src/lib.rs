//! Shared primitives for the clinical dashboard workspace.
//!
//! Pure data types with no I/O: error locations, HTTP status helpers and a
//! redacted credential wrapper. Everything above this crate depends on it,
//! nothing here depends on the rest of the workspace.
//!
//! ## Architecture
//!
//! - **common** (this crate): Shared primitives
//! - **api-client**: Authenticated HTTP gateway to the dashboard backend
//! - **dashboard**: Application shell wiring the client together

pub mod error;
pub mod http_status;
pub mod redacted_token;

pub use error::error_location::ErrorLocation;
pub use error::redact_error::RedactError;
pub use http_status::HttpStatusCode;
pub use redacted_token::RedactedToken;

#[cfg(test)]
mod tests;
