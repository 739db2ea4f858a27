//! Authenticated HTTP gateway for the clinical dashboard backend.
//!
//! Every outbound call goes through [`ApiClient`], which attaches the stored
//! bearer token, unwraps the backend envelope and converts every failure into
//! one [`ApiError`]. Calls rejected with an expired access token are parked
//! behind a single credential refresh and retried once it settles.

pub mod client;
pub mod config;
pub mod credentials;
pub mod envelope;
pub mod error;
pub mod normalizer;
pub mod pipeline;
pub mod refresh;

#[cfg(test)]
mod tests;

pub use client::ApiClient;
pub use credentials::{CredentialStore, FileCredentialStore, MemoryCredentialStore};
pub use envelope::{ApiResponse, AuthTokens, Paginated, Pagination};
pub use error::api::ApiError;
pub use pipeline::{ApiRequest, RequestOptions};
pub use refresh::session::{SessionEndReason, SessionEvent};

pub const DEFAULT_API_HOST: &str = "127.0.0.1";
pub const DEFAULT_API_PORT: u16 = 8000;
pub const DEFAULT_API_BASE_URL: &str =
    const_format::concatcp!("http://", DEFAULT_API_HOST, ":", DEFAULT_API_PORT, "/api/");

pub const AUTH_ROUTE: &str = "auth";
pub const LOGIN_PATH: &str = const_format::concatcp!(AUTH_ROUTE, "/login");
pub const REFRESH_PATH: &str = const_format::concatcp!(AUTH_ROUTE, "/refresh");
