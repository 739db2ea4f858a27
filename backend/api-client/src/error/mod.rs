pub mod api;
pub mod client;
pub mod config;
pub mod credentials;

pub use api::ApiError;
pub use client::ClientBuildError;
pub use config::ConfigError;
pub use credentials::CredentialStoreError;
