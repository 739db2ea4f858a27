use crate::error::config::ConfigError;

use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error as ThisError;

/// Errors raised while assembling an [`ApiClient`](crate::ApiClient).
///
/// Request-time failures never use this type; they are always [`ApiError`](crate::ApiError).
#[derive(Debug, ThisError)]
pub enum ClientBuildError {
    #[error("URL Parse Error: {message} {location}")]
    UrlParse {
        message: String,
        location: ErrorLocation,
    },

    #[error("HTTP Client Error: {message} {location}")]
    Http {
        message: String,
        location: ErrorLocation,
    },

    #[error(transparent)]
    Config(#[from] ConfigError),
}

impl From<url::ParseError> for ClientBuildError {
    #[track_caller]
    fn from(error: url::ParseError) -> Self {
        ClientBuildError::UrlParse {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<reqwest::Error> for ClientBuildError {
    #[track_caller]
    fn from(error: reqwest::Error) -> Self {
        ClientBuildError::Http {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
