use api_client::ApiError;
use api_client::error::{ClientBuildError, ConfigError};

use common::ErrorLocation;

use std::panic::Location;

use thiserror::Error;

/// Errors surfaced by the dashboard shell.
///
/// Library errors are flattened into messages here; the location records where
/// the shell received them.
#[derive(Debug, Error)]
pub enum DashboardError {
    /// Error from this App
    #[error("Dashboard Error: {message} {location}")]
    Dashboard {
        message: String,
        location: ErrorLocation,
    },

    /// Configuration could not be loaded or was invalid
    #[error("Config Error: {message} {location}")]
    Config {
        message: String,
        location: ErrorLocation,
    },

    /// The API client could not be constructed
    #[error("Client Error: {message} {location}")]
    Client {
        message: String,
        location: ErrorLocation,
    },

    /// A backend call failed
    #[error("Api Error: {message} {location}")]
    Api {
        message: String,
        location: ErrorLocation,
    },
}

impl DashboardError {
    #[track_caller]
    pub fn dashboard(message: impl Into<String>) -> Self {
        DashboardError::Dashboard {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }

    /// Message for the terminal, without source locations.
    pub fn user_message(&self) -> &str {
        match self {
            DashboardError::Dashboard { message, .. }
            | DashboardError::Config { message, .. }
            | DashboardError::Client { message, .. }
            | DashboardError::Api { message, .. } => message,
        }
    }
}

impl From<ConfigError> for DashboardError {
    #[track_caller]
    fn from(error: ConfigError) -> Self {
        DashboardError::Config {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<ClientBuildError> for DashboardError {
    #[track_caller]
    fn from(error: ClientBuildError) -> Self {
        DashboardError::Client {
            message: error.to_string(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}

impl From<ApiError> for DashboardError {
    #[track_caller]
    fn from(error: ApiError) -> Self {
        DashboardError::Api {
            message: error.full_message(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
