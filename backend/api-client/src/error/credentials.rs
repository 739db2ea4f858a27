//! Errors from credential storage backends.
//!
//! Storage failures are fatal to the operation that hit them; nothing retries.

use common::ErrorLocation;

use std::path::PathBuf;
use std::panic::Location;

use thiserror::Error as ThisError;

#[derive(Debug, ThisError)]
pub enum CredentialStoreError {
    #[error("Credential Read Error: {path}: {source} {location}")]
    Read {
        path: PathBuf,
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("Credential Write Error: {path}: {source} {location}")]
    Write {
        path: PathBuf,
        #[source]
        source: std::io::Error,
        location: ErrorLocation,
    },

    #[error("Credential Parse Error: {path}: {reason} {location}")]
    Parse {
        path: PathBuf,
        reason: String,
        location: ErrorLocation,
    },

    #[error("Credential Serialization Error: {reason} {location}")]
    Serialize {
        reason: String,
        location: ErrorLocation,
    },

    #[error("Credential Lock Error: {message} {location}")]
    Poisoned {
        message: String,
        location: ErrorLocation,
    },
}

impl CredentialStoreError {
    #[track_caller]
    pub fn poisoned(message: impl Into<String>) -> Self {
        CredentialStoreError::Poisoned {
            message: message.into(),
            location: ErrorLocation::from(Location::caller()),
        }
    }
}
