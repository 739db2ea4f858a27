use crate::ErrorLocation;

use thiserror::Error as ThisError;

/// Raised when a redacted secret is pushed through a serializer.
#[derive(Debug, ThisError)]
pub enum RedactError {
    #[error("Token Serialization Error: {kind} tokens must be exposed explicitly {location}")]
    TokenSerialization {
        kind: &'static str,
        location: ErrorLocation,
    },
}
