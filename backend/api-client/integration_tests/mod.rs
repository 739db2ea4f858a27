//! Integration tests for the API client against a mock backend.

mod helpers;

mod pipeline;
mod refresh;
mod session;
