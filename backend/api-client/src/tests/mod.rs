mod api_error;
mod config;
mod normalizer;
