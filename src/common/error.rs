//! Error types for the application.

use thiserror::Error;

/// Configuration-related errors.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    IoError {
        path: String,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config: {message}")]
    ParseError { message: String },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

/// Failures reported by the Slack API client.
///
/// These are delivered inside completion events and surfaced as notices;
/// none of them is fatal to the bridge.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ApiError {
    #[error("{method} failed: {message}")]
    Request {
        method: &'static str,
        message: String,
    },

    #[error("Invalid authentication token")]
    InvalidAuth,

    #[error("Not connected")]
    NotConnected,

    #[error("Rate limited")]
    RateLimited,
}

/// Result type alias for Slack API calls.
pub type ApiResult<T> = std::result::Result<T, ApiError>;
