//! Error types for push-dl
//!
//! This module provides error handling for the library, including:
//! - A crate-level [`Error`] with a [`Result`] alias
//! - A tagged [`GotifyError`] decoded once at the HTTP boundary, so transport
//!   failures, undecodable bodies, and application-level rejections are never
//!   confused with legitimate empty results

use thiserror::Error;

/// Result type alias for push-dl operations
pub type Result<T> = std::result::Result<T, Error>;

/// Result type alias for Gotify API operations
pub type GotifyResult<T> = std::result::Result<T, GotifyError>;

/// Main error type for push-dl
///
/// Configuration errors are the only fatal class: they are returned before the
/// poll loop starts. Everything else is absorbed at the component boundary,
/// logged, and converted into "this piece produced nothing this cycle".
#[derive(Debug, Error)]
pub enum Error {
    /// Configuration error with context about which setting is invalid
    #[error("configuration error: {message}")]
    Config {
        /// Human-readable error message describing the configuration issue
        message: String,
        /// The configuration key that caused the error (e.g., "temp_dir")
        key: Option<String>,
    },

    /// I/O error
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Gotify API error (transport, decode, or application-level)
    #[error("gotify error: {0}")]
    Gotify(#[from] GotifyError),

    /// Serialization error
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// The download status log could not be read or rewritten
    #[error("status log error: {0}")]
    StatusLog(String),

    /// The download command could not be launched
    #[error("executor error: {0}")]
    Executor(String),
}

impl Error {
    /// Convenience constructor for configuration errors
    pub fn config(message: impl Into<String>, key: impl Into<String>) -> Self {
        Self::Config {
            message: message.into(),
            key: Some(key.into()),
        }
    }
}

/// Error type for the Gotify HTTP boundary
///
/// The remote's response shapes are decoded exactly once, into this tagged
/// type. Callers match on the variant instead of probing optional JSON keys.
#[derive(Debug, Error)]
pub enum GotifyError {
    /// The request never completed (connect, timeout, TLS, ...)
    #[error("transport error: {0}")]
    Transport(#[from] reqwest::Error),

    /// The response body was not the JSON shape we expected
    #[error("could not decode response: {0}")]
    Decode(String),

    /// The server answered with an application-level error description
    #[error("server rejected request: {description}")]
    Application {
        /// The `errorDescription` field reported by the server
        description: String,
    },
}
