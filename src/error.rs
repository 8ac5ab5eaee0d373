//! Error types for the Zoekt client.

use std::time::Duration;

use thiserror::Error;

/// Errors returned by [`crate::ZoektClient`] and [`crate::BlockingZoektClient`].
///
/// The query parser, builder, template evaluator and offset adjuster never
/// fail; only the network layer and content decoding produce these.
#[derive(Debug, Error)]
pub enum ZoektError {
    /// The server could not be reached.
    #[error("Failed to connect to Zoekt server: {0}")]
    Connection(String),

    /// The request did not complete within the configured timeout.
    #[error("Request timed out after {} seconds", .0.as_secs_f64())]
    Timeout(Duration),

    /// The server answered with a non-success status.
    #[error("Zoekt API error ({status_code}): {message}")]
    Api { status_code: u16, message: String },

    /// The response body did not match the expected shape.
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// Match content was not valid base64.
    #[error("Invalid base64 content: {0}")]
    Decode(#[from] base64::DecodeError),

    /// Invalid client configuration.
    #[error("Invalid configuration: {0}")]
    Config(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
}

impl ZoektError {
    /// Whether a retry could plausibly succeed.
    pub const fn is_retryable(&self) -> bool {
        matches!(self, ZoektError::Connection(_) | ZoektError::Timeout(_))
    }

    /// Classify a transport-level failure from reqwest.
    pub(crate) fn from_transport(err: reqwest::Error, timeout: Duration) -> Self {
        if err.is_timeout() {
            ZoektError::Timeout(timeout)
        } else if err.is_decode() {
            ZoektError::Parse(err.to_string())
        } else {
            ZoektError::Connection(err.to_string())
        }
    }
}

impl From<serde_json::Error> for ZoektError {
    fn from(err: serde_json::Error) -> Self {
        ZoektError::Parse(err.to_string())
    }
}
