//! Error types for the HTTP transport.

use mailsync_core::RemoteError;

/// Result type alias for transport setup and requests.
pub type Result<T> = std::result::Result<T, Error>;

/// Transport error types.
#[derive(Debug, thiserror::Error)]
pub enum Error {
    /// HTTP request error.
    #[error("HTTP error: {0}")]
    Http(#[from] reqwest::Error),

    /// JSON parsing error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// The server answered with a non-success status.
    #[error("HTTP status {0}")]
    Status(u16),

    /// Invalid configuration.
    #[error("Invalid configuration: {0}")]
    InvalidConfig(String),

    /// URL parsing error.
    #[error("URL error: {0}")]
    Url(#[from] url::ParseError),
}

impl From<Error> for RemoteError {
    fn from(err: Error) -> Self {
        match err {
            Error::Json(e) => Self::Malformed(e.to_string()),
            other => Self::Transport(other.to_string()),
        }
    }
}
