//! Error types for the core library.

use thiserror::Error;

use crate::remote::RemoteError;

/// Errors that can occur in core operations.
#[derive(Debug, Error)]
pub enum Error {
    /// Remote call failed.
    #[error("Remote error: {0}")]
    Remote(#[from] RemoteError),

    /// Serialization/deserialization error.
    #[error("Serialization error: {0}")]
    Serde(#[from] serde_json::Error),

    /// I/O error.
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    /// Folder is not part of the loaded folder list.
    #[error("Unknown folder: {0}")]
    UnknownFolder(String),

    /// The engine event loop is no longer running.
    #[error("Sync engine stopped")]
    EngineStopped,

    /// The local store's background writer is gone.
    #[error("Local store writer stopped")]
    StoreClosed,
}

/// Result type alias using our Error type.
pub type Result<T> = std::result::Result<T, Error>;
