//! Error types for the session layer.

use std::io;

/// Errors that can occur while reading or writing session state.
#[derive(Debug, thiserror::Error)]
pub enum SessionError {
    /// The backing file could not be read or written.
    #[error("session storage I/O failed: {0}")]
    Io(#[from] io::Error),

    /// A stored document could not be encoded or decoded as JSON.
    #[error("session storage is not valid JSON: {0}")]
    Serde(#[from] serde_json::Error),
}
