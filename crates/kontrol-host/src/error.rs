//! Host API error types.

use thiserror::Error;

/// Result type alias for host API operations.
pub type HostResult<T> = Result<T, HostError>;

/// Errors that can occur talking to the container host.
#[derive(Debug, Error)]
pub enum HostError {
    #[error("failed to connect to host socket: {0}")]
    Connect(#[from] std::io::Error),

    #[error("http error: {0}")]
    Http(#[from] hyper::Error),

    #[error("container not found: {0}")]
    NotFound(String),

    #[error("host API returned {status}: {message}")]
    Api { status: u16, message: String },

    #[error("failed to decode host response: {0}")]
    Decode(#[from] serde_json::Error),
}
