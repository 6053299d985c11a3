/*
[INPUT]:  Error sources (validation, auth, serialization, WebSocket)
[OUTPUT]: Structured error types with context and classification helpers
[POS]:    Error handling layer - unified error type for the entire crate
[UPDATE]: When adding new error sources or improving error messages
*/

use thiserror::Error;

/// Main error type for the OKX stream adapter
#[derive(Error, Debug)]
pub enum OkxError {
    /// Caller passed an invalid argument (e.g. an empty instrument list)
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Private-stream operation attempted without credentials
    #[error("credentials required for private channels")]
    MissingCredentials,

    /// Login signature could not be computed
    #[error("signature error: {0}")]
    Signature(String),

    /// Serialization/deserialization failed
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// URL parsing failed
    #[error("invalid URL: {0}")]
    UrlParse(#[from] url::ParseError),

    /// WebSocket error
    #[error("WebSocket error: {0}")]
    WebSocket(String),

    /// The session was closed by an explicit teardown
    #[error("session closed")]
    SessionClosed,
}

impl OkxError {
    /// True for errors reported synchronously to the caller before any
    /// network activity; these are never retried.
    pub fn is_caller_error(&self) -> bool {
        matches!(
            self,
            OkxError::InvalidArgument(_) | OkxError::MissingCredentials
        )
    }
}

/// Result type alias for adapter operations
pub type Result<T> = std::result::Result<T, OkxError>;
