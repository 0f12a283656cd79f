//! Transport error definitions.

use thiserror::Error;

/// Errors that can occur while exchanging a request with the auction server.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum TransportError {
    /// Connect or read deadline elapsed.
    #[error("transport timeout: {0}")]
    Timeout(String),

    /// The host URL could not be used to build a request.
    #[error("invalid auction URL: {0}")]
    InvalidUrl(String),

    /// Any other I/O failure, including unreadable response bodies.
    #[error("transport I/O error: {0}")]
    Io(String),
}

impl From<reqwest::Error> for TransportError {
    fn from(e: reqwest::Error) -> Self {
        if e.is_timeout() {
            TransportError::Timeout(e.to_string())
        } else if e.is_builder() {
            TransportError::InvalidUrl(e.to_string())
        } else {
            TransportError::Io(e.to_string())
        }
    }
}

/// Result type for transport operations.
pub type TransportResult<T> = Result<T, TransportError>;
