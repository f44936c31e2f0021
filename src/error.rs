//! Error taxonomy for settled request results.
//!
//! Every failure that can reach the UI boundary is normalized into one of
//! three shapes before it is stored in the cache:
//!
//! - [`ApiError::Network`] — the request never reached the server, or no
//!   response arrived (DNS failure, refused connection, closed socket).
//! - [`ApiError::Server`] — the server answered with a non-2xx status and,
//!   when available, a structured `{"message": …}` body.
//! - [`ApiError::Transform`] — a 2xx response failed shape validation, or a
//!   request builder rejected its arguments before any network I/O.
//!
//! Failures are data, not control flow: the cache stores them and
//! subscribers render them. Nothing in this crate converts an error result
//! back into a success.

use thiserror::Error;

/// A normalized request failure.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum ApiError {
    /// The request never produced a response.
    #[error("network error: {0}")]
    Network(String),

    /// The server responded with a non-2xx status.
    #[error("server error ({status}): {message}")]
    Server { status: u16, message: String },

    /// A success response (or the request arguments) failed validation.
    #[error("transform error: {0}")]
    Transform(String),
}

impl ApiError {
    /// Creates a network error from any displayable cause.
    pub fn network(cause: impl ToString) -> Self {
        Self::Network(cause.to_string())
    }

    /// Creates a server error with the given status and message.
    pub fn server(status: u16, message: impl Into<String>) -> Self {
        Self::Server {
            status,
            message: message.into(),
        }
    }

    /// Creates a transform error from any displayable cause.
    pub fn transform(cause: impl ToString) -> Self {
        Self::Transform(cause.to_string())
    }

    /// The human-readable message, regardless of variant.
    ///
    /// This is the string a UI renders; it never includes the status code.
    pub fn message(&self) -> &str {
        match self {
            Self::Network(msg) | Self::Transform(msg) => msg,
            Self::Server { message, .. } => message,
        }
    }

    /// The HTTP status code, for server errors only.
    pub const fn status(&self) -> Option<u16> {
        match self {
            Self::Server { status, .. } => Some(*status),
            _ => None,
        }
    }
}
