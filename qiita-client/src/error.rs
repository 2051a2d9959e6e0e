//! Error types for the Qiita client

use std::io::ErrorKind;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for client operations
pub type Result<T> = std::result::Result<T, ClientError>;

/// Errors that can occur when using the Qiita client
#[derive(Debug, Error)]
pub enum ClientError {
    /// The authentication endpoint rejected the client credentials
    #[error("Can't authenticate with the Qiita server: {0}")]
    Authentication(String),

    /// Server answered 404
    #[error("Resource not found: {0}")]
    NotFound(String),

    /// Server answered 403
    #[error("Forbidden: {0}")]
    Forbidden(String),

    /// Server answered 400 (after the one-time token refresh, if any)
    #[error("Bad request: {0}")]
    BadRequest(String),

    /// The request did not succeed within the retry budget
    ///
    /// `status` is `None` when the server could not be reached at all.
    #[error(
        "Request '{method} {path}' did not succeed. Status code: {}. Message: {message}",
        display_status(.status)
    )]
    RequestFailed {
        method: String,
        path: String,
        status: Option<u16>,
        message: String,
    },

    /// Caller misused an operation's parameter contract
    #[error("Invalid argument: {0}")]
    InvalidArgument(String),

    /// Unexpected condition outside the typed failures above
    #[error("{0}")]
    Runtime(String),

    /// Transport error that is not a connection-level failure
    #[error("HTTP request failed: {0}")]
    Http(#[from] reqwest::Error),

    /// Failed to parse a response body
    #[error("Failed to parse response: {0}")]
    Parse(String),

    /// The server certificate could not be loaded
    #[error("Failed to load server certificate {}: {source}", .path.display())]
    Certificate {
        path: PathBuf,
        source: std::io::Error,
    },
}

fn display_status(status: &Option<u16>) -> String {
    status.map_or_else(|| "none (server unreachable)".to_string(), |s| s.to_string())
}

/// Check if a transport error means the server could not be talked to
///
/// Covers refused connections, timeouts, and connections the server closed
/// or reset before answering (as during a server restart).
pub(crate) fn is_connection_failure(error: &reqwest::Error) -> bool {
    if error.is_connect() || error.is_timeout() || error.is_request() || error.is_body() {
        return true;
    }

    let mut source = std::error::Error::source(error);
    while let Some(cause) = source {
        if let Some(io) = cause.downcast_ref::<std::io::Error>() {
            if matches!(
                io.kind(),
                ErrorKind::ConnectionReset
                    | ErrorKind::ConnectionAborted
                    | ErrorKind::BrokenPipe
                    | ErrorKind::UnexpectedEof
            ) {
                return true;
            }
        }
        source = cause.source();
    }
    false
}

impl ClientError {
    /// Create a request failure for an exhausted retry budget
    pub fn request_failed(
        method: impl Into<String>,
        path: impl Into<String>,
        status: Option<u16>,
        message: impl Into<String>,
    ) -> Self {
        Self::RequestFailed {
            method: method.into(),
            path: path.into(),
            status,
            message: message.into(),
        }
    }

    /// Check if the server could not be reached at all
    pub fn is_unreachable(&self) -> bool {
        matches!(self, Self::RequestFailed { status: None, .. })
    }

    /// Check if this error is a "not found" error
    pub fn is_not_found(&self) -> bool {
        matches!(self, Self::NotFound(_))
    }

    /// Check if this error is one of the typed server-status errors (400/403/404)
    pub fn is_client_error(&self) -> bool {
        matches!(
            self,
            Self::NotFound(_) | Self::Forbidden(_) | Self::BadRequest(_)
        )
    }
}
