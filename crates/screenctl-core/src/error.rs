//! Error types for screen operations.

use thiserror::Error;

/// Errors that can occur during screen operations.
#[derive(Error, Debug)]
pub enum ScreenError {
    /// screen not found in PATH.
    #[error("screen not found in PATH")]
    ScreenNotFound,

    /// Input rejected before any external invocation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// Session not found.
    #[error("session '{0}' not found")]
    SessionNotFound(String),

    /// Session already exists.
    #[error("session '{0}' already exists")]
    SessionExists(String),

    /// screen command failed. Carries the tool's combined output verbatim.
    #[error("screen command failed: {0}")]
    CommandFailed(String),

    /// A wait was aborted by the caller's cancellation token.
    #[error("operation cancelled")]
    Cancelled,

    /// Signal delivery to a session process failed.
    #[error("signal delivery failed: {0}")]
    Signal(String),

    /// I/O error.
    #[error("io error: {0}")]
    Io(#[from] std::io::Error),

    /// Failed to parse tool output.
    #[error("parse error: {0}")]
    ParseError(String),

    /// Startup configuration could not be resolved.
    #[error("configuration error: {0}")]
    Config(String),
}

impl ScreenError {
    /// Returns true if this error means the session does not exist.
    pub fn is_not_found(&self) -> bool {
        matches!(self, ScreenError::SessionNotFound(_))
    }

    /// Returns true if this error came from cancellation.
    pub fn is_cancelled(&self) -> bool {
        matches!(self, ScreenError::Cancelled)
    }
}

/// Result type alias for screen operations.
pub type Result<T> = std::result::Result<T, ScreenError>;
