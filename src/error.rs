use std::io;
use std::time::Duration;
use strum_macros::Display;
use thiserror::Error;

/// The primary error type for the `rs232-session` library.
#[derive(Error, Debug)]
pub enum SessionError {
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Key file too short: expected at least {expected} bytes, got {actual}")]
    KeyTooShort { expected: usize, actual: usize },

    #[error("Failed to open serial port {port}: {source}")]
    Connection {
        port: String,
        #[source]
        source: serialport::Error,
    },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("Timeout after {after:?}: expected {expected} response bytes, got {received}")]
    Timeout {
        expected: usize,
        received: usize,
        after: Duration,
    },
}

/// Coarse failure category, for callers that only need to branch on the kind.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Display)]
pub enum ErrorKind {
    #[strum(to_string = "invalid input")]
    InvalidInput,
    #[strum(to_string = "connection")]
    Connection,
    #[strum(to_string = "I/O")]
    Io,
    #[strum(to_string = "timeout")]
    Timeout,
}

impl SessionError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            SessionError::InvalidInput(_) | SessionError::KeyTooShort { .. } => ErrorKind::InvalidInput,
            SessionError::Connection { .. } => ErrorKind::Connection,
            SessionError::Io(_) => ErrorKind::Io,
            SessionError::Timeout { .. } => ErrorKind::Timeout,
        }
    }

    /// Process exit status used by the command-line front end
    pub fn exit_code(&self) -> i32 {
        match self.kind() {
            ErrorKind::InvalidInput => 2,
            ErrorKind::Connection => 3,
            ErrorKind::Io => 4,
            ErrorKind::Timeout => 5,
        }
    }

    pub(crate) fn invalid(message: impl Into<String>) -> Self {
        SessionError::InvalidInput(message.into())
    }
}
