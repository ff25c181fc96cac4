//! Error types used across Lunyard.
use thiserror::Error;

/// High-level error categories for adapters and OS-facing helpers.
#[derive(Debug, Copy, Clone, PartialEq, Eq, Error)]
pub enum ErrorKind {
    #[error("configuration error")]
    Config,
    #[error("io error")]
    Io,
    #[error("command failed")]
    Command,
    #[error("timed out")]
    Timeout,
    #[error("gadget error")]
    Gadget,
    #[error("locking error")]
    Locking,
}

/// Structured error with a kind and human message.
#[derive(Debug, Error)]
#[error("{kind:?}: {msg}")]
pub struct Error {
    pub kind: ErrorKind,
    pub msg: String,
}

impl Error {
    pub fn new(kind: ErrorKind, msg: impl Into<String>) -> Self {
        Self {
            kind,
            msg: msg.into(),
        }
    }

    pub fn io(context: impl std::fmt::Display, e: &std::io::Error) -> Self {
        Self::new(ErrorKind::Io, format!("{context}: {e}"))
    }
}

/// Convenient alias for results returning a `types::Error`.
pub type Result<T> = std::result::Result<T, Error>;
