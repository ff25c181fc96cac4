//! What a caller-supplied operation sees while a partition is writable.
use std::path::{Component, Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use thiserror::Error;

/// Failure reported by a caller-supplied operation.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum OpError {
    #[error("cancelled")]
    Cancelled,
    #[error("invalid path: {0}")]
    InvalidPath(String),
    #[error("io error: {0}")]
    Io(String),
    #[error("{0}")]
    Failed(String),
}

impl From<std::io::Error> for OpError {
    fn from(e: std::io::Error) -> Self {
        OpError::Io(e.to_string())
    }
}

/// Shared cancellation flag. Set by the executor once the deadline passes.
#[derive(Debug, Clone, Default)]
pub struct CancelToken(Arc<AtomicBool>);

impl CancelToken {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    pub fn cancel(&self) {
        self.0.store(true, Ordering::SeqCst);
    }

    #[must_use]
    pub fn is_cancelled(&self) -> bool {
        self.0.load(Ordering::SeqCst)
    }

    /// Safe point for long operations: returns `Err(OpError::Cancelled)` once cancelled.
    ///
    /// # Errors
    /// Returns `OpError::Cancelled` after the executor gave up on the operation.
    pub fn checkpoint(&self) -> Result<(), OpError> {
        if self.is_cancelled() {
            Err(OpError::Cancelled)
        } else {
            Ok(())
        }
    }
}

/// The writable view of one partition handed to an operation.
#[derive(Debug, Clone)]
pub struct WriteWindow {
    root: PathBuf,
    partition: String,
    cancel: CancelToken,
}

impl WriteWindow {
    #[must_use]
    pub fn new(root: PathBuf, partition: impl Into<String>, cancel: CancelToken) -> Self {
        Self {
            root,
            partition: partition.into(),
            cancel,
        }
    }

    /// Mount point of the read-write view.
    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    #[must_use]
    pub fn partition(&self) -> &str {
        &self.partition
    }

    #[must_use]
    pub fn cancel_token(&self) -> &CancelToken {
        &self.cancel
    }

    /// Shorthand for `cancel_token().checkpoint()`.
    ///
    /// # Errors
    /// Returns `OpError::Cancelled` once the executor gave up on the operation.
    pub fn checkpoint(&self) -> Result<(), OpError> {
        self.cancel.checkpoint()
    }

    /// Join a relative path onto the window root, refusing anything that escapes it.
    ///
    /// # Errors
    /// Returns `OpError::InvalidPath` for absolute paths, `..` components or an empty path.
    pub fn resolve(&self, rel: &Path) -> Result<PathBuf, OpError> {
        let mut out = self.root.clone();
        let mut pushed = false;
        for c in rel.components() {
            match c {
                Component::Normal(part) => {
                    out.push(part);
                    pushed = true;
                }
                Component::CurDir => {}
                _ => return Err(OpError::InvalidPath(rel.display().to_string())),
            }
        }
        if !pushed {
            return Err(OpError::InvalidPath(rel.display().to_string()));
        }
        Ok(out)
    }
}
