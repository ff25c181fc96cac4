pub mod file;

use std::time::Duration;

use crate::types::errors::Result;

/// Held for the lifetime of one transition; releasing happens on drop.
pub trait LockGuard: Send {}

/// Process-wide (and cross-process) mutual exclusion for quick-edit transitions.
pub trait LockManager: Send + Sync {
    /// Acquire the transition lock, waiting at most `timeout_ms`.
    /// # Errors
    /// Returns an error if the lock cannot be acquired within the timeout period.
    fn acquire_process_lock(&self, timeout_ms: u64) -> Result<Box<dyn LockGuard>>;

    /// Age of the outstanding lock, or `None` when nobody holds it.
    /// Read-only; never removes or creates anything.
    fn holder_age(&self) -> Option<Duration>;
}
