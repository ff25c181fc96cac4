use std::time::Duration;

use crate::api::Lunyard;
use crate::constants::{CLEANUP_ALLOWANCE_SECS, LOCK_STALE_SECS};
use crate::logging::{AuditSink, FactsEmitter};
use crate::types::ProgressStatus;

/// Derived entirely from the lock record; never blocks and never writes.
pub(crate) fn run<E: FactsEmitter, A: AuditSink>(api: &Lunyard<E, A>) -> ProgressStatus {
    let Some(age) = api.lock.holder_age() else {
        return ProgressStatus::default();
    };
    if age >= Duration::from_secs(LOCK_STALE_SECS) {
        // Crashed holder; the next acquirer reaps it.
        return ProgressStatus {
            in_progress: false,
            lock_age: Some(age),
            estimated_seconds_remaining: None,
        };
    }
    let budget = api.config.timeouts.exec_secs + CLEANUP_ALLOWANCE_SECS;
    ProgressStatus {
        in_progress: true,
        lock_age: Some(age),
        estimated_seconds_remaining: Some(budget.saturating_sub(age.as_secs())),
    }
}
