use std::time::{Duration, Instant};

use log::Level;
use serde_json::json;

use crate::adapters::lock::LockGuard;
use crate::api::errors::ApiError;
use crate::api::Lunyard;
use crate::constants::LOCK_POLL_MS;
use crate::logging::{AuditSink, FactsEmitter, StageLogger};

/// Take the global transition lock, emitting a `lock.acquire` fact either way.
pub(crate) fn acquire<E: FactsEmitter, A: AuditSink>(
    api: &Lunyard<E, A>,
    slog: &StageLogger<'_>,
    timeout: Duration,
) -> Result<Box<dyn LockGuard>, ApiError> {
    let t0 = Instant::now();
    let timeout_ms = u64::try_from(timeout.as_millis()).unwrap_or(u64::MAX);
    let res = api.lock.acquire_process_lock(timeout_ms);
    let lock_wait_ms = u64::try_from(t0.elapsed().as_millis()).unwrap_or(u64::MAX);
    let fields = json!({
        "lock_path": api.config.lock_path.display().to_string(),
        "lock_wait_ms": lock_wait_ms,
        "lock_attempts": 1 + lock_wait_ms / LOCK_POLL_MS,
    });
    match res {
        Ok(g) => {
            slog.lock_acquire().merge(fields).emit_success();
            Ok(g)
        }
        Err(e) => {
            let err = ApiError::ConcurrencyTimeout(format!(
                "lock not acquired within {}s",
                timeout.as_secs()
            ));
            slog.lock_acquire()
                .merge(fields)
                .field("error", json!(e.to_string()))
                .error_id(err.id())
                .emit_failure();
            api.audit.log(Level::Warn, &format!("lock acquisition failed: {e}"));
            Err(err)
        }
    }
}
