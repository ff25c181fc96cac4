//! Mount Transition Engine.
//!
//! One quick-edit moves a served partition through
//! `served -> backing_cleared -> ro_unmounted -> loop_ready -> rw_mounted ->
//! callback_running -> synced` and back. Cleanup runs on every path out of the
//! forward steps, including panics, and always in the same priority order:
//! LUN backing first, read-only mount second, cache drop last.
mod cleanup;
mod steps;

use std::panic::{self, AssertUnwindSafe};
use std::time::{Duration, Instant};

use log::Level;
use serde_json::json;

use crate::api::errors::ApiError;
use crate::api::{inspect, lock, Lunyard};
use crate::config::Timeouts;
use crate::constants::{DEFAULT_EXEC_TIMEOUT_SECS, DEFAULT_LOCK_TIMEOUT_SECS};
use crate::logging::audit::AuditCtx;
use crate::logging::{AuditSink, FactsEmitter, StageLogger};
use crate::types::{OpError, OperationResult, WriteWindow};

pub(crate) use steps::Transition;

/// Bounds for one quick-edit call.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct QuickEditOptions {
    pub lock_timeout: Duration,
    pub exec_timeout: Duration,
}

impl Default for QuickEditOptions {
    fn default() -> Self {
        Self {
            lock_timeout: Duration::from_secs(DEFAULT_LOCK_TIMEOUT_SECS),
            exec_timeout: Duration::from_secs(DEFAULT_EXEC_TIMEOUT_SECS),
        }
    }
}

impl QuickEditOptions {
    #[must_use]
    pub const fn from_timeouts(t: &Timeouts) -> Self {
        Self {
            lock_timeout: t.lock(),
            exec_timeout: t.exec(),
        }
    }
}

pub(crate) fn run<E, A, F>(
    api: &Lunyard<E, A>,
    partition: &str,
    op: F,
    opts: QuickEditOptions,
) -> OperationResult
where
    E: FactsEmitter,
    A: AuditSink,
    F: FnOnce(&WriteWindow) -> Result<String, OpError> + Send + 'static,
{
    let t0 = Instant::now();
    let ctx = AuditCtx::new(&api.facts, Some(partition));
    let slog = StageLogger::new(&ctx);

    let Some(part) = api.config.partition(partition) else {
        let err = ApiError::Configuration(format!("unknown partition '{partition}'"));
        slog.preflight().error_id(err.id()).emit_failure();
        return err.to_result();
    };
    if let Err(e) = api.config.check_hold_budget(opts.exec_timeout) {
        let err = ApiError::from(e);
        slog.preflight().error_id(err.id()).emit_failure();
        return err.to_result();
    }

    let pre = inspect::run(api);
    if !part.image.exists() {
        let err = ApiError::Configuration(format!("image {} is missing", part.image.display()));
        slog.preflight()
            .field("errors", json!(pre.errors))
            .error_id(err.id())
            .emit_failure();
        api.audit.log(Level::Error, &format!("quick-edit {partition}: {err}"));
        return err.to_result();
    }
    slog.preflight()
        .merge(json!({
            "healthy": pre.healthy,
            "issues": pre.issues.len(),
            "fixes_applied": pre.fixes_applied.len(),
        }))
        .emit_success();

    let guard = match lock::acquire(api, &slog, opts.lock_timeout) {
        Ok(g) => g,
        Err(e) => return e.to_result(),
    };

    let mut tr = Transition::new(api, part, &slog);
    let forward = panic::catch_unwind(AssertUnwindSafe(|| tr.forward(op, opts.exec_timeout)));
    let result = match forward {
        Ok(Ok(message)) => OperationResult::ok(message),
        Ok(Err(e)) => e.to_result(),
        Err(_) => {
            api.audit
                .log(Level::Error, &format!("quick-edit {partition}: internal panic"));
            ApiError::Mount("internal error during transition".to_string()).to_result()
        }
    };
    let degraded = tr.cleanup();
    drop(guard);

    // Advisory; never changes the result.
    let post = inspect::run(api);
    let duration_ms = u64::try_from(t0.elapsed().as_millis()).unwrap_or(u64::MAX);
    let ev = slog.postflight().merge(json!({
        "healthy": post.healthy,
        "issues": post.issues,
        "degraded": degraded,
        "success": result.success,
        "duration_ms": duration_ms,
    }));
    if post.healthy && !degraded {
        ev.emit_success();
    } else {
        ev.emit_warn();
    }
    api.audit.log(
        if result.success { Level::Info } else { Level::Warn },
        &format!("quick-edit {partition}: {}", result.message),
    );
    result
}
