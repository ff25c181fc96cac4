use log::Level;
use serde_json::json;

use crate::api::errors::ApiError;
use crate::api::executor::{run_with_timeout, ExecOutcome};
use crate::api::quick_edit::{self, QuickEditOptions};
use crate::api::{lock, Lunyard};
use crate::fs::mounted_at;
use crate::logging::audit::AuditCtx;
use crate::logging::{AuditSink, FactsEmitter, StageLogger};
use crate::types::{CancelToken, OpError, OperationResult, PresentMode, WriteWindow};

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
    let mode = api.current_mode();
    let ctx = AuditCtx::new(&api.facts, Some(partition));
    let slog = StageLogger::new(&ctx);
    slog.edit().field("mode", json!(mode.as_str())).emit_success();
    match mode {
        PresentMode::Present => quick_edit::run(api, partition, op, opts),
        PresentMode::Edit => match direct(api, &slog, partition, op, opts) {
            Ok(msg) => OperationResult::ok(msg),
            Err(e) => {
                slog.edit()
                    .field("error", json!(e.to_string()))
                    .error_id(e.id())
                    .emit_failure();
                e.to_result()
            }
        },
        PresentMode::Unknown => {
            let e = ApiError::Gadget("device mode unknown; refusing to edit".to_string());
            slog.edit().error_id(e.id()).emit_failure();
            api.audit.log(Level::Warn, &format!("edit {partition}: mode unknown"));
            e.to_result()
        }
    }
}

/// Edit mode: the partition is already mounted read-write locally.
fn direct<E, A, F>(
    api: &Lunyard<E, A>,
    slog: &StageLogger<'_>,
    partition: &str,
    op: F,
    opts: QuickEditOptions,
) -> Result<String, ApiError>
where
    E: FactsEmitter,
    A: AuditSink,
    F: FnOnce(&WriteWindow) -> Result<String, OpError> + Send + 'static,
{
    let part = api
        .config
        .partition(partition)
        .ok_or_else(|| ApiError::Configuration(format!("unknown partition '{partition}'")))?;
    api.config.check_hold_budget(opts.exec_timeout)?;
    let _guard = lock::acquire(api, slog, opts.lock_timeout)?;

    let entries = api.system.mounts().map_err(ApiError::from)?;
    if !mounted_at(&entries, &part.rw_mount).is_some_and(|m| m.is_read_write()) {
        return Err(ApiError::Mount(format!(
            "{} is not mounted read-write",
            part.name
        )));
    }

    let window = WriteWindow::new(part.rw_mount.clone(), &part.name, CancelToken::new());
    let outcome = run_with_timeout(op, window, opts.exec_timeout, api.config.timeouts.cancel_grace());
    if let Err(e) = api.system.sync() {
        log::warn!("sync after {} edit failed: {e}", part.name);
    }
    match outcome {
        ExecOutcome::Completed(Ok(msg)) => Ok(msg),
        ExecOutcome::Completed(Err(e)) => Err(ApiError::Callback(e.to_string())),
        ExecOutcome::Panicked(msg) => Err(ApiError::Callback(format!("panicked: {msg}"))),
        ExecOutcome::TimedOut { .. } => Err(ApiError::CallbackTimeout(opts.exec_timeout.as_secs())),
    }
}
