//! Gadget Rebind Controller.
use std::thread;
use std::time::Duration;

use log::Level;
use serde_json::json;

use crate::api::errors::ApiError;
use crate::api::{lock, Lunyard};
use crate::gadget::restore_backing;
use crate::gadget::udc::available_udcs;
use crate::logging::audit::AuditCtx;
use crate::logging::{AuditSink, FactsEmitter, StageLogger};
use crate::types::{OperationResult, PresentMode};

/// Restore every LUN; returns the LUN indices that could not be restored.
fn restore_all<E: FactsEmitter, A: AuditSink>(api: &Lunyard<E, A>) -> Vec<u32> {
    api.config
        .partitions
        .iter()
        .filter(|p| !restore_backing(&api.configfs, &p.image, p.lun, &api.config.restore))
        .map(|p| p.lun)
        .collect()
}

pub(crate) fn run<E: FactsEmitter, A: AuditSink>(api: &Lunyard<E, A>, delay: Duration) -> OperationResult {
    let ctx = AuditCtx::new(&api.facts, None);
    let slog = StageLogger::new(&ctx);
    let res = rebind(api, &slog, delay);
    match &res {
        Ok(udc) => {
            let delay_ms = u64::try_from(delay.as_millis()).unwrap_or(u64::MAX);
            slog.rebind()
                .merge(json!({ "udc": udc, "delay_ms": delay_ms }))
                .emit_success();
            api.audit.log(Level::Info, &format!("rebind: gadget re-bound to {udc}"));
            OperationResult::ok(format!("gadget re-bound to {udc}"))
        }
        Err(e) => {
            slog.rebind()
                .field("error", json!(e.to_string()))
                .error_id(e.id())
                .emit_failure();
            api.audit.log(Level::Error, &format!("rebind: {e}"));
            e.to_result()
        }
    }
}

fn rebind<E: FactsEmitter, A: AuditSink>(
    api: &Lunyard<E, A>,
    slog: &StageLogger<'_>,
    delay: Duration,
) -> Result<String, ApiError> {
    // Binding while partitions are mounted read-write locally would hand the host a
    // filesystem someone else is writing.
    if api.current_mode() == PresentMode::Edit {
        return Err(ApiError::Gadget("device is in edit mode".to_string()));
    }
    let _guard = lock::acquire(api, slog, api.config.timeouts.lock())?;

    let failed = restore_all(api);
    if !failed.is_empty() {
        log::warn!("LUN(s) {failed:?} not restored before unbind");
    }

    let current = api.configfs.read_udc().map_err(ApiError::from)?;
    let udc = if current.is_empty() {
        available_udcs(&api.config.udc_class_dir)
            .map_err(ApiError::from)?
            .into_iter()
            .next()
            .ok_or_else(|| ApiError::Gadget("no USB device controller available".to_string()))?
    } else {
        current
    };

    api.configfs.write_udc("").map_err(ApiError::from)?;
    thread::sleep(delay);
    // Unbinding can drop the LUN backings.
    let failed = restore_all(api);
    api.configfs.write_udc(&udc).map_err(ApiError::from)?;

    let bound = api.configfs.read_udc().map_err(ApiError::from)?;
    if bound != udc {
        return Err(ApiError::Gadget(format!(
            "UDC reads '{bound}' after binding '{udc}'"
        )));
    }
    if !failed.is_empty() {
        return Err(ApiError::CriticalRestoreFailure(format!("LUN(s) {failed:?}")));
    }
    Ok(udc)
}
