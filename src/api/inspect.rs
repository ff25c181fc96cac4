//! Gadget State Inspector.
//!
//! Read-only apart from one repair: a LUN whose backing is empty or wrong while the
//! host is being served gets restored on the spot. Unexpected read-write mounts are
//! reported and left alone; unmounting them could throw away writes.
use std::time::Duration;

use log::Level;
use serde_json::json;

use crate::api::errors::ErrorId;
use crate::api::Lunyard;
use crate::constants::LOCK_STALE_SECS;
use crate::fs::{mounted_at, mounts_of_image};
use crate::gadget::lun::backing_matches;
use crate::gadget::restore_backing;
use crate::logging::audit::AuditCtx;
use crate::logging::{AuditSink, FactsEmitter, StageLogger};
use crate::types::{GadgetState, MountEntry, Partition, PresentMode};

struct Audit {
    state: GadgetState,
    unresolved: bool,
}

impl Audit {
    fn issue(&mut self, msg: String, unresolved: bool) {
        self.unresolved |= unresolved;
        self.state.issues.push(msg);
    }
}

pub(crate) fn run<E: FactsEmitter, A: AuditSink>(api: &Lunyard<E, A>) -> GadgetState {
    let ctx = AuditCtx::new(&api.facts, None);
    let slog = StageLogger::new(&ctx);
    let mut audit = Audit {
        state: GadgetState::default(),
        unresolved: false,
    };

    for p in &api.config.partitions {
        if !p.image.exists() {
            audit.state.errors.push(format!(
                "partition '{}': image {} is missing",
                p.name,
                p.image.display()
            ));
        }
    }
    if !audit.state.errors.is_empty() {
        return finish(api, &slog, audit, Some(ErrorId::E_CONFIG));
    }

    // A fresh lock held by someone else means a transition deliberately cleared a
    // LUN and has a read-write mount up. Touching either would break it.
    let stale = Duration::from_secs(LOCK_STALE_SECS);
    if let Some(age) = api.lock.holder_age().filter(|a| *a < stale) {
        audit.issue(
            format!(
                "transition in progress (lock held {}s); repairs deferred",
                age.as_secs()
            ),
            false,
        );
        return finish(api, &slog, audit, None);
    }

    let mode = api.current_mode();
    if mode == PresentMode::Present {
        for p in &api.config.partitions {
            check_lun(api, p, &mut audit);
        }
    }

    match api.system.mounts() {
        Ok(entries) => {
            for p in &api.config.partitions {
                check_mounts(api, p, &entries, mode, &mut audit);
            }
        }
        Err(e) => audit.state.errors.push(format!("mount table unavailable: {e}")),
    }

    let id = if audit.state.errors.is_empty() {
        None
    } else {
        Some(ErrorId::E_GADGET)
    };
    finish(api, &slog, audit, id)
}

fn check_lun<E: FactsEmitter, A: AuditSink>(api: &Lunyard<E, A>, p: &Partition, audit: &mut Audit) {
    let current = match api.configfs.read_backing(p.lun) {
        Ok(cur) if backing_matches(&cur, &p.image) => return,
        Ok(cur) if cur.is_empty() => "<empty>".to_string(),
        Ok(cur) => cur,
        Err(e) => format!("<unreadable: {e}>"),
    };
    audit.issue(
        format!(
            "LUN {} ({}) backing is {current}, expected {}",
            p.lun,
            p.name,
            p.image.display()
        ),
        false,
    );
    if restore_backing(&api.configfs, &p.image, p.lun, &api.config.restore) {
        audit.state.fixes_applied.push(format!(
            "restored LUN {} backing to {}",
            p.lun,
            p.image.display()
        ));
    } else {
        audit.state.errors.push(format!(
            "LUN {} ({}) backing restore failed",
            p.lun, p.name
        ));
    }
}

fn check_mounts<E: FactsEmitter, A: AuditSink>(
    api: &Lunyard<E, A>,
    p: &Partition,
    entries: &[MountEntry],
    mode: PresentMode,
    audit: &mut Audit,
) {
    let bindings = match api.system.loop_bindings(&p.image) {
        Ok(b) => b,
        Err(e) => {
            audit
                .state
                .errors
                .push(format!("loop table query for {} failed: {e}", p.image.display()));
            Vec::new()
        }
    };

    // In edit mode read-write mounts are the point.
    if mode != PresentMode::Edit {
        let mut rw: Vec<&MountEntry> = mounts_of_image(entries, &p.image, &bindings)
            .into_iter()
            .filter(|m| m.is_read_write())
            .collect();
        if let Some(m) = mounted_at(entries, &p.rw_mount).filter(|m| m.is_read_write()) {
            if !rw.iter().any(|e| e.target == m.target) {
                rw.push(m);
            }
        }
        for m in rw {
            audit.issue(
                format!(
                    "unexpected read-write mount of {} at {} (interrupted transition?)",
                    m.source.display(),
                    m.target.display()
                ),
                true,
            );
        }
    }

    if mode == PresentMode::Present && mounted_at(entries, &p.ro_mount).is_none() {
        audit.issue(
            format!(
                "read-only mount for '{}' missing at {}",
                p.name,
                p.ro_mount.display()
            ),
            true,
        );
    }
}

fn finish<E: FactsEmitter, A: AuditSink>(
    api: &Lunyard<E, A>,
    slog: &StageLogger<'_>,
    audit: Audit,
    id: Option<ErrorId>,
) -> GadgetState {
    let mut state = audit.state;
    state.healthy = state.errors.is_empty() && !audit.unresolved;
    let ev = slog.inspect().merge(json!({
        "healthy": state.healthy,
        "issues": state.issues,
        "fixes_applied": state.fixes_applied,
        "errors": state.errors,
    }));
    match id {
        Some(id) => {
            api.audit.log(Level::Error, &format!("gadget audit: {} error(s)", state.errors.len()));
            ev.error_id(id).emit_failure();
        }
        None if !state.healthy || !state.fixes_applied.is_empty() => ev.emit_warn(),
        None => ev.emit_success(),
    }
    state
}
