use log::Level;
use serde_json::json;

use super::Transition;
use crate::api::errors::ErrorId;
use crate::fs::{get_or_create, mounted_at};
use crate::gadget::restore_backing;
use crate::types::TransitionState;

impl Transition<'_> {
    /// Undo the forward steps. Never fails; returns `true` when service is degraded
    /// (read-only mount could not be re-established).
    pub(crate) fn cleanup(&mut self) -> bool {
        let restored = self.restore_lun();
        let ro_mounted = self.remount_read_only();
        self.drop_caches();
        self.slog
            .cleanup()
            .merge(json!({
                "backing_restored": restored,
                "ro_mounted": ro_mounted,
                "final_state": self.state.as_str(),
            }))
            .emit_success();
        !ro_mounted
    }

    /// Priority 1. A failure is critical but must not replace the operation's result.
    fn restore_lun(&mut self) -> bool {
        let p = self.part;
        if restore_backing(self.cfs, &p.image, p.lun, &self.config.restore) {
            self.enter(TransitionState::BackingRestored);
            return true;
        }
        self.slog
            .cleanup()
            .merge(json!({
                "priority": 1,
                "action": "restore_backing",
                "lun": p.lun,
                "image": p.image.display().to_string(),
            }))
            .error_id(ErrorId::E_RESTORE_FAILED)
            .emit_failure();
        self.audit.log(
            Level::Error,
            &format!("CRITICAL: LUN {} backing not restored; host has no medium", p.lun),
        );
        false
    }

    /// Priority 2. Same loop device, so no second binding is created.
    fn remount_read_only(&mut self) -> bool {
        let p = self.part;
        let entries = self.sys.mounts().ok();
        // Only our own mount comes off; anything else at the rw path is reported by inspection.
        let ours = match entries.as_deref() {
            Some(e) => mounted_at(e, &p.rw_mount).is_some_and(|m| {
                self.rw_mounted || self.device.as_deref() == Some(m.source.as_path())
            }),
            None => self.rw_mounted,
        };
        if ours {
            match self.sys.unmount(&p.rw_mount) {
                Ok(()) => {
                    self.rw_mounted = false;
                    self.enter(TransitionState::RwUnmounted);
                }
                Err(e) => {
                    self.warn_p2("unmount_rw", &e.to_string());
                    return false;
                }
            }
        } else if let Some(m) = entries.as_deref().and_then(|e| mounted_at(e, &p.rw_mount)) {
            log::warn!(
                "leaving foreign mount of {} at {}",
                m.source.display(),
                m.target.display()
            );
        }

        if entries
            .as_deref()
            .and_then(|e| mounted_at(e, &p.ro_mount))
            .is_some()
        {
            self.enter(TransitionState::RoMounted);
            return true;
        }

        let dev = match self.device.clone() {
            Some(d) => d,
            None => match get_or_create(self.sys, &p.image) {
                Ok(d) => d,
                Err(e) => {
                    self.warn_p2("loop", &e.to_string());
                    return false;
                }
            },
        };
        let fs = match self.fs {
            Some(fs) => fs,
            None => match self.sys.probe_fs(&dev) {
                Ok(fs) => fs,
                Err(e) => {
                    self.warn_p2("probe", &e.to_string());
                    return false;
                }
            },
        };
        let opts = self.config.mount_profile.ro_options();
        match self.sys.mount(&dev, &p.ro_mount, fs, &opts) {
            Ok(()) => {
                self.enter(TransitionState::RoMounted);
                true
            }
            Err(e) => {
                self.warn_p2("mount_ro", &e.to_string());
                false
            }
        }
    }

    fn warn_p2(&self, action: &str, error: &str) {
        self.slog
            .cleanup()
            .merge(json!({
                "priority": 2,
                "action": action,
                "error": error,
                "state": self.state.as_str(),
            }))
            .error_id(ErrorId::E_MOUNT)
            .emit_warn();
        self.audit.log(
            Level::Warn,
            &format!("{}: read-only mount not re-established ({action}: {error})", self.part.name),
        );
    }

    /// Priority 3, advisory.
    fn drop_caches(&self) {
        if let Err(e) = self.sys.drop_caches() {
            log::debug!("drop_caches ignored: {e}");
        }
    }
}
