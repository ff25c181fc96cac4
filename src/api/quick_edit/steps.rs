use std::path::PathBuf;
use std::time::Duration;

use log::Level;
use serde_json::json;

use crate::adapters::SystemOps;
use crate::api::errors::ApiError;
use crate::api::executor::{run_with_timeout, ExecOutcome};
use crate::api::Lunyard;
use crate::config::Config;
use crate::fs::{get_or_create, mounts_of_image};
use crate::gadget::ConfigFs;
use crate::logging::{AuditSink, FactsEmitter, StageLogger};
use crate::types::errors::Error;
use crate::types::{CancelToken, FsKind, OpError, Partition, TransitionState, WriteWindow};

/// Working state of one transition. Cleanup reads what the forward steps got done.
pub(crate) struct Transition<'a> {
    pub(super) sys: &'a dyn SystemOps,
    pub(super) cfs: &'a ConfigFs,
    pub(super) config: &'a Config,
    pub(super) audit: &'a dyn AuditSink,
    pub(super) part: &'a Partition,
    pub(super) slog: &'a StageLogger<'a>,
    pub(super) state: TransitionState,
    pub(super) device: Option<PathBuf>,
    pub(super) fs: Option<FsKind>,
    pub(super) rw_mounted: bool,
}

impl<'a> Transition<'a> {
    pub(crate) fn new<E: FactsEmitter, A: AuditSink>(
        api: &'a Lunyard<E, A>,
        part: &'a Partition,
        slog: &'a StageLogger<'a>,
    ) -> Self {
        Self {
            sys: api.system.as_ref(),
            cfs: &api.configfs,
            config: &api.config,
            audit: &api.audit,
            part,
            slog,
            state: TransitionState::Served,
            device: None,
            fs: part.fs,
            rw_mounted: false,
        }
    }

    pub(super) fn enter(&mut self, next: TransitionState) {
        self.state = next;
        self.slog
            .step()
            .field("state", json!(next.as_str()))
            .emit_success();
    }

    /// Log the detail of a failed step; hand back a short caller-facing error.
    pub(super) fn step_failed(&self, step: &str, e: &Error, summary: String) -> ApiError {
        let err = ApiError::Mount(summary);
        self.slog
            .step()
            .merge(json!({
                "step": step,
                "state": self.state.as_str(),
                "error": e.to_string(),
            }))
            .error_id(err.id())
            .emit_failure();
        self.audit
            .log(Level::Error, &format!("{} {step}: {e}", self.part.name));
        err
    }

    /// Forward half of the transition. Returns the operation's message on success.
    pub(crate) fn forward<F>(&mut self, op: F, exec_timeout: Duration) -> Result<String, ApiError>
    where
        F: FnOnce(&WriteWindow) -> Result<String, OpError> + Send + 'static,
    {
        self.clear_backing();
        self.unmount_existing()?;

        let dev = get_or_create(self.sys, &self.part.image).map_err(|e| {
            self.step_failed("loop", &e, format!("no loop device for {}", self.part.name))
        })?;
        self.device = Some(dev.clone());
        self.enter(TransitionState::LoopReady);

        let fs = match self.fs {
            Some(fs) => fs,
            None => self.sys.probe_fs(&dev).map_err(|e| {
                self.step_failed("probe", &e, format!("unknown filesystem on {}", self.part.name))
            })?,
        };
        self.fs = Some(fs);
        let opts = self.config.mount_profile.rw_options();
        self.sys
            .mount(&dev, &self.part.rw_mount, fs, &opts)
            .map_err(|e| {
                self.step_failed("mount_rw", &e, format!("could not mount {} read-write", self.part.name))
            })?;
        self.rw_mounted = true;
        self.enter(TransitionState::RwMounted);

        self.enter(TransitionState::CallbackRunning);
        let result = self.run_operation(op, exec_timeout);

        match self.sys.sync() {
            Ok(()) => self.enter(TransitionState::Synced),
            Err(e) => log::warn!("sync after {} edit failed: {e}", self.part.name),
        }
        result
    }

    /// Best effort: cleanup restores the backing whether or not this worked.
    fn clear_backing(&mut self) {
        match self.cfs.clear_backing(self.part.lun) {
            Ok(()) => self.enter(TransitionState::BackingCleared),
            Err(e) => {
                log::warn!("clearing LUN {} backing failed: {e}", self.part.lun);
                self.slog
                    .step()
                    .merge(json!({
                        "step": "clear_backing",
                        "lun": self.part.lun,
                        "error": e.to_string(),
                    }))
                    .emit_warn();
            }
        }
    }

    /// Unmount every mount of the image. Loop devices stay bound for reuse.
    fn unmount_existing(&mut self) -> Result<(), ApiError> {
        let bindings = self.sys.loop_bindings(&self.part.image).map_err(|e| {
            self.step_failed("loop_query", &e, format!("loop table unavailable for {}", self.part.name))
        })?;
        let entries = self.sys.mounts().map_err(|e| {
            self.step_failed("mount_table", &e, "mount table unavailable".to_string())
        })?;
        let mut targets: Vec<PathBuf> = mounts_of_image(&entries, &self.part.image, &bindings)
            .into_iter()
            .map(|m| m.target.clone())
            .collect();
        targets.dedup();
        // Stacked mounts come off top first.
        for target in targets.iter().rev() {
            self.sys.unmount(target).map_err(|e| {
                self.step_failed(
                    "unmount",
                    &e,
                    format!("could not unmount {} ({})", self.part.name, target.display()),
                )
            })?;
        }
        self.enter(TransitionState::RoUnmounted);
        Ok(())
    }

    fn run_operation<F>(&self, op: F, exec_timeout: Duration) -> Result<String, ApiError>
    where
        F: FnOnce(&WriteWindow) -> Result<String, OpError> + Send + 'static,
    {
        let window = WriteWindow::new(self.part.rw_mount.clone(), &self.part.name, CancelToken::new());
        let outcome = run_with_timeout(op, window, exec_timeout, self.config.timeouts.cancel_grace());
        let result = match &outcome {
            ExecOutcome::Completed(Ok(msg)) => Ok(msg.clone()),
            ExecOutcome::Completed(Err(e)) => Err(ApiError::Callback(e.to_string())),
            ExecOutcome::Panicked(msg) => Err(ApiError::Callback(format!("panicked: {msg}"))),
            ExecOutcome::TimedOut { .. } => Err(ApiError::CallbackTimeout(exec_timeout.as_secs())),
        };
        let ev = self.slog.callback().field(
            "outcome",
            json!(match &outcome {
                ExecOutcome::Completed(Ok(_)) => "completed",
                ExecOutcome::Completed(Err(_)) => "failed",
                ExecOutcome::Panicked(_) => "panicked",
                ExecOutcome::TimedOut { stopped: true } => "timed_out",
                ExecOutcome::TimedOut { stopped: false } => "abandoned",
            }),
        );
        match &result {
            Ok(_) => ev.emit_success(),
            Err(e) => ev.field("error", json!(e.to_string())).error_id(e.id()).emit_failure(),
        }
        result
    }
}
