use std::time::Duration;

use serde::Deserialize;

use crate::constants::{
    CLEANUP_ALLOWANCE_SECS, DEFAULT_CANCEL_GRACE_SECS, DEFAULT_COMMAND_TIMEOUT_SECS, DEFAULT_EXEC_TIMEOUT_SECS,
    DEFAULT_LOCK_TIMEOUT_SECS, LUN_RESTORE_BACKOFF_MS, LUN_RESTORE_MAX_RETRIES,
};

/// Ownership/permission profile applied to FAT-family mounts.
///
/// Files written through the read-write window must stay readable for whatever
/// later serves them, so both mounts use the same owner and mask.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct MountProfile {
    pub uid: u32,
    pub gid: u32,
    /// Octal umask string, e.g. `"022"`.
    pub umask: String,
}

impl Default for MountProfile {
    fn default() -> Self {
        Self {
            uid: 1000,
            gid: 1000,
            umask: "022".to_string(),
        }
    }
}

impl MountProfile {
    /// Option string for the read-write mount.
    #[must_use]
    pub fn rw_options(&self) -> String {
        format!("rw,uid={},gid={},umask={}", self.uid, self.gid, self.umask)
    }

    /// Option string for the read-only mount.
    #[must_use]
    pub fn ro_options(&self) -> String {
        format!("ro,uid={},gid={},umask={}", self.uid, self.gid, self.umask)
    }
}

#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct Timeouts {
    pub lock_secs: u64,
    pub exec_secs: u64,
    pub command_secs: u64,
    pub cancel_grace_secs: u64,
}

impl Default for Timeouts {
    fn default() -> Self {
        Self {
            lock_secs: DEFAULT_LOCK_TIMEOUT_SECS,
            exec_secs: DEFAULT_EXEC_TIMEOUT_SECS,
            command_secs: DEFAULT_COMMAND_TIMEOUT_SECS,
            cancel_grace_secs: DEFAULT_CANCEL_GRACE_SECS,
        }
    }
}

impl Timeouts {
    #[must_use]
    pub const fn lock(&self) -> Duration {
        Duration::from_secs(self.lock_secs)
    }

    #[must_use]
    pub const fn exec(&self) -> Duration {
        Duration::from_secs(self.exec_secs)
    }

    #[must_use]
    pub const fn command(&self) -> Duration {
        Duration::from_secs(self.command_secs)
    }

    #[must_use]
    pub const fn cancel_grace(&self) -> Duration {
        Duration::from_secs(self.cancel_grace_secs)
    }

    /// Longest a transition running an operation bounded by `exec` keeps the lock.
    #[must_use]
    pub fn hold_budget(&self, exec: Duration) -> Duration {
        exec.saturating_add(self.cancel_grace())
            .saturating_add(Duration::from_secs(CLEANUP_ALLOWANCE_SECS))
    }
}

/// Retry budget for writing the LUN backing attribute.
#[derive(Clone, Debug, PartialEq, Eq, Deserialize)]
#[serde(deny_unknown_fields, default)]
pub struct RestoreSettings {
    pub max_retries: u32,
    pub backoff_ms: u64,
}

impl Default for RestoreSettings {
    fn default() -> Self {
        Self {
            max_retries: LUN_RESTORE_MAX_RETRIES,
            backoff_ms: LUN_RESTORE_BACKOFF_MS,
        }
    }
}

impl RestoreSettings {
    /// Delay before retrying after failed attempt number `attempt` (1-based).
    #[must_use]
    pub const fn backoff_for(&self, attempt: u32) -> Duration {
        Duration::from_millis(self.backoff_ms * attempt as u64)
    }
}
