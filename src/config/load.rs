use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use super::types::{MountProfile, RestoreSettings, Timeouts};
use crate::constants::LOCK_STALE_SECS;
use crate::types::errors::{Error, ErrorKind, Result};
use crate::types::Partition;

/// Top-level configuration for a [`Lunyard`](crate::Lunyard) instance.
#[derive(Clone, Debug, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Config {
    #[serde(default = "default_configfs_root")]
    pub configfs_root: PathBuf,
    #[serde(default = "default_udc_class_dir")]
    pub udc_class_dir: PathBuf,
    #[serde(default = "default_lock_path")]
    pub lock_path: PathBuf,
    /// Mount table consulted for audits; PID 1's view by default.
    #[serde(default = "default_mount_table")]
    pub mount_table: PathBuf,
    /// Run mount/umount inside PID 1's mount namespace.
    #[serde(default = "default_true")]
    pub host_namespace: bool,
    #[serde(default)]
    pub mount_profile: MountProfile,
    #[serde(default)]
    pub timeouts: Timeouts,
    #[serde(default)]
    pub restore: RestoreSettings,
    pub partitions: Vec<Partition>,
}

fn default_configfs_root() -> PathBuf {
    PathBuf::from("/sys/kernel/config")
}

fn default_udc_class_dir() -> PathBuf {
    PathBuf::from("/sys/class/udc")
}

fn default_lock_path() -> PathBuf {
    PathBuf::from("/run/lunyard/quick_edit.lock")
}

fn default_mount_table() -> PathBuf {
    PathBuf::from("/proc/1/mounts")
}

const fn default_true() -> bool {
    true
}

impl Config {
    /// Build a configuration with defaults for everything but the partition table.
    #[must_use]
    pub fn with_partitions(partitions: Vec<Partition>) -> Self {
        Self {
            configfs_root: default_configfs_root(),
            udc_class_dir: default_udc_class_dir(),
            lock_path: default_lock_path(),
            mount_table: default_mount_table(),
            host_namespace: true,
            mount_profile: MountProfile::default(),
            timeouts: Timeouts::default(),
            restore: RestoreSettings::default(),
            partitions,
        }
    }

    /// Parse and validate a YAML document.
    ///
    /// # Errors
    /// Returns `ErrorKind::Config` when the document is malformed or fails validation.
    pub fn from_yaml_str(raw: &str) -> Result<Self> {
        let cfg: Self = serde_yaml::from_str(raw)
            .map_err(|e| Error::new(ErrorKind::Config, format!("parse: {e}")))?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Read, parse and validate a YAML file.
    ///
    /// # Errors
    /// Returns `ErrorKind::Io` when the file cannot be read, `ErrorKind::Config` otherwise.
    pub fn from_yaml_file(path: &Path) -> Result<Self> {
        let raw = std::fs::read_to_string(path)
            .map_err(|e| Error::io(format!("read {}", path.display()), &e))?;
        Self::from_yaml_str(&raw)
    }

    /// Check the partition table for the invariants the orchestrator relies on.
    ///
    /// # Errors
    /// Returns `ErrorKind::Config` describing the first violation found.
    pub fn validate(&self) -> Result<()> {
        if self.partitions.is_empty() {
            return Err(config_err("at least one partition must be configured"));
        }
        let mut names = HashSet::new();
        let mut luns = HashSet::new();
        for p in &self.partitions {
            if p.name.trim().is_empty() {
                return Err(config_err("partition name must not be empty"));
            }
            if !names.insert(p.name.as_str()) {
                return Err(config_err(format!("duplicate partition name '{}'", p.name)));
            }
            if !luns.insert(p.lun) {
                return Err(config_err(format!("duplicate LUN index {}", p.lun)));
            }
            for (label, path) in [
                ("image", &p.image),
                ("ro_mount", &p.ro_mount),
                ("rw_mount", &p.rw_mount),
            ] {
                if !path.is_absolute() {
                    return Err(config_err(format!(
                        "partition '{}': {label} must be absolute ({})",
                        p.name,
                        path.display()
                    )));
                }
            }
            if p.ro_mount == p.rw_mount {
                return Err(config_err(format!(
                    "partition '{}': ro_mount and rw_mount must differ",
                    p.name
                )));
            }
        }
        if u32::from_str_radix(&self.mount_profile.umask, 8).is_err() {
            return Err(config_err(format!(
                "mount_profile.umask '{}' is not octal",
                self.mount_profile.umask
            )));
        }
        self.check_hold_budget(self.timeouts.exec())
    }

    /// A transition holding the lock past the staleness threshold would have its record
    /// reaped by the next acquirer, so the worst-case hold for an operation bounded by
    /// `exec` must stay below it.
    ///
    /// # Errors
    /// Returns `ErrorKind::Config` when `exec` plus cancellation grace and cleanup
    /// allowance reaches the staleness threshold.
    pub fn check_hold_budget(&self, exec: Duration) -> Result<()> {
        let hold = self.timeouts.hold_budget(exec);
        if hold >= Duration::from_secs(LOCK_STALE_SECS) {
            return Err(config_err(format!(
                "operation timeout {}s leaves a worst-case lock hold of {}s, \
                 must stay below {LOCK_STALE_SECS}s",
                exec.as_secs(),
                hold.as_secs()
            )));
        }
        Ok(())
    }

    #[must_use]
    pub fn partition(&self, name: &str) -> Option<&Partition> {
        self.partitions.iter().find(|p| p.name == name)
    }
}

fn config_err(msg: impl Into<String>) -> Error {
    Error::new(ErrorKind::Config, msg)
}
