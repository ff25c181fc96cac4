use std::path::PathBuf;

use crate::config::Config;
use crate::fs::mount::parse_mount_table;
use crate::gadget::ConfigFs;
use crate::types::PresentMode;

/// Tells the orchestrator how the device is currently exposing its partitions.
pub trait ModeIndicator: Send + Sync {
    fn current_mode(&self) -> PresentMode;
}

/// Derives the mode from the gadget binding and the host mount table.
///
/// A bound UDC means the host is being served (`Present`). An unbound gadget with
/// at least one partition mounted read-write at its edit path means `Edit`.
#[derive(Debug, Clone)]
pub struct GadgetModeIndicator {
    configfs: ConfigFs,
    mount_table: PathBuf,
    rw_mounts: Vec<PathBuf>,
}

impl GadgetModeIndicator {
    #[must_use]
    pub fn from_config(cfg: &Config) -> Self {
        Self {
            configfs: ConfigFs::new(&cfg.configfs_root),
            mount_table: cfg.mount_table.clone(),
            rw_mounts: cfg.partitions.iter().map(|p| p.rw_mount.clone()).collect(),
        }
    }
}

impl ModeIndicator for GadgetModeIndicator {
    fn current_mode(&self) -> PresentMode {
        if self.configfs.is_bound() {
            return PresentMode::Present;
        }
        let Ok(raw) = std::fs::read_to_string(&self.mount_table) else {
            return PresentMode::Unknown;
        };
        let edit = parse_mount_table(&raw)
            .iter()
            .any(|m| m.is_read_write() && self.rw_mounts.contains(&m.target));
        if edit {
            PresentMode::Edit
        } else {
            PresentMode::Unknown
        }
    }
}

/// Always reports the same mode. Useful when an outer service owns mode switching.
#[derive(Debug, Clone, Copy)]
pub struct FixedMode(pub PresentMode);

impl ModeIndicator for FixedMode {
    fn current_mode(&self) -> PresentMode {
        self.0
    }
}
