//! Kernel configfs surface of the USB gadget.
//!
//! Only two attributes matter here: a mass-storage LUN's backing `file` and the
//! gadget's `UDC` binding. Everything else about the gadget is owned by whatever
//! created it at boot.
pub mod lun;
pub mod udc;

use std::fs;
use std::path::{Path, PathBuf};

use crate::constants::GADGET_DIR;

pub use lun::restore_backing;

/// Handle on a configfs mount (normally `/sys/kernel/config`).
#[derive(Debug, Clone)]
pub struct ConfigFs {
    root: PathBuf,
}

impl ConfigFs {
    #[must_use]
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    #[must_use]
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Gadget directories under `usb_gadget/`, sorted by name.
    pub(crate) fn gadgets(&self) -> Vec<PathBuf> {
        sorted_children(&self.root.join(GADGET_DIR), |_| true)
    }
}

/// Sorted subdirectories of `dir` whose file name passes `keep`. Unreadable dirs yield nothing.
pub(crate) fn sorted_children(dir: &Path, keep: impl Fn(&str) -> bool) -> Vec<PathBuf> {
    let Ok(rd) = fs::read_dir(dir) else {
        return Vec::new();
    };
    let mut out: Vec<PathBuf> = rd
        .filter_map(std::result::Result::ok)
        .filter(|e| e.file_type().map(|t| t.is_dir()).unwrap_or(false))
        .filter(|e| keep(&e.file_name().to_string_lossy()))
        .map(|e| e.path())
        .collect();
    out.sort();
    out
}
