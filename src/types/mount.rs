//! Data-only mount types used across the crate.
use std::path::PathBuf;

/// Typed representation of the mount flags Lunyard cares about.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MountFlags {
    /// Whether the mount is read-only
    pub read_only: bool,
}

/// One row of a mount table (`/proc/<pid>/mounts` format).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MountEntry {
    pub source: PathBuf,
    pub target: PathBuf,
    pub fstype: String,
    pub options: String,
}

impl MountEntry {
    #[must_use]
    pub fn flags(&self) -> MountFlags {
        let has_rw = self.options.split(',').any(|o| o == "rw");
        MountFlags { read_only: !has_rw }
    }

    #[must_use]
    pub fn is_read_write(&self) -> bool {
        !self.flags().read_only
    }
}
