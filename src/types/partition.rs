//! Static partition descriptors loaded from configuration.
use std::fmt;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

/// Filesystem kind of a partition image. Selects the mount option profile.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FsKind {
    Vfat,
    Exfat,
}

impl FsKind {
    /// Parse the `TYPE` value reported by `blkid`.
    #[must_use]
    pub fn from_probe(s: &str) -> Option<Self> {
        match s.trim().to_ascii_lowercase().as_str() {
            "vfat" | "fat" | "fat16" | "fat32" | "msdos" => Some(Self::Vfat),
            "exfat" => Some(Self::Exfat),
            _ => None,
        }
    }

    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Vfat => "vfat",
            Self::Exfat => "exfat",
        }
    }
}

impl fmt::Display for FsKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One LUN served by the mass-storage gadget and the mount points used to edit it.
///
/// Immutable for the lifetime of the process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct Partition {
    pub name: String,
    pub lun: u32,
    pub image: PathBuf,
    pub ro_mount: PathBuf,
    pub rw_mount: PathBuf,
    /// Filesystem kind when known up front; probed on the loop device otherwise.
    #[serde(default)]
    pub fs: Option<FsKind>,
}

impl Partition {
    #[must_use]
    pub fn image(&self) -> &Path {
        &self.image
    }
}

/// A loop device currently bound to an image file.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LoopBinding {
    pub device: PathBuf,
    pub image: PathBuf,
}
