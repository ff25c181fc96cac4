pub mod cmd;
pub mod linux;

use std::path::{Path, PathBuf};

use crate::types::errors::Result;
use crate::types::{FsKind, LoopBinding, MountEntry};

/// OS surface the orchestrator drives: loop devices, mounts and kernel knobs.
///
/// Every method is a single bounded interaction with the host. Implementations
/// must not retry internally; the callers decide what is fatal and what is advisory.
pub trait SystemOps: Send + Sync {
    /// Loop devices currently bound to `image`, in the order the kernel reports them.
    ///
    /// # Errors
    /// Returns an error when the loop table cannot be queried.
    fn loop_bindings(&self, image: &Path) -> Result<Vec<LoopBinding>>;

    /// Bind `image` to a free loop device and return the device path.
    ///
    /// # Errors
    /// Returns an error when no binding could be created.
    fn attach_loop(&self, image: &Path) -> Result<PathBuf>;

    /// Filesystem kind found on `device`.
    ///
    /// # Errors
    /// Returns an error when the probe fails or reports an unsupported filesystem.
    fn probe_fs(&self, device: &Path) -> Result<FsKind>;

    /// Mount `device` at `target` with the given option string, in the host mount namespace.
    ///
    /// # Errors
    /// Returns an error when the mount command fails or times out.
    fn mount(&self, device: &Path, target: &Path, fs: FsKind, options: &str) -> Result<()>;

    /// Unmount whatever is mounted at `target`. Never detaches loop devices.
    ///
    /// # Errors
    /// Returns an error when the unmount command fails or times out.
    fn unmount(&self, target: &Path) -> Result<()>;

    /// Current host mount table.
    ///
    /// # Errors
    /// Returns an error when the table cannot be read.
    fn mounts(&self) -> Result<Vec<MountEntry>>;

    /// Flush dirty filesystem buffers.
    ///
    /// # Errors
    /// Returns an error when the flush cannot be issued.
    fn sync(&self) -> Result<()>;

    /// Advisory page-cache drop.
    ///
    /// # Errors
    /// Returns an error when the kernel knob cannot be written.
    fn drop_caches(&self) -> Result<()>;
}
