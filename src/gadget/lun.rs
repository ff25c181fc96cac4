use std::fs;
use std::os::unix::ffi::OsStrExt;
use std::path::{Component, Path, PathBuf};
use std::thread;

use super::{sorted_children, ConfigFs};
use crate::config::RestoreSettings;
use crate::constants::{LUN_FILE_ATTR, LUN_FORCED_EJECT_ATTR, MASS_STORAGE_PREFIX};
use crate::types::errors::{Error, ErrorKind, Result};

impl ConfigFs {
    /// `usb_gadget/*/functions/mass_storage.*/lun.<n>`; first match in sorted order.
    #[must_use]
    pub fn lun_dir(&self, lun: u32) -> Option<PathBuf> {
        let name = format!("lun.{lun}");
        self.gadgets()
            .into_iter()
            .flat_map(|g| sorted_children(&g.join("functions"), |n| n.starts_with(MASS_STORAGE_PREFIX)))
            .map(|f| f.join(&name))
            .find(|d| d.join(LUN_FILE_ATTR).exists())
    }

    /// Path of the LUN's backing-file attribute, if the LUN exists.
    #[must_use]
    pub fn lun_attr(&self, lun: u32) -> Option<PathBuf> {
        self.lun_dir(lun).map(|d| d.join(LUN_FILE_ATTR))
    }

    fn require_lun_attr(&self, lun: u32) -> Result<PathBuf> {
        self.lun_attr(lun).ok_or_else(|| {
            Error::new(
                ErrorKind::Gadget,
                format!("no mass-storage attribute for LUN {lun} under {}", self.root().display()),
            )
        })
    }

    /// Current backing path; empty when the medium is ejected.
    ///
    /// # Errors
    /// `ErrorKind::Gadget` when the LUN does not exist, `ErrorKind::Io` when it cannot be read.
    pub fn read_backing(&self, lun: u32) -> Result<String> {
        let attr = self.require_lun_attr(lun)?;
        let raw = fs::read_to_string(&attr)
            .map_err(|e| Error::io(format!("read {}", attr.display()), &e))?;
        Ok(raw.trim().to_string())
    }

    /// # Errors
    /// `ErrorKind::Gadget` when the LUN does not exist, `ErrorKind::Io` when the write is refused.
    pub fn write_backing(&self, lun: u32, image: &Path) -> Result<()> {
        let attr = self.require_lun_attr(lun)?;
        fs::write(&attr, image.as_os_str().as_bytes())
            .map_err(|e| Error::io(format!("write {}", attr.display()), &e))
    }

    /// Eject the medium. Falls back to `forced_eject` when the host holds the medium locked.
    ///
    /// # Errors
    /// Returns the last error seen when neither method worked.
    pub fn clear_backing(&self, lun: u32) -> Result<()> {
        let attr = self.require_lun_attr(lun)?;
        match fs::write(&attr, b"") {
            Ok(()) => Ok(()),
            Err(e) => {
                log::warn!("eject of LUN {lun} refused ({e}); trying forced_eject");
                let forced = attr.with_file_name(LUN_FORCED_EJECT_ATTR);
                fs::write(&forced, b"1")
                    .map_err(|e| Error::io(format!("write {}", forced.display()), &e))
            }
        }
    }
}

/// Lexical normalization for comparing attribute contents with configured paths.
/// Symlinks are resolved when the path exists.
pub(crate) fn normalize(p: &Path) -> PathBuf {
    if let Ok(c) = p.canonicalize() {
        return c;
    }
    let mut out = PathBuf::new();
    for c in p.components() {
        match c {
            Component::CurDir => {}
            Component::ParentDir => {
                out.pop();
            }
            other => out.push(other.as_os_str()),
        }
    }
    out
}

/// True when the LUN currently serves `image`.
#[must_use]
pub fn backing_matches(current: &str, image: &Path) -> bool {
    !current.is_empty() && normalize(Path::new(current)) == normalize(image)
}

fn restore_once(cfs: &ConfigFs, image: &Path, lun: u32) -> Result<()> {
    let target = normalize(image);
    cfs.write_backing(lun, &target)?;
    let read_back = cfs.read_backing(lun)?;
    if backing_matches(&read_back, &target) {
        Ok(())
    } else {
        Err(Error::new(
            ErrorKind::Gadget,
            format!(
                "LUN {lun} reads back '{read_back}' after writing '{}'",
                target.display()
            ),
        ))
    }
}

/// Make LUN `lun` serve `image`, retrying with linear backoff.
///
/// Returns `false` only once every attempt has failed. That is the one condition
/// the orchestrator treats as a critical alarm: the host has lost its drive.
pub fn restore_backing(cfs: &ConfigFs, image: &Path, lun: u32, settings: &RestoreSettings) -> bool {
    if let Ok(cur) = cfs.read_backing(lun) {
        if backing_matches(&cur, image) {
            return true;
        }
    }
    let attempts = settings.max_retries.max(1);
    for attempt in 1..=attempts {
        match restore_once(cfs, image, lun) {
            Ok(()) => {
                if attempt > 1 {
                    log::info!("LUN {lun} restored on attempt {attempt}");
                }
                return true;
            }
            Err(e) => {
                log::warn!("LUN {lun} restore attempt {attempt}/{attempts} failed: {e}");
                if attempt < attempts {
                    thread::sleep(settings.backoff_for(attempt));
                }
            }
        }
    }
    log::error!(
        target: "lunyard::critical",
        "LUN {lun} backing could not be restored to {} after {attempts} attempts; host has no medium",
        image.display()
    );
    false
}
