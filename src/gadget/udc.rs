use std::fs;
use std::path::{Path, PathBuf};

use super::{sorted_children, ConfigFs};
use crate::constants::{MASS_STORAGE_PREFIX, UDC_ATTR};
use crate::types::errors::{Error, ErrorKind, Result};

impl ConfigFs {
    /// `UDC` attribute of the gadget carrying the mass-storage function.
    #[must_use]
    pub fn udc_attr(&self) -> Option<PathBuf> {
        let gadgets = self.gadgets();
        let with_msd = gadgets.iter().find(|g| {
            !sorted_children(&g.join("functions"), |n| n.starts_with(MASS_STORAGE_PREFIX)).is_empty()
        });
        with_msd
            .or_else(|| gadgets.first())
            .map(|g| g.join(UDC_ATTR))
            .filter(|p| p.exists())
    }

    fn require_udc_attr(&self) -> Result<PathBuf> {
        self.udc_attr().ok_or_else(|| {
            Error::new(
                ErrorKind::Gadget,
                format!("no gadget UDC attribute under {}", self.root().display()),
            )
        })
    }

    /// Controller the gadget is bound to; empty when unbound.
    ///
    /// # Errors
    /// `ErrorKind::Gadget` when no gadget exists, `ErrorKind::Io` on read failure.
    pub fn read_udc(&self) -> Result<String> {
        let attr = self.require_udc_attr()?;
        let raw = fs::read_to_string(&attr)
            .map_err(|e| Error::io(format!("read {}", attr.display()), &e))?;
        Ok(raw.trim().to_string())
    }

    /// Bind to `name`, or unbind when `name` is empty.
    ///
    /// # Errors
    /// `ErrorKind::Gadget` when no gadget exists, `ErrorKind::Io` when the kernel refuses.
    pub fn write_udc(&self, name: &str) -> Result<()> {
        let attr = self.require_udc_attr()?;
        let payload = if name.is_empty() { "\n" } else { name };
        fs::write(&attr, payload).map_err(|e| Error::io(format!("write {}", attr.display()), &e))
    }

    /// Whether the gadget is currently presented to a host.
    #[must_use]
    pub fn is_bound(&self) -> bool {
        self.read_udc().map(|s| !s.is_empty()).unwrap_or(false)
    }
}

/// Controllers present on the system (entries of `/sys/class/udc`), sorted.
///
/// # Errors
/// `ErrorKind::Io` when the class directory cannot be listed.
pub fn available_udcs(class_dir: &Path) -> Result<Vec<String>> {
    let rd = fs::read_dir(class_dir)
        .map_err(|e| Error::io(format!("list {}", class_dir.display()), &e))?;
    let mut names: Vec<String> = rd
        .filter_map(std::result::Result::ok)
        .map(|e| e.file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    Ok(names)
}
