//! Loop Device Manager: one binding per image, reused across transitions.
use std::path::{Path, PathBuf};

use crate::adapters::SystemOps;
use crate::types::errors::Result;

/// Return the loop device bound to `image`, binding one only when none exists.
///
/// Bindings are deliberately never torn down; a long-running host would otherwise
/// churn through loop devices. Callers hold the transition lock, which is what makes
/// the query-then-attach sequence race free.
///
/// # Errors
/// Propagates query and attach failures from `sys`.
pub fn get_or_create(sys: &dyn SystemOps, image: &Path) -> Result<PathBuf> {
    let existing = sys.loop_bindings(image)?;
    if let Some(first) = existing.first() {
        if existing.len() > 1 {
            log::warn!(
                "{} has {} loop bindings; reusing {}",
                image.display(),
                existing.len(),
                first.device.display()
            );
        }
        return Ok(first.device.clone());
    }
    let dev = sys.attach_loop(image)?;
    log::info!("bound {} to {}", image.display(), dev.display());
    Ok(dev)
}
