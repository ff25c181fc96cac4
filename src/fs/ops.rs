//! Built-in operations for a quick-edit window.
//!
//! Each one resolves paths through [`WriteWindow::resolve`], checks the cancel
//! token at safe points and never leaves a half-written file under its final
//! name: data goes to a temporary sibling first and is renamed into place.
use std::fs::{self, File};
use std::io::{Read, Write};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};

use crate::constants::TMP_SUFFIX;
use crate::types::{OpError, WriteWindow};

const COPY_CHUNK: usize = 1 << 20;

static NEXT_TMP_COUNTER: AtomicU64 = AtomicU64::new(0);

fn tmp_sibling(target: &Path) -> PathBuf {
    let n = NEXT_TMP_COUNTER.fetch_add(1, Ordering::Relaxed);
    let name = target
        .file_name()
        .map(|s| s.to_string_lossy().into_owned())
        .unwrap_or_default();
    target.with_file_name(format!(".{name}.{}.{n}{TMP_SUFFIX}", std::process::id()))
}

fn ensure_parent(path: &Path) -> Result<(), OpError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

fn copy_chunks(window: &WriteWindow, src: &Path, tmp: &Path) -> Result<u64, OpError> {
    let mut input = File::open(src)?;
    let mut output = File::create(tmp)?;
    let mut buf = vec![0u8; COPY_CHUNK];
    let mut total = 0u64;
    loop {
        window.checkpoint()?;
        let n = input.read(&mut buf)?;
        if n == 0 {
            break;
        }
        output.write_all(&buf[..n])?;
        total += n as u64;
    }
    output.sync_all()?;
    Ok(total)
}

/// Copy a local file into the window at `dest_rel`.
///
/// # Errors
/// `OpError::Cancelled` when the deadline passed mid-copy; I/O and path errors otherwise.
pub fn copy_into(window: &WriteWindow, src: &Path, dest_rel: &Path) -> Result<String, OpError> {
    let dest = window.resolve(dest_rel)?;
    ensure_parent(&dest)?;
    let tmp = tmp_sibling(&dest);
    let placed = copy_chunks(window, src, &tmp).and_then(|bytes| {
        window.checkpoint()?;
        fs::rename(&tmp, &dest)?;
        Ok(bytes)
    });
    match placed {
        Ok(bytes) => Ok(format!(
            "copied {} ({bytes} bytes) to {}",
            src.display(),
            dest_rel.display()
        )),
        Err(e) => {
            let _ = fs::remove_file(&tmp);
            Err(e)
        }
    }
}

/// Delete a file or directory tree inside the window.
///
/// # Errors
/// `OpError::Io` when the entry does not exist or cannot be removed.
pub fn remove(window: &WriteWindow, rel: &Path) -> Result<String, OpError> {
    let target = window.resolve(rel)?;
    window.checkpoint()?;
    let md = fs::symlink_metadata(&target)?;
    if md.is_dir() {
        fs::remove_dir_all(&target)?;
    } else {
        fs::remove_file(&target)?;
    }
    Ok(format!("removed {}", rel.display()))
}

/// Rename an entry inside the window. Refuses to overwrite an existing destination.
///
/// # Errors
/// `OpError::Failed` when the destination exists; I/O and path errors otherwise.
pub fn rename(window: &WriteWindow, from_rel: &Path, to_rel: &Path) -> Result<String, OpError> {
    let from = window.resolve(from_rel)?;
    let to = window.resolve(to_rel)?;
    window.checkpoint()?;
    fs::symlink_metadata(&from)?;
    if fs::symlink_metadata(&to).is_ok() {
        return Err(OpError::Failed(format!("{} already exists", to_rel.display())));
    }
    ensure_parent(&to)?;
    fs::rename(&from, &to)?;
    Ok(format!("renamed {} to {}", from_rel.display(), to_rel.display()))
}
