//! Mount table parsing and the queries the orchestrator runs against it.

use std::path::{Path, PathBuf};

use crate::types::{LoopBinding, MountEntry};

/// Undo the octal escapes the kernel applies to mount table fields (`\040` for space).
fn unescape(field: &str) -> String {
    let bytes = field.as_bytes();
    let mut out = Vec::with_capacity(bytes.len());
    let mut i = 0;
    while i < bytes.len() {
        if bytes[i] == b'\\' && i + 4 <= bytes.len() {
            let oct = &bytes[i + 1..i + 4];
            let parsed = std::str::from_utf8(oct).ok().and_then(|o| u8::from_str_radix(o, 8).ok());
            if let Some(v) = parsed {
                out.push(v);
                i += 4;
                continue;
            }
        }
        out.push(bytes[i]);
        i += 1;
    }
    String::from_utf8_lossy(&out).into_owned()
}

/// Parse `/proc/<pid>/mounts` content. Malformed lines are skipped.
#[must_use]
pub fn parse_mount_table(raw: &str) -> Vec<MountEntry> {
    raw.lines()
        .filter_map(|line| {
            let parts: Vec<&str> = line.split_whitespace().collect();
            if parts.len() < 4 {
                return None;
            }
            Some(MountEntry {
                source: PathBuf::from(unescape(parts[0])),
                target: PathBuf::from(unescape(parts[1])),
                fstype: parts[2].to_string(),
                options: parts[3].to_ascii_lowercase(),
            })
        })
        .collect()
}

/// Mounts whose source is the image itself or one of its loop devices.
#[must_use]
pub fn mounts_of_image<'a>(
    entries: &'a [MountEntry],
    image: &Path,
    bindings: &[LoopBinding],
) -> Vec<&'a MountEntry> {
    entries
        .iter()
        .filter(|m| m.source == image || bindings.iter().any(|b| b.device == m.source))
        .collect()
}

/// The entry mounted at `target`, if any. Later rows shadow earlier ones.
#[must_use]
pub fn mounted_at<'a>(entries: &'a [MountEntry], target: &Path) -> Option<&'a MountEntry> {
    entries.iter().rev().find(|m| m.target == target)
}
