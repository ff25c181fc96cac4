use std::fs::{self, File, OpenOptions};
use std::io::{ErrorKind as IoKind, Write};
use std::path::PathBuf;
use std::thread;
use std::time::{Duration, Instant, SystemTime};

use fs2::FileExt;
use uuid::Uuid;

use crate::constants::{LOCK_POLL_MS, LOCK_STALE_SECS};
use crate::types::errors::{Error, ErrorKind, Result};

use super::{LockGuard, LockManager};

/// Lock backed by a record file whose existence means "a transition is in flight"
/// and whose modification time is the transition's age.
///
/// A record older than the staleness threshold is presumed to belong to a crashed
/// process and is removed by the next acquirer. Check-remove-create runs under an
/// `flock` on a sibling gate file so two acquirers cannot both reap the same record.
#[derive(Debug)]
pub struct FileLockManager {
    path: PathBuf,
    stale_after: Duration,
}

impl FileLockManager {
    #[must_use]
    pub const fn new(path: PathBuf) -> Self {
        Self {
            path,
            stale_after: Duration::from_secs(LOCK_STALE_SECS),
        }
    }

    #[must_use]
    pub fn with_stale_after(mut self, stale_after: Duration) -> Self {
        self.stale_after = stale_after;
        self
    }

    fn gate_path(&self) -> PathBuf {
        let mut s = self.path.clone().into_os_string();
        s.push(".gate");
        PathBuf::from(s)
    }

    fn record_age(&self) -> Option<Duration> {
        let md = fs::metadata(&self.path).ok()?;
        let mtime = md.modified().ok()?;
        Some(
            SystemTime::now()
                .duration_since(mtime)
                .unwrap_or(Duration::ZERO),
        )
    }

    fn open_gate(&self) -> Result<File> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| Error::io(format!("create {}", parent.display()), &e))?;
        }
        OpenOptions::new()
            .create(true)
            .read(true)
            .write(true)
            .truncate(false)
            .open(self.gate_path())
            .map_err(|e| Error::io("open lock gate", &e))
    }

    /// One claim attempt: reap a stale record, then try to create ours.
    fn try_claim(&self, token: &str) -> Result<bool> {
        let gate = self.open_gate()?;
        gate.lock_exclusive()
            .map_err(|e| Error::io("lock gate", &e))?;
        let claimed = self.claim_under_gate(token);
        let _ = gate.unlock();
        claimed
    }

    fn claim_under_gate(&self, token: &str) -> Result<bool> {
        match self.record_age() {
            Some(age) if age >= self.stale_after => {
                log::warn!(
                    "removing stale lock record {} (age {}s)",
                    self.path.display(),
                    age.as_secs()
                );
                match fs::remove_file(&self.path) {
                    Ok(()) => {}
                    Err(e) if e.kind() == IoKind::NotFound => {}
                    Err(e) => return Err(Error::io("remove stale lock record", &e)),
                }
            }
            Some(_) => return Ok(false),
            None => {}
        }
        match OpenOptions::new()
            .write(true)
            .create_new(true)
            .open(&self.path)
        {
            Ok(mut f) => {
                f.write_all(token.as_bytes())
                    .map_err(|e| Error::io("write lock record", &e))?;
                Ok(true)
            }
            Err(e) if e.kind() == IoKind::AlreadyExists => Ok(false),
            Err(e) => Err(Error::io("create lock record", &e)),
        }
    }
}

struct FileGuard {
    path: PathBuf,
    token: String,
}

impl Drop for FileGuard {
    fn drop(&mut self) {
        match fs::read_to_string(&self.path) {
            Ok(content) if content == self.token => {
                if let Err(e) = fs::remove_file(&self.path) {
                    log::error!("failed to remove lock record {}: {e}", self.path.display());
                }
            }
            Ok(_) => log::warn!(
                "lock record {} was taken over by another holder; leaving it",
                self.path.display()
            ),
            Err(e) if e.kind() == IoKind::NotFound => {
                log::warn!("lock record {} vanished before release", self.path.display());
            }
            Err(e) => log::error!("failed to read lock record {}: {e}", self.path.display()),
        }
    }
}

impl LockGuard for FileGuard {}

impl LockManager for FileLockManager {
    fn acquire_process_lock(&self, timeout_ms: u64) -> Result<Box<dyn LockGuard>> {
        let t0 = Instant::now();
        let token = format!("{} {}", std::process::id(), Uuid::new_v4());
        loop {
            if self.try_claim(&token)? {
                return Ok(Box::new(FileGuard {
                    path: self.path.clone(),
                    token,
                }));
            }
            if t0.elapsed() >= Duration::from_millis(timeout_ms) {
                // Last chance: the holder may have gone stale while we waited.
                if self.try_claim(&token)? {
                    return Ok(Box::new(FileGuard {
                        path: self.path.clone(),
                        token,
                    }));
                }
                let held = self.record_age().map_or(0, |a| a.as_secs());
                return Err(Error::new(
                    ErrorKind::Locking,
                    format!("timeout acquiring quick-edit lock (held for {held}s)"),
                ));
            }
            thread::sleep(Duration::from_millis(LOCK_POLL_MS));
        }
    }

    fn holder_age(&self) -> Option<Duration> {
        self.record_age()
    }
}
