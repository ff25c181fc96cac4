// tests/helpers/lockmgr.rs
// A simple in-process lock manager for tests. A process-global flag claimed with
// compare-and-swap serializes holders with a bounded timeout; the age of the current
// holder is tracked alongside. The guard owns no borrow, so it can cross threads.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::{Duration, Instant};

use lunyard::adapters::{LockGuard, LockManager};
use lunyard::types::errors::{Error, ErrorKind, Result};

static HELD: AtomicBool = AtomicBool::new(false);
static HELD_SINCE: Mutex<Option<Instant>> = Mutex::new(None);

#[derive(Debug, Default)]
pub struct TestLockManager;

struct Guard;

impl Drop for Guard {
    fn drop(&mut self) {
        *HELD_SINCE.lock().unwrap_or_else(PoisonError::into_inner) = None;
        HELD.store(false, Ordering::Release);
    }
}

impl LockGuard for Guard {}

impl TestLockManager {
    pub fn new() -> Self {
        Self
    }
}

impl LockManager for TestLockManager {
    fn acquire_process_lock(&self, timeout_ms: u64) -> Result<Box<dyn LockGuard>> {
        let t0 = Instant::now();
        loop {
            if HELD
                .compare_exchange(false, true, Ordering::Acquire, Ordering::Relaxed)
                .is_ok()
            {
                *HELD_SINCE.lock().unwrap_or_else(PoisonError::into_inner) = Some(Instant::now());
                return Ok(Box::new(Guard));
            }
            if t0.elapsed() >= Duration::from_millis(timeout_ms) {
                return Err(Error::new(ErrorKind::Locking, "timeout acquiring test lock"));
            }
            std::thread::sleep(Duration::from_millis(5));
        }
    }

    fn holder_age(&self) -> Option<Duration> {
        HELD_SINCE
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .map(|t| t.elapsed())
    }
}
