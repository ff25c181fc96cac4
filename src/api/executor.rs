//! Timeout-Bounded Callback Executor.
//!
//! The operation runs on its own thread. At the deadline the executor trips the
//! window's cancel token and gives the operation a grace period to reach a
//! checkpoint. An operation that ignores the token is abandoned; the caller is told
//! so through `TimedOut { stopped: false }`.
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::mpsc::{self, RecvTimeoutError};
use std::thread;
use std::time::Duration;

use crate::types::{OpError, WriteWindow};

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ExecOutcome {
    Completed(Result<String, OpError>),
    Panicked(String),
    TimedOut { stopped: bool },
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "panic".to_string()
    }
}

/// Run `op` against `window`, waiting at most `timeout` plus `grace` after cancellation.
pub fn run_with_timeout<F>(op: F, window: WriteWindow, timeout: Duration, grace: Duration) -> ExecOutcome
where
    F: FnOnce(&WriteWindow) -> Result<String, OpError> + Send + 'static,
{
    let cancel = window.cancel_token().clone();
    let (tx, rx) = mpsc::channel();
    let spawned = thread::Builder::new()
        .name(format!("lunyard-op-{}", window.partition()))
        .spawn(move || {
            let res = panic::catch_unwind(AssertUnwindSafe(|| op(&window)));
            let _ = tx.send(res);
        });
    if let Err(e) = spawned {
        return ExecOutcome::Completed(Err(OpError::Failed(format!("could not start worker: {e}"))));
    }

    match rx.recv_timeout(timeout) {
        Ok(Ok(res)) => ExecOutcome::Completed(res),
        Ok(Err(payload)) => ExecOutcome::Panicked(panic_message(payload.as_ref())),
        Err(RecvTimeoutError::Disconnected) => {
            ExecOutcome::Panicked("worker exited without a result".to_string())
        }
        Err(RecvTimeoutError::Timeout) => {
            cancel.cancel();
            let stopped = match rx.recv_timeout(grace) {
                Ok(_) | Err(RecvTimeoutError::Disconnected) => true,
                Err(RecvTimeoutError::Timeout) => {
                    log::warn!(
                        "operation ignored cancellation for {}ms; abandoning worker",
                        grace.as_millis()
                    );
                    false
                }
            };
            ExecOutcome::TimedOut { stopped }
        }
    }
}
