//! Bounded external command execution.
use std::io::Read;
use std::process::{Command, Output, Stdio};
use std::time::Duration;

use wait_timeout::ChildExt;

use crate::types::errors::{Error, ErrorKind, Result};

/// Run `cmd` to completion, killing it once `timeout` elapses.
///
/// Stdout and stderr are drained on helper threads so a chatty child cannot
/// block on a full pipe while we wait on it.
///
/// # Errors
/// `ErrorKind::Io` when the program cannot be spawned, `ErrorKind::Timeout` when it is killed.
pub fn output_with_timeout(program: &str, cmd: &mut Command, timeout: Duration) -> Result<Output> {
    cmd.stdin(Stdio::null())
        .stdout(Stdio::piped())
        .stderr(Stdio::piped());
    let mut child = cmd
        .spawn()
        .map_err(|e| Error::io(format!("spawn {program}"), &e))?;

    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();
    let stdout_handle = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut out) = stdout.take() {
            let _ = out.read_to_end(&mut buf);
        }
        buf
    });
    let stderr_handle = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut err) = stderr.take() {
            let _ = err.read_to_end(&mut buf);
        }
        buf
    });

    let waited = child
        .wait_timeout(timeout)
        .map_err(|e| Error::io(format!("wait {program}"), &e))?;
    let Some(status) = waited else {
        let _ = child.kill();
        let _ = child.wait();
        let _ = stdout_handle.join();
        let _ = stderr_handle.join();
        return Err(Error::new(
            ErrorKind::Timeout,
            format!("{program} did not finish within {}s", timeout.as_secs()),
        ));
    };

    let stdout = stdout_handle.join().unwrap_or_default();
    let stderr = stderr_handle.join().unwrap_or_default();
    Ok(Output {
        status,
        stdout,
        stderr,
    })
}

/// Like [`output_with_timeout`] but a non-zero exit status is an error too.
///
/// # Errors
/// Everything [`output_with_timeout`] returns, plus `ErrorKind::Command` on a failed exit.
pub fn checked_output(program: &str, cmd: &mut Command, timeout: Duration) -> Result<Output> {
    let output = output_with_timeout(program, cmd, timeout)?;
    if !output.status.success() {
        return Err(command_failed(program, &output));
    }
    Ok(output)
}

pub(crate) fn command_failed(program: &str, output: &Output) -> Error {
    let stderr = String::from_utf8_lossy(&output.stderr);
    let code = output
        .status
        .code()
        .map_or_else(|| "signal".to_string(), |c| c.to_string());
    Error::new(
        ErrorKind::Command,
        format!("{program} exited with {code}: {}", stderr.trim()),
    )
}
