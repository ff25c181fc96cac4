use thiserror::Error;

use crate::types::errors::{Error as CoreError, ErrorKind};
use crate::types::OperationResult;

/// Failure categories a public operation can end in.
#[derive(Debug, Error)]
pub enum ApiError {
    #[error("configuration error: {0}")]
    Configuration(String),
    #[error("another operation is in progress: {0}")]
    ConcurrencyTimeout(String),
    #[error("mount error: {0}")]
    Mount(String),
    #[error("operation timed out after {0}s")]
    CallbackTimeout(u64),
    #[error("operation error: {0}")]
    Callback(String),
    #[error("LUN backing restore failed: {0}")]
    CriticalRestoreFailure(String),
    #[error("gadget error: {0}")]
    Gadget(String),
}

impl ApiError {
    #[must_use]
    pub const fn id(&self) -> ErrorId {
        match self {
            ApiError::Configuration(_) => ErrorId::E_CONFIG,
            ApiError::ConcurrencyTimeout(_) => ErrorId::E_LOCKING,
            ApiError::Mount(_) => ErrorId::E_MOUNT,
            ApiError::CallbackTimeout(_) => ErrorId::E_CALLBACK_TIMEOUT,
            ApiError::Callback(_) => ErrorId::E_CALLBACK,
            ApiError::CriticalRestoreFailure(_) => ErrorId::E_RESTORE_FAILED,
            ApiError::Gadget(_) => ErrorId::E_GADGET,
        }
    }

    /// Caller-facing result: the message plus the stable error ID as a short tag.
    #[must_use]
    pub fn to_result(&self) -> OperationResult {
        OperationResult::failed(format!("{self} ({})", id_str(self.id())))
    }
}

impl From<CoreError> for ApiError {
    fn from(e: CoreError) -> Self {
        match e.kind {
            ErrorKind::Config => ApiError::Configuration(e.msg),
            ErrorKind::Locking => ApiError::ConcurrencyTimeout(e.msg),
            ErrorKind::Gadget => ApiError::Gadget(e.msg),
            ErrorKind::Io | ErrorKind::Command | ErrorKind::Timeout => ApiError::Mount(e.msg),
        }
    }
}

// Stable identifiers emitted in facts and appended to failure messages.
// SCREAMING_SNAKE_CASE matches the emitted strings.
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ErrorId {
    E_CONFIG,
    E_LOCKING,
    E_MOUNT,
    E_CALLBACK_TIMEOUT,
    E_CALLBACK,
    E_RESTORE_FAILED,
    E_GADGET,
    E_GENERIC,
}

#[must_use]
pub const fn id_str(id: ErrorId) -> &'static str {
    match id {
        ErrorId::E_CONFIG => "E_CONFIG",
        ErrorId::E_LOCKING => "E_LOCKING",
        ErrorId::E_MOUNT => "E_MOUNT",
        ErrorId::E_CALLBACK_TIMEOUT => "E_CALLBACK_TIMEOUT",
        ErrorId::E_CALLBACK => "E_CALLBACK",
        ErrorId::E_RESTORE_FAILED => "E_RESTORE_FAILED",
        ErrorId::E_GADGET => "E_GADGET",
        ErrorId::E_GENERIC => "E_GENERIC",
    }
}

#[must_use]
pub const fn exit_code_for(id: ErrorId) -> i32 {
    match id {
        ErrorId::E_CONFIG => 10,
        ErrorId::E_LOCKING => 30,
        ErrorId::E_MOUNT => 40,
        ErrorId::E_CALLBACK_TIMEOUT => 50,
        ErrorId::E_CALLBACK => 60,
        ErrorId::E_RESTORE_FAILED => 70,
        ErrorId::E_GADGET => 80,
        ErrorId::E_GENERIC => 1,
    }
}

#[must_use]
pub fn exit_code_for_id_str(s: &str) -> Option<i32> {
    match s {
        "E_CONFIG" => Some(10),
        "E_LOCKING" => Some(30),
        "E_MOUNT" => Some(40),
        "E_CALLBACK_TIMEOUT" => Some(50),
        "E_CALLBACK" => Some(60),
        "E_RESTORE_FAILED" => Some(70),
        "E_GADGET" => Some(80),
        "E_GENERIC" => Some(1),
        _ => None,
    }
}

/// Recover the exit code from a failed [`OperationResult`] message's trailing `(E_…)` tag.
#[must_use]
pub fn exit_code_for_result(res: &OperationResult) -> i32 {
    if res.success {
        return 0;
    }
    res.message
        .rsplit_once('(')
        .and_then(|(_, tail)| tail.strip_suffix(')'))
        .and_then(exit_code_for_id_str)
        .unwrap_or(exit_code_for(ErrorId::E_GENERIC))
}
