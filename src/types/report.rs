use std::time::Duration;

use serde::Serialize;

/// The sole outcome contract surfaced to callers of public operations.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
pub struct OperationResult {
    pub success: bool,
    pub message: String,
}

impl OperationResult {
    pub fn ok(message: impl Into<String>) -> Self {
        Self {
            success: true,
            message: message.into(),
        }
    }

    pub fn failed(message: impl Into<String>) -> Self {
        Self {
            success: false,
            message: message.into(),
        }
    }
}

/// Cheap read-only view of whether a transition is in flight.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct ProgressStatus {
    pub in_progress: bool,
    pub lock_age: Option<Duration>,
    pub estimated_seconds_remaining: Option<u64>,
}
