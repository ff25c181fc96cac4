use serde::Serialize;

/// Result of one gadget audit. Produced fresh on every inspection; never persisted.
#[derive(Clone, Debug, Default, Serialize)]
pub struct GadgetState {
    pub healthy: bool,
    pub issues: Vec<String>,
    pub fixes_applied: Vec<String>,
    pub errors: Vec<String>,
}

/// States of one quick-edit transition, in the order they are entered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TransitionState {
    Served,
    BackingCleared,
    RoUnmounted,
    LoopReady,
    RwMounted,
    CallbackRunning,
    Synced,
    RwUnmounted,
    RoMounted,
    BackingRestored,
}

impl TransitionState {
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::Served => "served",
            Self::BackingCleared => "backing_cleared",
            Self::RoUnmounted => "ro_unmounted",
            Self::LoopReady => "loop_ready",
            Self::RwMounted => "rw_mounted",
            Self::CallbackRunning => "callback_running",
            Self::Synced => "synced",
            Self::RwUnmounted => "rw_unmounted",
            Self::RoMounted => "ro_mounted",
            Self::BackingRestored => "backing_restored",
        }
    }
}
