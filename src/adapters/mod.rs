pub mod lock;
pub mod mode;
pub mod system;

pub use lock::file::FileLockManager;
pub use lock::{LockGuard, LockManager};
pub use mode::{FixedMode, GadgetModeIndicator, ModeIndicator};
pub use system::linux::LinuxSystem;
pub use system::SystemOps;
