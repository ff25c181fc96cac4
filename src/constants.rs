//! Shared crate-wide constants for Lunyard.
//!
//! Centralizes timing budgets and configfs path fragments used across modules.
//! Most of these are defaults that `config::Config` can override.

/// Age after which an outstanding lock record is presumed to belong to a crashed process.
pub const LOCK_STALE_SECS: u64 = 120;

/// Poll interval in milliseconds for the file-backed lock manager (see `adapters/lock/file.rs`).
pub const LOCK_POLL_MS: u64 = 100;

/// Default bound on waiting for the global transition lock.
pub const DEFAULT_LOCK_TIMEOUT_SECS: u64 = 10;

/// Default ceiling for a caller-supplied operation inside a quick-edit window.
pub const DEFAULT_EXEC_TIMEOUT_SECS: u64 = 60;

/// How long a timed-out operation gets to observe cancellation before it is abandoned.
pub const DEFAULT_CANCEL_GRACE_SECS: u64 = 5;

/// Cap applied to every individual external command (losetup, mount, blkid, ...).
pub const DEFAULT_COMMAND_TIMEOUT_SECS: u64 = 10;

/// Shorter cap for read-only queries against the loop table.
pub const QUERY_COMMAND_TIMEOUT_SECS: u64 = 5;

/// LUN backing restore: attempts before the failure is treated as critical.
pub const LUN_RESTORE_MAX_RETRIES: u32 = 3;

/// LUN backing restore: backoff base, multiplied by the attempt number.
pub const LUN_RESTORE_BACKOFF_MS: u64 = 500;

/// Added to the exec timeout when estimating how long an in-flight transition has left.
pub const CLEANUP_ALLOWANCE_SECS: u64 = 15;

/// Default delay between UDC unbind and rebind.
pub const DEFAULT_REBIND_DELAY_MS: u64 = 2_000;

/// Directory under the configfs root that holds gadget definitions.
pub const GADGET_DIR: &str = "usb_gadget";

/// Prefix of mass-storage function directories (`mass_storage.<instance>`).
pub const MASS_STORAGE_PREFIX: &str = "mass_storage.";

/// Name of the LUN attribute holding the backing file path.
pub const LUN_FILE_ATTR: &str = "file";

/// Name of the LUN attribute that detaches the medium even while the host holds it.
pub const LUN_FORCED_EJECT_ATTR: &str = "forced_eject";

/// Name of the gadget attribute binding it to a USB Device Controller.
pub const UDC_ATTR: &str = "UDC";

/// Kernel knob for the advisory page-cache drop after a transition.
pub const DROP_CACHES_PATH: &str = "/proc/sys/vm/drop_caches";

/// Mount namespace of PID 1; mount changes must land there to be visible system-wide.
pub const HOST_MNT_NS: &str = "/proc/1/ns/mnt";

/// Default scratch suffix for atomic writes performed by built-in operations.
pub const TMP_SUFFIX: &str = ".lunyard.tmp";
