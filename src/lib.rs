#![forbid(unsafe_code)]
//! Lunyard: safe, reversible read-write windows over USB mass-storage gadget images.
//!
//! Safety model highlights:
//! - The externally presented LUN is cleared only inside a globally serialized transition,
//!   and its backing file is restored first during cleanup on every exit path.
//! - Loop devices are reused per image; a second binding for the same image is never created.
//! - Caller-supplied operations run on a worker bounded by a deadline and a cancellation token.
//! - All OS mutations go through the `SystemOps` and configfs seams so they can be faked in tests.

pub mod adapters;
pub mod api;
pub mod config;
pub mod constants;
pub mod fs;
pub mod gadget;
pub mod logging;
pub mod types;

pub use api::*;
