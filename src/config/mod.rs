//! Configuration: partition table, gadget paths, timeouts and mount profile.
//!
//! Consumers typically load a [`Config`](crate::config::Config) from YAML via
//! `Config::from_yaml_file` and hand it to [`Lunyard`](crate::Lunyard). Every
//! field has a default so a minimal file only needs the `partitions` list.
//!
//! Submodules:
//! - `types`: grouped settings structs and their defaults
//! - `load`: YAML parsing and validation

pub mod load;
pub mod types;

pub use load::Config;
pub use types::{MountProfile, RestoreSettings, Timeouts};
