pub mod loopdev;
pub mod mount;
pub mod ops;

pub use loopdev::get_or_create;
pub use mount::{mounted_at, mounts_of_image, parse_mount_table};
