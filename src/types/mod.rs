pub mod errors;
pub mod mode;
pub mod mount;
pub mod partition;
pub mod report;
pub mod state;
pub mod window;

pub use errors::*;
pub use mode::*;
pub use mount::*;
pub use partition::*;
pub use report::*;
pub use state::*;
pub use window::*;
