pub mod guest;
pub mod vmexit;

pub use guest::*;
pub use vmexit::VmExitReason;
