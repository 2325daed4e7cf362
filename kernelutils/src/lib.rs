#![cfg_attr(not(test), no_std)]

extern crate alloc;

mod hard;
mod misc;

pub use hard::ControlStructure;
#[cfg(target_arch = "x86_64")]
pub use hard::ActiveVmcs;
#[cfg(any(test, feature = "recording"))]
pub use hard::recording::{FieldAccess, RecordingVmcs};

pub use misc::HypervisorError;
pub use misc::VmInstructionFailure;
