#![cfg_attr(not(test), no_std)]

//! Delivery of guest exceptions, NMIs and external interrupts for a VMX
//! hypervisor.
//!
//! Every VM-exit caused by one of those events is routed here on the core
//! that exited. The event is either re-injected on the next VM-entry, handed
//! to a debugger/instrumentation hook, or parked in the core's
//! pending-interrupt queue until the guest opens its interrupt window.

extern crate alloc;

pub mod config;
pub mod intel;

pub use config::{HypervisorConfig, MAX_PROCESSORS, PENDING_INTERRUPTS_BUFFER_CAPACITY};
pub use intel::*;
pub use kernelutils::{ControlStructure, HypervisorError};
