pub mod events;
pub mod hooks;
mod idt_emulation;
mod pending;
pub mod raw;
mod session;
pub mod support;
mod vcpu;

pub use idt_emulation::IdtEmulation;

pub use hooks::Hooks;
pub use hooks::Unclaimed;
pub use hooks::{BreakpointHook, DebugTrapHook, PageFaultHook, SoftwareBreakpointHook, UndefinedOpcodeHook};

pub use pending::PendingInterrupts;
pub use pending::PendingQueueError;

pub use raw::*;

pub use session::HypervisorSession;
pub use session::VcpuTable;

pub use support::error::SessionError;
pub use support::{is_guest_interruptible, is_interrupt_window_exiting_armed, set_interrupt_window_exiting};

pub use vcpu::VirtualCpuState;
