mod interruptibility;
mod interruption;
mod page_fault;

pub use interruption::InterruptDescriptor;
pub use interruption::InterruptionType;
pub use interruption::BREAKPOINT_VECTOR;
pub use interruption::DEBUG_VECTOR;
pub use interruption::INVALID_OPCODE_VECTOR;
pub use interruption::NMI_VECTOR;
pub use interruption::PAGE_FAULT_VECTOR;

pub use interruptibility::InterruptibilityState;

pub use page_fault::PageFaultContext;
pub use page_fault::PageFaultErrorCode;
