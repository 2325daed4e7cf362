//! Collaborators that may claim an exception before it is re-injected.
//!
//! Each hook returns `true` when it consumed the event, in which case nothing
//! is injected for it.

use alloc::boxed::Box;
use core::fmt;

use crate::intel::guest::raw::PageFaultErrorCode;
use crate::intel::guest::vcpu::VirtualCpuState;

/// Breakpoints planted by the hypervisor through EPT.
pub trait SoftwareBreakpointHook {
    fn try_handle(&self, core_id: usize) -> bool;
}

/// The kernel debugger's #BP handler.
pub trait BreakpointHook {
    fn try_handle(&self, core_id: usize) -> bool;
}

/// The kernel debugger's #DB handler, also used for thread-change detection.
pub trait DebugTrapHook {
    fn try_handle(&self, core_id: usize) -> bool;
}

/// The kernel debugger's #PF handler.
pub trait PageFaultHook {
    fn try_handle(&self, core_id: usize, address: u64, error_code: PageFaultErrorCode) -> bool;
}

/// The system-call hook, which raises #UD on SYSCALL/SYSRET.
pub trait UndefinedOpcodeHook {
    fn try_handle(&self, vcpu: &mut VirtualCpuState) -> bool;
}

/// A hook that never claims anything.
#[derive(Debug, Default, Copy, Clone)]
pub struct Unclaimed;

impl SoftwareBreakpointHook for Unclaimed {
    fn try_handle(&self, _core_id: usize) -> bool {
        false
    }
}

impl BreakpointHook for Unclaimed {
    fn try_handle(&self, _core_id: usize) -> bool {
        false
    }
}

impl DebugTrapHook for Unclaimed {
    fn try_handle(&self, _core_id: usize) -> bool {
        false
    }
}

impl PageFaultHook for Unclaimed {
    fn try_handle(&self, _core_id: usize, _address: u64, _error_code: PageFaultErrorCode) -> bool {
        false
    }
}

impl UndefinedOpcodeHook for Unclaimed {
    fn try_handle(&self, _vcpu: &mut VirtualCpuState) -> bool {
        false
    }
}

impl<F: Fn(usize) -> bool> SoftwareBreakpointHook for F {
    fn try_handle(&self, core_id: usize) -> bool {
        self(core_id)
    }
}

impl<F: Fn(usize) -> bool> BreakpointHook for F {
    fn try_handle(&self, core_id: usize) -> bool {
        self(core_id)
    }
}

impl<F: Fn(usize) -> bool> DebugTrapHook for F {
    fn try_handle(&self, core_id: usize) -> bool {
        self(core_id)
    }
}

impl<F: Fn(usize, u64, PageFaultErrorCode) -> bool> PageFaultHook for F {
    fn try_handle(&self, core_id: usize, address: u64, error_code: PageFaultErrorCode) -> bool {
        self(core_id, address, error_code)
    }
}

impl<F: Fn(&mut VirtualCpuState) -> bool> UndefinedOpcodeHook for F {
    fn try_handle(&self, vcpu: &mut VirtualCpuState) -> bool {
        self(vcpu)
    }
}

/// Every collaborator the exception dispatcher consults. Defaults to
/// [`Unclaimed`] everywhere.
pub struct Hooks {
    pub software_breakpoint: Box<dyn SoftwareBreakpointHook>,
    pub breakpoint: Box<dyn BreakpointHook>,
    pub debug_trap: Box<dyn DebugTrapHook>,
    pub page_fault: Box<dyn PageFaultHook>,
    pub undefined_opcode: Box<dyn UndefinedOpcodeHook>,
}

impl Hooks {
    pub fn with_software_breakpoint(mut self, hook: impl SoftwareBreakpointHook + 'static) -> Self {
        self.software_breakpoint = Box::new(hook);
        self
    }

    pub fn with_breakpoint(mut self, hook: impl BreakpointHook + 'static) -> Self {
        self.breakpoint = Box::new(hook);
        self
    }

    pub fn with_debug_trap(mut self, hook: impl DebugTrapHook + 'static) -> Self {
        self.debug_trap = Box::new(hook);
        self
    }

    pub fn with_page_fault(mut self, hook: impl PageFaultHook + 'static) -> Self {
        self.page_fault = Box::new(hook);
        self
    }

    pub fn with_undefined_opcode(mut self, hook: impl UndefinedOpcodeHook + 'static) -> Self {
        self.undefined_opcode = Box::new(hook);
        self
    }
}

impl Default for Hooks {
    fn default() -> Self {
        Self {
            software_breakpoint: Box::new(Unclaimed),
            breakpoint: Box::new(Unclaimed),
            debug_trap: Box::new(Unclaimed),
            page_fault: Box::new(Unclaimed),
            undefined_opcode: Box::new(Unclaimed),
        }
    }
}

impl fmt::Debug for Hooks {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Hooks").finish_non_exhaustive()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_claim_nothing() {
        let hooks = Hooks::default();
        let mut vcpu = VirtualCpuState::new(0);

        assert!(!hooks.software_breakpoint.try_handle(0));
        assert!(!hooks.breakpoint.try_handle(0));
        assert!(!hooks.debug_trap.try_handle(0));
        assert!(!hooks.page_fault.try_handle(0, 0x1000, PageFaultErrorCode(2)));
        assert!(!hooks.undefined_opcode.try_handle(&mut vcpu));
    }

    #[test]
    fn closures_become_hooks() {
        let hooks = Hooks::default()
            .with_breakpoint(|core_id: usize| core_id == 1)
            .with_page_fault(|_: usize, address: u64, code: PageFaultErrorCode| {
                address == 0xdead_b000 && code.write()
            })
            .with_undefined_opcode(|vcpu: &mut VirtualCpuState| {
                vcpu.suppress_rip_increment();
                true
            });
        let mut vcpu = VirtualCpuState::new(0);

        assert!(hooks.breakpoint.try_handle(1));
        assert!(!hooks.breakpoint.try_handle(0));
        assert!(hooks.page_fault.try_handle(0, 0xdead_b000, PageFaultErrorCode(2)));
        assert!(hooks.undefined_opcode.try_handle(&mut vcpu));
        assert!(!vcpu.should_increment_rip());
    }
}
