use kernelutils::{ControlStructure, HypervisorError};
use x86::vmx::vmcs;

use super::IdtEmulation;
use crate::intel::guest::events;
use crate::intel::guest::raw::{
    InterruptDescriptor, PageFaultErrorCode, BREAKPOINT_VECTOR, DEBUG_VECTOR, INVALID_OPCODE_VECTOR,
    NMI_VECTOR, PAGE_FAULT_VECTOR,
};
use crate::intel::guest::vcpu::VirtualCpuState;

impl IdtEmulation {
    /// Handles an "exception or NMI" exit. `trap` is the decoded VM-exit
    /// interruption information.
    pub fn handle_exception_or_nmi<H: ControlStructure>(
        &self,
        vcpu: &mut VirtualCpuState,
        hw: &mut H,
        trap: InterruptDescriptor,
    ) -> Result<(), HypervisorError> {
        let core_id = vcpu.core_id();

        match trap.vector {
            BREAKPOINT_VECTOR => {
                if self.hooks().software_breakpoint.try_handle(core_id) {
                    log::debug!("#BP on core {core_id} claimed by an EPT breakpoint");
                } else if self.hooks().breakpoint.try_handle(core_id) {
                    log::debug!("#BP on core {core_id} claimed by the debugger");
                } else {
                    vcpu.suppress_rip_increment();
                    events::reinject_breakpoint(hw, trap)?;
                }
            }
            INVALID_OPCODE_VECTOR => {
                if self.hooks().undefined_opcode.try_handle(vcpu) {
                    log::debug!("#UD on core {core_id} claimed by the syscall hook");
                } else {
                    events::inject_undefined_opcode(vcpu, hw)?;
                }
            }
            PAGE_FAULT_VECTOR => {
                let error_code = hw.read_field32(vmcs::ro::VMEXIT_INTERRUPTION_ERR_CODE)?;
                let address = hw.read_cr2();

                if self
                    .hooks()
                    .page_fault
                    .try_handle(core_id, address, PageFaultErrorCode(error_code))
                {
                    log::debug!("#PF at {address:#x} on core {core_id} claimed by the debugger");
                } else {
                    self.handle_page_fault(vcpu, hw, trap, None, error_code)?;
                }
            }
            DEBUG_VECTOR => {
                if self.hooks().debug_trap.try_handle(core_id) {
                    log::debug!("#DB on core {core_id} claimed by the debugger");
                } else {
                    events::reinject(hw, trap)?;
                }
            }
            NMI_VECTOR => {
                if vcpu.suppresses_nmi() {
                    log::warn!("Dropping NMI on core {core_id} while stepping");
                } else {
                    events::reinject(hw, trap)?;
                }
            }
            _ => events::reinject(hw, trap)?,
        }

        Ok(())
    }
}
