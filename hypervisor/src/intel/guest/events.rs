//! Writes that schedule an event for delivery on the next VM-entry.

use kernelutils::{ControlStructure, HypervisorError};
use x86::vmx::vmcs;

use crate::intel::guest::raw::{InterruptDescriptor, InterruptionType, INVALID_OPCODE_VECTOR};
use crate::intel::guest::vcpu::VirtualCpuState;

/// Re-injects `trap` exactly as it was reported. Only the VM-entry
/// interruption-information field is written.
pub fn reinject<H: ControlStructure>(
    hw: &mut H,
    trap: InterruptDescriptor,
) -> Result<(), HypervisorError> {
    log::trace!("Injecting {trap}");
    hw.write_field(
        vmcs::control::VMENTRY_INTERRUPTION_INFO_FIELD,
        u64::from(trap.encode()),
    )
}

/// Re-injects #BP. INT3 is a software exception, so the VM-entry instruction
/// length has to match the instruction that raised it.
pub fn reinject_breakpoint<H: ControlStructure>(
    hw: &mut H,
    trap: InterruptDescriptor,
) -> Result<(), HypervisorError> {
    reinject(hw, trap)?;
    if trap.interruption_type.needs_instruction_length() {
        let length = hw.read_field(vmcs::ro::VMEXIT_INSTRUCTION_LEN)?;
        hw.write_field(vmcs::control::VMENTRY_INSTRUCTION_LEN, length)?;
    }
    Ok(())
}

/// Injects #UD and keeps RIP on the faulting instruction.
pub fn inject_undefined_opcode<H: ControlStructure>(
    vcpu: &mut VirtualCpuState,
    hw: &mut H,
) -> Result<(), HypervisorError> {
    let trap = InterruptDescriptor::new(INVALID_OPCODE_VECTOR, InterruptionType::HardwareException);
    reinject(hw, trap)?;
    vcpu.suppress_rip_increment();
    Ok(())
}
