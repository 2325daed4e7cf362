pub mod error;

use kernelutils::{ControlStructure, HypervisorError};
use x86::bits64::rflags::RFlags;
use x86::vmx::vmcs;
use x86::vmx::vmcs::control::PrimaryControls;

use crate::intel::guest::raw::InterruptibilityState;

/// Sets or clears "interrupt-window exiting" in the primary processor-based
/// VM-execution controls, leaving every other control bit as it was.
///
/// See: Table 25-6. Definitions of Primary Processor-Based VM-Execution Controls
pub fn set_interrupt_window_exiting<H: ControlStructure>(
    hw: &mut H,
    enable: bool,
) -> Result<(), HypervisorError> {
    let field = vmcs::control::PRIMARY_PROCBASED_EXEC_CONTROLS;
    let mut controls = hw.read_field32(field)?;
    let window = PrimaryControls::INTERRUPT_WINDOW_EXITING.bits();
    if enable {
        controls |= window;
    } else {
        controls &= !window;
    }
    hw.write_field(field, u64::from(controls))
}

pub fn is_interrupt_window_exiting_armed<H: ControlStructure>(
    hw: &H,
) -> Result<bool, HypervisorError> {
    let controls = hw.read_field32(vmcs::control::PRIMARY_PROCBASED_EXEC_CONTROLS)?;
    Ok(PrimaryControls::from_bits_truncate(controls).contains(PrimaryControls::INTERRUPT_WINDOW_EXITING))
}

/// Whether an external interrupt can be injected on the next VM-entry:
/// RFLAGS.IF is set and no MOV SS/POP SS blocking is in effect.
///
/// Blocking by STI is not checked.
pub fn is_guest_interruptible<H: ControlStructure>(hw: &H) -> Result<bool, HypervisorError> {
    let rflags = RFlags::from_bits_truncate(hw.read_field(vmcs::guest::RFLAGS)?);
    let interruptibility =
        InterruptibilityState::from(hw.read_field32(vmcs::guest::INTERRUPTIBILITY_STATE)?);

    Ok(rflags.contains(RFlags::FLAGS_IF) && !interruptibility.blocking_by_mov_ss())
}
