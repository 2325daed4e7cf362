use bit_field::BitField;
use kernelutils::{ControlStructure, HypervisorError};
use x86::vmx::vmcs;

use crate::intel::guest::{IdtEmulation, InterruptDescriptor, VirtualCpuState};

/// The basic exit reasons routed to interrupt and exception delivery.
///
/// See: Table C-1. Basic Exit Reasons
#[derive(Debug, Copy, Clone, PartialEq, Eq)]
pub enum VmExitReason {
    ExceptionOrNmi,
    ExternalInterrupt,
    InterruptWindow,
    NmiWindow,
    /// Any other basic exit reason. Handled elsewhere in the exit loop.
    Unhandled(u16),
}

impl VmExitReason {
    /// Decodes the exit-reason field. Only the basic exit reason (bits 15:0)
    /// is considered.
    pub fn from_raw(exit_reason: u32) -> Self {
        match exit_reason.get_bits(0..16) as u16 {
            0 => Self::ExceptionOrNmi,
            1 => Self::ExternalInterrupt,
            7 => Self::InterruptWindow,
            8 => Self::NmiWindow,
            basic => Self::Unhandled(basic),
        }
    }

    pub fn read<H: ControlStructure>(hw: &H) -> Result<Self, HypervisorError> {
        hw.read_field32(vmcs::ro::EXIT_REASON).map(Self::from_raw)
    }
}

impl IdtEmulation {
    /// Routes one VM-exit to its handler. Exits that deliver an event have it
    /// decoded from the VM-exit interruption-information field first.
    pub fn handle_vmexit<H: ControlStructure>(
        &self,
        vcpu: &mut VirtualCpuState,
        hw: &mut H,
        reason: VmExitReason,
    ) -> Result<(), HypervisorError> {
        match reason {
            VmExitReason::ExceptionOrNmi => {
                let trap = read_exit_interruption(hw)?;
                self.handle_exception_or_nmi(vcpu, hw, trap)
            }
            VmExitReason::ExternalInterrupt => {
                let trap = read_exit_interruption(hw)?;
                self.handle_external_interrupt(vcpu, hw, trap)
            }
            VmExitReason::InterruptWindow => self.handle_interrupt_window_exiting(vcpu, hw),
            VmExitReason::NmiWindow => {
                self.handle_nmi_window_exiting(vcpu);
                Ok(())
            }
            VmExitReason::Unhandled(basic) => {
                log::trace!("Exit reason {basic} is not an interrupt or exception exit");
                Ok(())
            }
        }
    }
}

fn read_exit_interruption<H: ControlStructure>(hw: &H) -> Result<InterruptDescriptor, HypervisorError> {
    hw.read_field32(vmcs::ro::VMEXIT_INTERRUPTION_INFO)
        .map(InterruptDescriptor::decode)
}

#[cfg(test)]
mod tests {
    use super::*;
    use kernelutils::RecordingVmcs;

    #[test]
    fn decodes_basic_exit_reason() {
        assert_eq!(VmExitReason::from_raw(0), VmExitReason::ExceptionOrNmi);
        assert_eq!(VmExitReason::from_raw(1), VmExitReason::ExternalInterrupt);
        assert_eq!(VmExitReason::from_raw(7), VmExitReason::InterruptWindow);
        assert_eq!(VmExitReason::from_raw(8), VmExitReason::NmiWindow);
        assert_eq!(VmExitReason::from_raw(10), VmExitReason::Unhandled(10));
        // VM-entry failure bit does not change the basic reason.
        assert_eq!(VmExitReason::from_raw(0x8000_0001), VmExitReason::ExternalInterrupt);
    }

    #[test]
    fn reads_reason_from_control_structure() {
        let hw = RecordingVmcs::new().with_field(vmcs::ro::EXIT_REASON, 7);
        assert_eq!(VmExitReason::read(&hw), Ok(VmExitReason::InterruptWindow));
    }

    #[test]
    fn exception_exit_decodes_trap_from_exit_information() {
        let emulation = IdtEmulation::default();
        let mut vcpu = VirtualCpuState::new(0);
        let mut hw = RecordingVmcs::new().with_field(vmcs::ro::VMEXIT_INTERRUPTION_INFO, 0x8000_0b0d);

        emulation
            .handle_vmexit(&mut vcpu, &mut hw, VmExitReason::ExceptionOrNmi)
            .unwrap();

        assert_eq!(
            hw.writes_to(vmcs::control::VMENTRY_INTERRUPTION_INFO_FIELD),
            vec![0x8000_0b0d]
        );
    }

    #[test]
    fn other_exits_touch_nothing() {
        let emulation = IdtEmulation::default();
        let mut vcpu = VirtualCpuState::new(0);
        let mut hw = RecordingVmcs::new();

        emulation
            .handle_vmexit(&mut vcpu, &mut hw, VmExitReason::Unhandled(10))
            .unwrap();
        emulation
            .handle_vmexit(&mut vcpu, &mut hw, VmExitReason::NmiWindow)
            .unwrap();

        assert!(hw.writes().is_empty());
        assert!(vcpu.should_increment_rip());
    }
}
