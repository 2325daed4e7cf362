use kernelutils::{ControlStructure, HypervisorError};
use x86::vmx::vmcs;

use super::IdtEmulation;
use crate::intel::guest::raw::{InterruptDescriptor, PageFaultContext, PageFaultErrorCode};
use crate::intel::guest::vcpu::VirtualCpuState;

impl IdtEmulation {
    /// Delivers `trap` (a #PF) to the guest.
    ///
    /// The faulting address is `address`, or the exit qualification when
    /// `None`. CR2 is written before any VM-entry field so the guest sees the
    /// right address when the fault is delivered.
    pub fn handle_page_fault<H: ControlStructure>(
        &self,
        vcpu: &mut VirtualCpuState,
        hw: &mut H,
        trap: InterruptDescriptor,
        address: Option<u64>,
        error_code: u32,
    ) -> Result<(), HypervisorError> {
        let address = match address {
            Some(address) => address,
            None => hw.read_field(vmcs::ro::EXIT_QUALIFICATION)?,
        };
        let fault = PageFaultContext {
            address,
            error_code: PageFaultErrorCode(error_code),
        };
        log::trace!("Injecting #PF at {:#x} {:?}", fault.address, fault.error_code);

        hw.write_cr2(fault.address);
        vcpu.suppress_rip_increment();

        hw.write_field(
            vmcs::control::VMENTRY_INTERRUPTION_INFO_FIELD,
            u64::from(trap.encode()),
        )?;
        if trap.error_code_valid {
            hw.write_field(
                vmcs::control::VMENTRY_EXCEPTION_ERR_CODE,
                u64::from(fault.error_code.0),
            )?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intel::guest::raw::{InterruptionType, PAGE_FAULT_VECTOR};
    use kernelutils::{FieldAccess, RecordingVmcs};

    fn page_fault() -> InterruptDescriptor {
        InterruptDescriptor::new(PAGE_FAULT_VECTOR, InterruptionType::HardwareException)
            .with_error_code()
    }

    #[test]
    fn address_from_exit_qualification() {
        let emulation = IdtEmulation::default();
        let mut vcpu = VirtualCpuState::new(0);
        let mut hw = RecordingVmcs::new().with_field(vmcs::ro::EXIT_QUALIFICATION, 0xffff_8000_1234_5000);

        emulation
            .handle_page_fault(&mut vcpu, &mut hw, page_fault(), None, 0b10)
            .unwrap();

        assert_eq!(
            hw.writes(),
            &[
                FieldAccess::WriteCr2(0xffff_8000_1234_5000),
                FieldAccess::Write {
                    field: vmcs::control::VMENTRY_INTERRUPTION_INFO_FIELD,
                    value: 0x8000_0b0e,
                },
                FieldAccess::Write {
                    field: vmcs::control::VMENTRY_EXCEPTION_ERR_CODE,
                    value: 0b10,
                },
            ]
        );
        assert!(!vcpu.should_increment_rip());
    }

    #[test]
    fn explicit_address_wins() {
        let emulation = IdtEmulation::default();
        let mut vcpu = VirtualCpuState::new(0);
        let mut hw = RecordingVmcs::new().with_field(vmcs::ro::EXIT_QUALIFICATION, 0x1000);

        emulation
            .handle_page_fault(&mut vcpu, &mut hw, page_fault(), Some(0x7ff0_0000), 0x14)
            .unwrap();

        assert_eq!(hw.cr2(), 0x7ff0_0000);
    }

    #[test]
    fn no_error_code_without_valid_bit() {
        let emulation = IdtEmulation::default();
        let mut vcpu = VirtualCpuState::new(0);
        let mut hw = RecordingVmcs::new();
        let trap = InterruptDescriptor::new(PAGE_FAULT_VECTOR, InterruptionType::HardwareException);

        emulation
            .handle_page_fault(&mut vcpu, &mut hw, trap, Some(0x1000), 0x7)
            .unwrap();

        assert!(hw.writes_to(vmcs::control::VMENTRY_EXCEPTION_ERR_CODE).is_empty());
        assert_eq!(hw.writes().len(), 2);
    }
}
