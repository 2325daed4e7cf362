use kernelutils::{ControlStructure, HypervisorError};
use x86::vmx::vmcs;

use super::IdtEmulation;
use crate::intel::guest::support::set_interrupt_window_exiting;
use crate::intel::guest::vcpu::VirtualCpuState;

impl IdtEmulation {
    /// Handles an "interrupt window" exit by delivering one parked interrupt.
    ///
    /// Interrupt-window exiting is cleared as soon as nothing is left to
    /// deliver.
    pub fn handle_interrupt_window_exiting<H: ControlStructure>(
        &self,
        vcpu: &mut VirtualCpuState,
        hw: &mut H,
    ) -> Result<(), HypervisorError> {
        match vcpu.pending_interrupts_mut().dequeue_one() {
            None => {
                set_interrupt_window_exiting(hw, false)?;
                log::trace!("Interrupt window exiting disarmed on core {}", vcpu.core_id());
            }
            Some(trap) => {
                log::trace!("Injecting deferred {trap} on core {}", vcpu.core_id());
                hw.write_field(
                    vmcs::control::VMENTRY_INTERRUPTION_INFO_FIELD,
                    u64::from(trap.encode()),
                )?;
                if trap.error_code_valid {
                    let error_code = hw.read_field(vmcs::ro::VMEXIT_INTERRUPTION_ERR_CODE)?;
                    hw.write_field(vmcs::control::VMENTRY_EXCEPTION_ERR_CODE, error_code)?;
                }

                if vcpu.pending_interrupts().is_empty() {
                    set_interrupt_window_exiting(hw, false)?;
                    log::trace!("Interrupt window exiting disarmed on core {}", vcpu.core_id());
                }
            }
        }

        vcpu.suppress_rip_increment();
        Ok(())
    }

    /// NMI-window exiting is never armed here, so this exit is unexpected.
    pub fn handle_nmi_window_exiting(&self, vcpu: &VirtualCpuState) {
        log::error!("Unexpected NMI-window exit on core {}", vcpu.core_id());
    }

    /// Leaves instrumentation stepping on this core. Interrupts parked while
    /// stepping are drained through the interrupt window from here on.
    pub fn end_instrumentation_step<H: ControlStructure>(
        &self,
        vcpu: &mut VirtualCpuState,
        hw: &mut H,
    ) -> Result<(), HypervisorError> {
        vcpu.enable_external_interrupts_on_continue = false;
        vcpu.enable_external_interrupts_on_continue_mtf = false;

        if !vcpu.pending_interrupts().is_empty() {
            set_interrupt_window_exiting(hw, true)?;
            log::debug!(
                "Draining {} interrupts deferred while stepping core {}",
                vcpu.pending_interrupts().len(),
                vcpu.core_id()
            );
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::intel::guest::raw::{InterruptDescriptor, InterruptionType};
    use crate::intel::guest::support::is_interrupt_window_exiting_armed;
    use kernelutils::RecordingVmcs;

    const ENTRY_INFO: u32 = vmcs::control::VMENTRY_INTERRUPTION_INFO_FIELD;

    fn armed() -> RecordingVmcs {
        let mut hw = RecordingVmcs::new();
        set_interrupt_window_exiting(&mut hw, true).unwrap();
        hw.clear_writes();
        hw
    }

    fn external(vector: u8) -> InterruptDescriptor {
        InterruptDescriptor::new(vector, InterruptionType::ExternalInterrupt)
    }

    #[test]
    fn empty_queue_disarms() {
        let emulation = IdtEmulation::default();
        let mut vcpu = VirtualCpuState::new(0);
        let mut hw = armed();

        emulation.handle_interrupt_window_exiting(&mut vcpu, &mut hw).unwrap();

        assert!(!is_interrupt_window_exiting_armed(&hw).unwrap());
        assert!(hw.writes_to(ENTRY_INFO).is_empty());
        assert!(!vcpu.should_increment_rip());
    }

    #[test]
    fn delivers_one_and_stays_armed() {
        let emulation = IdtEmulation::default();
        let mut vcpu = VirtualCpuState::new(0);
        vcpu.pending_interrupts_mut().enqueue(external(0x30)).unwrap();
        vcpu.pending_interrupts_mut().enqueue(external(0x31)).unwrap();
        let mut hw = armed();

        emulation.handle_interrupt_window_exiting(&mut vcpu, &mut hw).unwrap();

        assert_eq!(hw.writes_to(ENTRY_INFO), vec![0x8000_0030]);
        assert!(is_interrupt_window_exiting_armed(&hw).unwrap());
        assert_eq!(vcpu.pending_interrupts().len(), 1);
    }

    #[test]
    fn last_delivery_disarms() {
        let emulation = IdtEmulation::default();
        let mut vcpu = VirtualCpuState::new(0);
        vcpu.pending_interrupts_mut().enqueue(external(0x30)).unwrap();
        let mut hw = armed();

        emulation.handle_interrupt_window_exiting(&mut vcpu, &mut hw).unwrap();

        assert_eq!(hw.writes_to(ENTRY_INFO), vec![0x8000_0030]);
        assert!(!is_interrupt_window_exiting_armed(&hw).unwrap());
    }

    #[test]
    fn error_code_copied_from_exit() {
        let emulation = IdtEmulation::default();
        let mut vcpu = VirtualCpuState::new(0);
        let trap = InterruptDescriptor::new(0x0d, InterruptionType::HardwareException).with_error_code();
        vcpu.pending_interrupts_mut().enqueue(trap).unwrap();
        let mut hw = armed().with_field(vmcs::ro::VMEXIT_INTERRUPTION_ERR_CODE, 0x18);

        emulation.handle_interrupt_window_exiting(&mut vcpu, &mut hw).unwrap();

        assert_eq!(hw.writes_to(vmcs::control::VMENTRY_EXCEPTION_ERR_CODE), vec![0x18]);
    }

    #[test]
    fn ending_a_step_arms_for_parked_interrupts() {
        let emulation = IdtEmulation::default();
        let mut vcpu = VirtualCpuState::new(0);
        vcpu.enable_external_interrupts_on_continue_mtf = true;
        vcpu.pending_interrupts_mut().enqueue(external(0x30)).unwrap();
        let mut hw = RecordingVmcs::new();

        emulation.end_instrumentation_step(&mut vcpu, &mut hw).unwrap();

        assert!(!vcpu.is_instrumentation_stepping());
        assert!(is_interrupt_window_exiting_armed(&hw).unwrap());
    }

    #[test]
    fn ending_a_step_with_nothing_parked_leaves_controls_alone() {
        let emulation = IdtEmulation::default();
        let mut vcpu = VirtualCpuState::new(0);
        vcpu.enable_external_interrupts_on_continue = true;
        let mut hw = RecordingVmcs::new();

        emulation.end_instrumentation_step(&mut vcpu, &mut hw).unwrap();

        assert!(!vcpu.is_instrumentation_stepping());
        assert!(hw.writes().is_empty());
    }
}
